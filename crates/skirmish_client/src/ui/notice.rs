use bevy::prelude::*;

use crate::app_state::AppState;
use crate::frame::SimulationStatus;
use crate::input::SampledInput;
use crate::player::camera::Vitals;

#[derive(Component)]
pub struct NoticeText;

/// A 2D camera so the notice stays visible while no 3D view exists.
pub fn overlay_camera(state: AppState) -> impl Fn(Commands) {
    move |mut commands: Commands| {
        commands.spawn((Camera2d, StateScoped(state.clone())));
    }
}

pub fn spawn_notice(mut commands: Commands) {
    commands
        .spawn(Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            top: Val::Percent(40.0),
            justify_content: JustifyContent::Center,
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                NoticeText,
                Text::new(""),
                TextFont {
                    font_size: 28.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                TextLayout::new_with_justify(JustifyText::Center),
            ));
        });
}

/// Picks the single most important message for the player, if any.
fn notice_for(
    state: &AppState,
    status: &SimulationStatus,
    alive: bool,
    pointer_captured: bool,
) -> Option<String> {
    if let SimulationStatus::Halted { reason } = status {
        return Some(format!("Simulation stopped\n{reason}"));
    }
    match state {
        AppState::Connecting => Some("Joining arena...".into()),
        AppState::Ended => Some("Session ended".into()),
        AppState::InGame if !alive => Some("You were eliminated\nPress R to respawn".into()),
        AppState::InGame if !pointer_captured => Some("Click to play".into()),
        AppState::InGame => None,
    }
}

pub fn update_notice(
    state: Res<State<AppState>>,
    status: Res<SimulationStatus>,
    vitals: Res<Vitals>,
    input: Res<SampledInput>,
    mut query: Query<&mut Text, With<NoticeText>>,
) {
    let message = notice_for(
        state.get(),
        &status,
        vitals.0.is_alive,
        input.0.pointer_captured(),
    )
    .unwrap_or_default();

    for mut text in &mut query {
        if text.0 != message {
            text.0.clone_from(&message);
        }
    }
}
