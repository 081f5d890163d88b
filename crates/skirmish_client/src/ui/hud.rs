use std::collections::VecDeque;

use bevy::prelude::*;
use skirmish_protocol::protocol::PlayerId;

use crate::LocalPlayerId;
use crate::app_state::AppState;
use crate::events::KillEvent;
use crate::network::Roster;
use crate::player::camera::Vitals;

const KILL_FEED_LEN: usize = 4;

#[derive(Component)]
pub struct VitalsText;

#[derive(Component)]
pub struct KillFeedText;

/// Most recent kills, newest last, already formatted for display.
#[derive(Resource, Default)]
pub struct KillFeed(pub VecDeque<String>);

pub fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        VitalsText,
        StateScoped(AppState::InGame),
        Text::new(""),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        },
    ));

    commands.spawn((
        KillFeedText,
        StateScoped(AppState::InGame),
        Text::new(""),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::srgba(1.0, 1.0, 1.0, 0.85)),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(12.0),
            right: Val::Px(12.0),
            ..default()
        },
    ));

    // Crosshair
    commands
        .spawn((
            StateScoped(AppState::InGame),
            Node {
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
        ))
        .with_children(|parent| {
            parent.spawn((
                Node {
                    width: Val::Px(4.0),
                    height: Val::Px(4.0),
                    ..default()
                },
                BackgroundColor(Color::srgba(1.0, 1.0, 1.0, 0.8)),
            ));
        });
}

fn display_name(id: PlayerId, local: Option<PlayerId>, roster: &Roster) -> String {
    if Some(id) == local {
        return "You".into();
    }
    roster
        .0
        .get(id)
        .map(|view| view.username.clone())
        .unwrap_or_else(|| format!("#{id}"))
}

pub fn record_kills(
    mut ev_kill: EventReader<KillEvent>,
    local_id: Res<LocalPlayerId>,
    roster: Res<Roster>,
    mut feed: ResMut<KillFeed>,
) {
    for kill in ev_kill.read() {
        let line = format!(
            "{} eliminated {}",
            display_name(kill.killer_id, local_id.0, &roster),
            display_name(kill.victim_id, local_id.0, &roster)
        );
        feed.0.push_back(line);
        while feed.0.len() > KILL_FEED_LEN {
            feed.0.pop_front();
        }
    }
}

pub fn update_hud(
    vitals: Res<Vitals>,
    feed: Res<KillFeed>,
    mut vitals_text: Query<&mut Text, (With<VitalsText>, Without<KillFeedText>)>,
    mut feed_text: Query<&mut Text, (With<KillFeedText>, Without<VitalsText>)>,
) {
    if vitals.is_changed() {
        let v = vitals.0;
        for mut text in &mut vitals_text {
            text.0 = format!(
                "HP {}/{}   K {}   D {}",
                v.health.max(0),
                v.max_health,
                v.kills,
                v.deaths
            );
        }
    }

    if feed.is_changed() {
        let joined = feed.0.iter().cloned().collect::<Vec<_>>().join("\n");
        for mut text in &mut feed_text {
            text.0.clone_from(&joined);
        }
    }
}
