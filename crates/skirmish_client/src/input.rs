use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, WindowFocused};
use skirmish_protocol::input::{Action, InputSampler};

use crate::app_state::AppState;
use crate::config::ClientConfig;
use crate::frame::TickSet;

const BINDINGS: [(Action, &[KeyCode]); 7] = [
    (Action::Forward, &[KeyCode::KeyW]),
    (Action::Backward, &[KeyCode::KeyS]),
    (Action::Left, &[KeyCode::KeyA]),
    (Action::Right, &[KeyCode::KeyD]),
    (Action::Jump, &[KeyCode::Space]),
    (Action::Sprint, &[KeyCode::ShiftLeft]),
    (Action::Crouch, &[KeyCode::ControlLeft, KeyCode::KeyC]),
];

#[derive(Resource, Default)]
pub struct SampledInput(pub InputSampler);

/// Reads raw device state into the sampler. Looking and firing only happen
/// while the pointer is captured; the click that captures it never fires.
pub fn sample_input(
    keys: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    motion: Res<AccumulatedMouseMotion>,
    config: Res<ClientConfig>,
    mut input: ResMut<SampledInput>,
) {
    let sampler = &mut input.0;

    if keys.just_pressed(KeyCode::Escape) {
        sampler.set_pointer_captured(false);
    } else if mouse.just_pressed(MouseButton::Left) {
        if sampler.pointer_captured() {
            sampler.request_fire();
        } else {
            sampler.set_pointer_captured(true);
        }
    }

    for (action, keycodes) in BINDINGS {
        sampler.set_action(action, keys.any_pressed(keycodes.iter().copied()));
    }

    if motion.delta != Vec2::ZERO {
        sampler.apply_look_delta(motion.delta.x, motion.delta.y, config.sensitivity);
    }

    if keys.just_pressed(KeyCode::KeyR) {
        sampler.request_respawn();
    }
}

pub fn release_on_focus_lost(
    mut input: ResMut<SampledInput>,
    mut focus_events: EventReader<WindowFocused>,
) {
    for event in focus_events.read() {
        if !event.focused {
            input.0.set_pointer_captured(false);
        }
    }
}

/// Continuously enforce cursor state to match the sampler.
pub fn enforce_cursor_state(
    input: Res<SampledInput>,
    state: Res<State<AppState>>,
    mut windows: Query<&mut Window>,
) {
    let Ok(mut window) = windows.get_single_mut() else {
        return;
    };

    let captured = input.0.pointer_captured() && *state.get() == AppState::InGame;
    let grab_mode = if captured {
        CursorGrabMode::Locked
    } else {
        CursorGrabMode::None
    };
    if window.cursor_options.grab_mode != grab_mode {
        window.cursor_options.grab_mode = grab_mode;
        window.cursor_options.visible = !captured;
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SampledInput>()
            .add_systems(
                Update,
                (release_on_focus_lost, sample_input)
                    .chain()
                    .in_set(TickSet::Input),
            )
            .add_systems(Last, enforce_cursor_state);
    }
}
