use bevy::ecs::query::QuerySingleError;
use bevy::prelude::*;
use skirmish_protocol::clock::FrameClock;
use thiserror::Error;

use crate::app_state::AppState;
use crate::events::SimulationHaltedEvent;

/// Ordered stages of one simulation tick.
///
/// Only `Intake` runs outside `AppState::InGame`; every other stage is gated on
/// the session being live and the simulation not halted.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickSet {
    Intake,
    Input,
    Motion,
    Projectiles,
    Outbound,
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("local player unavailable: {0}")]
    LocalPlayer(#[from] QuerySingleError),

    #[error("local player state became non-finite at tick {0}")]
    NonFiniteState(u64),
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub enum SimulationStatus {
    #[default]
    Running,
    Halted {
        reason: String,
    },
}

impl SimulationStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, SimulationStatus::Running)
    }
}

/// Sanitized timing for the current tick. `delta` is `None` when the frame
/// must be skipped.
#[derive(Resource, Debug, Default)]
pub struct FrameTiming {
    pub clock: FrameClock,
    pub delta: Option<f32>,
}

pub fn simulation_running(status: Res<SimulationStatus>) -> bool {
    status.is_running()
}

pub fn advance_frame_clock(
    time: Res<Time>,
    state: Res<State<AppState>>,
    status: Res<SimulationStatus>,
    mut timing: ResMut<FrameTiming>,
) {
    timing.delta = if *state.get() == AppState::InGame && status.is_running() {
        timing.clock.advance(time.delta_secs_f64())
    } else {
        None
    };
}

/// Terminal handler for fallible tick systems: the first error stops the
/// repeating tick and leaves a notice for the player.
pub fn halt_on_error(
    In(result): In<Result<(), SimulationError>>,
    mut status: ResMut<SimulationStatus>,
    mut halted: EventWriter<SimulationHaltedEvent>,
) {
    let Err(err) = result else {
        return;
    };
    if status.is_running() {
        error!("Simulation halted: {}", err);
        let reason = err.to_string();
        *status = SimulationStatus::Halted {
            reason: reason.clone(),
        };
        halted.send(SimulationHaltedEvent { reason });
    }
}

pub struct FramePlugin;

impl Plugin for FramePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FrameTiming>()
            .init_resource::<SimulationStatus>()
            .add_systems(Update, advance_frame_clock.in_set(TickSet::Intake));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventsPlugin;

    fn failing() -> Result<(), SimulationError> {
        Err(SimulationError::NonFiniteState(3))
    }

    #[test]
    fn first_error_halts_the_simulation() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins(EventsPlugin::new())
            .init_resource::<SimulationStatus>()
            .add_systems(Update, failing.pipe(halt_on_error));

        app.update();
        let status = app.world().resource::<SimulationStatus>().clone();
        assert!(matches!(status, SimulationStatus::Halted { ref reason } if reason.contains("tick 3")));

        app.update();
        assert_eq!(*app.world().resource::<SimulationStatus>(), status);
    }
}
