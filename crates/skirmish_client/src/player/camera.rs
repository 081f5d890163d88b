use bevy::prelude::*;
use skirmish_protocol::clock::ReportThrottle;
use skirmish_protocol::input::MovementIntents;
use skirmish_protocol::motion::{PlayerState, integrate};
use skirmish_protocol::protocol::{ClientMessage, Rotation};
use skirmish_protocol::roster::LocalVitals;

use crate::app_state::AppState;
use crate::frame::{FrameTiming, SimulationError};
use crate::input::SampledInput;
use crate::{ClientTransportRes, LocalPlayerId};

/// The camera entity doubles as the local player. Its `PlayerState` is only
/// written by local physics and by a `Respawned` reply.
#[derive(Component)]
pub struct LocalPlayer(pub PlayerState);

/// Where the authority placed us on join.
#[derive(Resource, Default)]
pub struct SpawnPoint(pub Vec3);

#[derive(Resource, Default)]
pub struct PendingTeleport(pub Option<Vec3>);

/// Authority-reported health and score for the local player.
#[derive(Resource, Default)]
pub struct Vitals(pub LocalVitals);

#[derive(Resource, Default)]
pub struct PositionReporter(pub ReportThrottle);

pub fn spawn_local_player(mut commands: Commands, spawn: Res<SpawnPoint>) {
    let state = PlayerState::spawn_at(spawn.0);
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(state.position).with_rotation(state.view_rotation()),
        LocalPlayer(state),
        StateScoped(AppState::InGame),
    ));
    info!("Spawned local player at {:?}", spawn.0);
}

pub fn move_local_player(
    timing: Res<FrameTiming>,
    input: Res<SampledInput>,
    vitals: Res<Vitals>,
    mut teleport: ResMut<PendingTeleport>,
    mut query: Query<(&mut Transform, &mut LocalPlayer)>,
) -> Result<(), SimulationError> {
    let (mut transform, mut player) = query.get_single_mut()?;

    if let Some(position) = teleport.0.take() {
        player.0.teleport(position);
        debug!("Teleported local player to {:?}", position);
    }

    let Some(dt) = timing.delta else {
        return Ok(());
    };

    // A dead player keeps looking around but ignores movement keys.
    let intents = if vitals.0.is_alive {
        input.0.intents()
    } else {
        MovementIntents::default()
    };
    integrate(&mut player.0, &intents, input.0.look(), dt);

    if !player.0.is_finite() {
        return Err(SimulationError::NonFiniteState(timing.clock.ticks()));
    }

    transform.translation = player.0.position;
    transform.rotation = player.0.view_rotation();
    Ok(())
}

pub fn report_position(
    time: Res<Time<Real>>,
    local_id: Res<LocalPlayerId>,
    transport: Res<ClientTransportRes>,
    mut reporter: ResMut<PositionReporter>,
    query: Query<&LocalPlayer>,
) -> Result<(), SimulationError> {
    let Some(player_id) = local_id.0 else {
        return Ok(());
    };
    let player = query.get_single()?;

    if reporter.0.ready(time.elapsed()) {
        transport.send_best_effort(ClientMessage::ReportPosition {
            player_id,
            position: player.0.position,
            rotation: Rotation {
                pitch: player.0.pitch,
                yaw: player.0.yaw,
            },
        });
    }
    Ok(())
}

pub fn request_respawn(
    local_id: Res<LocalPlayerId>,
    vitals: Res<Vitals>,
    transport: Res<ClientTransportRes>,
    mut input: ResMut<SampledInput>,
) {
    if !input.0.take_respawn() {
        return;
    }
    let Some(player_id) = local_id.0 else {
        return;
    };
    if !vitals.0.is_alive {
        transport.send_best_effort(ClientMessage::Respawn { player_id });
    }
}
