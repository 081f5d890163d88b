use bevy::prelude::*;
use skirmish_protocol::protocol::ClientMessage;

use crate::app_state::AppState;
use crate::config::ClientConfig;
use crate::frame::{FrameTiming, SimulationStatus};
use crate::input::SampledInput;
use crate::network::{PendingSnapshots, Roster};
use crate::player::camera::{PendingTeleport, PositionReporter, SpawnPoint, Vitals};
use crate::projectile::ProjectileField;
use crate::ui::hud::KillFeed;
use crate::{ClientTransportRes, LocalPlayerId};

/// Sends the Join request once when the client starts connecting.
pub fn send_join(transport: Res<ClientTransportRes>, config: Res<ClientConfig>) {
    info!("Joining as '{}'", config.player_name);
    transport.send_best_effort(ClientMessage::Join {
        player_name: config.player_name.clone(),
    });
}

pub fn end_session_on_request(
    keys: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if keys.just_pressed(KeyCode::F10) {
        next_state.set(AppState::Ended);
    }
}

/// Cleanup system that runs on OnExit(AppState::InGame).
/// Tells the authority we left, then drops the transport and resets session state.
pub fn cleanup_game_session(world: &mut World) {
    if let Some(transport) = world.remove_resource::<ClientTransportRes>() {
        transport.send_best_effort(ClientMessage::Leave);
    }

    world.insert_resource(LocalPlayerId::default());
    world.insert_resource(SpawnPoint::default());
    world.insert_resource(PendingTeleport::default());
    world.insert_resource(Vitals::default());
    world.insert_resource(PositionReporter::default());
    world.insert_resource(SampledInput::default());
    world.insert_resource(FrameTiming::default());
    world.insert_resource(KillFeed::default());

    if let Some(mut roster) = world.get_resource_mut::<Roster>() {
        roster.0.clear();
    }
    if let Some(mut pending) = world.get_resource_mut::<PendingSnapshots>() {
        pending.0.clear();
    }
    if let Some(mut field) = world.get_resource_mut::<ProjectileField>() {
        field.0.clear();
    }

    let halted = world
        .get_resource::<SimulationStatus>()
        .is_some_and(|status| !status.is_running());
    info!("Session closed{}", if halted { " after a halt" } else { "" });
}

/// Best-effort Leave when the app quits mid-session.
pub fn leave_on_app_exit(
    mut exits: EventReader<AppExit>,
    state: Res<State<AppState>>,
    transport: Option<Res<ClientTransportRes>>,
) {
    if exits.read().next().is_none() {
        return;
    }
    if let (AppState::InGame, Some(transport)) = (state.get(), transport) {
        transport.send_best_effort(ClientMessage::Leave);
    }
}

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppState::Connecting), send_join)
            .add_systems(OnExit(AppState::InGame), cleanup_game_session)
            .add_systems(
                Update,
                end_session_on_request.run_if(in_state(AppState::InGame)),
            )
            .add_systems(Last, leave_on_app_exit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Fidelity;
    use crate::ClientPlugin;
    use skirmish_protocol::transport::{LOCAL_CLIENT_ID, ServerTransport, create_local_transport};
    use skirmish_protocol::protocol::ServerMessage;

    use bevy::input::InputPlugin;
    use bevy::state::app::StatesPlugin;

    #[test]
    fn join_then_end_sends_leave_and_resets() {
        let (client, server) = create_local_transport();
        let config = ClientConfig::new("vex", 0.002, Fidelity::Reduced).expect("config");

        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins((StatesPlugin, InputPlugin, AssetPlugin::default()))
            .init_asset::<Mesh>()
            .init_asset::<StandardMaterial>()
            .add_event::<bevy::window::WindowFocused>()
            .add_plugins(ClientPlugin::new(Box::new(client), config));

        app.update();
        let joins = server.receive();
        assert!(matches!(
            joins.as_slice(),
            [(_, ClientMessage::Join { player_name })] if player_name == "vex"
        ));

        server.send(
            LOCAL_CLIENT_ID,
            ServerMessage::Joined {
                player_id: 4,
                spawn: Vec3::new(0.0, 0.9, 0.0),
            },
        );
        app.update();
        app.update();
        assert_eq!(*app.world().resource::<State<AppState>>().get(), AppState::InGame);

        app.world_mut()
            .resource_mut::<NextState<AppState>>()
            .set(AppState::Ended);
        app.update();

        assert_eq!(*app.world().resource::<State<AppState>>().get(), AppState::Ended);
        assert!(!app.world().contains_resource::<ClientTransportRes>());
        assert_eq!(app.world().resource::<LocalPlayerId>().0, None);
        assert!(
            server
                .receive()
                .iter()
                .any(|(_, msg)| matches!(msg, ClientMessage::Leave))
        );
    }
}
