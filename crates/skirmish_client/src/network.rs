use std::collections::VecDeque;

use bevy::prelude::*;
use skirmish_protocol::clock::unix_millis;
use skirmish_protocol::protocol::ServerMessage;
use skirmish_protocol::roster::RemoteRoster;
use skirmish_protocol::snapshot::GameSnapshot;

use crate::app_state::AppState;
use crate::config::Fidelity;
use crate::events::{HitConfirmedEvent, KillEvent, PlayerJoinEvent, PlayerLeaveEvent, RespawnEvent};
use crate::frame::TickSet;
use crate::player::camera::{PendingTeleport, SpawnPoint, Vitals};
use crate::projectile::ProjectileField;
use crate::{ClientTransportRes, LocalPlayerId};

/// Snapshots received since the last reconciliation, oldest first.
#[derive(Resource, Default)]
pub struct PendingSnapshots(pub VecDeque<GameSnapshot>);

#[derive(Resource, Default)]
pub struct Roster(pub RemoteRoster);

/// Fidelity captured at build time so intake can drop snapshots nobody consumes.
#[derive(Resource, Clone, Copy)]
pub struct IntakeFidelity(pub Fidelity);

/// Receives all server messages and routes them to client state.
#[allow(clippy::too_many_arguments)]
pub fn client_receive_messages(
    transport: Res<ClientTransportRes>,
    fidelity: Res<IntakeFidelity>,
    state: Res<State<AppState>>,
    mut next_state: ResMut<NextState<AppState>>,
    mut local_player_id: ResMut<LocalPlayerId>,
    mut spawn: ResMut<SpawnPoint>,
    mut teleport: ResMut<PendingTeleport>,
    mut pending: ResMut<PendingSnapshots>,
    mut ev_hit_confirmed: EventWriter<HitConfirmedEvent>,
    mut ev_respawn: EventWriter<RespawnEvent>,
) {
    for msg in transport.0.receive() {
        match msg {
            ServerMessage::Joined { player_id, spawn: position } => {
                if local_player_id.0.is_some() {
                    warn!("Ignoring duplicate join acknowledgement for {}", player_id);
                    continue;
                }
                local_player_id.0 = Some(player_id);
                spawn.0 = position;
                next_state.set(AppState::InGame);
                info!("Joined as player {} at {:?}", player_id, position);
            }

            ServerMessage::Rejected { reason } => {
                error!("Join rejected: {}", reason);
                next_state.set(AppState::Ended);
            }

            ServerMessage::Snapshot(snapshot) => {
                if fidelity.0 == Fidelity::Full && *state.get() == AppState::InGame {
                    pending.0.push_back(snapshot);
                }
            }

            ServerMessage::HitResult(outcome) => {
                if let Some(outcome) = outcome {
                    debug!(
                        "Hit confirmed: damage={} killed={}",
                        outcome.damage, outcome.killed
                    );
                }
                ev_hit_confirmed.send(HitConfirmedEvent { outcome });
            }

            ServerMessage::Respawned { position } => {
                teleport.0 = Some(position);
                ev_respawn.send(RespawnEvent { position });
            }
        }
    }
}

/// Drains queued snapshots into the roster and the projectile field, in order.
#[allow(clippy::too_many_arguments)]
pub fn reconcile_snapshots(
    local_player_id: Res<LocalPlayerId>,
    mut pending: ResMut<PendingSnapshots>,
    mut roster: ResMut<Roster>,
    mut field: ResMut<ProjectileField>,
    mut vitals: ResMut<Vitals>,
    mut ev_join: EventWriter<PlayerJoinEvent>,
    mut ev_leave: EventWriter<PlayerLeaveEvent>,
    mut ev_kill: EventWriter<KillEvent>,
) {
    if pending.0.is_empty() {
        return;
    }
    if let Some(id) = local_player_id.0 {
        if roster.0.local_id() != Some(id) {
            roster.0.set_local_id(id);
        }
    }

    let now_ms = unix_millis();
    while let Some(snapshot) = pending.0.pop_front() {
        let changes = roster.0.reconcile(&snapshot, &mut field.0, now_ms);

        if let Some(local) = changes.local {
            vitals.0 = local;
        }
        for player_id in changes.joined {
            if let Some(view) = roster.0.get(player_id) {
                info!("Player '{}' (id={}) entered the arena", view.username, player_id);
                ev_join.send(PlayerJoinEvent {
                    player_id,
                    name: view.username.clone(),
                    position: view.position,
                });
            }
        }
        for player_id in changes.left {
            info!("Player {} left the arena", player_id);
            ev_leave.send(PlayerLeaveEvent { player_id });
        }
        for kill in changes.kills {
            ev_kill.send(KillEvent {
                killer_id: kill.killer_id,
                victim_id: kill.victim_id,
                timestamp: kill.timestamp,
            });
        }
    }
}

pub struct NetworkPlugin {
    pub fidelity: Fidelity,
}

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(IntakeFidelity(self.fidelity))
            .init_resource::<PendingSnapshots>()
            .init_resource::<Roster>()
            .add_systems(
                Update,
                client_receive_messages
                    .in_set(TickSet::Intake)
                    .run_if(resource_exists::<ClientTransportRes>),
            );

        if self.fidelity == Fidelity::Full {
            app.init_resource::<ProjectileField>().add_systems(
                Update,
                reconcile_snapshots
                    .after(client_receive_messages)
                    .in_set(TickSet::Intake)
                    .run_if(in_state(AppState::InGame)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventsPlugin;
    use skirmish_protocol::protocol::{Rotation, ServerMessage};
    use skirmish_protocol::snapshot::{BulletRecord, GameInfo, PlayerRecord};
    use skirmish_protocol::transport::{
        LOCAL_CLIENT_ID, LocalServerTransport, ServerTransport, create_local_transport,
    };

    fn player(id: u64, name: &str, health: i32) -> PlayerRecord {
        PlayerRecord {
            id: Some(id),
            username: Some(name.into()),
            position: Some(Vec3::new(id as f32, 0.9, 0.0)),
            rotation: Some(Rotation::default()),
            health: Some(health),
            max_health: Some(100),
            is_alive: Some(health > 0),
            kills: Some(0),
            deaths: Some(0),
        }
    }

    fn snapshot(players: Vec<PlayerRecord>, bullets: Vec<BulletRecord>) -> GameSnapshot {
        GameSnapshot {
            game: GameInfo {
                id: 1,
                name: "Arena".into(),
            },
            players,
            bullets,
            recent_kills: Vec::new(),
        }
    }

    fn network_app() -> (App, LocalServerTransport) {
        let (client, server) = create_local_transport();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins(bevy::state::app::StatesPlugin)
            .add_plugins(EventsPlugin::new())
            .init_state::<AppState>()
            .insert_resource(ClientTransportRes(Box::new(client)))
            .init_resource::<LocalPlayerId>()
            .init_resource::<SpawnPoint>()
            .init_resource::<PendingTeleport>()
            .init_resource::<Vitals>()
            .add_plugins(NetworkPlugin {
                fidelity: Fidelity::Full,
            });
        (app, server)
    }

    #[test]
    fn joined_enters_game_and_snapshots_reconcile() {
        let (mut app, server) = network_app();
        server
            .send(
                LOCAL_CLIENT_ID,
                ServerMessage::Joined {
                    player_id: 1,
                    spawn: Vec3::new(40.0, 0.9, 40.0),
                },
            );
        app.update();
        app.update();

        assert_eq!(*app.world().resource::<State<AppState>>().get(), AppState::InGame);
        assert_eq!(app.world().resource::<LocalPlayerId>().0, Some(1));
        assert_eq!(app.world().resource::<SpawnPoint>().0, Vec3::new(40.0, 0.9, 40.0));

        server
            .send(
                LOCAL_CLIENT_ID,
                ServerMessage::Snapshot(snapshot(
                    vec![player(1, "me", 75), player(2, "rival", 100)],
                    Vec::new(),
                )),
            );
        app.update();

        let roster = &app.world().resource::<Roster>().0;
        assert_eq!(roster.len(), 1);
        assert!(roster.contains(2));
        assert!(!roster.contains(1));
        assert_eq!(app.world().resource::<Vitals>().0.health, 75);
        assert!(app.world().resource::<PendingSnapshots>().0.is_empty());
    }

    #[test]
    fn snapshots_before_joining_are_dropped() {
        let (mut app, server) = network_app();
        server
            .send(
                LOCAL_CLIENT_ID,
                ServerMessage::Snapshot(snapshot(vec![player(2, "rival", 100)], Vec::new())),
            );
        app.update();

        assert!(app.world().resource::<PendingSnapshots>().0.is_empty());
        assert!(app.world().resource::<Roster>().0.is_empty());
    }

    #[test]
    fn respawned_schedules_a_teleport() {
        let (mut app, server) = network_app();
        server
            .send(
                LOCAL_CLIENT_ID,
                ServerMessage::Respawned {
                    position: Vec3::new(-40.0, 0.9, 40.0),
                },
            );
        app.update();

        assert_eq!(
            app.world().resource::<PendingTeleport>().0,
            Some(Vec3::new(-40.0, 0.9, 40.0))
        );
    }
}
