use bevy::prelude::*;
use rand::rngs::StdRng;

use skirmish_protocol::clock::unix_millis;
use skirmish_protocol::protocol::{ClientMessage, ServerMessage};
use skirmish_protocol::transport::ServerTransport;

use crate::authority::ArenaAuthority;

/// Bevy Resource wrapping a boxed ServerTransport.
#[derive(Resource)]
pub struct ServerTransportRes(pub Box<dyn ServerTransport>);

/// Paces snapshot broadcasts.
#[derive(Resource)]
pub struct SnapshotTimer(pub Timer);

#[derive(Resource)]
pub struct AuthorityRng(pub StdRng);

/// Process all incoming client messages and answer the ones that expect a reply.
pub fn server_process_messages(
    mut authority: ResMut<ArenaAuthority>,
    mut rng: ResMut<AuthorityRng>,
    transport: Res<ServerTransportRes>,
) {
    let now = unix_millis();

    for (client_id, msg) in transport.0.receive() {
        match msg {
            ClientMessage::Join { player_name } => {
                let spawn = authority.join(client_id, player_name.clone(), &mut rng.0);
                transport.0.send(
                    client_id,
                    ServerMessage::Joined {
                        player_id: client_id,
                        spawn,
                    },
                );
                info!("Player '{}' (id={}) joined at {:?}", player_name, client_id, spawn);
            }

            ClientMessage::Leave => {
                if authority.leave(client_id) {
                    info!("Player id={} left", client_id);
                }
            }

            ClientMessage::ReportPosition {
                player_id,
                position,
                rotation,
            } => {
                if player_id != client_id {
                    warn!("Client {} reported a position for player {}", client_id, player_id);
                    continue;
                }
                authority.report_position(player_id, position, rotation);
            }

            ClientMessage::Fire {
                player_id,
                start_position,
                direction,
            } => {
                if player_id != client_id {
                    warn!("Client {} fired as player {}", client_id, player_id);
                    continue;
                }
                match authority.fire(player_id, start_position, direction, now) {
                    Some(bullet_id) => debug!("Player {} fired bullet {}", player_id, bullet_id),
                    None => debug!("Refused shot from player {}", player_id),
                }
            }

            ClientMessage::ReportHit {
                bullet_id,
                victim_id,
            } => {
                let outcome = authority.report_hit(bullet_id, victim_id, now);
                if let Some(outcome) = outcome {
                    info!(
                        "Bullet {} hit player {} for {} (killed={})",
                        bullet_id, victim_id, outcome.damage, outcome.killed
                    );
                }
                transport.0.send(client_id, ServerMessage::HitResult(outcome));
            }

            ClientMessage::Respawn { player_id } => {
                if player_id != client_id {
                    warn!("Client {} asked to respawn player {}", client_id, player_id);
                    continue;
                }
                if let Some(position) = authority.respawn(player_id, &mut rng.0) {
                    transport.0.send(client_id, ServerMessage::Respawned { position });
                }
            }
        }
    }
}

/// Reap stale bullets and broadcast the current state on every timer tick.
pub fn server_broadcast_snapshots(
    time: Res<Time>,
    mut timer: ResMut<SnapshotTimer>,
    mut authority: ResMut<ArenaAuthority>,
    transport: Res<ServerTransportRes>,
) {
    if !timer.0.tick(time.delta()).just_finished() {
        return;
    }

    let reaped = authority.reap_stale(unix_millis());
    if reaped > 0 {
        debug!("Reaped {} stale bullets", reaped);
    }
    transport.0.broadcast(ServerMessage::Snapshot(authority.snapshot()));
}
