pub mod authority;
pub mod systems;

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use skirmish_protocol::transport::ServerTransport;

use authority::ArenaAuthority;
use systems::{
    AuthorityRng, ServerTransportRes, SnapshotTimer, server_broadcast_snapshots,
    server_process_messages,
};

pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_millis(100);

/// Runs an [`ArenaAuthority`] inside a Bevy app, either embedded next to the
/// client (solo play) or headless behind a TCP transport.
pub struct ServerPlugin {
    transport: Mutex<Option<Box<dyn ServerTransport>>>,
    game_name: String,
    snapshot_interval: Duration,
}

impl ServerPlugin {
    pub fn new(transport: impl ServerTransport, game_name: impl Into<String>) -> Self {
        Self {
            transport: Mutex::new(Some(Box::new(transport))),
            game_name: game_name.into(),
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
        }
    }

    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = interval;
        self
    }
}

impl Plugin for ServerPlugin {
    fn build(&self, app: &mut App) {
        let transport = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .expect("ServerPlugin transport already taken");

        info!(
            "Hosting game '{}' (snapshots every {:?})",
            self.game_name, self.snapshot_interval
        );

        app.insert_resource(ServerTransportRes(transport))
            .insert_resource(ArenaAuthority::new(1, self.game_name.clone()))
            .insert_resource(AuthorityRng(StdRng::from_entropy()))
            .insert_resource(SnapshotTimer(Timer::new(
                self.snapshot_interval,
                TimerMode::Repeating,
            )))
            .add_systems(
                Update,
                (
                    server_process_messages,
                    server_broadcast_snapshots.after(server_process_messages),
                ),
            );
    }
}
