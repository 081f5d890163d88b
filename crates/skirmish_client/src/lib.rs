pub mod app_state;
pub mod avatar;
pub mod config;
pub mod events;
pub mod frame;
pub mod input;
pub mod network;
pub mod player;
pub mod projectile;
pub mod render;
pub mod session;
pub mod ui;

use std::sync::{Mutex, PoisonError};

use bevy::prelude::*;
use skirmish_protocol::protocol::{ClientMessage, PlayerId};
use skirmish_protocol::transport::ClientTransport;

use app_state::AppState;
use config::{ClientConfig, Fidelity};
use events::EventsPlugin;
use frame::{TickSet, simulation_running};

/// Bevy Resource wrapping a boxed ClientTransport.
#[derive(Resource)]
pub struct ClientTransportRes(pub Box<dyn ClientTransport>);

impl ClientTransportRes {
    /// Fire-and-forget send. Failures are logged and the message is dropped;
    /// nothing is retried, so reports can never arrive out of order.
    pub fn send_best_effort(&self, msg: ClientMessage) {
        if let Err(err) = self.0.send(msg) {
            warn!("Dropped outbound message: {}", err);
        }
    }
}

/// Id the authority assigned to this client, once joined.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalPlayerId(pub Option<PlayerId>);

/// The client plugin composes all client-side functionality.
///
/// The fidelity strategy is fixed here: reduced fidelity never registers the
/// projectile or reconciliation systems.
pub struct ClientPlugin {
    transport: Mutex<Option<Box<dyn ClientTransport>>>,
    config: ClientConfig,
    event_plugins: Mutex<Vec<Box<dyn events::SkirmishPlugin>>>,
}

impl ClientPlugin {
    pub fn new(transport: Box<dyn ClientTransport>, config: ClientConfig) -> Self {
        Self {
            transport: Mutex::new(Some(transport)),
            config,
            event_plugins: Mutex::new(Vec::new()),
        }
    }

    pub fn with_plugin(self, plugin: impl events::SkirmishPlugin) -> Self {
        self.event_plugins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(plugin));
        self
    }
}

impl Plugin for ClientPlugin {
    fn build(&self, app: &mut App) {
        let transport = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .expect("ClientPlugin transport already taken");

        let event_plugins = self
            .event_plugins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        let fidelity = self.config.fidelity;
        info!("Starting client as '{}' ({:?})", self.config.player_name, fidelity);

        app.insert_resource(ClientTransportRes(transport))
            .insert_resource(self.config.clone())
            .init_resource::<LocalPlayerId>()
            .init_state::<AppState>()
            .enable_state_scoped_entities::<AppState>()
            .configure_sets(
                Update,
                (
                    TickSet::Intake,
                    TickSet::Input,
                    TickSet::Motion,
                    TickSet::Projectiles,
                    TickSet::Outbound,
                )
                    .chain(),
            );

        for set in [
            TickSet::Input,
            TickSet::Motion,
            TickSet::Projectiles,
            TickSet::Outbound,
        ] {
            app.configure_sets(
                Update,
                set.run_if(in_state(AppState::InGame))
                    .run_if(simulation_running),
            );
        }

        app.add_plugins(EventsPlugin::new_with(event_plugins))
            .add_plugins(frame::FramePlugin)
            .add_plugins(session::SessionPlugin)
            .add_plugins(network::NetworkPlugin { fidelity })
            .add_plugins(input::InputPlugin)
            .add_plugins(player::PlayerPlugin)
            .add_plugins(render::RenderPlugin { fidelity })
            .add_plugins(ui::UiPlugin);

        if fidelity == Fidelity::Full {
            app.add_plugins(avatar::AvatarPlugin)
                .add_plugins(projectile::ProjectilePlugin);
        }
    }
}
