use anyhow::Context;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;
use skirmish_macros::skirmish_plugin;

use skirmish_client::ClientPlugin;
use skirmish_client::config::{ClientConfig, DEFAULT_SENSITIVITY, Fidelity};
use skirmish_client::events;
use skirmish_protocol::tcp_transport::TcpClientTransport;
use skirmish_protocol::transport::create_local_transport;
use skirmish_server::ServerPlugin;

#[derive(Parser)]
#[command(name = "skirmish")]
#[command(about = "Skirmish: first-person arena shooter")]
struct Args {
    /// Connect to a remote authority (host:port). Without it, an embedded
    /// authority runs in-process.
    #[arg(long)]
    connect: Option<String>,

    /// Player name
    #[arg(long, default_value = "Player")]
    name: String,

    /// Minimal lighting and geometry, no projectiles or remote players
    #[arg(long)]
    reduced: bool,

    /// Radians of view rotation per pixel of mouse motion
    #[arg(long, default_value_t = DEFAULT_SENSITIVITY)]
    sensitivity: f32,

    /// Log filter, e.g. "info,skirmish_client=debug"
    #[arg(long, default_value = "info,wgpu=error,naga=warn")]
    log: String,
}

struct CombatLog;

#[skirmish_plugin]
impl CombatLog {
    #[Event::Kill]
    fn on_kill(&self, event: &events::KillEvent) {
        info!("Player {} eliminated player {}", event.killer_id, event.victim_id);
    }

    #[Event::HitConfirmed]
    fn on_hit(&self, event: &events::HitConfirmedEvent) {
        if let Some(outcome) = event.outcome {
            info!("Hit for {} damage{}", outcome.damage, if outcome.killed { " (kill)" } else { "" });
        }
    }

    #[Event::PlayerJoin]
    fn on_join(&self, event: &events::PlayerJoinEvent) {
        info!(
            "'{}' joined at ({:.1}, {:.1}, {:.1})",
            event.name, event.position.x, event.position.y, event.position.z
        );
    }

    #[Event::PlayerLeave]
    fn on_leave(&self, event: &events::PlayerLeaveEvent) {
        info!("Player {} left", event.player_id);
    }

    #[Event::SimulationHalted]
    fn on_halt(&self, event: &events::SimulationHaltedEvent) {
        warn!("Simulation halted: {}", event.reason);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let fidelity = if args.reduced {
        Fidelity::Reduced
    } else {
        Fidelity::Full
    };
    let config = ClientConfig::new(args.name, args.sensitivity, fidelity)
        .context("invalid client settings")?;

    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Skirmish".into(),
                    ..default()
                }),
                ..default()
            })
            .set(LogPlugin {
                filter: args.log,
                ..default()
            }),
    );

    match args.connect {
        // Network mode: connect to a remote authority
        Some(addr) => {
            let transport = TcpClientTransport::connect(&addr)
                .with_context(|| format!("failed to connect to {addr}"))?;

            app.add_plugins(ClientPlugin::new(Box::new(transport), config).with_plugin(CombatLog));
        }
        // Solo mode: embedded authority + local transport
        None => {
            let (client_transport, server_transport) = create_local_transport();

            app.add_plugins(ServerPlugin::new(server_transport, "Practice Arena"));
            app.add_plugins(
                ClientPlugin::new(Box::new(client_transport), config).with_plugin(CombatLog),
            );
        }
    }

    app.run();
    Ok(())
}
