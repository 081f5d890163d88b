use std::time::Duration;

use anyhow::{Context, ensure};
use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;

use skirmish_protocol::tcp_transport::TcpServerTransport;
use skirmish_server::ServerPlugin;

#[derive(Parser)]
#[command(name = "skirmish_dedicated_server")]
#[command(about = "Skirmish arena authority (headless)")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 7777)]
    port: u16,

    /// Arena name announced in snapshots
    #[arg(short, long, default_value = "Arena")]
    name: String,

    /// Milliseconds between snapshot broadcasts
    #[arg(long, default_value_t = 100)]
    snapshot_interval_ms: u64,

    /// Log filter, e.g. "info,skirmish_server=debug"
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    ensure!(
        args.snapshot_interval_ms > 0,
        "--snapshot-interval-ms must be greater than zero"
    );

    let addr = format!("0.0.0.0:{}", args.port);
    let transport =
        TcpServerTransport::bind(&addr).with_context(|| format!("failed to bind {addr}"))?;

    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin {
            filter: args.log,
            ..default()
        })
        .add_plugins(
            ServerPlugin::new(transport, args.name)
                .with_snapshot_interval(Duration::from_millis(args.snapshot_interval_ms)),
        )
        .run();

    Ok(())
}
