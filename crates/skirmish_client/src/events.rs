use std::sync::{Mutex, PoisonError};

use bevy::prelude::*;
use skirmish_protocol::protocol::{BulletId, HitOutcome, PlayerId};

// --- Events ---

#[derive(Event)]
pub struct ShotFiredEvent {
    pub shooter: PlayerId,
    pub origin: Vec3,
    pub direction: Vec3,
}

/// A locally simulated projectile collided with a remote player.
#[derive(Event)]
pub struct ProjectileHitEvent {
    pub projectile: BulletId,
    pub victim: PlayerId,
    pub position: Vec3,
}

/// The authority answered a hit report. `None` means the report was ignored.
#[derive(Event)]
pub struct HitConfirmedEvent {
    pub outcome: Option<HitOutcome>,
}

#[derive(Event)]
pub struct KillEvent {
    pub killer_id: PlayerId,
    pub victim_id: PlayerId,
    pub timestamp: u64,
}

#[derive(Event)]
pub struct PlayerJoinEvent {
    pub player_id: PlayerId,
    pub name: String,
    pub position: Vec3,
}

#[derive(Event)]
pub struct PlayerLeaveEvent {
    pub player_id: PlayerId,
}

#[derive(Event)]
pub struct RespawnEvent {
    pub position: Vec3,
}

#[derive(Event)]
pub struct SimulationHaltedEvent {
    pub reason: String,
}

// --- Plugin trait ---

#[allow(unused_variables)]
pub trait SkirmishPlugin: Send + Sync + 'static {
    fn on_shot_fired(&self, event: &ShotFiredEvent) {}
    fn on_projectile_hit(&self, event: &ProjectileHitEvent) {}
    fn on_hit_confirmed(&self, event: &HitConfirmedEvent) {}
    fn on_kill(&self, event: &KillEvent) {}
    fn on_player_join(&self, event: &PlayerJoinEvent) {}
    fn on_player_leave(&self, event: &PlayerLeaveEvent) {}
    fn on_respawn(&self, event: &RespawnEvent) {}
    fn on_simulation_halted(&self, event: &SimulationHaltedEvent) {}
}

// --- Registry ---

#[derive(Resource)]
struct PluginRegistry {
    plugins: Vec<Box<dyn SkirmishPlugin>>,
}

// --- Dispatch systems ---

fn dispatch<E: Event>(
    mut reader: EventReader<E>,
    registry: Res<PluginRegistry>,
    hook: impl Fn(&dyn SkirmishPlugin, &E),
) {
    for event in reader.read() {
        for plugin in &registry.plugins {
            hook(plugin.as_ref(), event);
        }
    }
}

fn dispatch_shot_fired(reader: EventReader<ShotFiredEvent>, registry: Res<PluginRegistry>) {
    dispatch(reader, registry, |p, e| p.on_shot_fired(e));
}

fn dispatch_projectile_hit(
    reader: EventReader<ProjectileHitEvent>,
    registry: Res<PluginRegistry>,
) {
    dispatch(reader, registry, |p, e| p.on_projectile_hit(e));
}

fn dispatch_hit_confirmed(
    reader: EventReader<HitConfirmedEvent>,
    registry: Res<PluginRegistry>,
) {
    dispatch(reader, registry, |p, e| p.on_hit_confirmed(e));
}

fn dispatch_kill(reader: EventReader<KillEvent>, registry: Res<PluginRegistry>) {
    dispatch(reader, registry, |p, e| p.on_kill(e));
}

fn dispatch_player_join(reader: EventReader<PlayerJoinEvent>, registry: Res<PluginRegistry>) {
    dispatch(reader, registry, |p, e| p.on_player_join(e));
}

fn dispatch_player_leave(reader: EventReader<PlayerLeaveEvent>, registry: Res<PluginRegistry>) {
    dispatch(reader, registry, |p, e| p.on_player_leave(e));
}

fn dispatch_respawn(reader: EventReader<RespawnEvent>, registry: Res<PluginRegistry>) {
    dispatch(reader, registry, |p, e| p.on_respawn(e));
}

fn dispatch_simulation_halted(
    reader: EventReader<SimulationHaltedEvent>,
    registry: Res<PluginRegistry>,
) {
    dispatch(reader, registry, |p, e| p.on_simulation_halted(e));
}

// --- EventsPlugin builder ---

pub struct EventsPlugin {
    plugins: Mutex<Vec<Box<dyn SkirmishPlugin>>>,
}

impl EventsPlugin {
    pub fn new() -> Self {
        Self::new_with(Vec::new())
    }

    pub fn new_with(plugins: Vec<Box<dyn SkirmishPlugin>>) -> Self {
        Self {
            plugins: Mutex::new(plugins),
        }
    }

    pub fn add_plugin(self, plugin: impl SkirmishPlugin) -> Self {
        self.plugins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(plugin));
        self
    }
}

impl Default for EventsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for EventsPlugin {
    fn build(&self, app: &mut App) {
        let plugins = self
            .plugins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        app.insert_resource(PluginRegistry { plugins });

        app.add_event::<ShotFiredEvent>()
            .add_event::<ProjectileHitEvent>()
            .add_event::<HitConfirmedEvent>()
            .add_event::<KillEvent>()
            .add_event::<PlayerJoinEvent>()
            .add_event::<PlayerLeaveEvent>()
            .add_event::<RespawnEvent>()
            .add_event::<SimulationHaltedEvent>()
            .add_systems(
                PostUpdate,
                (
                    dispatch_shot_fired,
                    dispatch_projectile_hit,
                    dispatch_hit_confirmed,
                    dispatch_kill,
                    dispatch_player_join,
                    dispatch_player_leave,
                    dispatch_respawn,
                    dispatch_simulation_halted,
                ),
            );
    }
}
