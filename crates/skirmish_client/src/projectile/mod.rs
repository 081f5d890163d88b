use std::collections::HashSet;

use bevy::prelude::*;
use skirmish_protocol::projectile::ProjectileSimulator;
use skirmish_protocol::protocol::{BulletId, ClientMessage};

use crate::app_state::AppState;
use crate::events::{ProjectileHitEvent, ShotFiredEvent};
use crate::frame::{FrameTiming, SimulationError, TickSet, halt_on_error};
use crate::input::SampledInput;
use crate::network::Roster;
use crate::player::camera::{LocalPlayer, Vitals};
use crate::{ClientTransportRes, LocalPlayerId};

const PROJECTILE_COLOR: Color = Color::srgb(1.0, 0.85, 0.3);
const FLASH_COLOR: Color = Color::srgb(1.0, 0.6, 0.2);
const FLASH_SECONDS: f32 = 0.08;
const FLASH_OFFSET: Vec3 = Vec3::new(0.25, -0.2, -0.7);

/// Projectiles currently in flight, as announced by the authority.
#[derive(Resource, Default)]
pub struct ProjectileField(pub ProjectileSimulator);

#[derive(Component)]
pub struct ProjectileVisual(pub BulletId);

#[derive(Component)]
pub struct MuzzleFlash(pub Timer);

#[derive(Resource)]
pub struct ProjectileAssets {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
    pub flash_mesh: Handle<Mesh>,
    pub flash_material: Handle<StandardMaterial>,
}

fn setup_projectile_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(ProjectileAssets {
        mesh: meshes.add(Sphere::new(0.08)),
        material: materials.add(StandardMaterial {
            base_color: PROJECTILE_COLOR,
            emissive: LinearRgba::rgb(4.0, 3.0, 1.0),
            ..default()
        }),
        flash_mesh: meshes.add(Sphere::new(0.06)),
        flash_material: materials.add(StandardMaterial {
            base_color: FLASH_COLOR,
            emissive: LinearRgba::rgb(6.0, 3.0, 1.0),
            unlit: true,
            ..default()
        }),
    });
}

/// Reports a shot and shows a muzzle flash. The projectile itself only
/// appears once the authority lists it in a snapshot.
#[allow(clippy::too_many_arguments)]
pub fn fire_weapon(
    mut commands: Commands,
    mut input: ResMut<SampledInput>,
    local_id: Res<LocalPlayerId>,
    vitals: Res<Vitals>,
    transport: Res<ClientTransportRes>,
    assets: Res<ProjectileAssets>,
    mut ev_fired: EventWriter<ShotFiredEvent>,
    query: Query<(Entity, &LocalPlayer)>,
) -> Result<(), SimulationError> {
    if !input.0.take_fire() {
        return Ok(());
    }
    let Some(player_id) = local_id.0 else {
        return Ok(());
    };
    if !vitals.0.is_alive {
        return Ok(());
    }

    let (camera, player) = query.get_single()?;
    let origin = player.0.position;
    let direction = player.0.view_direction();

    transport.send_best_effort(ClientMessage::Fire {
        player_id,
        start_position: origin,
        direction,
    });

    commands.entity(camera).with_children(|parent| {
        parent.spawn((
            MuzzleFlash(Timer::from_seconds(FLASH_SECONDS, TimerMode::Once)),
            Mesh3d(assets.flash_mesh.clone()),
            MeshMaterial3d(assets.flash_material.clone()),
            Transform::from_translation(FLASH_OFFSET),
        ));
    });

    ev_fired.send(ShotFiredEvent {
        shooter: player_id,
        origin,
        direction,
    });
    Ok(())
}

/// Steps every projectile and reports collisions with remote players.
pub fn advance_projectiles(
    timing: Res<FrameTiming>,
    roster: Res<Roster>,
    transport: Res<ClientTransportRes>,
    mut field: ResMut<ProjectileField>,
    mut ev_hit: EventWriter<ProjectileHitEvent>,
) {
    let Some(dt) = timing.delta else {
        return;
    };
    if field.0.is_empty() {
        return;
    }

    let report = field.0.tick(dt, &roster.0.targets());
    for hit in report.hits {
        let position = roster
            .0
            .get(hit.victim)
            .map(|view| view.position)
            .unwrap_or_default();
        debug!("Projectile {} hit player {}", hit.projectile, hit.victim);
        transport.send_best_effort(ClientMessage::ReportHit {
            bullet_id: hit.projectile,
            victim_id: hit.victim,
        });
        ev_hit.send(ProjectileHitEvent {
            projectile: hit.projectile,
            victim: hit.victim,
            position,
        });
    }
}

/// Keeps one visual per live projectile.
pub fn sync_projectile_visuals(
    mut commands: Commands,
    field: Res<ProjectileField>,
    assets: Res<ProjectileAssets>,
    mut visuals: Query<(Entity, &ProjectileVisual, &mut Transform)>,
) {
    let mut shown = HashSet::new();
    for (entity, visual, mut transform) in &mut visuals {
        match field.0.get(visual.0) {
            Some(projectile) => {
                transform.translation = projectile.position;
                shown.insert(visual.0);
            }
            None => commands.entity(entity).despawn_recursive(),
        }
    }

    for projectile in field.0.iter().filter(|p| !shown.contains(&p.id)) {
        commands.spawn((
            ProjectileVisual(projectile.id),
            Mesh3d(assets.mesh.clone()),
            MeshMaterial3d(assets.material.clone()),
            Transform::from_translation(projectile.position),
            StateScoped(AppState::InGame),
        ));
    }
}

pub fn fade_muzzle_flashes(
    mut commands: Commands,
    time: Res<Time>,
    mut flashes: Query<(Entity, &mut MuzzleFlash)>,
) {
    for (entity, mut flash) in &mut flashes {
        if flash.0.tick(time.delta()).finished() {
            commands.entity(entity).despawn_recursive();
        }
    }
}

pub struct ProjectilePlugin;

impl Plugin for ProjectilePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ProjectileField>()
            .add_systems(Startup, setup_projectile_assets)
            .add_systems(
                Update,
                (
                    fire_weapon.pipe(halt_on_error),
                    advance_projectiles,
                    sync_projectile_visuals,
                )
                    .chain()
                    .in_set(TickSet::Projectiles),
            )
            .add_systems(Update, fade_muzzle_flashes);
    }
}
