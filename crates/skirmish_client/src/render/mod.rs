use bevy::prelude::*;
use skirmish_protocol::arena::{ARENA_CEILING, ARENA_HALF_EXTENT};

use crate::app_state::AppState;
use crate::config::Fidelity;

const FLOOR_COLOR: Color = Color::srgb(0.32, 0.36, 0.30);
const WALL_COLOR: Color = Color::srgb(0.55, 0.55, 0.60);
const COVER_COLOR: Color = Color::srgb(0.45, 0.33, 0.22);
const WALL_THICKNESS: f32 = 1.0;

/// Cover blocks as (centre on the floor, full size).
const COVER: [(Vec3, Vec3); 6] = [
    (Vec3::new(10.0, 0.0, 10.0), Vec3::new(2.0, 2.0, 2.0)),
    (Vec3::new(-10.0, 0.0, -10.0), Vec3::new(2.0, 2.0, 2.0)),
    (Vec3::new(-18.0, 0.0, 14.0), Vec3::new(6.0, 1.2, 1.0)),
    (Vec3::new(18.0, 0.0, -14.0), Vec3::new(6.0, 1.2, 1.0)),
    (Vec3::new(0.0, 0.0, 25.0), Vec3::new(1.0, 3.0, 8.0)),
    (Vec3::new(0.0, 0.0, -25.0), Vec3::new(1.0, 3.0, 8.0)),
];

pub struct RenderPlugin {
    pub fidelity: Fidelity,
}

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        match self.fidelity {
            Fidelity::Full => {
                app.add_systems(OnEnter(AppState::InGame), (spawn_lighting, spawn_arena));
            }
            Fidelity::Reduced => {
                app.add_systems(
                    OnEnter(AppState::InGame),
                    (spawn_reduced_lighting, spawn_floor),
                );
            }
        }
    }
}

fn spawn_lighting(mut commands: Commands) {
    commands.spawn((
        DirectionalLight {
            illuminance: 12000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.9, 0.3, 0.0)),
        StateScoped(AppState::InGame),
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 250.0,
    });
}

fn spawn_reduced_lighting(mut commands: Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 900.0,
    });
}

fn spawn_floor(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let size = ARENA_HALF_EXTENT * 2.0;
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(size, size))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: FLOOR_COLOR,
            perceptual_roughness: 0.95,
            ..default()
        })),
        Transform::default(),
        StateScoped(AppState::InGame),
    ));
}

fn spawn_arena(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let size = ARENA_HALF_EXTENT * 2.0;
    let floor_material = materials.add(StandardMaterial {
        base_color: FLOOR_COLOR,
        perceptual_roughness: 0.95,
        ..default()
    });
    let wall_material = materials.add(StandardMaterial {
        base_color: WALL_COLOR,
        ..default()
    });
    let cover_material = materials.add(StandardMaterial {
        base_color: COVER_COLOR,
        perceptual_roughness: 0.8,
        ..default()
    });

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(size, size))),
        MeshMaterial3d(floor_material),
        Transform::default(),
        StateScoped(AppState::InGame),
    ));

    // Walls sit just outside the playable square.
    let long_wall = meshes.add(Cuboid::new(size + 2.0 * WALL_THICKNESS, ARENA_CEILING, WALL_THICKNESS));
    let offset = ARENA_HALF_EXTENT + WALL_THICKNESS / 2.0;
    let half_height = ARENA_CEILING / 2.0;
    for (translation, rotation) in [
        (Vec3::new(0.0, half_height, offset), Quat::IDENTITY),
        (Vec3::new(0.0, half_height, -offset), Quat::IDENTITY),
        (Vec3::new(offset, half_height, 0.0), Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
        (Vec3::new(-offset, half_height, 0.0), Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
    ] {
        commands.spawn((
            Mesh3d(long_wall.clone()),
            MeshMaterial3d(wall_material.clone()),
            Transform::from_translation(translation).with_rotation(rotation),
            StateScoped(AppState::InGame),
        ));
    }

    for (base, extent) in COVER {
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::from_size(extent))),
            MeshMaterial3d(cover_material.clone()),
            Transform::from_translation(base + Vec3::Y * extent.y / 2.0),
            StateScoped(AppState::InGame),
        ));
    }
}
