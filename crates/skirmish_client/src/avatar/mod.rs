use std::collections::HashSet;

use bevy::prelude::*;
use skirmish_protocol::protocol::PlayerId;
use skirmish_protocol::roster::RemoteView;

use crate::app_state::AppState;
use crate::frame::TickSet;
use crate::network::{Roster, reconcile_snapshots};

// --- Colors ---

const BODY_COLOR: Color = Color::srgb(0.78, 0.25, 0.22);
const DEAD_COLOR: Color = Color::srgb(0.25, 0.25, 0.28);

/// Remote bodies are drawn with their origin at the reported centre.
const BODY_HEIGHT: f32 = 1.8;
const NAME_TAG_OFFSET: f32 = 1.2;

// --- Components ---

#[derive(Component)]
pub struct RemoteAvatar {
    pub id: PlayerId,
    pub alive: bool,
}

#[derive(Component)]
pub struct RemoteAvatarNameTag;

#[derive(Resource)]
pub struct AvatarAssets {
    pub body: Handle<Mesh>,
    pub alive: Handle<StandardMaterial>,
    pub dead: Handle<StandardMaterial>,
}

impl AvatarAssets {
    fn material(&self, alive: bool) -> Handle<StandardMaterial> {
        if alive {
            self.alive.clone()
        } else {
            self.dead.clone()
        }
    }
}

fn setup_avatar_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(AvatarAssets {
        body: meshes.add(Capsule3d::new(0.4, BODY_HEIGHT - 0.8)),
        alive: materials.add(StandardMaterial {
            base_color: BODY_COLOR,
            ..default()
        }),
        dead: materials.add(StandardMaterial {
            base_color: DEAD_COLOR,
            ..default()
        }),
    });
}

fn spawn_remote_avatar(commands: &mut Commands, assets: &AvatarAssets, view: &RemoteView) {
    commands
        .spawn((
            RemoteAvatar {
                id: view.id,
                alive: view.is_alive,
            },
            Mesh3d(assets.body.clone()),
            MeshMaterial3d(assets.material(view.is_alive)),
            Transform::from_translation(view.position),
            StateScoped(AppState::InGame),
        ))
        .with_children(|root| {
            root.spawn((
                RemoteAvatarNameTag,
                Text2d::new(view.username.clone()),
                TextFont {
                    font_size: 24.0,
                    ..default()
                },
                Transform::from_translation(Vec3::new(0.0, NAME_TAG_OFFSET, 0.0))
                    .with_scale(Vec3::splat(0.01)),
            ));
        });

    info!("Spawned remote avatar '{}' (id={})", view.username, view.id);
}

/// Makes the set of remote avatars match the roster exactly. Positions snap
/// to the last reported value.
pub fn sync_remote_avatars(
    mut commands: Commands,
    roster: Res<Roster>,
    assets: Res<AvatarAssets>,
    mut avatars: Query<(
        Entity,
        &mut RemoteAvatar,
        &mut Transform,
        &mut MeshMaterial3d<StandardMaterial>,
    )>,
) {
    let mut present = HashSet::new();

    for (entity, mut avatar, mut transform, mut material) in &mut avatars {
        let Some(view) = roster.0.get(avatar.id) else {
            commands.entity(entity).despawn_recursive();
            info!("Despawned remote avatar (id={})", avatar.id);
            continue;
        };
        present.insert(avatar.id);

        transform.translation = view.position;
        if avatar.alive != view.is_alive {
            avatar.alive = view.is_alive;
            material.0 = assets.material(view.is_alive);
        }
    }

    for view in roster.0.iter().filter(|v| !present.contains(&v.id)) {
        spawn_remote_avatar(&mut commands, &assets, view);
    }
}

// --- Plugin ---

pub struct AvatarPlugin;

impl Plugin for AvatarPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_avatar_assets).add_systems(
            Update,
            sync_remote_avatars
                .after(reconcile_snapshots)
                .in_set(TickSet::Intake)
                .run_if(in_state(AppState::InGame)),
        );
    }
}
