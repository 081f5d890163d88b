pub mod hud;
pub mod notice;

use bevy::prelude::*;
use hud::{KillFeed, record_kills, spawn_hud, update_hud};
use notice::{overlay_camera, spawn_notice, update_notice};

use crate::app_state::AppState;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<KillFeed>()
            .add_systems(Startup, spawn_notice)
            .add_systems(OnEnter(AppState::Connecting), overlay_camera(AppState::Connecting))
            .add_systems(OnEnter(AppState::Ended), overlay_camera(AppState::Ended))
            .add_systems(OnEnter(AppState::InGame), spawn_hud)
            .add_systems(Update, update_notice)
            .add_systems(
                Update,
                (record_kills, update_hud)
                    .chain()
                    .run_if(in_state(AppState::InGame)),
            );
    }
}
