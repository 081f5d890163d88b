pub mod camera;

use bevy::prelude::*;
use camera::{
    PendingTeleport, PositionReporter, SpawnPoint, Vitals, move_local_player, report_position,
    request_respawn, spawn_local_player,
};

use crate::app_state::AppState;
use crate::frame::{TickSet, halt_on_error};

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SpawnPoint>()
            .init_resource::<PendingTeleport>()
            .init_resource::<Vitals>()
            .init_resource::<PositionReporter>()
            .add_systems(OnEnter(AppState::InGame), spawn_local_player)
            .add_systems(
                Update,
                move_local_player.pipe(halt_on_error).in_set(TickSet::Motion),
            )
            .add_systems(
                Update,
                (report_position.pipe(halt_on_error), request_respawn).in_set(TickSet::Outbound),
            );
    }
}
