use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::snapshot::GameSnapshot;

pub type PlayerId = u64;
pub type BulletId = u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f32,
    pub yaw: f32,
}

/// Reply to a hit report when the authority accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitOutcome {
    pub hit: bool,
    pub damage: i32,
    pub killed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Ask to join the running game under a display name.
    Join { player_name: String },
    /// Graceful disconnect.
    Leave,
    /// Throttled, fire-and-forget pose report.
    ReportPosition {
        player_id: PlayerId,
        position: Vec3,
        rotation: Rotation,
    },
    /// Shot fired along the view ray. The authority picks speed and damage.
    Fire {
        player_id: PlayerId,
        start_position: Vec3,
        direction: Vec3,
    },
    /// Locally detected projectile contact.
    ReportHit {
        bullet_id: BulletId,
        victim_id: PlayerId,
    },
    /// Request to come back after dying.
    Respawn { player_id: PlayerId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Join accepted; the player starts at `spawn`.
    Joined { player_id: PlayerId, spawn: Vec3 },
    /// Join refused with a reason.
    Rejected { reason: String },
    /// Periodic authoritative state.
    Snapshot(GameSnapshot),
    /// Answer to a hit report. `None` when the report was invalid.
    HitResult(Option<HitOutcome>),
    /// Respawn accepted at the given spawn point.
    Respawned { position: Vec3 },
}
