//! Authoritative snapshot records.
//!
//! Every field of a wire record is optional: an entry the authority sends
//! half-populated is rejected on its own by `validate` instead of failing the
//! whole snapshot.

use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::protocol::{BulletId, PlayerId, Rotation};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub game: GameInfo,
    pub players: Vec<PlayerRecord>,
    pub bullets: Vec<BulletRecord>,
    pub recent_kills: Vec<KillRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: Option<PlayerId>,
    pub username: Option<String>,
    pub position: Option<Vec3>,
    pub rotation: Option<Rotation>,
    pub health: Option<i32>,
    pub max_health: Option<i32>,
    pub kills: Option<u32>,
    pub deaths: Option<u32>,
    pub is_alive: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletRecord {
    pub id: Option<BulletId>,
    pub start_position: Option<Vec3>,
    pub direction: Option<Vec3>,
    pub speed: Option<f32>,
    /// Milliseconds since the UNIX epoch on the authority's clock.
    pub timestamp: Option<u64>,
    /// Player who fired it. Absent when the authority does not say.
    #[serde(default)]
    pub owner_id: Option<PlayerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillRecord {
    pub killer_id: PlayerId,
    pub victim_id: PlayerId,
    pub timestamp: u64,
}

/// A player record with every field present and finite.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntry {
    pub id: PlayerId,
    pub username: String,
    pub position: Vec3,
    pub rotation: Rotation,
    pub health: i32,
    pub max_health: i32,
    pub kills: u32,
    pub deaths: u32,
    pub is_alive: bool,
}

/// A bullet record with every field present and a usable direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulletEntry {
    pub id: BulletId,
    pub start_position: Vec3,
    pub direction: Vec3,
    pub speed: f32,
    pub timestamp: u64,
    pub owner: Option<PlayerId>,
}

impl BulletEntry {
    pub fn velocity(&self) -> Vec3 {
        self.direction.normalize_or_zero() * self.speed
    }
}

fn require<T>(value: Option<T>, entity: &'static str, field: &'static str) -> Result<T, SnapshotError> {
    value.ok_or(SnapshotError::MissingField { entity, field })
}

fn finite_vec(value: Vec3, entity: &'static str, field: &'static str) -> Result<Vec3, SnapshotError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SnapshotError::NonFinite { entity, field })
    }
}

impl PlayerRecord {
    pub fn validate(&self) -> Result<PlayerEntry, SnapshotError> {
        const ENTITY: &str = "player";
        let rotation = require(self.rotation, ENTITY, "rotation")?;
        if !rotation.pitch.is_finite() || !rotation.yaw.is_finite() {
            return Err(SnapshotError::NonFinite {
                entity: ENTITY,
                field: "rotation",
            });
        }
        Ok(PlayerEntry {
            id: require(self.id, ENTITY, "id")?,
            username: require(self.username.clone(), ENTITY, "username")?,
            position: finite_vec(require(self.position, ENTITY, "position")?, ENTITY, "position")?,
            rotation,
            health: require(self.health, ENTITY, "health")?,
            max_health: require(self.max_health, ENTITY, "maxHealth")?,
            kills: require(self.kills, ENTITY, "kills")?,
            deaths: require(self.deaths, ENTITY, "deaths")?,
            is_alive: require(self.is_alive, ENTITY, "isAlive")?,
        })
    }
}

impl From<&PlayerEntry> for PlayerRecord {
    fn from(entry: &PlayerEntry) -> Self {
        Self {
            id: Some(entry.id),
            username: Some(entry.username.clone()),
            position: Some(entry.position),
            rotation: Some(entry.rotation),
            health: Some(entry.health),
            max_health: Some(entry.max_health),
            kills: Some(entry.kills),
            deaths: Some(entry.deaths),
            is_alive: Some(entry.is_alive),
        }
    }
}

impl BulletRecord {
    pub fn validate(&self) -> Result<BulletEntry, SnapshotError> {
        const ENTITY: &str = "bullet";
        let id = require(self.id, ENTITY, "id")?;
        let start_position = finite_vec(
            require(self.start_position, ENTITY, "startPosition")?,
            ENTITY,
            "startPosition",
        )?;
        let direction = finite_vec(require(self.direction, ENTITY, "direction")?, ENTITY, "direction")?;
        if direction.length_squared() == 0.0 {
            return Err(SnapshotError::ZeroDirection(id));
        }
        let speed = require(self.speed, ENTITY, "speed")?;
        if !speed.is_finite() {
            return Err(SnapshotError::NonFinite {
                entity: ENTITY,
                field: "speed",
            });
        }
        Ok(BulletEntry {
            id,
            start_position,
            direction,
            speed,
            timestamp: require(self.timestamp, ENTITY, "timestamp")?,
            owner: self.owner_id,
        })
    }
}

impl From<&BulletEntry> for BulletRecord {
    fn from(entry: &BulletEntry) -> Self {
        Self {
            id: Some(entry.id),
            start_position: Some(entry.start_position),
            direction: Some(entry.direction),
            speed: Some(entry.speed),
            timestamp: Some(entry.timestamp),
            owner_id: entry.owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_player() -> PlayerEntry {
        PlayerEntry {
            id: 4,
            username: "vex".into(),
            position: Vec3::new(1.0, 0.9, -2.0),
            rotation: Rotation { pitch: 0.1, yaw: 1.2 },
            health: 75,
            max_health: 100,
            kills: 2,
            deaths: 1,
            is_alive: true,
        }
    }

    #[test]
    fn complete_player_record_validates() {
        let entry = full_player();
        let record = PlayerRecord::from(&entry);
        assert_eq!(record.validate(), Ok(entry));
    }

    #[test]
    fn missing_player_field_is_reported() {
        let mut record = PlayerRecord::from(&full_player());
        record.is_alive = None;
        assert_eq!(
            record.validate(),
            Err(SnapshotError::MissingField {
                entity: "player",
                field: "isAlive"
            })
        );
    }

    #[test]
    fn nan_position_is_rejected() {
        let mut record = PlayerRecord::from(&full_player());
        record.position = Some(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(matches!(
            record.validate(),
            Err(SnapshotError::NonFinite { field: "position", .. })
        ));
    }

    #[test]
    fn zero_direction_bullet_is_rejected() {
        let record = BulletRecord {
            id: Some(9),
            start_position: Some(Vec3::ZERO),
            direction: Some(Vec3::ZERO),
            speed: Some(100.0),
            timestamp: Some(0),
            owner_id: None,
        };
        assert_eq!(record.validate(), Err(SnapshotError::ZeroDirection(9)));
    }

    #[test]
    fn bullet_velocity_uses_unit_direction() {
        let entry = BulletEntry {
            id: 1,
            start_position: Vec3::ZERO,
            direction: Vec3::new(0.0, 0.0, -4.0),
            speed: 100.0,
            timestamp: 0,
            owner: None,
        };
        assert_eq!(entry.velocity(), Vec3::new(0.0, 0.0, -100.0));
    }
}
