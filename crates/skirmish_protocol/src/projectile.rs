use std::collections::{BTreeMap, HashSet};

use bevy_math::Vec3;

use crate::arena::contains_projectile;
use crate::protocol::{BulletId, PlayerId};
use crate::snapshot::BulletEntry;

/// Seconds a projectile lives. Matches the authority's reaping threshold.
pub const PROJECTILE_LIFETIME: f64 = 5.0;
pub const HIT_RADIUS: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: BulletId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Creation time on the simulator clock. May be negative for projectiles
    /// that were already in flight when first observed.
    pub born_at: f64,
    /// The shooter never collides with their own projectile.
    pub owner: Option<PlayerId>,
}

impl Projectile {
    pub fn age(&self, now: f64) -> f64 {
        now - self.born_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Expired,
    OutOfBounds,
    Hit(PlayerId),
    /// The authority stopped listing it.
    Withdrawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileHit {
    pub projectile: BulletId,
    pub victim: PlayerId,
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub hits: Vec<ProjectileHit>,
    pub removed: Vec<(BulletId, Removal)>,
}

/// Owns every locally visible projectile and its clock.
///
/// Ids the simulator removed on its own (expiry, bounds, hit) are retired and
/// refused by [`ProjectileSimulator::insert`] until the authority stops
/// listing them, so a bullet that already hit cannot reappear from a stale
/// snapshot.
#[derive(Debug, Default)]
pub struct ProjectileSimulator {
    clock: f64,
    live: BTreeMap<BulletId, Projectile>,
    retired: HashSet<BulletId>,
}

impl ProjectileSimulator {
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn get(&self, id: BulletId) -> Option<&Projectile> {
        self.live.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.live.values()
    }

    pub fn is_known(&self, id: BulletId) -> bool {
        self.live.contains_key(&id) || self.retired.contains(&id)
    }

    /// Start tracking a projectile that is already `age_seconds` old.
    /// Returns false if the id is live or retired.
    pub fn insert(&mut self, id: BulletId, position: Vec3, velocity: Vec3, age_seconds: f64) -> bool {
        self.track(id, None, position, velocity, age_seconds)
    }

    fn track(
        &mut self,
        id: BulletId,
        owner: Option<PlayerId>,
        position: Vec3,
        velocity: Vec3,
        age_seconds: f64,
    ) -> bool {
        if self.is_known(id) {
            return false;
        }
        let age = if age_seconds.is_finite() {
            age_seconds.clamp(0.0, PROJECTILE_LIFETIME)
        } else {
            0.0
        };
        self.live.insert(
            id,
            Projectile {
                id,
                position,
                velocity,
                born_at: self.clock - age,
                owner,
            },
        );
        true
    }

    /// Seed a projectile from an authoritative record, aged from its own timestamp.
    pub fn spawn_from_authority(&mut self, entry: &BulletEntry, now_ms: u64) -> bool {
        let age = now_ms.saturating_sub(entry.timestamp) as f64 / 1000.0;
        self.track(entry.id, entry.owner, entry.start_position, entry.velocity(), age)
    }

    /// Drop live projectiles the authority no longer lists, and forget retired
    /// ids it has stopped listing.
    pub fn withdraw_unlisted(&mut self, listed: &HashSet<BulletId>) -> Vec<BulletId> {
        self.retired.retain(|id| listed.contains(id));
        let withdrawn: Vec<BulletId> = self
            .live
            .keys()
            .filter(|id| !listed.contains(id))
            .copied()
            .collect();
        for id in &withdrawn {
            self.live.remove(id);
        }
        withdrawn
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.retired.clear();
    }

    /// Advance every projectile by `dt` and test it against `targets`.
    ///
    /// Targets are checked in ascending id order, skipping the projectile's
    /// owner, and at most one victim is hit per projectile. Contact is measured against the segment the
    /// projectile swept this tick, so fast shots cannot pass through a player
    /// between two frames.
    pub fn tick(&mut self, dt: f32, targets: &[(PlayerId, Vec3)]) -> TickReport {
        self.clock += f64::from(dt);
        let now = self.clock;

        let mut ordered = targets.to_vec();
        ordered.sort_by_key(|(id, _)| *id);

        let mut report = TickReport::default();
        for projectile in self.live.values_mut() {
            let start = projectile.position;
            projectile.position += projectile.velocity * dt;

            let removal = if projectile.age(now) >= PROJECTILE_LIFETIME {
                Some(Removal::Expired)
            } else if !projectile.position.is_finite() || !contains_projectile(projectile.position) {
                Some(Removal::OutOfBounds)
            } else {
                ordered
                    .iter()
                    .filter(|(id, _)| projectile.owner != Some(*id))
                    .find(|(_, target)| segment_distance(start, projectile.position, *target) < HIT_RADIUS)
                    .map(|(victim, _)| Removal::Hit(*victim))
            };

            if let Some(removal) = removal {
                if let Removal::Hit(victim) = removal {
                    report.hits.push(ProjectileHit {
                        projectile: projectile.id,
                        victim,
                    });
                }
                report.removed.push((projectile.id, removal));
            }
        }

        for (id, _) in &report.removed {
            self.live.remove(id);
            self.retired.insert(*id);
        }
        report
    }
}

fn segment_distance(a: Vec3, b: Vec3, point: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return a.distance(point);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t).distance(point)
}
