use std::collections::{BTreeMap, VecDeque};

use bevy::math::Vec3;
use bevy::prelude::Resource;
use rand::Rng;
use rand::seq::SliceRandom;

use skirmish_protocol::projectile::PROJECTILE_LIFETIME;
use skirmish_protocol::protocol::{BulletId, HitOutcome, PlayerId, Rotation};
use skirmish_protocol::snapshot::{
    BulletEntry, BulletRecord, GameInfo, GameSnapshot, KillRecord, PlayerEntry, PlayerRecord,
};

pub const BULLET_SPEED: f32 = 100.0;
pub const BULLET_DAMAGE: i32 = 25;
pub const MAX_HEALTH: i32 = 100;
pub const BULLET_TTL_MS: u64 = (PROJECTILE_LIFETIME * 1000.0) as u64;
pub const RECENT_KILL_LIMIT: usize = 10;

pub const SPAWN_POINTS: [Vec3; 5] = [
    Vec3::new(0.0, 0.9, 0.0),
    Vec3::new(-40.0, 0.9, -40.0),
    Vec3::new(40.0, 0.9, -40.0),
    Vec3::new(-40.0, 0.9, 40.0),
    Vec3::new(40.0, 0.9, 40.0),
];

#[derive(Debug, Clone)]
struct Combatant {
    username: String,
    position: Vec3,
    rotation: Rotation,
    health: i32,
    kills: u32,
    deaths: u32,
    is_alive: bool,
}

#[derive(Debug, Clone)]
struct StoredBullet {
    entry: BulletEntry,
    damage: i32,
}

/// In-memory system of record for one running game: health, kills and
/// canonical bullet existence.
#[derive(Resource, Debug)]
pub struct ArenaAuthority {
    game: GameInfo,
    players: BTreeMap<PlayerId, Combatant>,
    bullets: BTreeMap<BulletId, StoredBullet>,
    recent_kills: VecDeque<KillRecord>,
    next_bullet_id: BulletId,
}

fn pick_spawn(rng: &mut impl Rng) -> Vec3 {
    SPAWN_POINTS.choose(rng).copied().unwrap_or(SPAWN_POINTS[0])
}

impl ArenaAuthority {
    pub fn new(game_id: u64, name: impl Into<String>) -> Self {
        Self {
            game: GameInfo {
                id: game_id,
                name: name.into(),
            },
            players: BTreeMap::new(),
            bullets: BTreeMap::new(),
            recent_kills: VecDeque::new(),
            next_bullet_id: 1,
        }
    }

    pub fn game(&self) -> &GameInfo {
        &self.game
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn bullet_count(&self) -> usize {
        self.bullets.len()
    }

    pub fn health(&self, id: PlayerId) -> Option<i32> {
        self.players.get(&id).map(|p| p.health)
    }

    pub fn is_alive(&self, id: PlayerId) -> Option<bool> {
        self.players.get(&id).map(|p| p.is_alive)
    }

    /// Add a player at a random spawn point. Re-joining resets the player.
    pub fn join(&mut self, id: PlayerId, username: impl Into<String>, rng: &mut impl Rng) -> Vec3 {
        let position = pick_spawn(rng);
        self.players.insert(
            id,
            Combatant {
                username: username.into(),
                position,
                rotation: Rotation::default(),
                health: MAX_HEALTH,
                kills: 0,
                deaths: 0,
                is_alive: true,
            },
        );
        position
    }

    pub fn leave(&mut self, id: PlayerId) -> bool {
        self.players.remove(&id).is_some()
    }

    pub fn report_position(&mut self, id: PlayerId, position: Vec3, rotation: Rotation) {
        if !position.is_finite() {
            return;
        }
        if let Some(player) = self.players.get_mut(&id) {
            player.position = position;
            player.rotation = rotation;
        }
    }

    /// Persist a bullet fired by a living player. Returns its id.
    pub fn fire(&mut self, id: PlayerId, start: Vec3, direction: Vec3, now_ms: u64) -> Option<BulletId> {
        let shooter = self.players.get(&id)?;
        if !shooter.is_alive || !start.is_finite() {
            return None;
        }
        let direction = direction.try_normalize()?;

        let bullet_id = self.next_bullet_id;
        self.next_bullet_id += 1;
        self.bullets.insert(
            bullet_id,
            StoredBullet {
                entry: BulletEntry {
                    id: bullet_id,
                    start_position: start,
                    direction,
                    speed: BULLET_SPEED,
                    timestamp: now_ms,
                    owner: Some(id),
                },
                damage: BULLET_DAMAGE,
            },
        );
        Some(bullet_id)
    }

    /// Apply a client-reported hit. Returns `None` for unknown bullets,
    /// unknown or already dead victims, and shooters reported as their own victim.
    pub fn report_hit(&mut self, bullet_id: BulletId, victim_id: PlayerId, now_ms: u64) -> Option<HitOutcome> {
        let bullet = self.bullets.get(&bullet_id)?;
        let (owner, damage) = (bullet.entry.owner, bullet.damage);
        if owner == Some(victim_id) {
            return None;
        }

        let victim = self.players.get_mut(&victim_id)?;
        if !victim.is_alive {
            return None;
        }
        victim.health = (victim.health - damage).max(0);
        let killed = victim.health == 0;
        if killed {
            victim.is_alive = false;
            victim.deaths += 1;
        }

        self.bullets.remove(&bullet_id);

        if let (true, Some(owner)) = (killed, owner) {
            if let Some(killer) = self.players.get_mut(&owner) {
                killer.kills += 1;
            }
            self.recent_kills.push_back(KillRecord {
                killer_id: owner,
                victim_id,
                timestamp: now_ms,
            });
            while self.recent_kills.len() > RECENT_KILL_LIMIT {
                self.recent_kills.pop_front();
            }
        }

        Some(HitOutcome {
            hit: true,
            damage,
            killed,
        })
    }

    /// Bring a player back at full health on a spawn point.
    pub fn respawn(&mut self, id: PlayerId, rng: &mut impl Rng) -> Option<Vec3> {
        let position = pick_spawn(rng);
        let player = self.players.get_mut(&id)?;
        player.health = MAX_HEALTH;
        player.is_alive = true;
        player.position = position;
        Some(position)
    }

    /// Forget bullets older than the projectile lifetime. Returns how many were dropped.
    pub fn reap_stale(&mut self, now_ms: u64) -> usize {
        let before = self.bullets.len();
        self.bullets
            .retain(|_, b| now_ms.saturating_sub(b.entry.timestamp) < BULLET_TTL_MS);
        before - self.bullets.len()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game: self.game.clone(),
            players: self
                .players
                .iter()
                .map(|(&id, p)| {
                    PlayerRecord::from(&PlayerEntry {
                        id,
                        username: p.username.clone(),
                        position: p.position,
                        rotation: p.rotation,
                        health: p.health,
                        max_health: MAX_HEALTH,
                        kills: p.kills,
                        deaths: p.deaths,
                        is_alive: p.is_alive,
                    })
                })
                .collect(),
            bullets: self.bullets.values().map(|b| BulletRecord::from(&b.entry)).collect(),
            recent_kills: self.recent_kills.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn arena_with(ids: &[PlayerId]) -> (ArenaAuthority, StdRng) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut authority = ArenaAuthority::new(1, "test");
        for &id in ids {
            authority.join(id, format!("p{id}"), &mut rng);
        }
        (authority, rng)
    }

    #[test]
    fn joins_land_on_spawn_points() {
        let (authority, _) = arena_with(&[1, 2, 3]);
        let snapshot = authority.snapshot();
        assert_eq!(snapshot.players.len(), 3);
        for record in &snapshot.players {
            let entry = record.validate().expect("complete record");
            assert!(SPAWN_POINTS.contains(&entry.position));
            assert_eq!(entry.health, MAX_HEALTH);
        }
    }

    #[test]
    fn fired_bullets_use_fixed_speed_and_unit_direction() {
        let (mut authority, _) = arena_with(&[1]);
        let id = authority
            .fire(1, Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.0, 0.0, -3.0), 1_000)
            .expect("bullet");
        let record = authority.snapshot().bullets[0].validate().expect("bullet record");
        assert_eq!(record.id, id);
        assert_eq!(record.speed, BULLET_SPEED);
        assert!((record.direction - Vec3::NEG_Z).length() < 1e-6);
        assert_eq!(record.timestamp, 1_000);
    }

    #[test]
    fn four_hits_kill_and_credit_the_shooter() {
        let (mut authority, _) = arena_with(&[1, 2]);
        let mut outcomes = Vec::new();
        for t in 0..4 {
            let bullet = authority.fire(1, Vec3::ZERO, Vec3::X, t).expect("bullet");
            outcomes.push(authority.report_hit(bullet, 2, t).expect("valid hit"));
        }
        assert!(outcomes[..3].iter().all(|o| o.hit && !o.killed && o.damage == BULLET_DAMAGE));
        assert!(outcomes[3].killed);
        assert_eq!(authority.is_alive(2), Some(false));

        let snapshot = authority.snapshot();
        let shooter = snapshot.players[0].validate().expect("shooter");
        let victim = snapshot.players[1].validate().expect("victim");
        assert_eq!(shooter.kills, 1);
        assert_eq!(victim.deaths, 1);
        assert_eq!(
            snapshot.recent_kills,
            vec![KillRecord {
                killer_id: 1,
                victim_id: 2,
                timestamp: 3
            }]
        );
        assert!(snapshot.bullets.is_empty());
    }

    #[test]
    fn invalid_hits_return_none() {
        let (mut authority, mut rng) = arena_with(&[1, 2]);
        assert_eq!(authority.report_hit(99, 2, 0), None);

        let bullet = authority.fire(1, Vec3::ZERO, Vec3::X, 0).expect("bullet");
        assert_eq!(authority.report_hit(bullet, 42, 0), None);

        for t in 0..4 {
            let b = authority.fire(1, Vec3::ZERO, Vec3::X, t).expect("bullet");
            authority.report_hit(b, 2, t);
        }
        assert_eq!(authority.report_hit(bullet, 2, 10), None);
        // A dead player cannot shoot until respawned.
        assert_eq!(authority.fire(2, Vec3::ZERO, Vec3::X, 10), None);

        let position = authority.respawn(2, &mut rng).expect("respawn");
        assert!(SPAWN_POINTS.contains(&position));
        assert_eq!(authority.health(2), Some(MAX_HEALTH));
        assert_eq!(authority.is_alive(2), Some(true));
    }

    #[test]
    fn shooter_cannot_be_hit_by_own_bullet() {
        let (mut authority, _) = arena_with(&[1, 2]);
        let bullet = authority.fire(1, Vec3::ZERO, Vec3::NEG_Z, 0).expect("bullet");

        assert_eq!(authority.report_hit(bullet, 1, 0), None);
        assert_eq!(authority.health(1), Some(MAX_HEALTH));

        // The refused report leaves the bullet live for a real victim.
        assert_eq!(authority.bullet_count(), 1);
        assert!(authority.report_hit(bullet, 2, 0).is_some());
    }

    #[test]
    fn snapshot_bullets_name_their_shooter() {
        let (mut authority, _) = arena_with(&[1, 2]);
        authority.fire(2, Vec3::ZERO, Vec3::X, 0).expect("bullet");

        let snapshot = authority.snapshot();
        assert_eq!(snapshot.bullets.len(), 1);
        assert_eq!(snapshot.bullets[0].owner_id, Some(2));
    }

    #[test]
    fn a_bullet_only_lands_once() {
        let (mut authority, _) = arena_with(&[1, 2, 3]);
        let bullet = authority.fire(1, Vec3::ZERO, Vec3::X, 0).expect("bullet");
        assert!(authority.report_hit(bullet, 2, 0).is_some());
        assert_eq!(authority.report_hit(bullet, 3, 0), None);
    }

    #[test]
    fn stale_bullets_are_reaped_after_lifetime() {
        let (mut authority, _) = arena_with(&[1]);
        authority.fire(1, Vec3::ZERO, Vec3::X, 1_000);
        authority.fire(1, Vec3::ZERO, Vec3::X, 3_000);

        assert_eq!(authority.reap_stale(5_999), 0);
        assert_eq!(authority.reap_stale(6_000), 1);
        assert_eq!(authority.bullet_count(), 1);
    }

    #[test]
    fn zero_direction_shots_are_refused() {
        let (mut authority, _) = arena_with(&[1]);
        assert_eq!(authority.fire(1, Vec3::ZERO, Vec3::ZERO, 0), None);
    }

    #[test]
    fn recent_kills_are_bounded() {
        let (mut authority, mut rng) = arena_with(&[1, 2]);
        for round in 0..(RECENT_KILL_LIMIT as u64 + 3) {
            for shot in 0..4 {
                let t = round * 10 + shot;
                let b = authority.fire(1, Vec3::ZERO, Vec3::X, t).expect("bullet");
                authority.report_hit(b, 2, t);
            }
            authority.respawn(2, &mut rng);
        }
        assert_eq!(authority.snapshot().recent_kills.len(), RECENT_KILL_LIMIT);
    }
}
