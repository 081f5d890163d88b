//! Merges authoritative snapshots into the client's view of other players
//! and seeds projectiles the client has not seen yet.

use std::collections::{BTreeMap, HashSet};

use bevy_math::Vec3;
use tracing::warn;

use crate::error::SnapshotError;
use crate::projectile::ProjectileSimulator;
use crate::protocol::{BulletId, PlayerId, Rotation};
use crate::snapshot::{GameSnapshot, KillRecord, PlayerEntry};

/// Display-only state for one remote player.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteView {
    pub id: PlayerId,
    pub username: String,
    pub position: Vec3,
    pub rotation: Rotation,
    pub health: i32,
    pub is_alive: bool,
}

impl From<&PlayerEntry> for RemoteView {
    fn from(entry: &PlayerEntry) -> Self {
        Self {
            id: entry.id,
            username: entry.username.clone(),
            position: entry.position,
            rotation: entry.rotation,
            health: entry.health,
            is_alive: entry.is_alive,
        }
    }
}

/// What the authority says about the local player. Never fed back into physics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVitals {
    pub health: i32,
    pub max_health: i32,
    pub kills: u32,
    pub deaths: u32,
    pub is_alive: bool,
}

impl Default for LocalVitals {
    fn default() -> Self {
        Self {
            health: 100,
            max_health: 100,
            kills: 0,
            deaths: 0,
            is_alive: true,
        }
    }
}

/// Changes produced by one snapshot.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub joined: Vec<PlayerId>,
    pub left: Vec<PlayerId>,
    pub spawned: Vec<BulletId>,
    pub withdrawn: Vec<BulletId>,
    pub local: Option<LocalVitals>,
    pub kills: Vec<KillRecord>,
    pub rejected: Vec<SnapshotError>,
}

#[derive(Debug, Default)]
pub struct RemoteRoster {
    local_id: Option<PlayerId>,
    views: BTreeMap<PlayerId, RemoteView>,
    /// Kills already reported, limited to those the authority still lists.
    seen_kills: HashSet<KillRecord>,
}

impl RemoteRoster {
    pub fn new(local_id: Option<PlayerId>) -> Self {
        Self {
            local_id,
            ..Default::default()
        }
    }

    pub fn local_id(&self) -> Option<PlayerId> {
        self.local_id
    }

    pub fn set_local_id(&mut self, id: PlayerId) {
        self.local_id = Some(id);
        self.views.remove(&id);
    }

    pub fn get(&self, id: PlayerId) -> Option<&RemoteView> {
        self.views.get(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.views.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Views in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &RemoteView> {
        self.views.values()
    }

    /// Collision targets for the projectile simulator.
    pub fn targets(&self) -> Vec<(PlayerId, Vec3)> {
        self.views.values().map(|v| (v.id, v.position)).collect()
    }

    pub fn clear(&mut self) {
        self.views.clear();
        self.seen_kills.clear();
    }

    /// Apply one snapshot.
    ///
    /// Entries that fail validation are skipped for this snapshot only. If a
    /// rejected entry still carries an id, that player or bullet counts as
    /// present so it is not torn down because of one bad record.
    pub fn reconcile(
        &mut self,
        snapshot: &GameSnapshot,
        projectiles: &mut ProjectileSimulator,
        now_ms: u64,
    ) -> Reconciliation {
        let mut out = Reconciliation::default();

        let mut present = HashSet::new();
        for record in &snapshot.players {
            if let Some(id) = record.id {
                present.insert(id);
            }
            let entry = match record.validate() {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(%err, "skipping player entry");
                    out.rejected.push(err);
                    continue;
                }
            };

            if Some(entry.id) == self.local_id {
                out.local = Some(LocalVitals {
                    health: entry.health,
                    max_health: entry.max_health,
                    kills: entry.kills,
                    deaths: entry.deaths,
                    is_alive: entry.is_alive,
                });
                continue;
            }

            let view = RemoteView::from(&entry);
            if self.views.insert(entry.id, view).is_none() {
                out.joined.push(entry.id);
            }
        }

        self.views.retain(|id, _| {
            let keep = present.contains(id);
            if !keep {
                out.left.push(*id);
            }
            keep
        });

        let listed: HashSet<BulletId> = snapshot.bullets.iter().filter_map(|b| b.id).collect();
        out.withdrawn = projectiles.withdraw_unlisted(&listed);

        for record in &snapshot.bullets {
            let entry = match record.validate() {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(%err, "skipping bullet entry");
                    out.rejected.push(err);
                    continue;
                }
            };
            if projectiles.spawn_from_authority(&entry, now_ms) {
                out.spawned.push(entry.id);
            }
        }

        let listed: HashSet<KillRecord> = snapshot.recent_kills.iter().copied().collect();
        self.seen_kills.retain(|kill| listed.contains(kill));
        let mut kills: Vec<KillRecord> = snapshot
            .recent_kills
            .iter()
            .filter(|kill| self.seen_kills.insert(**kill))
            .copied()
            .collect();
        kills.sort_by_key(|k| (k.timestamp, k.killer_id, k.victim_id));
        out.kills = kills;

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{BulletRecord, PlayerRecord};

    const LOCAL: PlayerId = 1;

    fn player(id: PlayerId, position: Vec3) -> PlayerRecord {
        PlayerRecord::from(&PlayerEntry {
            id,
            username: format!("p{id}"),
            position,
            rotation: Rotation::default(),
            health: 100,
            max_health: 100,
            kills: 0,
            deaths: 0,
            is_alive: true,
        })
    }

    fn bullet(id: BulletId, start: Vec3, timestamp: u64) -> BulletRecord {
        BulletRecord {
            id: Some(id),
            start_position: Some(start),
            direction: Some(Vec3::NEG_Z),
            speed: Some(100.0),
            timestamp: Some(timestamp),
            owner_id: None,
        }
    }

    fn snapshot(players: Vec<PlayerRecord>, bullets: Vec<BulletRecord>) -> GameSnapshot {
        GameSnapshot {
            players,
            bullets,
            ..Default::default()
        }
    }

    #[test]
    fn new_player_gets_one_view_and_leaves_cleanly() {
        let mut roster = RemoteRoster::new(Some(LOCAL));
        let mut sim = ProjectileSimulator::default();

        let first = snapshot(vec![player(LOCAL, Vec3::ZERO), player(2, Vec3::X)], vec![]);
        let changes = roster.reconcile(&first, &mut sim, 0);
        assert_eq!(changes.joined, vec![2]);
        assert_eq!(roster.len(), 1);

        let again = roster.reconcile(&first, &mut sim, 0);
        assert!(again.joined.is_empty());
        assert_eq!(roster.len(), 1);

        let gone = roster.reconcile(&snapshot(vec![player(LOCAL, Vec3::ZERO)], vec![]), &mut sim, 0);
        assert_eq!(gone.left, vec![2]);
        assert!(roster.is_empty());
        assert!(!roster.contains(LOCAL));
    }

    #[test]
    fn local_entry_only_updates_vitals() {
        let mut roster = RemoteRoster::new(Some(LOCAL));
        let mut sim = ProjectileSimulator::default();
        let mut own = player(LOCAL, Vec3::new(30.0, 0.9, 30.0));
        own.health = Some(25);
        own.is_alive = Some(false);

        let changes = roster.reconcile(&snapshot(vec![own], vec![]), &mut sim, 0);
        assert!(roster.get(LOCAL).is_none());
        let vitals = changes.local.expect("local vitals");
        assert_eq!(vitals.health, 25);
        assert!(!vitals.is_alive);
    }

    #[test]
    fn positions_follow_latest_snapshot() {
        let mut roster = RemoteRoster::new(Some(LOCAL));
        let mut sim = ProjectileSimulator::default();
        roster.reconcile(&snapshot(vec![player(2, Vec3::X)], vec![]), &mut sim, 0);
        roster.reconcile(&snapshot(vec![player(2, Vec3::Z * 4.0)], vec![]), &mut sim, 0);
        assert_eq!(roster.get(2).map(|v| v.position), Some(Vec3::Z * 4.0));
    }

    #[test]
    fn invalid_entries_are_skipped_without_dropping_the_rest() {
        let mut roster = RemoteRoster::new(Some(LOCAL));
        let mut sim = ProjectileSimulator::default();
        roster.reconcile(&snapshot(vec![player(2, Vec3::X), player(3, Vec3::Z)], vec![]), &mut sim, 0);

        let mut broken = player(2, Vec3::ONE);
        broken.position = None;
        let nameless = PlayerRecord {
            id: None,
            ..player(9, Vec3::ZERO)
        };
        let changes = roster.reconcile(
            &snapshot(vec![broken, nameless, player(3, Vec3::NEG_X), player(4, Vec3::Y)], vec![]),
            &mut sim,
            0,
        );

        assert_eq!(changes.rejected.len(), 2);
        assert_eq!(changes.joined, vec![4]);
        assert!(changes.left.is_empty());
        assert_eq!(roster.get(2).map(|v| v.position), Some(Vec3::X));
        assert_eq!(roster.get(3).map(|v| v.position), Some(Vec3::NEG_X));
    }

    #[test]
    fn bullets_are_seeded_once_and_never_overwritten() {
        let mut roster = RemoteRoster::new(Some(LOCAL));
        let mut sim = ProjectileSimulator::default();
        let start = Vec3::new(0.0, 1.5, 0.0);

        let changes = roster.reconcile(&snapshot(vec![], vec![bullet(10, start, 8_000)]), &mut sim, 10_000);
        assert_eq!(changes.spawned, vec![10]);
        assert_eq!(sim.get(10).map(|p| p.born_at), Some(-2.0));

        sim.tick(0.01, &[]);
        let moved = sim.get(10).map(|p| p.position);

        let changes = roster.reconcile(
            &snapshot(vec![], vec![bullet(10, Vec3::new(20.0, 1.0, 20.0), 8_000)]),
            &mut sim,
            10_010,
        );
        assert!(changes.spawned.is_empty());
        assert_eq!(sim.get(10).map(|p| p.position), moved);
    }

    #[test]
    fn unlisted_bullets_are_withdrawn() {
        let mut roster = RemoteRoster::new(Some(LOCAL));
        let mut sim = ProjectileSimulator::default();
        roster.reconcile(&snapshot(vec![], vec![bullet(10, Vec3::Y, 0)]), &mut sim, 0);

        let changes = roster.reconcile(&snapshot(vec![], vec![]), &mut sim, 100);
        assert_eq!(changes.withdrawn, vec![10]);
        assert!(sim.is_empty());
    }

    #[test]
    fn kill_feed_reports_each_kill_once() {
        let mut roster = RemoteRoster::new(Some(LOCAL));
        let mut sim = ProjectileSimulator::default();
        let kill = |t| KillRecord {
            killer_id: 2,
            victim_id: 3,
            timestamp: t,
        };
        let mut snap = snapshot(vec![], vec![]);
        snap.recent_kills = vec![kill(200), kill(100)];

        let first = roster.reconcile(&snap, &mut sim, 0);
        assert_eq!(first.kills, vec![kill(100), kill(200)]);

        snap.recent_kills.push(kill(300));
        let second = roster.reconcile(&snap, &mut sim, 0);
        assert_eq!(second.kills, vec![kill(300)]);
    }

    #[test]
    fn observed_shot_does_not_hit_its_shooter() {
        let mut roster = RemoteRoster::new(Some(LOCAL));
        let mut sim = ProjectileSimulator::default();
        let muzzle = Vec3::new(10.0, 0.9, 10.0);
        let mut shot = bullet(1, muzzle, 5_000);
        shot.owner_id = Some(2);

        roster.reconcile(&snapshot(vec![player(2, muzzle)], vec![shot]), &mut sim, 5_000);
        assert_eq!(sim.len(), 1);

        let report = sim.tick(1.0 / 60.0, &roster.targets());
        assert!(report.hits.is_empty());
        assert_eq!(sim.len(), 1);
    }

    #[test]
    fn kills_sharing_a_timestamp_are_all_reported() {
        let mut roster = RemoteRoster::new(Some(LOCAL));
        let mut sim = ProjectileSimulator::default();
        let first_kill = KillRecord {
            killer_id: 2,
            victim_id: 3,
            timestamp: 500,
        };
        let same_instant = KillRecord {
            killer_id: 4,
            victim_id: 5,
            timestamp: 500,
        };

        let mut snap = snapshot(vec![], vec![]);
        snap.recent_kills = vec![first_kill];
        assert_eq!(roster.reconcile(&snap, &mut sim, 0).kills, vec![first_kill]);

        snap.recent_kills.push(same_instant);
        assert_eq!(roster.reconcile(&snap, &mut sim, 0).kills, vec![same_instant]);
        assert!(roster.reconcile(&snap, &mut sim, 0).kills.is_empty());
    }
}
