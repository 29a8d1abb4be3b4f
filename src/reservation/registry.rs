//! File Reservation Registry (C5, `SPEC_FULL.md` §4.5).

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conflict::{classify, patterns_overlap, suggest, ConflictKind, Resolution};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: String,
    pub agent_name: String,
    pub pattern: String,
    pub exclusive: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reason: String,
}

impl Reservation {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Returned in place of a [`Reservation`] when a `reserve` request is
/// blocked by one or more live, overlapping reservations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub holders: Vec<String>,
    pub kind: ConflictKind,
    pub suggestion: Resolution,
}

#[derive(Debug, Default)]
pub struct ReservationFilter {
    pub agent_name: Option<String>,
    pub pattern_prefix: Option<String>,
}

/// Advisory lock registry shared across all concurrent orchestrations
/// (`SPEC_FULL.md` §5). `reserve` performs the overlap check and the insert
/// atomically under a single mutex, per the shared-resource policy.
#[derive(Default)]
pub struct ReservationRegistry {
    reservations: Mutex<HashMap<String, Reservation>>,
}

impl ReservationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `pattern` for `agent`. Returns the new reservation, or a
    /// [`Conflict`] describing the blocking holders and an advisory
    /// resolution if any live reservation overlaps and either side is
    /// exclusive.
    pub fn reserve(
        &self,
        agent: &str,
        pattern: &str,
        exclusive: bool,
        ttl: Duration,
        reason: &str,
    ) -> Result<Reservation, Conflict> {
        let now = Utc::now();
        let mut reservations = self.reservations.lock().unwrap();

        let blocking: Vec<Reservation> = reservations
            .values()
            .filter(|r| r.is_live(now) && patterns_overlap(&r.pattern, pattern))
            .filter(|r| exclusive || r.exclusive)
            .cloned()
            .collect();

        if !blocking.is_empty() {
            let kind = classify(exclusive, blocking[0].exclusive);
            let suggestion = suggest(&blocking, now, pattern_is_narrowable(pattern));
            return Err(Conflict {
                holders: blocking.iter().map(|r| r.agent_name.clone()).collect(),
                kind,
                suggestion,
            });
        }

        let reservation = Reservation {
            reservation_id: Uuid::new_v4().to_string(),
            agent_name: agent.to_string(),
            pattern: pattern.to_string(),
            exclusive,
            created_at: now,
            expires_at: now + ttl,
            reason: reason.to_string(),
        };
        reservations.insert(reservation.reservation_id.clone(), reservation.clone());
        Ok(reservation)
    }

    /// Release a reservation by id, or every reservation held by an agent.
    /// Idempotent: releasing an id that doesn't exist is a no-op.
    pub fn release(&self, agent_or_reservation: &str) {
        let mut reservations = self.reservations.lock().unwrap();
        reservations.remove(agent_or_reservation);
        reservations.retain(|_, r| r.agent_name != agent_or_reservation);
    }

    pub fn list(&self, filter: &ReservationFilter) -> Vec<Reservation> {
        let reservations = self.reservations.lock().unwrap();
        reservations
            .values()
            .filter(|r| {
                filter
                    .agent_name
                    .as_ref()
                    .map_or(true, |a| &r.agent_name == a)
            })
            .filter(|r| {
                filter
                    .pattern_prefix
                    .as_ref()
                    .map_or(true, |p| r.pattern.starts_with(p.as_str()))
            })
            .cloned()
            .collect()
    }

    /// Remove reservations past expiry. Safe under concurrent use: the
    /// whole scan-and-remove happens under the same mutex as `reserve`.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut reservations = self.reservations.lock().unwrap();
        let before = reservations.len();
        reservations.retain(|_, r| r.is_live(now));
        before - reservations.len()
    }
}

/// A pattern is narrowable if it contains a glob wildcard that could be
/// replaced by a more specific literal segment.
fn pattern_is_narrowable(pattern: &str) -> bool {
    pattern.contains('*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_exclusive_overlap_suggests_negotiate() {
        let registry = ReservationRegistry::new();
        registry
            .reserve(
                "Blue",
                "internal/auth/*.go",
                true,
                Duration::minutes(30),
                "working on token refresh",
            )
            .unwrap();

        let err = registry
            .reserve("Green", "internal/auth/*.go", true, Duration::minutes(10), "x")
            .unwrap_err();
        assert_eq!(err.kind, ConflictKind::ExclusiveExclusive);
        assert_eq!(err.holders, vec!["Blue".to_string()]);
        assert_eq!(err.suggestion, Resolution::Negotiate);
    }

    #[test]
    fn expired_reservation_suggests_force_release_then_succeeds() {
        let registry = ReservationRegistry::new();
        let old = registry
            .reserve(
                "Old",
                "internal/cache/*.go",
                true,
                Duration::minutes(-10),
                "stale",
            )
            .unwrap();

        let err = registry
            .reserve("New", "internal/cache/*.go", true, Duration::minutes(30), "x")
            .unwrap_err();
        assert_eq!(err.suggestion, Resolution::ForceRelease);

        registry.release(&old.reservation_id);
        assert!(registry
            .reserve("New", "internal/cache/*.go", true, Duration::minutes(30), "x")
            .is_ok());
    }

    #[test]
    fn shared_shared_overlap_is_permitted() {
        let registry = ReservationRegistry::new();
        registry
            .reserve("A", "pkg/**", false, Duration::minutes(30), "reading")
            .unwrap();
        assert!(registry
            .reserve("B", "pkg/util.go", false, Duration::minutes(30), "reading")
            .is_ok());
    }

    #[test]
    fn sweep_removes_only_expired() {
        let registry = ReservationRegistry::new();
        registry
            .reserve("A", "a/*.go", false, Duration::minutes(-1), "stale")
            .unwrap();
        registry
            .reserve("B", "b/*.go", false, Duration::minutes(30), "live")
            .unwrap();
        assert_eq!(registry.sweep(), 1);
        assert_eq!(registry.list(&ReservationFilter::default()).len(), 1);
    }
}
