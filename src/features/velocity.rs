//! Short-window activity velocity.
//!
//! Velocity is the number of ratings a user took part in (on either side)
//! within a trailing window. Bursts of activity right before a rating are
//! typical of sybil accounts being warmed up.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{RatingStore, Role, UserId, WindowCount};
use crate::error::{FeatureError, Result};

/// Velocity observations of one user in timestamp order
#[derive(Debug, Clone, Default)]
struct VelocityTrail {
    timestamps: Vec<DateTime<Utc>>,
    /// Running maximum up to and including each observation
    running_max: Vec<usize>,
}

/// Per-user history of recorded velocities.
///
/// Owned by the caller and fed in timestamp order, so the maximum seen
/// before any instant can be answered without rescanning the store.
#[derive(Debug, Clone, Default)]
pub struct VelocityCache {
    trails: HashMap<UserId, VelocityTrail>,
}

impl VelocityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a velocity observation for `user`.
    ///
    /// Observations must not go back in time for a given user.
    pub fn record(&mut self, user: UserId, timestamp: DateTime<Utc>, velocity: usize) -> Result<()> {
        let trail = self.trails.entry(user).or_default();

        if let Some(&last) = trail.timestamps.last() {
            if timestamp < last {
                return Err(FeatureError::OutOfOrder {
                    user,
                    last,
                    attempted: timestamp,
                });
            }
        }

        let max = trail.running_max.last().copied().unwrap_or(0).max(velocity);
        trail.timestamps.push(timestamp);
        trail.running_max.push(max);
        Ok(())
    }

    /// Largest velocity recorded for `user` strictly before `timestamp`
    pub fn max_before(&self, user: UserId, timestamp: DateTime<Utc>) -> usize {
        let Some(trail) = self.trails.get(&user) else {
            return 0;
        };
        match trail.timestamps.partition_point(|&t| t < timestamp) {
            0 => 0,
            n => trail.running_max[n - 1],
        }
    }

    /// Number of users with at least one observation
    pub fn user_count(&self) -> usize {
        self.trails.len()
    }
}

/// Received and given activity in one trailing window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionalVelocity {
    /// Window length in hours
    pub hours: i64,
    /// Ratings received
    pub incoming: WindowCount,
    /// Ratings given
    pub outgoing: WindowCount,
}

impl DirectionalVelocity {
    /// Ratings received plus ratings given
    pub fn total(&self) -> usize {
        self.incoming.total + self.outgoing.total
    }

    /// Column names for a window length and the rating side the user was
    /// on, in [`DirectionalVelocity::values`] order
    pub fn names(hours: i64, role: Role) -> Vec<String> {
        let side = role.suffix();
        let mut names = Vec::with_capacity(7);
        for direction in ["in", "out"] {
            for kind in ["neg", "pos", "all"] {
                names.push(format!("vel_{}_{}_{}_{}", hours, direction, kind, side));
            }
        }
        names.push(format!("vel_{}_all_{}", hours, side));
        names
    }

    pub fn values(&self) -> Vec<f64> {
        let counts = |c: &WindowCount| [c.negative as f64, c.positive as f64, c.total as f64];
        let mut values = Vec::with_capacity(7);
        values.extend(counts(&self.incoming));
        values.extend(counts(&self.outgoing));
        values.push(self.total() as f64);
        values
    }
}

/// Start of a trailing window, saturating at the earliest instant
fn window_start(timestamp: DateTime<Utc>, window: Option<Duration>) -> DateTime<Utc> {
    window
        .and_then(|w| timestamp.checked_sub_signed(w))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Point queries for activity velocity
#[derive(Debug, Clone, Copy)]
pub struct VelocityComputer<'a> {
    store: &'a RatingStore,
}

impl<'a> VelocityComputer<'a> {
    pub fn new(store: &'a RatingStore) -> Self {
        Self { store }
    }

    /// Ratings involving `user` in `(timestamp - window, timestamp)`.
    ///
    /// A window reaching past the earliest representable instant covers
    /// everything before `timestamp`.
    pub fn current_velocity(&self, user: UserId, timestamp: DateTime<Utc>, window: Duration) -> usize {
        self.store
            .events_in_window(user, Role::Either, window_start(timestamp, Some(window)), timestamp)
            .total
    }

    /// Largest velocity recorded in `cache` for `user` before `timestamp`
    pub fn max_velocity(&self, cache: &VelocityCache, user: UserId, timestamp: DateTime<Utc>) -> usize {
        cache.max_before(user, timestamp)
    }

    /// Received and given activity of `user` in the trailing `hours`
    pub fn directional(&self, user: UserId, timestamp: DateTime<Utc>, hours: i64) -> DirectionalVelocity {
        let start = window_start(timestamp, Duration::try_hours(hours));
        DirectionalVelocity {
            hours,
            incoming: self.store.events_in_window(user, Role::Target, start, timestamp),
            outgoing: self.store.events_in_window(user, Role::Source, start, timestamp),
        }
    }
}
