//! Point table with linked reactions.
//!
//! `PointTable` holds:
//! - the current integer value of every named point
//! - linked reactions (an edge on one point sets another after a delay)
//! - the queue of reactions waiting for their due time
//!
//! Time is passed in by the caller so the table stays synchronous.

use barn_common::hal::config::{LinkedPoint, SimBusConfig};
use barn_common::io::gateway::PointState;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Reaction queued by a point edge.
#[derive(Debug, Clone)]
struct PendingChange {
    due: Instant,
    point: String,
    value: i64,
}

/// Simulated point values.
#[derive(Debug, Default)]
pub struct PointTable {
    values: HashMap<String, i64>,
    links: HashMap<String, Vec<LinkedPoint>>,
    pending: VecDeque<PendingChange>,
}

impl PointTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table populated from `io.toml`.
    pub fn from_config(config: &SimBusConfig) -> Self {
        let mut table = Self::new();
        for point in &config.point {
            table.values.insert(point.name.clone(), point.initial);
            if !point.linked.is_empty() {
                table.links.insert(point.name.clone(), point.linked.clone());
            }
        }
        table
    }

    /// Insert a point if absent. Returns `true` when it was created.
    pub fn ensure(&mut self, name: &str, initial: i64) -> bool {
        if self.values.contains_key(name) {
            return false;
        }
        self.values.insert(name.to_string(), initial);
        true
    }

    /// Add a linked reaction to `source`.
    pub fn link(&mut self, source: &str, reaction: LinkedPoint) {
        self.links
            .entry(source.to_string())
            .or_default()
            .push(reaction);
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the table has no points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current value of `name`, after applying due reactions.
    pub fn read(&mut self, name: &str, now: Instant) -> Option<i64> {
        self.apply_due(now);
        self.values.get(name).copied()
    }

    /// Store a value as a device write. Edges trigger linked reactions.
    ///
    /// Returns `false` for an unknown point.
    pub fn write(&mut self, name: &str, value: i64, now: Instant) -> bool {
        self.apply_due(now);
        let Some(slot) = self.values.get_mut(name) else {
            return false;
        };
        let previous = std::mem::replace(slot, value);
        if previous != value {
            self.on_edge(name, value, now);
        }
        true
    }

    /// Overwrite a value without triggering reactions.
    ///
    /// Pending reactions targeting the point are dropped so the forced value
    /// sticks. Returns `false` for an unknown point.
    pub fn force(&mut self, name: &str, value: i64) -> bool {
        let Some(slot) = self.values.get_mut(name) else {
            return false;
        };
        *slot = value;
        self.pending.retain(|p| p.point != name);
        true
    }

    fn on_edge(&mut self, source: &str, value: i64, now: Instant) {
        let Some(bit) = PointState { state: value }.as_bit() else {
            return;
        };
        let Some(reactions) = self.links.get(source) else {
            return;
        };

        for reaction in reactions.iter().filter(|r| r.trigger == bit) {
            // A newer reaction supersedes any still pending on the same point.
            self.pending.retain(|p| p.point != reaction.point);
            let due = now + Duration::from_secs_f64(reaction.delay_s.max(0.0));
            trace!(
                "{} {} -> queued {} = {} in {:.3}s",
                source,
                if bit { "ON" } else { "OFF" },
                reaction.point,
                i64::from(reaction.result),
                reaction.delay_s
            );
            self.pending.push_back(PendingChange {
                due,
                point: reaction.point.clone(),
                value: i64::from(reaction.result),
            });
        }
        self.pending.make_contiguous().sort_by_key(|p| p.due);
    }

    fn apply_due(&mut self, now: Instant) {
        while self.pending.front().is_some_and(|p| p.due <= now) {
            let Some(change) = self.pending.pop_front() else {
                break;
            };
            if let Some(slot) = self.values.get_mut(&change.point) {
                let old = std::mem::replace(slot, change.value);
                if old != change.value {
                    debug!("{} changed: {} -> {}", change.point, old, change.value);
                }
            }
        }
    }
}
