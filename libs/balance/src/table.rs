//! Distribution tables built from observed placements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ResourceId, TaskId};

/// A single observation of where a task was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// The observed task.
    pub task_id: TaskId,

    /// The resource the scheduler placed it on, if any.
    pub resource: Option<ResourceId>,
}

impl Placement {
    /// Create a new placement observation.
    pub fn new(task_id: TaskId, resource: Option<ResourceId>) -> Self {
        Self { task_id, resource }
    }
}

/// Assignment counts keyed by resource id.
///
/// Only resources that received at least one task are present. Iteration
/// is in ascending resource id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistributionTable {
    counts: BTreeMap<ResourceId, u64>,
}

impl DistributionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from explicit counts. Zero counts are dropped and
    /// repeated resources are summed.
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (ResourceId, u64)>,
    {
        let mut table = BTreeMap::new();
        for (resource, count) in counts {
            if count > 0 {
                *table.entry(resource).or_insert(0) += count;
            }
        }
        Self { counts: table }
    }

    /// Total number of placed tasks.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct resources observed.
    pub fn resource_count(&self) -> usize {
        self.counts.len()
    }

    /// Returns true if no placements were observed.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Assignment count for a resource (zero if never observed).
    pub fn count(&self, resource: ResourceId) -> u64 {
        self.counts.get(&resource).copied().unwrap_or(0)
    }

    /// Iterate `(resource, count)` pairs in ascending resource order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, u64)> + '_ {
        self.counts.iter().map(|(resource, count)| (*resource, *count))
    }
}

/// Fold placements into a fresh distribution table.
///
/// Placements without a resource are skipped. Each task id is expected to
/// appear at most once per call; duplicates are counted as given.
pub fn aggregate<'a, I>(placements: I) -> DistributionTable
where
    I: IntoIterator<Item = &'a Placement>,
{
    let counts = placements
        .into_iter()
        .filter_map(|placement| placement.resource)
        .fold(BTreeMap::new(), |mut counts, resource| {
            *counts.entry(resource).or_insert(0u64) += 1;
            counts
        });

    DistributionTable { counts }
}
