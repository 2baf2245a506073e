//! Load-balance statistics over a distribution table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{DistributionTable, ResourceId};

/// Balance figures derived from a [`DistributionTable`].
///
/// Lower standard deviation means a more even spread. Comparing two runs is
/// left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceStatistic {
    /// Sum of all counts.
    pub total: u64,

    /// Number of distinct resources in the table.
    pub resource_count: usize,

    /// Percentage of `total` placed on each resource.
    pub shares: BTreeMap<ResourceId, f64>,

    /// Mean count per resource. Present only alongside `std_dev`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,

    /// Population standard deviation of the counts. Only computed when more
    /// than one resource was observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
}

impl BalanceStatistic {
    /// Compute fresh statistics for a table.
    pub fn compute(table: &DistributionTable) -> Self {
        let total = table.total();
        let resource_count = table.resource_count();

        let shares = table
            .iter()
            .map(|(resource, count)| {
                let share = if total > 0 {
                    100.0 * count as f64 / total as f64
                } else {
                    0.0
                };
                (resource, share)
            })
            .collect();

        let (mean, std_dev) = if resource_count > 1 {
            let k = resource_count as f64;
            let mean = total as f64 / k;
            let variance = table
                .iter()
                .map(|(_, count)| (count as f64 - mean).powi(2))
                .sum::<f64>()
                / k;
            (Some(mean), Some(variance.sqrt()))
        } else {
            (None, None)
        };

        Self {
            total,
            resource_count,
            shares,
            mean,
            std_dev,
        }
    }

    /// Share of a resource in percent (zero if absent).
    pub fn share(&self, resource: ResourceId) -> f64 {
        self.shares.get(&resource).copied().unwrap_or(0.0)
    }

    /// Sum of all shares; `100` within rounding for a non-empty table.
    pub fn share_sum(&self) -> f64 {
        self.shares.values().sum()
    }
}
