//! Work partitioning for a batch.
//!
//! Splits `[0, N)` into one contiguous range per worker. Every worker gets
//! `N / C` indices; what happens to the `N % C` trailing indices is decided by
//! the [`RemainderPolicy`].

use crate::error::CoreError;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// What to do with the `N % C` indices left over by integer division.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemainderPolicy {
    /// Leave them unassigned. They are reported as uncovered, never executed.
    #[default]
    Drop,
    /// Append them to the last worker's partition.
    LastWorker,
}

impl fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemainderPolicy::Drop => write!(f, "drop"),
            RemainderPolicy::LastWorker => write!(f, "last-worker"),
        }
    }
}

impl FromStr for RemainderPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(RemainderPolicy::Drop),
            "last-worker" => Ok(RemainderPolicy::LastWorker),
            other => Err(CoreError::Config(format!(
                "unknown remainder policy '{other}' (expected 'drop' or 'last-worker')"
            ))),
        }
    }
}

/// Contiguous half-open range of indices owned by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub worker: usize,
    pub range: Range<u64>,
}

impl Partition {
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Result of partitioning a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub partitions: Vec<Partition>,
    /// Indices no worker owns. Empty unless `N % C != 0` under [`RemainderPolicy::Drop`].
    pub uncovered: Range<u64>,
}

impl PartitionPlan {
    pub fn uncovered_count(&self) -> u64 {
        self.uncovered.end - self.uncovered.start
    }
}

/// Partition `[0, total)` across `concurrency` workers.
///
/// Worker `k` owns `[k * (N/C), (k+1) * (N/C))`. A zero `total` yields no
/// partitions at all.
pub fn partition_indices(
    total: u64,
    concurrency: usize,
    policy: RemainderPolicy,
) -> Result<PartitionPlan, CoreError> {
    if concurrency == 0 {
        return Err(CoreError::Config(
            "concurrency must be at least 1".to_string(),
        ));
    }
    if total == 0 {
        return Ok(PartitionPlan {
            partitions: Vec::new(),
            uncovered: 0..0,
        });
    }

    let workers = concurrency as u64;
    let size = total / workers;
    let covered_end = size * workers;

    let mut partitions: Vec<Partition> = (0..concurrency)
        .map(|worker| {
            let start = worker as u64 * size;
            Partition {
                worker,
                range: start..start + size,
            }
        })
        .collect();

    let uncovered = match policy {
        RemainderPolicy::Drop => covered_end..total,
        RemainderPolicy::LastWorker => {
            if let Some(last) = partitions.last_mut() {
                last.range.end = total;
            }
            total..total
        }
    };

    Ok(PartitionPlan {
        partitions,
        uncovered,
    })
}

/// Describe the partitioning plan for logging.
pub fn describe_partitioning(batch: &str, plan: &PartitionPlan) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Work distribution for '{batch}':"));

    for partition in &plan.partitions {
        lines.push(format!(
            "  worker-{}: [{}, {}) ({} ops)",
            partition.worker,
            partition.range.start,
            partition.range.end,
            partition.len()
        ));
    }
    if !plan.uncovered.is_empty() {
        lines.push(format!(
            "  unassigned: [{}, {}) ({} ops)",
            plan.uncovered.start,
            plan.uncovered.end,
            plan.uncovered_count()
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_contiguous(plan: &PartitionPlan) {
        let mut next = 0;
        for (k, p) in plan.partitions.iter().enumerate() {
            assert_eq!(p.worker, k);
            assert_eq!(p.range.start, next);
            next = p.range.end;
        }
        assert_eq!(plan.uncovered.start, next);
    }

    #[test]
    fn test_partition_equal_distribution() {
        let plan = partition_indices(12, 4, RemainderPolicy::Drop).unwrap();

        assert_eq!(plan.partitions.len(), 4);
        assert!(plan.partitions.iter().all(|p| p.len() == 3));
        assert_eq!(plan.partitions[0].range, 0..3);
        assert_eq!(plan.partitions[3].range, 9..12);
        assert_eq!(plan.uncovered_count(), 0);
        assert_contiguous(&plan);
    }

    #[test]
    fn test_partition_drop_leaves_high_end_uncovered() {
        let plan = partition_indices(10, 4, RemainderPolicy::Drop).unwrap();

        assert_eq!(plan.partitions.len(), 4);
        assert!(plan.partitions.iter().all(|p| p.len() == 2));
        assert_eq!(plan.uncovered, 8..10);
        assert_eq!(plan.uncovered_count(), 10 % 4);
        assert_contiguous(&plan);
    }

    #[test]
    fn test_partition_last_worker_takes_remainder() {
        let plan = partition_indices(10, 4, RemainderPolicy::LastWorker).unwrap();

        assert_eq!(plan.partitions[2].range, 4..6);
        assert_eq!(plan.partitions[3].range, 6..10);
        assert_eq!(plan.uncovered_count(), 0);
        assert_contiguous(&plan);
    }

    #[test]
    fn test_partition_more_workers_than_indices() {
        let plan = partition_indices(3, 4, RemainderPolicy::Drop).unwrap();
        assert_eq!(plan.partitions.len(), 4);
        assert!(plan.partitions.iter().all(Partition::is_empty));
        assert_eq!(plan.uncovered, 0..3);

        let plan = partition_indices(3, 4, RemainderPolicy::LastWorker).unwrap();
        assert_eq!(plan.partitions[3].range, 0..3);
        assert_eq!(plan.uncovered_count(), 0);
    }

    #[test]
    fn test_partition_zero_total() {
        let plan = partition_indices(0, 4, RemainderPolicy::Drop).unwrap();
        assert!(plan.partitions.is_empty());
        assert_eq!(plan.uncovered_count(), 0);
    }

    #[test]
    fn test_partition_zero_concurrency_rejected() {
        let err = partition_indices(10, 0, RemainderPolicy::Drop).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_remainder_policy_parse() {
        assert_eq!("drop".parse::<RemainderPolicy>().unwrap(), RemainderPolicy::Drop);
        assert_eq!(
            "last-worker".parse::<RemainderPolicy>().unwrap(),
            RemainderPolicy::LastWorker
        );
        assert!("spread".parse::<RemainderPolicy>().is_err());
        assert_eq!(RemainderPolicy::LastWorker.to_string(), "last-worker");
    }

    #[test]
    fn test_describe_partitioning() {
        let plan = partition_indices(10, 4, RemainderPolicy::Drop).unwrap();
        let description = describe_partitioning("parent inserts", &plan);

        assert!(description.contains("parent inserts"));
        assert!(description.contains("worker-0: [0, 2)"));
        assert!(description.contains("unassigned: [8, 10) (2 ops)"));
    }
}
