//! Bottom-up risk roll-up.
//!
//! Directories are visited before files among a node's children. A node whose
//! children are all unsupported becomes [`RiskLevel::NotSupported`]; otherwise it
//! aggregates over its supported children only.

use crate::tree::{FileRisk, NodeId, RiskTree};
use lmrisk_protocol::{AggregationPolicy, RiskLevel};

struct Summary {
    value: f64,
    /// Raw per-line values below the node, collected only for `Median`.
    samples: Vec<f64>,
}

/// Recompute `risk_level` for every node under `policy` and return the root's level.
/// Scores already attached to the files are reused, nothing is fetched.
pub fn aggregate(tree: &mut RiskTree, policy: AggregationPolicy) -> RiskLevel {
    let root = tree.root();
    aggregate_node(tree, root, policy);
    tree.node(root).risk_level
}

fn aggregate_node(tree: &mut RiskTree, id: NodeId, policy: AggregationPolicy) -> Option<Summary> {
    let (files, directories): (Vec<NodeId>, Vec<NodeId>) = tree
        .node(id)
        .children()
        .iter()
        .copied()
        .partition(|child| tree.node(*child).is_file());

    let mut values = Vec::with_capacity(files.len() + directories.len());
    let mut samples = Vec::new();

    for directory in directories {
        if let Some(summary) = aggregate_node(tree, directory, policy) {
            values.push(summary.value);
            samples.extend(summary.samples);
        }
    }

    for file in files {
        let scalar = match tree.node(file).file_risk() {
            Some(FileRisk::Unsupported) | None => None,
            Some(risk) => {
                let lines = risk.lines();
                if policy == AggregationPolicy::Median {
                    samples.extend_from_slice(lines);
                }
                Some(reduce(lines, policy))
            }
        };
        let node = tree.node_mut(file);
        match scalar {
            Some(value) => {
                node.risk_level = RiskLevel::Value(value);
                values.push(value);
            }
            None => node.risk_level = RiskLevel::NotSupported,
        }
    }

    let node = tree.node_mut(id);
    if values.is_empty() {
        node.risk_level = RiskLevel::NotSupported;
        return None;
    }

    let value = match policy {
        AggregationPolicy::Average => mean(&values),
        AggregationPolicy::Maximum => maximum(&values),
        AggregationPolicy::Median => median(&samples),
    };
    node.risk_level = RiskLevel::Value(value);
    Some(Summary { value, samples })
}

/// Scalar for one file's per-line scores. Empty input yields `0`.
#[must_use]
pub fn reduce(values: &[f64], policy: AggregationPolicy) -> f64 {
    match policy {
        AggregationPolicy::Average => mean(values),
        AggregationPolicy::Median => median(values),
        AggregationPolicy::Maximum => maximum(values),
    }
}

#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = values.len() as f64;
    values.iter().sum::<f64>() / count
}

#[must_use]
pub fn maximum(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

/// Element at index `ceil(n / 2)` of the sorted values, clamped to the last
/// element so a single value is its own median.
#[must_use]
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let idx = sorted.len().div_ceil(2).min(sorted.len() - 1);
    sorted[idx]
}
