//! Partitioning of soft literals by weight.

use crate::mcs::SoftLiteral;
use crate::solver::Lit;

/// Splits soft literals into at most `max_partitions` partitions of decreasing weight. Literals of equal weight
/// always share a partition.
pub fn stratify(softs: &[SoftLiteral], max_partitions: usize) -> Vec<Vec<Lit>> {
    let mut sorted: Vec<SoftLiteral> = softs.to_vec();
    sorted.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.lit.cmp(&b.lit)));

    let mut levels: Vec<f64> = sorted.iter().map(|s| s.weight).collect();
    levels.dedup();
    if levels.is_empty() {
        return Vec::new();
    }
    let partitions = max_partitions.clamp(1, levels.len());
    let per_partition = (levels.len() + partitions - 1) / partitions;

    let mut result: Vec<Vec<Lit>> = vec![Vec::new(); partitions];
    let mut level = 0;
    for soft in &sorted {
        while levels[level] != soft.weight {
            level += 1;
        }
        result[level / per_partition].push(soft.lit);
    }
    result.retain(|partition| !partition.is_empty());
    result
}
