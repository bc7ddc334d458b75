// SMOTE - synthetic minority oversampling
//
// Every class below the majority count is topped up with synthetic rows
// interpolated between a random member and one of its k nearest same-class
// neighbours. Originals keep their order and come first; synthetic rows are
// appended class by class in label order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::TrainingSet;
use crate::analysis::FeatureVector;

/// Seeded SMOTE oversampler
#[derive(Debug, Clone)]
pub struct Smote {
    k_neighbors: usize,
    seed: u64,
}

impl Smote {
    /// # Arguments
    /// * `k_neighbors` - Neighbours considered per sample (capped per class at size - 1)
    /// * `seed` - RNG seed, so balancing is reproducible
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Self {
            k_neighbors: k_neighbors.max(1),
            seed,
        }
    }

    /// Balance `set` so every present class has the majority count
    pub fn balance(&self, set: &TrainingSet) -> TrainingSet {
        let counts = set.class_counts();
        let Some(&majority) = counts.values().max() else {
            return set.clone();
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut balanced = set.clone();

        for (&label, &count) in &counts {
            let deficit = majority - count;
            if deficit == 0 {
                continue;
            }

            let members: Vec<&[f32]> = set
                .features
                .iter()
                .zip(&set.labels)
                .filter(|(_, l)| **l == label)
                .map(|(f, _)| f.as_slice())
                .collect();

            if members.len() == 1 {
                tracing::warn!(
                    "[Dataset] Class {} has a single sample, oversampling by duplication",
                    label
                );
            }

            for row in self.synthesize(&members, deficit, &mut rng) {
                match FeatureVector::new(row) {
                    Ok(vector) => balanced.push(vector, label),
                    Err(err) => tracing::error!("[Dataset] Dropping synthetic row: {}", err),
                }
            }
            tracing::debug!("[Dataset] Class {}: {} -> {}", label, count, majority);
        }

        balanced
    }

    fn synthesize(&self, members: &[&[f32]], n: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
        if members.len() == 1 {
            return vec![members[0].to_vec(); n];
        }

        let k = self.k_neighbors.min(members.len() - 1);
        let neighbours: Vec<Vec<usize>> = (0..members.len())
            .map(|i| nearest_neighbours(members, i, k))
            .collect();

        (0..n)
            .map(|_| {
                let base = rng.gen_range(0..members.len());
                let neighbour = neighbours[base][rng.gen_range(0..k)];
                let gap: f32 = rng.gen_range(0.0..1.0);
                members[base]
                    .iter()
                    .zip(members[neighbour])
                    .map(|(x, y)| x + gap * (y - x))
                    .collect()
            })
            .collect()
    }
}

/// Indices of the `k` members closest to `members[i]`, excluding `i`
fn nearest_neighbours(members: &[&[f32]], i: usize, k: usize) -> Vec<usize> {
    let mut distances: Vec<(f32, usize)> = members
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != i)
        .map(|(j, other)| (squared_distance(members[i], other), j))
        .collect();
    distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    distances.into_iter().take(k).map(|(_, j)| j).collect()
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// `Label=count` pairs for logging
pub fn describe_counts(set: &TrainingSet) -> String {
    set.class_counts()
        .iter()
        .map(|(label, count)| format!("{}={}", label, count))
        .collect::<Vec<_>>()
        .join(", ")
}
