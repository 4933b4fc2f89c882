use serde::{Deserialize, Serialize};

/// Cluster membership of a point after DBSCAN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Assignment {
    Noise,
    Cluster(usize),
}

impl Assignment {
    pub fn cluster(&self) -> Option<usize> {
        match self {
            Assignment::Noise => None,
            Assignment::Cluster(id) => Some(*id),
        }
    }
}

/// Density-based clustering over `n` points with a caller-supplied distance.
///
/// A point's neighborhood contains itself and every point within `eps`. Points
/// with at least `min_samples` neighbors are core points; clusters grow from
/// core points in input order and border points join the first cluster that
/// reaches them. Cluster ids are assigned in order of discovery starting at 0.
pub fn dbscan<D>(n: usize, eps: f64, min_samples: usize, distance: D) -> Vec<Assignment>
where
    D: Fn(usize, usize) -> f64,
{
    let neighborhoods: Vec<Vec<usize>> = (0..n)
        .map(|i| (0..n).filter(|&j| i == j || distance(i, j) <= eps).collect())
        .collect();
    let is_core: Vec<bool> = neighborhoods.iter().map(|nb| nb.len() >= min_samples).collect();

    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut next_cluster = 0;

    for seed in 0..n {
        if labels[seed].is_some() || !is_core[seed] {
            continue;
        }

        labels[seed] = Some(next_cluster);
        let mut stack = vec![seed];
        while let Some(point) = stack.pop() {
            if !is_core[point] {
                continue;
            }
            for &neighbor in &neighborhoods[point] {
                if labels[neighbor].is_none() {
                    labels[neighbor] = Some(next_cluster);
                    if is_core[neighbor] {
                        stack.push(neighbor);
                    }
                }
            }
        }

        next_cluster += 1;
    }

    labels
        .into_iter()
        .map(|label| label.map_or(Assignment::Noise, Assignment::Cluster))
        .collect()
}
