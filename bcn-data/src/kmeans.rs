//! K-means clustering of two-dimensional points.

use bcn_core::{RainfallError, Result};
use log::debug;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_SEED: u64 = 42;
pub const N_INIT: usize = 10;
pub const MAX_ITERATIONS: usize = 300;

pub type Point = [f64; 2];

/// Outcome of the best k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub labels: Vec<usize>,
    pub centers: Vec<Point>,
    pub inertia: f64,
}

/// Cluster `points` into exactly `n_clusters` groups.
///
/// Seeds with k-means++, restarts `N_INIT` times and keeps the run with the
/// lowest inertia. Runs are reproducible for a given seed.
pub fn kmeans(points: &[Point], n_clusters: usize, seed: u64) -> Result<Clustering> {
    if n_clusters == 0 || points.len() < n_clusters {
        return Err(RainfallError::InvalidClusterCount {
            requested: n_clusters,
            rows: points.len(),
        });
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut best: Option<Clustering> = None;
    for run in 0..N_INIT {
        let centers = plus_plus_centers(points, n_clusters, &mut rng);
        let clustering = lloyd(points, centers);
        debug!("k-means run {} inertia {:.3}", run, clustering.inertia);
        if best
            .as_ref()
            .map_or(true, |current| clustering.inertia < current.inertia)
        {
            best = Some(clustering);
        }
    }
    best.ok_or(RainfallError::InvalidClusterCount {
        requested: n_clusters,
        rows: points.len(),
    })
}

fn distance_sq(a: &Point, b: &Point) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

fn nearest(point: &Point, centers: &[Point]) -> (usize, f64) {
    centers
        .iter()
        .enumerate()
        .map(|(i, center)| (i, distance_sq(point, center)))
        .fold((0, f64::INFINITY), |acc, candidate| {
            if candidate.1 < acc.1 {
                candidate
            } else {
                acc
            }
        })
}

fn plus_plus_centers(points: &[Point], n_clusters: usize, rng: &mut StdRng) -> Vec<Point> {
    let mut centers = vec![points[rng.gen_range(0..points.len())]];
    while centers.len() < n_clusters {
        let weights: Vec<f64> = points.iter().map(|p| nearest(p, &centers).1).collect();
        let index = match WeightedIndex::new(&weights) {
            Ok(distribution) => distribution.sample(rng),
            Err(_) => rng.gen_range(0..points.len()),
        };
        centers.push(points[index]);
    }
    centers
}

fn lloyd(points: &[Point], mut centers: Vec<Point>) -> Clustering {
    let k = centers.len();
    let mut labels = vec![usize::MAX; points.len()];
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (label, point) in labels.iter_mut().zip(points) {
            let (closest, _) = nearest(point, &centers);
            if *label != closest {
                *label = closest;
                changed = true;
            }
        }
        reseed_empty_clusters(points, &mut labels, &mut centers);

        let mut sums = vec![[0.0, 0.0]; k];
        let mut counts = vec![0usize; k];
        for (&label, point) in labels.iter().zip(points) {
            sums[label][0] += point[0];
            sums[label][1] += point[1];
            counts[label] += 1;
        }
        for ((center, sum), count) in centers.iter_mut().zip(&sums).zip(&counts) {
            if *count > 0 {
                *center = [sum[0] / *count as f64, sum[1] / *count as f64];
            }
        }
        if !changed {
            break;
        }
    }
    let inertia = labels
        .iter()
        .zip(points)
        .map(|(&label, point)| distance_sq(point, &centers[label]))
        .sum();
    Clustering {
        labels,
        centers,
        inertia,
    }
}

// Move the point farthest from its center into each empty cluster.
fn reseed_empty_clusters(points: &[Point], labels: &mut [usize], centers: &mut [Point]) {
    for cluster in 0..centers.len() {
        let mut counts = vec![0usize; centers.len()];
        labels.iter().for_each(|&label| counts[label] += 1);
        if counts[cluster] > 0 {
            continue;
        }
        let farthest = labels
            .iter()
            .zip(points)
            .enumerate()
            .filter(|(_, (label, _))| counts[**label] > 1)
            .map(|(i, (&label, point))| (i, distance_sq(point, &centers[label])))
            .fold(None, |acc: Option<(usize, f64)>, candidate| match acc {
                Some(current) if current.1 >= candidate.1 => Some(current),
                _ => Some(candidate),
            });
        if let Some((index, _)) = farthest {
            labels[index] = cluster;
            centers[cluster] = points[index];
        }
    }
}
