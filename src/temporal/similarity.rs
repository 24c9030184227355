//! Discrete similarity distances between the instants of two temporal
//! values: Fréchet, dynamic time warping and Hausdorff.

use crate::error::{MeosError, Result};
use crate::temporal::{Temporal, TemporalValue};

/// A pair of matched instant indexes of a warping path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub i: usize,
    pub j: usize,
}

#[derive(Clone, Copy)]
enum Similarity {
    Frechet,
    DynTimeWarp,
}

fn distance_matrix<V: TemporalValue>(a: &[V], b: &[V]) -> Result<Vec<Vec<f64>>> {
    a.iter()
        .map(|x| {
            b.iter()
                .map(|y| {
                    x.distance_to(y)
                        .ok_or_else(|| MeosError::InvalidArg(format!("The {} type has no distance", V::DATA_TYPE)))
                })
                .collect()
        })
        .collect()
}

/// Accumulated cost matrix of the dynamic program.
fn cost_matrix(dist: &[Vec<f64>], kind: Similarity) -> Vec<Vec<f64>> {
    let (n, m) = (dist.len(), dist[0].len());
    let mut cost = vec![vec![f64::INFINITY; m]; n];
    for i in 0..n {
        for j in 0..m {
            let d = dist[i][j];
            let prev = match (i, j) {
                (0, 0) => None,
                (0, _) => Some(cost[0][j - 1]),
                (_, 0) => Some(cost[i - 1][0]),
                _ => Some(cost[i - 1][j - 1].min(cost[i - 1][j]).min(cost[i][j - 1])),
            };
            cost[i][j] = match (kind, prev) {
                (_, None) => d,
                (Similarity::Frechet, Some(p)) => p.max(d),
                (Similarity::DynTimeWarp, Some(p)) => p + d,
            };
        }
    }
    cost
}

/// Walk back from the last cell along the cheapest predecessors.
fn warping_path(cost: &[Vec<f64>]) -> Vec<Match> {
    let (mut i, mut j) = (cost.len() - 1, cost[0].len() - 1);
    let mut path = vec![Match { i, j }];
    while i > 0 || j > 0 {
        if i == 0 {
            j -= 1;
        } else if j == 0 {
            i -= 1;
        } else {
            let diag = cost[i - 1][j - 1];
            let up = cost[i - 1][j];
            let left = cost[i][j - 1];
            if diag <= up && diag <= left {
                i -= 1;
                j -= 1;
            } else if up <= left {
                i -= 1;
            } else {
                j -= 1;
            }
        }
        path.push(Match { i, j });
    }
    path.reverse();
    path
}

fn instant_values<V: TemporalValue>(temp: &Temporal<V>) -> Vec<V> {
    temp.instants().into_iter().map(|i| i.value.clone()).collect()
}

impl<V: TemporalValue> Temporal<V> {
    fn similarity_costs(&self, other: &Temporal<V>, kind: Similarity) -> Result<Vec<Vec<f64>>> {
        self.start_instant().value.check_compatible(&other.start_instant().value)?;
        let dist = distance_matrix(&instant_values(self), &instant_values(other))?;
        Ok(cost_matrix(&dist, kind))
    }

    /// Discrete Fréchet distance between the instants of both values.
    pub fn frechet_distance(&self, other: &Temporal<V>) -> Result<f64> {
        let cost = self.similarity_costs(other, Similarity::Frechet)?;
        Ok(cost[cost.len() - 1][cost[0].len() - 1])
    }

    /// Matching of instants realizing the discrete Fréchet distance.
    pub fn frechet_path(&self, other: &Temporal<V>) -> Result<Vec<Match>> {
        Ok(warping_path(&self.similarity_costs(other, Similarity::Frechet)?))
    }

    /// Dynamic time warping distance between the instants of both values.
    pub fn dyntimewarp_distance(&self, other: &Temporal<V>) -> Result<f64> {
        let cost = self.similarity_costs(other, Similarity::DynTimeWarp)?;
        Ok(cost[cost.len() - 1][cost[0].len() - 1])
    }

    pub fn dyntimewarp_path(&self, other: &Temporal<V>) -> Result<Vec<Match>> {
        Ok(warping_path(&self.similarity_costs(other, Similarity::DynTimeWarp)?))
    }

    /// Discrete Hausdorff distance between the instant values of both
    /// values.
    pub fn hausdorff_distance(&self, other: &Temporal<V>) -> Result<f64> {
        self.start_instant().value.check_compatible(&other.start_instant().value)?;
        let dist = distance_matrix(&instant_values(self), &instant_values(other))?;
        let rows = dist.iter().map(|r| r.iter().cloned().fold(f64::INFINITY, f64::min)).fold(0.0, f64::max);
        let cols = (0..dist[0].len())
            .map(|j| dist.iter().map(|r| r[j]).fold(f64::INFINITY, f64::min))
            .fold(0.0, f64::max);
        Ok(rows.max(cols))
    }
}
