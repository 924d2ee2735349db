//! Discretization of continuous scores into clusters.

use crate::domain::error::{DomainError, DomainResult};

/// Result of clustering a vector of scores.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster centers, most populated first
    pub centers: Vec<f64>,
    /// Index into `centers` for every input value
    pub labels: Vec<usize>,
}

/// External clustering routine used by the `clust` field parser.
pub trait Clusterer: Send + Sync {
    fn fit(&self, values: &[f64]) -> DomainResult<Clustering>;
}

/// One-dimensional mean shift with a flat kernel.
///
/// Every value seeds a window that moves to the mean of the values within
/// `bandwidth` until it converges. Converged windows closer than `bandwidth`
/// to a more populated one are discarded; each value is then labeled with its
/// nearest remaining center.
#[derive(Debug, Clone)]
pub struct MeanShift {
    bandwidth: f64,
    max_iter: usize,
}

impl Default for MeanShift {
    fn default() -> Self {
        Self::new((-3.0f64).exp())
    }
}

impl MeanShift {
    pub fn new(bandwidth: f64) -> Self {
        Self {
            bandwidth,
            max_iter: 300,
        }
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    fn window(&self, values: &[f64], center: f64) -> (f64, usize) {
        let (sum, count) = values
            .iter()
            .filter(|v| (*v - center).abs() <= self.bandwidth)
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        (sum, count)
    }

    fn converge(&self, values: &[f64], seed: f64) -> (f64, usize) {
        let stop = 1e-3 * self.bandwidth;
        let mut center = seed;
        let mut population = 0;
        for _ in 0..self.max_iter {
            let (sum, count) = self.window(values, center);
            if count == 0 {
                break;
            }
            let shifted = sum / count as f64;
            population = count;
            let moved = (shifted - center).abs();
            center = shifted;
            if moved < stop {
                break;
            }
        }
        (center, population)
    }
}

impl Clusterer for MeanShift {
    fn fit(&self, values: &[f64]) -> DomainResult<Clustering> {
        if !(self.bandwidth > 0.0) {
            return Err(DomainError::MalformedInput(format!(
                "mean shift bandwidth must be positive, got {}",
                self.bandwidth
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::MalformedInput(
                "cannot cluster non-finite scores".to_string(),
            ));
        }

        let mut modes: Vec<(f64, usize)> = values
            .iter()
            .map(|&seed| self.converge(values, seed))
            .filter(|(_, population)| *population > 0)
            .collect();
        modes.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.total_cmp(&b.0)));

        let mut centers: Vec<f64> = Vec::new();
        for (center, _) in modes {
            if centers.iter().all(|c| (c - center).abs() >= self.bandwidth) {
                centers.push(center);
            }
        }

        let labels = values
            .iter()
            .map(|v| {
                centers
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| (*a - v).abs().total_cmp(&(*b - v).abs()))
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            })
            .collect();

        Ok(Clustering { centers, labels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_two_separated_groups_when_fitting_then_finds_two_centers() {
        let values = [0.10, 0.11, 0.12, 0.90, 0.91];
        let clustering = MeanShift::new(0.05).fit(&values).unwrap();

        assert_eq!(clustering.centers.len(), 2);
        assert_eq!(clustering.labels[0], clustering.labels[2]);
        assert_ne!(clustering.labels[0], clustering.labels[3]);
        assert_eq!(clustering.labels[3], clustering.labels[4]);
        assert!((clustering.centers[0] - 0.11).abs() < 1e-9);
    }

    #[test]
    fn given_empty_values_when_fitting_then_returns_no_centers() {
        let clustering = MeanShift::default().fit(&[]).unwrap();
        assert!(clustering.centers.is_empty());
        assert!(clustering.labels.is_empty());
    }

    #[test]
    fn given_nan_when_fitting_then_fails() {
        assert!(MeanShift::default().fit(&[0.1, f64::NAN]).is_err());
    }
}
