//! k-means grouping of motorcycles by year and brand factor

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{round2, PredictionError, Sample};

/// Number of groups reported
pub const CLUSTER_COUNT: usize = 3;

const MAX_ITERATIONS: usize = 100;

type Point = [f64; 2];

fn point(sample: &Sample) -> Point {
    [sample.year, sample.brand_factor]
}

fn distance(a: &Point, b: &Point) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

fn nearest(p: &Point, centroids: &[Point]) -> usize {
    let mut best = 0;
    for (i, c) in centroids.iter().enumerate().skip(1) {
        if distance(p, c) < distance(p, &centroids[best]) {
            best = i;
        }
    }
    best
}

/// Farthest-point seeding starting from the smallest point
fn seed(points: &[Point], k: usize) -> Vec<Point> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));

    let mut centroids = vec![sorted[0]];
    while centroids.len() < k {
        let mut farthest = sorted[0];
        let mut farthest_distance = -1.0;
        for p in &sorted {
            let d = centroids
                .iter()
                .map(|c| distance(p, c))
                .fold(f64::INFINITY, f64::min);
            if d > farthest_distance {
                farthest = *p;
                farthest_distance = d;
            }
        }
        centroids.push(farthest);
    }
    centroids
}

/// Lloyd iterations; returns final centroids and each point's cluster
fn kmeans(points: &[Point], k: usize) -> (Vec<Point>, Vec<usize>) {
    let mut centroids = seed(points, k);
    let mut assignment: Vec<usize> = points.iter().map(|p| nearest(p, &centroids)).collect();

    for _ in 0..MAX_ITERATIONS {
        for (i, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Point> = points
                .iter()
                .zip(&assignment)
                .filter(|(_, a)| **a == i)
                .map(|(p, _)| p)
                .collect();
            // An empty cluster keeps its previous centroid
            if !members.is_empty() {
                let n = members.len() as f64;
                *centroid = [
                    members.iter().map(|p| p[0]).sum::<f64>() / n,
                    members.iter().map(|p| p[1]).sum::<f64>() / n,
                ];
            }
        }

        let next: Vec<usize> = points.iter().map(|p| nearest(p, &centroids)).collect();
        if next == assignment {
            break;
        }
        assignment = next;
    }

    (centroids, assignment)
}

/// One group of similar motorcycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    /// 1-based, ordered by ascending centroid year
    pub cluster_id: usize,
    pub count: usize,
    pub average_year: f64,
    pub brands: Vec<String>,
}

/// Result of the pattern analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternReport {
    pub clusters: Vec<ClusterSummary>,
    pub total_motorcycles: usize,
    /// Mean distance from each motorcycle to its cluster centroid
    pub average_distance: f64,
}

/// Group `samples` into [`CLUSTER_COUNT`] clusters
///
/// # Errors
///
/// Fails with fewer samples than clusters.
pub fn analyze_patterns(samples: &[Sample]) -> Result<PatternReport, PredictionError> {
    if samples.len() < CLUSTER_COUNT {
        return Err(PredictionError::InsufficientData {
            needed: CLUSTER_COUNT,
            found: samples.len(),
        });
    }

    let points: Vec<Point> = samples.iter().map(point).collect();
    let (centroids, assignment) = kmeans(&points, CLUSTER_COUNT);

    let mut order: Vec<usize> = (0..centroids.len()).collect();
    order.sort_by(|a, b| centroids[*a][0].total_cmp(&centroids[*b][0]));

    let clusters = order
        .iter()
        .enumerate()
        .map(|(rank, &cluster)| {
            let members: Vec<&Sample> = samples
                .iter()
                .zip(&assignment)
                .filter(|(_, a)| **a == cluster)
                .map(|(s, _)| s)
                .collect();
            let count = members.len();
            let average_year = if count == 0 {
                0.0
            } else {
                members.iter().map(|s| s.year).sum::<f64>() / count as f64
            };
            let brands: BTreeSet<String> = members.iter().map(|s| s.brand.clone()).collect();

            ClusterSummary {
                cluster_id: rank + 1,
                count,
                average_year: round2(average_year),
                brands: brands.into_iter().collect(),
            }
        })
        .collect();

    let total_distance: f64 = points
        .iter()
        .zip(&assignment)
        .map(|(p, a)| distance(p, &centroids[*a]))
        .sum();

    Ok(PatternReport {
        clusters,
        total_motorcycles: samples.len(),
        average_distance: round2(total_distance / points.len() as f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separated_groups() {
        let samples = vec![
            Sample::new(2021, "Honda", 3.0),
            Sample::new(1990, "BMW", 9.0),
            Sample::new(2005, "Yamaha", 5.0),
            Sample::new(2020, "Honda", 2.0),
            Sample::new(1991, "BMW", 8.0),
            Sample::new(2006, "Suzuki", 6.0),
        ];
        let report = analyze_patterns(&samples).unwrap();

        assert_eq!(report.total_motorcycles, 6);
        let summary: Vec<(usize, usize, f64)> = report
            .clusters
            .iter()
            .map(|c| (c.cluster_id, c.count, c.average_year))
            .collect();
        assert_eq!(summary, vec![(1, 2, 1990.5), (2, 2, 2005.5), (3, 2, 2020.5)]);
        assert_eq!(report.clusters[0].brands, vec!["BMW".to_string()]);
        assert_eq!(
            report.clusters[1].brands,
            vec!["SUZUKI".to_string(), "YAMAHA".to_string()]
        );
        assert!(report.average_distance > 0.0 && report.average_distance < 1.0);
    }

    #[test]
    fn test_is_deterministic() {
        let samples: Vec<Sample> = (0..12)
            .map(|i| {
                let brand = ["Honda", "BMW", "Kawasaki"][i as usize % 3];
                Sample::new(1995 + (i * 7) % 25, brand, 1.0)
            })
            .collect();
        assert_eq!(analyze_patterns(&samples), analyze_patterns(&samples));
    }

    #[test]
    fn test_too_few_samples() {
        let samples = vec![Sample::new(2020, "Honda", 1.0), Sample::new(2021, "Honda", 1.0)];
        assert_eq!(
            analyze_patterns(&samples).unwrap_err(),
            PredictionError::InsufficientData {
                needed: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_identical_samples() {
        let samples = vec![Sample::new(2020, "Honda", 1.0); 4];
        let report = analyze_patterns(&samples).unwrap();
        assert_eq!(report.clusters.iter().map(|c| c.count).sum::<usize>(), 4);
        assert_eq!(report.average_distance, 0.0);
    }
}
