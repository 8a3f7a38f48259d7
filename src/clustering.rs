//! Fixed-count clustering of the social graph.
//!
//! Nodes are projected onto the two leading non-trivial eigenvectors of the
//! regularized normalized adjacency matrix (subspace iteration), then grouped
//! with k-means (k-means++ seeding, Lloyd iterations).

use crate::error::SimError;
use crate::graph::SocialGraph;
use crate::partition::{Partitioner, Strategy};
use crate::rng::{PARTITION_STREAM, RandomContext};
use crate::utils::check_num;
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Distribution, weighted::WeightedIndex};

pub type Point = [f64; 2];

pub struct Clustering {
    n_clusters: usize,
    n_power_iters: usize,
    max_iters: usize,
}

impl Clustering {
    pub fn new(n_clusters: usize) -> Result<Self, SimError> {
        check_num("number of clusters", n_clusters, 1..)?;
        Ok(Self {
            n_clusters,
            n_power_iters: 200,
            max_iters: 300,
        })
    }
}

impl Partitioner for Clustering {
    fn strategy(&self) -> Strategy {
        Strategy::Clustering
    }

    fn assign(&self, graph: &SocialGraph, ctx: &RandomContext) -> Result<Vec<usize>, SimError> {
        let mut rng = ctx.stream(PARTITION_STREAM);
        let points = spectral_coordinates(graph, self.n_power_iters, &mut rng);
        let n_clusters = self.n_clusters.min(points.len());
        k_means(&points, n_clusters, self.max_iters, &mut rng)
    }
}

/// Regularization strength: the mean degree, at least 1.
fn regularization(graph: &SocialGraph) -> f64 {
    match graph.n_nodes() {
        0 => 1.0,
        n_nodes => (2.0 * graph.n_edges() as f64 / n_nodes as f64).max(1.0),
    }
}

/// Two structural coordinates per node.
///
/// The operator is `M = D_t^-1/2 (A + t/n J) D_t^-1/2` with `D_t = D + t I`,
/// `t` the mean degree and `J` the all-ones matrix. `M` has a single
/// eigenvalue 1, with eigenvector `sqrt(d + t)`, even on a disconnected graph.
/// Small components and isolated nodes stay near the origin.
pub fn spectral_coordinates(
    graph: &SocialGraph,
    n_iters: usize,
    rng: &mut ChaCha12Rng,
) -> Vec<Point> {
    let n_nodes = graph.n_nodes();
    let tau = regularization(graph);

    let inv_sqrt_deg: Vec<f64> = (0..n_nodes)
        .map(|node| 1.0 / (graph.degree(node) as f64 + tau).sqrt())
        .collect();

    let mut trivial: Vec<f64> = inv_sqrt_deg.iter().map(|s| s.recip()).collect();
    normalize(&mut trivial);

    let mut basis: [Vec<f64>; 2] =
        std::array::from_fn(|_| (0..n_nodes).map(|_| rng.random_range(-1.0..1.0)).collect());
    orthonormalize(&mut basis, &trivial);

    for _ in 0..n_iters {
        for vec in basis.iter_mut() {
            *vec = shifted_product(graph, &inv_sqrt_deg, tau, vec);
        }
        orthonormalize(&mut basis, &trivial);
    }

    (0..n_nodes)
        .map(|node| [basis[0][node], basis[1][node]])
        .collect()
}

/// `(x + M x) / 2`; `M` is similar to a stochastic matrix, so the shift makes
/// every eigenvalue non-negative.
fn shifted_product(graph: &SocialGraph, inv_sqrt_deg: &[f64], tau: f64, x: &[f64]) -> Vec<f64> {
    let scaled: Vec<f64> = x.iter().zip(inv_sqrt_deg).map(|(v, s)| v * s).collect();
    let teleport = tau / graph.n_nodes() as f64 * scaled.iter().sum::<f64>();
    (0..graph.n_nodes())
        .map(|i| {
            let sum: f64 = graph.neighbors(i).iter().map(|&j| scaled[j]).sum();
            0.5 * (x[i] + inv_sqrt_deg[i] * (sum + teleport))
        })
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Remove the component of `vec` along the unit (or zero) vector `dir`.
fn project_out(vec: &mut [f64], dir: &[f64]) {
    let coef = dot(vec, dir);
    vec.iter_mut().zip(dir).for_each(|(v, d)| *v -= coef * d);
}

fn normalize(vec: &mut [f64]) {
    let norm = dot(vec, vec).sqrt();
    if norm > 0.0 {
        vec.iter_mut().for_each(|v| *v /= norm);
    }
}

fn orthonormalize(basis: &mut [Vec<f64>; 2], trivial: &[f64]) {
    for k in 0..basis.len() {
        let (done, rest) = basis.split_at_mut(k);
        let vec = &mut rest[0];
        project_out(vec, trivial);
        for prev in done.iter() {
            project_out(vec, prev);
        }
        normalize(vec);
    }
}

fn dist_2(a: &Point, b: &Point) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

/// Index of the centroid closest to `point`, lowest index on ties.
fn nearest(centroids: &[Point], point: &Point) -> usize {
    let mut i_best = 0;
    let mut d_best = f64::INFINITY;
    for (i_cen, cen) in centroids.iter().enumerate() {
        let d = dist_2(cen, point);
        if d < d_best {
            i_best = i_cen;
            d_best = d;
        }
    }
    i_best
}

/// Cluster index of each point, with at most `n_clusters` clusters.
pub fn k_means(
    points: &[Point],
    n_clusters: usize,
    max_iters: usize,
    rng: &mut ChaCha12Rng,
) -> Result<Vec<usize>, SimError> {
    check_num("number of clusters", n_clusters, 1..=points.len())?;

    let mut centroids = seed_centroids(points, n_clusters, rng)?;
    let mut labels = vec![usize::MAX; points.len()];

    for _ in 0..max_iters {
        let mut changed = false;
        for (label, point) in labels.iter_mut().zip(points) {
            let i_cen = nearest(&centroids, point);
            if i_cen != *label {
                *label = i_cen;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![[0.0; 2]; n_clusters];
        let mut counts = vec![0usize; n_clusters];
        for (&label, point) in labels.iter().zip(points) {
            sums[label][0] += point[0];
            sums[label][1] += point[1];
            counts[label] += 1;
        }
        // Empty clusters keep their previous centroid.
        for ((cen, sum), &count) in centroids.iter_mut().zip(&sums).zip(&counts) {
            if count > 0 {
                *cen = [sum[0] / count as f64, sum[1] / count as f64];
            }
        }
    }

    Ok(labels)
}

/// k-means++ seeding.
fn seed_centroids(
    points: &[Point],
    n_clusters: usize,
    rng: &mut ChaCha12Rng,
) -> Result<Vec<Point>, SimError> {
    let mut centroids = Vec::with_capacity(n_clusters);
    centroids.push(points[rng.random_range(0..points.len())]);

    while centroids.len() < n_clusters {
        let weights: Vec<f64> = points
            .iter()
            .map(|point| dist_2(&centroids[nearest(&centroids, point)], point))
            .collect();
        let i_point = if weights.iter().all(|&w| w == 0.0) {
            rng.random_range(0..points.len())
        } else {
            WeightedIndex::new(&weights)?.sample(rng)
        };
        centroids.push(points[i_point]);
    }

    Ok(centroids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Partition;
    use std::collections::HashSet;

    #[test]
    fn rejects_zero_clusters() {
        assert!(matches!(
            Clustering::new(0),
            Err(SimError::InvalidArgument(_))
        ));
    }

    #[test]
    fn k_means_separates_blobs() {
        let points = [
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [5.0, 5.0],
            [5.1, 5.0],
            [5.0, 5.1],
        ];
        let mut rng = RandomContext::new(1).stream(PARTITION_STREAM);
        let labels = k_means(&points, 2, 100, &mut rng).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn k_means_with_identical_points() {
        let points = [[1.0, 1.0]; 4];
        let mut rng = RandomContext::new(1).stream(PARTITION_STREAM);
        let labels = k_means(&points, 3, 100, &mut rng).unwrap();
        assert_eq!(labels, vec![0; 4]);
    }

    #[test]
    fn coordinates_are_orthonormal_to_trivial_vector() {
        let graph = SocialGraph::ring_of_cliques(3, 5);
        let mut rng = RandomContext::new(2).stream(PARTITION_STREAM);
        let points = spectral_coordinates(&graph, 200, &mut rng);

        let col = |k: usize| points.iter().map(|point| point[k]).collect::<Vec<_>>();
        // 33 edges over 15 nodes.
        let tau = 66.0 / 15.0;
        assert_eq!(regularization(&graph), tau);
        let trivial: Vec<f64> = (0..graph.n_nodes())
            .map(|node| (graph.degree(node) as f64 + tau).sqrt())
            .collect();
        assert!(dot(&col(0), &trivial).abs() < 1e-9);
        assert!(dot(&col(1), &trivial).abs() < 1e-9);
        assert!(dot(&col(0), &col(1)).abs() < 1e-9);
        assert!((dot(&col(0), &col(0)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn separates_ring_of_cliques() {
        let graph = SocialGraph::ring_of_cliques(3, 5);
        let ctx = RandomContext::new(42);
        let partition = Partition::compute(&Clustering::new(3).unwrap(), &graph, &ctx).unwrap();
        assert_eq!(partition.strategy(), Strategy::Clustering);
        assert_eq!(partition.n_communities(), 3);
        for c in 0..3 {
            let labels: HashSet<_> = (c * 5..(c + 1) * 5)
                .map(|node| partition.community_of(graph.id(node)))
                .collect();
            assert_eq!(labels.len(), 1);
        }
    }

    #[test]
    fn separates_cliques_despite_small_components() {
        // Three cliques of six in a ring, one isolated pair and four
        // isolated nodes.
        let mut edges = SocialGraph::ring_of_cliques(3, 6).edges().to_vec();
        edges.push((18, 19));
        let graph = SocialGraph::from_edges(24, &edges);

        let ctx = RandomContext::new(42);
        let partition = Partition::compute(&Clustering::new(3).unwrap(), &graph, &ctx).unwrap();
        let labels = partition.labels();

        let clique_labels: Vec<usize> = (0..3)
            .map(|c| {
                let members: HashSet<_> = (c * 6..(c + 1) * 6).map(|node| labels[node]).collect();
                assert_eq!(members.len(), 1, "clique {c} was split");
                labels[c * 6]
            })
            .collect();
        let distinct: HashSet<_> = clique_labels.iter().collect();
        assert_eq!(distinct.len(), 3);

        let total: usize = partition.communities().iter().map(|c| c.size()).sum();
        assert_eq!(total, 24);
    }

    #[test]
    fn edgeless_graph_is_regularized() {
        let graph = SocialGraph::from_edges(6, &[]);
        assert_eq!(regularization(&graph), 1.0);
        let mut rng = RandomContext::new(4).stream(PARTITION_STREAM);
        let points = spectral_coordinates(&graph, 50, &mut rng);
        assert!(points.iter().flatten().all(|val| val.is_finite()));
    }

    #[test]
    fn cluster_count_is_capped_by_node_count() {
        let graph = SocialGraph::ring_of_cliques(1, 3);
        let ctx = RandomContext::new(5);
        let partition = Partition::compute(&Clustering::new(5).unwrap(), &graph, &ctx).unwrap();
        assert!(partition.n_communities() <= 3);
        let total: usize = partition.communities().iter().map(|c| c.size()).sum();
        assert_eq!(total, 3);
    }
}
