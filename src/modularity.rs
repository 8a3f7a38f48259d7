//! Louvain modularity optimization.
//!
//! Each level greedily moves nodes between communities (local moving) in a
//! seeded random order, then collapses every community into a single node.
//! Levels repeat until no node moves.

use crate::error::SimError;
use crate::graph::SocialGraph;
use crate::partition::{Partitioner, Strategy};
use crate::rng::{PARTITION_STREAM, RandomContext};
use crate::utils::check_num;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha12Rng;
use std::collections::BTreeMap;

/// Smallest modularity gain that justifies a move.
const MIN_GAIN: f64 = 1e-12;

pub struct Louvain {
    resolution: f64,
    max_levels: usize,
    max_passes: usize,
}

impl Default for Louvain {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_levels: 32,
            max_passes: 100,
        }
    }
}

impl Louvain {
    /// Louvain with the given resolution; values above 1 favor smaller
    /// communities.
    pub fn new(resolution: f64) -> Result<Self, SimError> {
        check_num("resolution", resolution, 0.0..)?;
        Ok(Self {
            resolution,
            ..Self::default()
        })
    }
}

impl Partitioner for Louvain {
    fn strategy(&self) -> Strategy {
        Strategy::Modularity
    }

    fn assign(&self, graph: &SocialGraph, ctx: &RandomContext) -> Result<Vec<usize>, SimError> {
        let mut rng = ctx.stream(PARTITION_STREAM);

        let mut level = Level::from_graph(graph);
        let mut labels: Vec<usize> = (0..graph.n_nodes()).collect();

        for i_level in 0..self.max_levels {
            let (mut comm, moved) = level.local_moving(&mut rng, self.resolution, self.max_passes);
            if !moved {
                break;
            }

            let n_comm = renumber(&mut comm);
            labels.iter_mut().for_each(|label| *label = comm[*label]);
            log::debug!("level {i_level}: {n_comm} communities");

            if n_comm == level.n_nodes() {
                break;
            }
            level = level.aggregate(&comm, n_comm);
        }

        Ok(labels)
    }
}

/// Weighted graph of one aggregation level.
///
/// `adj[i]` lists `(j, a_ij)`; the diagonal entry `a_ii` counts the edges
/// inside the collapsed node twice.
struct Level {
    adj: Vec<Vec<(usize, f64)>>,
}

impl Level {
    fn from_graph(graph: &SocialGraph) -> Self {
        let adj = (0..graph.n_nodes())
            .map(|node| graph.neighbors(node).iter().map(|&j| (j, 1.0)).collect())
            .collect();
        Self { adj }
    }

    fn n_nodes(&self) -> usize {
        self.adj.len()
    }

    fn degrees(&self) -> Vec<f64> {
        self.adj
            .iter()
            .map(|row| row.iter().map(|&(_, w)| w).sum())
            .collect()
    }

    /// Community of each node after greedy moves, and whether any node moved.
    fn local_moving(
        &self,
        rng: &mut ChaCha12Rng,
        resolution: f64,
        max_passes: usize,
    ) -> (Vec<usize>, bool) {
        let n_nodes = self.n_nodes();
        let mut comm: Vec<usize> = (0..n_nodes).collect();

        let deg = self.degrees();
        let deg_sum: f64 = deg.iter().sum();
        if deg_sum == 0.0 {
            return (comm, false);
        }
        let mut tot = deg.clone();

        let mut order: Vec<usize> = (0..n_nodes).collect();
        order.shuffle(rng);

        let mut neigh_w = vec![0.0; n_nodes];
        let mut neigh_comm = Vec::new();
        let mut moved = false;

        for _ in 0..max_passes {
            let mut n_moves = 0;

            for &i in &order {
                for &(j, w) in &self.adj[i] {
                    if j == i {
                        continue;
                    }
                    let c = comm[j];
                    if neigh_w[c] == 0.0 {
                        neigh_comm.push(c);
                    }
                    neigh_w[c] += w;
                }

                let c_old = comm[i];
                tot[c_old] -= deg[i];

                let gain = |c: usize| neigh_w[c] - resolution * tot[c] * deg[i] / deg_sum;
                let mut c_best = c_old;
                let mut gain_best = gain(c_old);
                for &c in &neigh_comm {
                    let gain_c = gain(c);
                    if gain_c > gain_best + MIN_GAIN {
                        c_best = c;
                        gain_best = gain_c;
                    }
                }

                tot[c_best] += deg[i];
                if c_best != c_old {
                    comm[i] = c_best;
                    n_moves += 1;
                }

                for &c in &neigh_comm {
                    neigh_w[c] = 0.0;
                }
                neigh_comm.clear();
            }

            if n_moves == 0 {
                break;
            }
            moved = true;
        }

        (comm, moved)
    }

    /// Collapse each community into a single node.
    fn aggregate(&self, comm: &[usize], n_comm: usize) -> Self {
        let mut rows: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n_comm];
        for (i, row) in self.adj.iter().enumerate() {
            for &(j, w) in row {
                *rows[comm[i]].entry(comm[j]).or_insert(0.0) += w;
            }
        }
        let adj = rows
            .into_iter()
            .map(|row| row.into_iter().collect())
            .collect();
        Self { adj }
    }
}

/// Relabel communities as `0..n` in order of first appearance, returning `n`.
fn renumber(comm: &mut [usize]) -> usize {
    let mut new_ids = vec![usize::MAX; comm.len()];
    let mut n_comm = 0;
    for c in comm.iter_mut() {
        if new_ids[*c] == usize::MAX {
            new_ids[*c] = n_comm;
            n_comm += 1;
        }
        *c = new_ids[*c];
    }
    n_comm
}
