//! Homophily social graph.

use crate::error::SimError;
use crate::population::{MAX_SCORE, MIN_SCORE, SocioClass};
use crate::rng::{GRAPH_STREAM, RandomContext};
use crate::utils::check_num;
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Undirected simple graph over the persons of a run.
///
/// Nodes are stored at indices `0..n_nodes`, in population order, and each
/// carries the id, final score and class of its person. Index-based methods
/// serve the partitioners; [`SocialGraph::id`], [`SocialGraph::node`] and
/// [`SocialGraph::id_edges`] expose the graph keyed by person id, which is
/// also how it serializes.
#[derive(Debug, Clone, Serialize)]
#[serde(into = "GraphRecord")]
pub struct SocialGraph {
    ids: Vec<usize>,
    index: HashMap<usize, usize>,
    scores: Vec<f64>,
    classes: Vec<SocioClass>,
    adj: Vec<Vec<usize>>,
    edges: Vec<(usize, usize)>,
    edge_set: HashSet<(usize, usize)>,
}

impl SocialGraph {
    pub(crate) fn new(ids: Vec<usize>, scores: Vec<f64>, classes: Vec<SocioClass>) -> Self {
        let n_nodes = scores.len();
        let index = ids.iter().enumerate().map(|(node, &id)| (id, node)).collect();
        Self {
            ids,
            index,
            scores,
            classes,
            adj: vec![Vec::new(); n_nodes],
            edges: Vec::new(),
            edge_set: HashSet::new(),
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.scores.len()
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of unordered node pairs.
    pub fn max_edges(&self) -> usize {
        let n_nodes = self.n_nodes();
        n_nodes * n_nodes.saturating_sub(1) / 2
    }

    /// Person id of `node`.
    pub fn id(&self, node: usize) -> usize {
        self.ids[node]
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Node holding the person with id `id`.
    pub fn node(&self, id: usize) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn score(&self, node: usize) -> f64 {
        self.scores[node]
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn class(&self, node: usize) -> SocioClass {
        self.classes[node]
    }

    /// Neighbors of `node`, in insertion order.
    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.adj[node]
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adj[node].len()
    }

    /// Edges as `(i, j)` with `i < j`, in insertion order.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Edges as pairs of person ids, in insertion order.
    pub fn id_edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges
            .iter()
            .map(|&(i, j)| (self.ids[i], self.ids[j]))
    }

    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        self.edge_set.contains(&(i.min(j), i.max(j)))
    }

    fn add_edge(&mut self, i: usize, j: usize) -> bool {
        let key = (i.min(j), i.max(j));
        if i == j || !self.edge_set.insert(key) {
            return false;
        }
        self.edges.push(key);
        self.adj[i].push(j);
        self.adj[j].push(i);
        true
    }

    /// Graph on `n_nodes` nodes with ids `1..=n_nodes`, score 3 and the given
    /// edges.
    #[cfg(test)]
    pub(crate) fn from_edges(n_nodes: usize, edges: &[(usize, usize)]) -> Self {
        let mut graph = Self::new(
            (1..=n_nodes).collect(),
            vec![3.0; n_nodes],
            vec![SocioClass::Medium; n_nodes],
        );
        for &(i, j) in edges {
            graph.add_edge(i, j);
        }
        graph
    }

    /// Ring of `n_cliques` complete subgraphs of `size` nodes, clique `c`
    /// holding nodes `c * size..(c + 1) * size` with score `1 + c`.
    #[cfg(test)]
    pub(crate) fn ring_of_cliques(n_cliques: usize, size: usize) -> Self {
        let n_nodes = n_cliques * size;
        let scores = (0..n_nodes).map(|node| (1 + node / size) as f64).collect();
        let mut graph = Self::new(
            (1..=n_nodes).collect(),
            scores,
            vec![SocioClass::Medium; n_nodes],
        );
        for c in 0..n_cliques {
            let base = c * size;
            for i in base..base + size {
                for j in i + 1..base + size {
                    graph.add_edge(i, j);
                }
            }
            if n_cliques > 1 {
                let next = (c + 1) % n_cliques * size;
                graph.add_edge(base, next + 1);
            }
        }
        graph
    }
}

#[derive(Serialize)]
struct NodeRecord {
    id: usize,
    score: f64,
    class: SocioClass,
}

/// Serialized form of a [`SocialGraph`], keyed by person id.
#[derive(Serialize)]
struct GraphRecord {
    nodes: Vec<NodeRecord>,
    edges: Vec<(usize, usize)>,
}

impl From<SocialGraph> for GraphRecord {
    fn from(graph: SocialGraph) -> Self {
        let nodes = (0..graph.n_nodes())
            .map(|node| NodeRecord {
                id: graph.id(node),
                score: graph.score(node),
                class: graph.class(node),
            })
            .collect();
        let edges = graph.id_edges().collect();
        Self { nodes, edges }
    }
}

/// Probability that two persons connect, given their scores.
///
/// Decreases linearly with the score difference, scaled by `homophily`:
/// 1 everywhere at `homophily = 0`, 0 for scores 1 and 5 at `homophily = 1`.
pub fn connection_probability(score_i: f64, score_j: f64, homophily: f64) -> f64 {
    let range = MAX_SCORE - MIN_SCORE;
    (1.0 - ((score_i - score_j).abs() / range) * homophily).max(0.0)
}

/// Result of a graph build.
#[derive(Debug, Clone, Serialize)]
pub struct GraphBuild {
    pub graph: SocialGraph,
    /// The target edge count could not be reached.
    pub saturated: bool,
    /// Number of sampled pairs.
    pub attempts: u64,
}

/// Rejection sampler of homophily edges.
pub struct GraphBuilder {
    n_edges: usize,
    homophily: f64,
    max_stall: Option<u64>,
}

impl GraphBuilder {
    pub fn new(n_edges: usize, homophily: f64, max_stall: Option<u64>) -> Result<Self, SimError> {
        check_num("homophily", homophily, 0.0..=1.0)?;
        if let Some(max_stall) = max_stall {
            check_num("maximum stall", max_stall, 1..)?;
        }
        Ok(Self {
            n_edges,
            homophily,
            max_stall,
        })
    }

    /// Sample edges until `n_edges` are accepted or progress stalls.
    ///
    /// Sampling stops with `saturated` set once `max_stall` consecutive
    /// attempts add no edge, or as soon as every pair is connected.
    /// Node `i` is the person `ids[i]`, with final score `scores[i]` and
    /// class `classes[i]`.
    pub fn build(
        &self,
        ids: &[usize],
        scores: &[f64],
        classes: &[SocioClass],
        ctx: &RandomContext,
    ) -> Result<GraphBuild, SimError> {
        let n_nodes = scores.len();
        check_num("number of nodes", n_nodes, 2..)?;
        if ids.len() != n_nodes || classes.len() != n_nodes {
            return Err(SimError::InvalidArgument(format!(
                "expected {n_nodes} ids and classes, but got {} and {}",
                ids.len(),
                classes.len()
            )));
        }

        let mut rng = ctx.stream(GRAPH_STREAM);
        let mut graph = SocialGraph::new(ids.to_vec(), scores.to_vec(), classes.to_vec());
        if graph.index.len() != n_nodes {
            return Err(SimError::InvalidArgument("person ids must be unique".into()));
        }

        let max_stall = self
            .max_stall
            .unwrap_or((n_nodes as u64).saturating_mul(self.n_edges as u64))
            .max(1);

        let mut attempts = 0;
        let mut stall = 0;
        let mut saturated = false;

        while graph.n_edges() < self.n_edges {
            if graph.n_edges() == graph.max_edges() || stall >= max_stall {
                saturated = true;
                break;
            }

            attempts += 1;
            stall += 1;

            // Distinct pair, uniformly.
            let i = rng.random_range(0..n_nodes);
            let mut j = rng.random_range(0..n_nodes - 1);
            if j >= i {
                j += 1;
            }

            if graph.has_edge(i, j) {
                continue;
            }

            let prob = connection_probability(scores[i], scores[j], self.homophily);
            if rng.random::<f64>() < prob {
                graph.add_edge(i, j);
                stall = 0;
            }
        }

        if saturated {
            log::warn!(
                "graph saturated with {} of {} edges after {attempts} attempts",
                graph.n_edges(),
                self.n_edges
            );
        } else {
            log::info!("built graph with {} edges", graph.n_edges());
        }

        Ok(GraphBuild {
            graph,
            saturated,
            attempts,
        })
    }
}
