//! Community partitioning of the social graph.
//!
//! Two strategies share the [`Partitioner`] interface:
//! - [`Strategy::Modularity`]: Louvain modularity optimization, with an
//!   emergent number of communities (cargo feature `modularity`);
//! - [`Strategy::Clustering`]: k-means over a spectral projection of the
//!   adjacency matrix, with a fixed number of clusters.
//!
//! The strategy that produced a [`Partition`] is recorded in it.

use crate::clustering::Clustering;
use crate::config::PartitionConfig;
use crate::error::SimError;
use crate::graph::SocialGraph;
use crate::rng::RandomContext;
use crate::stats::Accumulator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Modularity,
    Clustering,
}

pub trait Partitioner {
    fn strategy(&self) -> Strategy;

    /// Community label of each node. Labels need not be contiguous.
    fn assign(&self, graph: &SocialGraph, ctx: &RandomContext) -> Result<Vec<usize>, SimError>;
}

/// Partitioner implementing `strategy`, if it is available in this build.
pub fn partitioner(
    strategy: Strategy,
    cfg: &PartitionConfig,
) -> Result<Box<dyn Partitioner>, SimError> {
    match strategy {
        #[cfg(feature = "modularity")]
        Strategy::Modularity => Ok(Box::new(crate::modularity::Louvain::new(cfg.resolution)?)),
        #[cfg(not(feature = "modularity"))]
        Strategy::Modularity => Err(SimError::CapabilityUnavailable(
            "modularity partitioning is not compiled in",
        )),
        Strategy::Clustering => Ok(Box::new(Clustering::new(cfg.n_clusters)?)),
    }
}

/// Partitioner for the configured strategy, falling back to clustering when
/// it is unavailable.
pub fn select_partitioner(cfg: &PartitionConfig) -> Result<Box<dyn Partitioner>, SimError> {
    match partitioner(cfg.strategy, cfg) {
        Err(SimError::CapabilityUnavailable(reason)) => {
            log::warn!(
                "{reason}, falling back to clustering with {} clusters",
                cfg.n_clusters
            );
            partitioner(Strategy::Clustering, cfg)
        }
        result => result,
    }
}

/// Newman modularity of `labels` on `graph`, 0 for a graph without edges.
pub fn modularity(graph: &SocialGraph, labels: &[usize]) -> f64 {
    let n_edges = graph.n_edges() as f64;
    if n_edges == 0.0 {
        return 0.0;
    }

    let n_labels = labels.iter().max().map_or(0, |&max| max + 1);
    let mut internal = vec![0.0; n_labels];
    let mut deg_sum = vec![0.0; n_labels];
    for &(i, j) in graph.edges() {
        if labels[i] == labels[j] {
            internal[labels[i]] += 1.0;
        }
        deg_sum[labels[i]] += 1.0;
        deg_sum[labels[j]] += 1.0;
    }

    internal
        .iter()
        .zip(&deg_sum)
        .map(|(&l_c, &d_c)| l_c / n_edges - (d_c / (2.0 * n_edges)).powi(2))
        .sum()
}

/// Community with score statistics of its members.
#[derive(Debug, Clone, Serialize)]
pub struct Community {
    pub id: usize,
    /// Person ids of the members, ascending.
    pub members: Vec<usize>,
    pub mean_score: f64,
    /// Sample standard deviation, `NaN` for a single member.
    pub std_dev_score: f64,
}

impl Community {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Assignment of every node to exactly one community.
///
/// Community ids are `0..n_communities`, ordered by descending size.
#[derive(Debug, Clone, Serialize)]
pub struct Partition {
    strategy: Strategy,
    #[serde(skip)]
    labels: Vec<usize>,
    /// Person id to community id.
    assignment: BTreeMap<usize, usize>,
    communities: Vec<Community>,
}

impl Partition {
    /// Run `partitioner` on `graph` and compute community statistics.
    pub fn compute(
        partitioner: &dyn Partitioner,
        graph: &SocialGraph,
        ctx: &RandomContext,
    ) -> Result<Self, SimError> {
        if graph.n_nodes() == 0 {
            return Err(SimError::InvalidArgument("graph has no nodes".into()));
        }

        let labels = partitioner.assign(graph, ctx)?;
        if labels.len() != graph.n_nodes() {
            return Err(SimError::InvalidArgument(format!(
                "expected {} labels, but got {}",
                graph.n_nodes(),
                labels.len()
            )));
        }

        let strategy = partitioner.strategy();
        let partition = Self::from_labels(strategy, &labels, graph.ids(), graph.scores());
        log::info!(
            "{:?} partition found {} communities",
            partition.strategy,
            partition.n_communities()
        );

        Ok(partition)
    }

    fn from_labels(
        strategy: Strategy,
        raw_labels: &[usize],
        ids: &[usize],
        scores: &[f64],
    ) -> Self {
        let n_raw = raw_labels.iter().max().map_or(0, |&max| max + 1);
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); n_raw];
        for (node, &label) in raw_labels.iter().enumerate() {
            groups[label].push(node);
        }
        groups.retain(|nodes| !nodes.is_empty());
        for nodes in groups.iter_mut() {
            nodes.sort_by_key(|&node| ids[node]);
        }

        // Largest first, ties broken by lowest member id.
        groups.sort_by(|a, b| b.len().cmp(&a.len()).then(ids[a[0]].cmp(&ids[b[0]])));

        let mut labels = vec![0; raw_labels.len()];
        let mut assignment = BTreeMap::new();
        let mut communities = Vec::with_capacity(groups.len());
        for (id, nodes) in groups.into_iter().enumerate() {
            let mut acc = Accumulator::new();
            for &node in &nodes {
                labels[node] = id;
                assignment.insert(ids[node], id);
                acc.add(scores[node]);
            }
            let report = acc.report();
            communities.push(Community {
                id,
                members: nodes.iter().map(|&node| ids[node]).collect(),
                mean_score: report.mean,
                std_dev_score: report.std_dev,
            });
        }

        Self {
            strategy,
            labels,
            assignment,
            communities,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Community of the person with id `id`.
    pub fn community_of(&self, id: usize) -> Option<usize> {
        self.assignment.get(&id).copied()
    }

    /// Community of each node, by node index.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn communities(&self) -> &[Community] {
        &self.communities
    }

    pub fn n_communities(&self) -> usize {
        self.communities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<usize>);

    fn config(strategy: Strategy) -> PartitionConfig {
        PartitionConfig {
            strategy,
            n_clusters: 3,
            ..PartitionConfig::default()
        }
    }

    impl Partitioner for Fixed {
        fn strategy(&self) -> Strategy {
            Strategy::Clustering
        }

        fn assign(&self, _: &SocialGraph, _: &RandomContext) -> Result<Vec<usize>, SimError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn communities_are_relabeled_by_size() {
        let ids = [1, 2, 3, 4, 5, 6];
        let scores = [1.0, 2.0, 3.0, 4.0, 5.0, 3.0];
        let raw_labels = [7, 2, 2, 7, 2, 9];
        let partition = Partition::from_labels(Strategy::Clustering, &raw_labels, &ids, &scores);

        assert_eq!(partition.labels(), &[1, 0, 0, 1, 0, 2]);
        let sizes: Vec<_> = partition
            .communities()
            .iter()
            .map(Community::size)
            .collect();
        assert_eq!(sizes, vec![3, 2, 1]);

        let largest = &partition.communities()[0];
        assert_eq!(largest.members, vec![2, 3, 5]);
        assert!((largest.mean_score - 10.0 / 3.0).abs() < 1e-12);
        assert!((largest.std_dev_score - (7.0f64 / 3.0).sqrt()).abs() < 1e-12);

        assert!(partition.communities()[2].std_dev_score.is_nan());
    }

    #[test]
    fn equal_sizes_ordered_by_lowest_member() {
        let raw_labels = [5, 3, 5, 3];
        let scores = [1.0; 4];
        let partition =
            Partition::from_labels(Strategy::Modularity, &raw_labels, &[1, 2, 3, 4], &scores);
        assert_eq!(partition.labels(), &[0, 1, 0, 1]);
        assert_eq!(partition.strategy(), Strategy::Modularity);

        // Node order differs from id order: the lowest id decides.
        let partition =
            Partition::from_labels(Strategy::Modularity, &raw_labels, &[9, 2, 8, 7], &scores);
        assert_eq!(partition.labels(), &[1, 0, 1, 0]);
        assert_eq!(partition.communities()[0].members, vec![2, 7]);
    }

    #[test]
    fn assignment_is_keyed_by_person_id() {
        let graph = SocialGraph::ring_of_cliques(2, 3);
        let fixed = Fixed(vec![4, 4, 4, 1, 1, 1]);
        let partition = Partition::compute(&fixed, &graph, &RandomContext::new(1)).unwrap();

        for node in 0..graph.n_nodes() {
            let id = graph.id(node);
            assert_eq!(partition.community_of(id), Some(partition.labels()[node]));
        }
        assert_eq!(partition.community_of(1), Some(0));
        assert_eq!(partition.community_of(4), Some(1));
        assert_eq!(partition.community_of(0), None);
        assert_eq!(partition.community_of(7), None);
        assert_eq!(partition.communities()[1].members, vec![4, 5, 6]);
    }

    #[test]
    fn wrong_label_count_is_rejected() {
        let graph = SocialGraph::from_edges(3, &[]);
        let result = Partition::compute(&Fixed(vec![0, 0]), &graph, &RandomContext::new(1));
        assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    }

    #[test]
    fn empty_graph_is_rejected() {
        let graph = SocialGraph::from_edges(0, &[]);
        let result = Partition::compute(&Fixed(Vec::new()), &graph, &RandomContext::new(1));
        assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    }

    #[test]
    fn modularity_of_known_partitions() {
        let graph = SocialGraph::ring_of_cliques(2, 3);
        // Two triangles, two bridges: m = 8, L_c = 3, d_c = 8.
        let split = modularity(&graph, &[0, 0, 0, 1, 1, 1]);
        assert!((split - 2.0 * (3.0 / 8.0 - 0.25)).abs() < 1e-12);
        assert_eq!(modularity(&graph, &[0; 6]), 0.0);

        let empty = SocialGraph::from_edges(2, &[]);
        assert_eq!(modularity(&empty, &[0, 1]), 0.0);
    }

    #[test]
    fn clustering_is_always_available() {
        let cfg = config(Strategy::Clustering);
        let part = select_partitioner(&cfg).unwrap();
        assert_eq!(part.strategy(), Strategy::Clustering);

        let cfg = PartitionConfig {
            n_clusters: 0,
            ..cfg
        };
        assert!(partitioner(Strategy::Clustering, &cfg).is_err());
    }

    #[cfg(feature = "modularity")]
    #[test]
    fn modularity_is_selected_when_compiled_in() {
        let part = select_partitioner(&config(Strategy::Modularity)).unwrap();
        assert_eq!(part.strategy(), Strategy::Modularity);

        let cfg = PartitionConfig {
            resolution: -1.0,
            ..config(Strategy::Modularity)
        };
        assert!(select_partitioner(&cfg).is_err());
    }

    #[cfg(not(feature = "modularity"))]
    #[test]
    fn modularity_falls_back_to_clustering() {
        let cfg = config(Strategy::Modularity);
        assert!(matches!(
            partitioner(Strategy::Modularity, &cfg),
            Err(SimError::CapabilityUnavailable(_))
        ));
        let part = select_partitioner(&cfg).unwrap();
        assert_eq!(part.strategy(), Strategy::Clustering);
    }
}
