use crate::partition::{Strategy, modularity};
use crate::pipeline::Outcome;
use crate::population::{SocioClass, Tier};
use crate::stats::{Accumulator, Description, describe};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Serialize)]
pub struct TierCount {
    pub tier: Tier,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ClassSummary {
    pub class: SocioClass,
    pub size: usize,
    pub mean_age: f64,
    pub mean_final_score: f64,
    /// Mean of final minus initial score.
    pub mean_drift: f64,
    pub mean_degree: f64,
    /// Number of communities with at least one member of the class.
    pub n_communities: usize,
}

#[derive(Debug, Serialize)]
pub struct CommunitySummary {
    pub id: usize,
    pub size: usize,
    pub mean_score: f64,
    pub std_dev_score: f64,
}

/// Condensed view of a run, logged at the end of `run`.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub n_persons: usize,
    pub n_days: usize,

    pub initial_scores: Description,
    pub final_scores: Description,
    /// Mean score on the last day minus mean score on day 0.
    pub mean_drift: f64,
    pub final_tiers: Vec<TierCount>,
    pub classes: Vec<ClassSummary>,

    pub n_edges: usize,
    pub saturated: bool,
    pub attempts: u64,

    pub requested_strategy: Strategy,
    pub strategy: Strategy,
    pub modularity: f64,
    pub communities: Vec<CommunitySummary>,
}

impl Summary {
    pub fn new(outcome: &Outcome) -> Self {
        let population = &outcome.population;
        let graph = &outcome.graph.graph;
        let partition = &outcome.partition;

        let initial_scores = population.initial_scores();
        let (n_days, final_scores, mean_drift) = match population.trajectories() {
            Some(traj) => {
                let daily_mean = traj.daily_mean();
                let drift = daily_mean[daily_mean.len() - 1] - daily_mean[0];
                (traj.n_days(), traj.final_scores(), drift)
            }
            None => (1, initial_scores.clone(), 0.0),
        };

        let final_tiers = Tier::ALL
            .iter()
            .map(|&tier| TierCount {
                tier,
                count: final_scores
                    .iter()
                    .filter(|&&score| Tier::of_score(score) == tier)
                    .count(),
            })
            .collect();

        let classes = SocioClass::ALL
            .iter()
            .map(|&class| {
                let mut age_acc = Accumulator::new();
                let mut score_acc = Accumulator::new();
                let mut drift_acc = Accumulator::new();
                let mut degree_acc = Accumulator::new();
                let mut communities = BTreeSet::new();

                let members = population
                    .persons()
                    .iter()
                    .enumerate()
                    .filter(|(_, per)| per.class() == class);
                for (i_per, per) in members {
                    age_acc.add(per.age() as f64);
                    score_acc.add(final_scores[i_per]);
                    if let Some(traj) = population.trajectories() {
                        let traj = traj.trajectory(i_per);
                        drift_acc.add(traj[traj.len() - 1] - traj[0]);
                    }
                    if let Some(node) = graph.node(per.id()) {
                        degree_acc.add(graph.degree(node) as f64);
                    }
                    communities.extend(partition.community_of(per.id()));
                }

                let score_report = score_acc.report();
                ClassSummary {
                    class,
                    size: score_report.n_vals,
                    mean_age: age_acc.report().mean,
                    mean_final_score: score_report.mean,
                    mean_drift: drift_acc.report().mean,
                    mean_degree: degree_acc.report().mean,
                    n_communities: communities.len(),
                }
            })
            .collect();

        let communities = partition
            .communities()
            .iter()
            .map(|c| CommunitySummary {
                id: c.id,
                size: c.size(),
                mean_score: c.mean_score,
                std_dev_score: c.std_dev_score,
            })
            .collect();

        Self {
            n_persons: population.len(),
            n_days,
            initial_scores: describe(&initial_scores),
            final_scores: describe(&final_scores),
            mean_drift,
            final_tiers,
            classes,
            n_edges: graph.n_edges(),
            saturated: outcome.graph.saturated,
            attempts: outcome.graph.attempts,
            requested_strategy: outcome.requested_strategy,
            strategy: partition.strategy(),
            modularity: modularity(graph, partition.labels()),
            communities,
        }
    }
}
