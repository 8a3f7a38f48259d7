use crate::config::Config;
use crate::generator::generate_population;
use crate::graph::{GraphBuild, GraphBuilder};
use crate::partition::{Partition, Strategy, select_partitioner};
use crate::population::Population;
use crate::rng::RandomContext;
use crate::simulation::Simulator;
use anyhow::{Context, Result};
use serde::Serialize;

/// Everything a run produces, handed to reporting.
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub population: Population,
    pub graph: GraphBuild,
    pub partition: Partition,
    pub requested_strategy: Strategy,
}

/// Runs generation, score evolution, graph building and partitioning in
/// sequence.
pub struct Pipeline {
    cfg: Config,
}

impl Pipeline {
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;
        Ok(Self { cfg })
    }

    pub fn run(&self) -> Result<Outcome> {
        let cfg = &self.cfg;
        let ctx = RandomContext::new(cfg.seed);

        let mut population = generate_population(cfg.population.n_persons, &ctx)
            .context("failed to generate population")?;

        let simulator =
            Simulator::new(cfg.behavior.clone()).context("failed to construct simulator")?;
        simulator
            .run(&mut population, &ctx)
            .context("failed to evolve scores")?;

        let final_scores = population
            .trajectories()
            .context("trajectories are missing after simulation")?
            .final_scores();

        let graph_cfg = &cfg.graph;
        let builder = GraphBuilder::new(graph_cfg.n_edges, graph_cfg.homophily, graph_cfg.max_stall)
            .context("failed to construct graph builder")?;
        let graph = builder
            .build(&population.ids(), &final_scores, &population.classes(), &ctx)
            .context("failed to build social graph")?;

        let partitioner =
            select_partitioner(&cfg.partition).context("failed to select partitioner")?;
        let partition = Partition::compute(partitioner.as_ref(), &graph.graph, &ctx)
            .context("failed to partition social graph")?;

        Ok(Outcome {
            population,
            graph,
            partition,
            requested_strategy: cfg.partition.strategy,
        })
    }
}
