use crate::error::SimError;
use crate::partition::Strategy;
use crate::utils::{check_finite, check_num};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Run configuration.
///
/// Loaded from a TOML file and validated before use. Every field has a
/// default, so missing sections fall back to the reference parameters.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Seed of every random stream of the run.
    pub seed: u64,

    pub population: PopulationConfig,
    pub behavior: BehaviorParams,
    pub graph: GraphConfig,
    pub partition: PartitionConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopulationConfig {
    /// Number of persons.
    pub n_persons: usize,
}

/// Parameters of the daily score update.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorParams {
    pub w_conformity: f64,
    /// May be negative: authentic people lose points.
    pub w_authenticity: f64,
    pub w_class: f64,
    pub w_education: f64,
    pub w_technology: f64,

    /// Standard deviation of the daily noise.
    pub volatility: f64,
    /// Strength of the drift proportional to the distance from the midpoint.
    pub momentum: f64,
    /// Strength of the push away from the midpoint.
    pub polarization: f64,

    /// Number of simulated days, including day 0.
    pub n_days: usize,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Target number of edges.
    pub n_edges: usize,
    /// Homophily coefficient in `[0, 1]`.
    pub homophily: f64,
    /// Consecutive attempts without a new edge before giving up.
    /// Defaults to `n_persons * n_edges`.
    pub max_stall: Option<u64>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartitionConfig {
    pub strategy: Strategy,
    /// Number of clusters of the clustering strategy.
    pub n_clusters: usize,
    /// Resolution of the modularity strategy.
    pub resolution: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 42,
            population: PopulationConfig::default(),
            behavior: BehaviorParams::default(),
            graph: GraphConfig::default(),
            partition: PartitionConfig::default(),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self { n_persons: 1000 }
    }
}

impl Default for BehaviorParams {
    fn default() -> Self {
        Self {
            w_conformity: 0.001,
            w_authenticity: -0.001,
            w_class: 0.002,
            w_education: 0.002,
            w_technology: 0.001,
            volatility: 0.02,
            momentum: 0.05,
            polarization: 0.0001,
            n_days: 180,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            n_edges: 2000,
            homophily: 0.7,
            max_stall: None,
        }
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Modularity,
            n_clusters: 5,
            resolution: 1.0,
        }
    }
}

impl BehaviorParams {
    pub fn validate(&self) -> Result<(), SimError> {
        check_finite("conformity weight", self.w_conformity)?;
        check_finite("authenticity weight", self.w_authenticity)?;
        check_finite("class weight", self.w_class)?;
        check_finite("education weight", self.w_education)?;
        check_finite("technology weight", self.w_technology)?;
        check_finite("volatility", self.volatility)?;
        check_num("volatility", self.volatility, 0.0..)?;
        check_finite("momentum", self.momentum)?;
        check_finite("polarization", self.polarization)?;
        check_num("number of days", self.n_days, 1..)?;
        Ok(())
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_num("number of persons", self.population.n_persons, 2..=1_000_000)
            .context("invalid population")?;

        self.behavior
            .validate()
            .context("invalid behavior parameters")?;
        check_num("number of days", self.behavior.n_days, 1..=100_000)
            .context("invalid behavior parameters")?;

        check_num("homophily", self.graph.homophily, 0.0..=1.0).context("invalid graph")?;
        if let Some(max_stall) = self.graph.max_stall {
            check_num("maximum stall", max_stall, 1..).context("invalid graph")?;
        }

        check_num("number of clusters", self.partition.n_clusters, 1..=1000)
            .context("invalid partition")?;
        check_finite("resolution", self.partition.resolution).context("invalid partition")?;
        check_num("resolution", self.partition.resolution, 0.0..).context("invalid partition")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            "seed = 7\n\
             [graph]\n\
             n_edges = 10\n\
             homophily = 1.0\n\
             [partition]\n\
             strategy = \"clustering\"\n",
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.graph.n_edges, 10);
        assert_eq!(config.graph.homophily, 1.0);
        assert_eq!(config.graph.max_stall, None);
        assert_eq!(config.partition.strategy, Strategy::Clustering);
        assert_eq!(config.partition.n_clusters, 5);
        assert_eq!(config.partition.resolution, 1.0);
        assert_eq!(config.behavior, BehaviorParams::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(toml::from_str::<Config>("[graph]\nn_edge = 3\n").is_err());
    }

    #[test]
    fn negative_edge_count_is_rejected() {
        assert!(toml::from_str::<Config>("[graph]\nn_edges = -3\n").is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = Config::default();
        config.graph.homophily = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.behavior.volatility = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.behavior.n_days = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.population.n_persons = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.partition.n_clusters = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.partition.resolution = -0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.partition.resolution = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn behavior_errors_are_invalid_arguments() {
        let params = BehaviorParams {
            momentum: f64::NAN,
            ..BehaviorParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(SimError::InvalidArgument(_))
        ));
    }
}
