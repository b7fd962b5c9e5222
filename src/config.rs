//! Pipeline configuration.
//!
//! Uses `figment` for layered configuration: defaults -> TOML file -> environment.
//! Environment keys use the `WORLDLIFE_` prefix with `__` for nesting, e.g.
//! `WORLDLIFE_MISSING_VALUES=drop_incomplete` or `WORLDLIFE_WEIGHTS__GDP=0.25`.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the cleaner does with rows whose life expectancy is missing.
/// Imputing and deleting are alternatives; a run uses exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Fill with the dataset-wide mean.
    #[default]
    ImputeMean,
    /// Delete rows missing life expectancy or GDP.
    DropIncomplete,
    /// Only fill values bracketed by both adjacent years.
    InterpolateOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeValuePolicy {
    /// List offending rows, change nothing.
    #[default]
    Report,
    /// List offending rows and clear the negative values.
    Nullify,
}

/// Weights of the composite country score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    pub life_expectancy: f64,
    pub gdp: f64,
    pub schooling: f64,
    pub immunization: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            life_expectancy: 0.4,
            gdp: 0.3,
            schooling: 0.2,
            immunization: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub missing_values: MissingValuePolicy,
    pub negative_values: NegativeValuePolicy,
    /// Row limit of the top-n-by-year view.
    pub top_n: usize,
    pub weights: CompositeWeights,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            missing_values: MissingValuePolicy::default(),
            negative_values: NegativeValuePolicy::default(),
            top_n: 10,
            weights: CompositeWeights::default(),
        }
    }
}

impl PipelineConfig {
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed("WORLDLIFE_").split("__"))
    }

    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config = Self::figment(file).extract().map_err(Box::new)?;
        Ok(config)
    }
}
