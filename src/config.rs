//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (TDPLAN_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [search]
//! memoize = true
//! timeout_ms = 5000
//! max_expansions = 100000
//! default_form = "cnf"
//!
//! [cost]
//! model = "steps"
//! map_weight = 0.25
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! TDPLAN_SEARCH__MAX_PREDICATES=12
//! TDPLAN_COST__MODEL=constant
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::boolean_exp::NormalForm;
use crate::cost::CostModelKind;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Plan search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Reuse sub-plans reached through different predicate orders
    #[serde(default)]
    pub memoize: bool,

    /// Wall-clock budget per search in milliseconds. 0 = no timeout.
    #[serde(default)]
    pub timeout_ms: u64,

    /// Maximum distinct predicates per expression. 0 = no limit.
    #[serde(default)]
    pub max_predicates: usize,

    /// Sub-problems one search may expand. 0 = no limit.
    #[serde(default)]
    pub max_expansions: usize,

    /// Normal form assumed for textual queries
    #[serde(default)]
    pub default_form: NormalForm,
}

/// Cost model selection and weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    /// Which built-in model to use (constant, steps)
    #[serde(default)]
    pub model: CostModelKind,

    /// Cost of every plan under the constant model
    #[serde(default = "default_constant")]
    pub constant: f64,

    /// Per select step under the steps model
    #[serde(default = "default_select_weight")]
    pub select_weight: f64,

    /// Per materialized column under the steps model
    #[serde(default = "default_map_weight")]
    pub map_weight: f64,

    /// Cost of an absent sub-plan under the steps model
    #[serde(default)]
    pub empty_plan: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_constant() -> f64 {
    1.0
}
fn default_select_weight() -> f64 {
    1.0
}
fn default_map_weight() -> f64 {
    0.5
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. config.toml (base configuration)
    /// 2. config.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (TDPLAN_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("TDPLAN_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("TDPLAN_").split("__"))
            .extract()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            memoize: false,
            timeout_ms: 0,
            max_predicates: 0,
            max_expansions: 0,
            default_form: NormalForm::Dnf,
        }
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        CostConfig {
            model: CostModelKind::Constant,
            constant: default_constant(),
            select_weight: default_select_weight(),
            map_weight: default_map_weight(),
            empty_plan: 0.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
