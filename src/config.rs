//! Runtime configuration
//!
//! Layered with the `config` crate, later layers winning:
//! 1. built-in defaults
//! 2. a TOML file (`--config`, `CADENCE_CONFIG_PATH`, or `./cadence.toml` if present)
//! 3. `CADENCE_*` environment variables, `__` separating sections
//!    (e.g. `CADENCE_SCHEDULER__STEPS_PER_TICK=500`)
//! 4. explicit builder overrides

use std::path::PathBuf;

use config::{Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interpreter::engine::DEFAULT_MAX_CALL_DEPTH;

const DEFAULT_CONFIG_FILE: &str = "cadence.toml";
const CONFIG_PATH_ENV: &str = "CADENCE_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

/// How the host drives suspended scripts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Resumable steps each script may take per tick
    pub steps_per_tick: usize,
    pub tick_interval_ms: u64,
    /// Give up after this many ticks; unbounded when absent
    pub max_ticks: Option<u64>,
    /// Loops suspend after this many iterations; 0 disables
    pub loop_yield_interval: usize,
    /// Nested script calls allowed before a call faults
    pub max_call_depth: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            steps_per_tick: 1000,
            tick_interval_ms: 50,
            max_ticks: None,
            loop_yield_interval: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load with the default search path and the process environment
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/* ===================== Builder ===================== */

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    use_env: bool,
    steps_per_tick: Option<usize>,
    tick_interval_ms: Option<u64>,
    max_ticks: Option<u64>,
    loop_yield_interval: Option<usize>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            config_path: None,
            use_env: true,
            steps_per_tick: None,
            tick_interval_ms: None,
            max_ticks: None,
            loop_yield_interval: None,
        }
    }
}

impl ConfigBuilder {
    /// Explicit config file; it must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Whether `CADENCE_*` variables are consulted
    pub fn use_env(mut self, use_env: bool) -> Self {
        self.use_env = use_env;
        self
    }

    pub fn steps_per_tick(mut self, steps: Option<usize>) -> Self {
        self.steps_per_tick = steps;
        self
    }

    pub fn tick_interval_ms(mut self, interval: Option<u64>) -> Self {
        self.tick_interval_ms = interval;
        self
    }

    pub fn max_ticks(mut self, ticks: Option<u64>) -> Self {
        self.max_ticks = ticks;
        self
    }

    pub fn loop_yield_interval(mut self, iterations: Option<usize>) -> Self {
        self.loop_yield_interval = iterations;
        self
    }

    pub fn build(self) -> Result<Config> {
        let mut builder = config::Config::builder();

        let explicit = self
            .config_path
            .clone()
            .or_else(|| {
                self.use_env
                    .then(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
                    .flatten()
            });
        builder = match explicit {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        if self.use_env {
            builder = builder.add_source(
                Environment::with_prefix("CADENCE")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut config: Config = builder.build()?.try_deserialize()?;

        if let Some(steps) = self.steps_per_tick {
            config.scheduler.steps_per_tick = steps;
        }
        if let Some(interval) = self.tick_interval_ms {
            config.scheduler.tick_interval_ms = interval;
        }
        if self.max_ticks.is_some() {
            config.scheduler.max_ticks = self.max_ticks;
        }
        if let Some(iterations) = self.loop_yield_interval {
            config.scheduler.loop_yield_interval = iterations;
        }

        if config.scheduler.steps_per_tick == 0 {
            return Err(config::ConfigError::Message(
                "scheduler.steps_per_tick must be at least 1".to_string(),
            )
            .into());
        }
        Ok(config)
    }
}
