// src/config.rs
//
// Numerical knobs shared by the grid classifier, the samplers and the pushers.
//
// Process-wide defaults are read once from the environment:
//   PLASMA_GRID_UNIFORM_TOL     relative-std tolerance for uniform detection
//   PLASMA_GRID_B_THRESHOLD     |B| floor used by the Zenitani-Umeda pusher
//   PLASMA_GRID_PAR_THRESHOLD   batch size above which loops go through rayon

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const DEFAULT_UNIFORM_TOL: f64 = 1e-6;
pub const DEFAULT_B_THRESHOLD: f64 = 1e-20;
pub const DEFAULT_PAR_THRESHOLD: usize = 4096;

static ENV_CONFIG: OnceLock<NumericsConfig> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericsConfig {
    /// Grid is uniform when std/mean of every axis step is below this.
    pub uniform_tol: f64,
    /// Minimum |B| (Tesla) before dividing by it.
    pub b_threshold: f64,
    /// Below this many particles/points, kernels run serially.
    pub par_threshold: usize,
}

impl Default for NumericsConfig {
    fn default() -> Self {
        Self {
            uniform_tol: DEFAULT_UNIFORM_TOL,
            b_threshold: DEFAULT_B_THRESHOLD,
            par_threshold: DEFAULT_PAR_THRESHOLD,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
}

impl NumericsConfig {
    /// Defaults with any `PLASMA_GRID_*` environment overrides applied.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            uniform_tol: env_parse("PLASMA_GRID_UNIFORM_TOL").unwrap_or(d.uniform_tol),
            b_threshold: env_parse("PLASMA_GRID_B_THRESHOLD").unwrap_or(d.b_threshold),
            par_threshold: env_parse("PLASMA_GRID_PAR_THRESHOLD").unwrap_or(d.par_threshold),
        }
    }

    /// Process-wide config, read from the environment on first use.
    pub fn global() -> &'static NumericsConfig {
        ENV_CONFIG.get_or_init(Self::from_env)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
