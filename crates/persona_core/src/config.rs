use crate::error::EngineError;
use crate::trigger::DEFAULT_TRIGGER_THRESHOLD;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub triggers: TriggerConfig,
    pub projection: ProjectionConfig,
    pub embedding: EmbeddingConfig,
    pub session: SessionConfig,
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: EngineConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Try to load from path; if the file is missing or invalid, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                if let Err(e) = cfg.validate() {
                    tracing::warn!("Ignoring env overrides ({})", e);
                    cfg = Self::default();
                }
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PERSONA_TRIGGER_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.triggers.threshold = n;
            }
        }
        if let Ok(v) = std::env::var("PERSONA_PROJECTION_DIMS") {
            if let Ok(n) = v.parse() {
                self.projection.target_dims = n;
            }
        }
        if let Ok(v) = std::env::var("PERSONA_PROJECTION_MODE") {
            if let Ok(mode) = v.parse() {
                self.projection.mode = mode;
            }
        }
        if let Ok(v) = std::env::var("PERSONA_EMBEDDING_BACKEND") {
            if let Ok(backend) = v.parse() {
                self.embedding.backend = backend;
            }
        }
        if let Ok(v) = std::env::var("PERSONA_CHUNK_WORDS") {
            if let Ok(n) = v.parse() {
                self.embedding.chunk_words = n;
            }
        }
        if let Ok(v) = std::env::var("PERSONA_OUTPUT_DIR") {
            self.session.output_dir = v;
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.triggers.threshold.is_finite() && self.triggers.threshold >= 0.0) {
            return Err(EngineError::config(format!(
                "trigger threshold must be a non-negative number, got {}",
                self.triggers.threshold
            )));
        }
        if self.projection.target_dims == 0 {
            return Err(EngineError::config("projection target_dims must be > 0"));
        }
        if self.embedding.dimensions == 0 {
            return Err(EngineError::config("embedding dimensions must be > 0"));
        }
        Ok(())
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// A trigger fires when the Euclidean distance is strictly below this.
    pub threshold: f32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_TRIGGER_THRESHOLD,
        }
    }
}

/// How per-turn embeddings are reduced for inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    /// One decomposition over every turn's main embedding; chunks reduced per turn.
    #[default]
    WholeHistory,
    /// One decomposition per turn over its main embedding plus its chunks.
    PerTurn,
}

impl FromStr for ProjectionMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "whole_history" | "history" => Ok(Self::WholeHistory),
            "per_turn" | "turn" => Ok(Self::PerTurn),
            other => Err(EngineError::config(format!("unknown projection mode '{}'", other))),
        }
    }
}

impl fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WholeHistory => f.write_str("whole-history"),
            Self::PerTurn => f.write_str("per-turn"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub mode: ProjectionMode,
    pub target_dims: usize,
    /// Total variance below this is treated as degenerate input.
    pub variance_epsilon: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            mode: ProjectionMode::WholeHistory,
            target_dims: 3,
            variance_epsilon: 1e-8,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    #[default]
    Hashing,
    /// Requires the `fastembed` cargo feature.
    Fastembed,
}

impl FromStr for EmbeddingBackend {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "fastembed" => Ok(Self::Fastembed),
            other => Err(EngineError::config(format!("unknown embedding backend '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Width of the hashing encoder. Ignored by fastembed.
    pub dimensions: usize,
    /// Messages longer than this many words also get per-chunk embeddings.
    /// 0 disables chunking.
    pub chunk_words: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Hashing,
            dimensions: 64,
            chunk_words: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub turns: usize,
    pub output_dir: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turns: 6,
            output_dir: "saved".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
