use facegate_core::{DetectorBackend, DistanceMetric, EmbeddingModel};
use facegate_imaging::DEFAULT_TARGET_WIDTH;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("{key} must be {expected}, got {value}")]
    OutOfRange {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Which of the two HTTP services a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Embed,
    Verify,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Embed => "facegate-embed",
            Self::Verify => "facegate-verify",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Embed => 8000,
            Self::Verify => 8001,
        }
    }
}

/// Service configuration, loaded from environment variables.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub service: Service,
    pub host: String,
    pub port: u16,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    pub model: EmbeddingModel,
    pub detector: DetectorBackend,
    /// Frames wider than this are downscaled before detection.
    pub target_width: u32,
    pub metric: DistanceMetric,
    /// Maximum distance still accepted by the verify service.
    pub confidence_threshold: f32,
    /// The single identity the verify service compares against.
    pub reference_image: PathBuf,
    pub max_upload_bytes: usize,
    /// Capacity of the engine request queue.
    pub engine_queue: usize,
}

impl Config {
    /// Load configuration from `FACEGATE_*` environment variables with defaults.
    pub fn from_env(service: Service) -> Result<Self, ConfigError> {
        Self::from_lookup(service, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(service: Service, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_dir = lookup("FACEGATE_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(facegate_core::default_model_dir);

        Ok(Self {
            service,
            host: lookup("FACEGATE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "FACEGATE_PORT", service.default_port()),
            model_dir,
            model: parse_ident(&lookup, "FACEGATE_MODEL_NAME", EmbeddingModel::ArcFace)?,
            detector: parse_ident(&lookup, "FACEGATE_DETECTOR_BACKEND", DetectorBackend::Scrfd)?,
            target_width: parse_or(&lookup, "FACEGATE_TARGET_WIDTH", DEFAULT_TARGET_WIDTH),
            metric: parse_ident(&lookup, "FACEGATE_DISTANCE_METRIC", DistanceMetric::Cosine)?,
            confidence_threshold: parse_or(&lookup, "FACEGATE_CONFIDENCE_THRESHOLD", 0.40),
            reference_image: lookup("FACEGATE_REFERENCE_IMAGE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("reference.jpg")),
            max_upload_bytes: parse_or(&lookup, "FACEGATE_MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            engine_queue: parse_or(&lookup, "FACEGATE_ENGINE_QUEUE", 16),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_width == 0 {
            return Err(ConfigError::OutOfRange {
                key: "FACEGATE_TARGET_WIDTH",
                expected: "greater than 0",
                value: self.target_width.to_string(),
            });
        }
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold <= 2.0) {
            return Err(ConfigError::OutOfRange {
                key: "FACEGATE_CONFIDENCE_THRESHOLD",
                expected: "in (0, 2]",
                value: self.confidence_threshold.to_string(),
            });
        }
        if self.engine_queue == 0 {
            return Err(ConfigError::OutOfRange {
                key: "FACEGATE_ENGINE_QUEUE",
                expected: "greater than 0",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Numeric settings fall back to the default when unset or unparseable.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparseable value, using default");
            default
        }),
        None => default,
    }
}

/// Identifiers must name something we can load; a typo is a startup error.
fn parse_ident<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr<Err = String>,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|reason| ConfigError::Invalid { key, reason }),
        None => Ok(default),
    }
}
