use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facegate_core::OnnxFaceEngine;
use facegate_imaging::diagnostics::{luminance, mean_brightness, verdict_for_brightness};
use facegate_imaging::{downscale_to_width, DiagnosticVerdict, ImageFrame};
use facegated::pipeline::{self, PipelineSettings};
use facegated::response::{EmbeddingResponse, VerifyResponse};
use facegated::{decide, Config, Reference, Service};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "facegate", about = "Face embedding and verification on local images")]
struct Cli {
    /// Directory containing ONNX model files (overrides FACEGATE_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the embedding of the first face in an image
    Embed {
        image: PathBuf,
    },
    /// Compare an image against a reference image
    Verify {
        image: PathBuf,
        /// Reference image (defaults to FACEGATE_REFERENCE_IMAGE)
        #[arg(short, long)]
        reference: Option<PathBuf>,
        /// Maximum accepted distance (defaults to FACEGATE_CONFIDENCE_THRESHOLD)
        #[arg(short, long)]
        threshold: Option<f32>,
    },
    /// Report brightness and the lighting verdict for an image (no models needed)
    Diagnose {
        image: PathBuf,
    },
    /// Print the effective service configuration
    Info {
        #[arg(long, value_enum, default_value = "embed")]
        service: ServiceArg,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ServiceArg {
    Embed,
    Verify,
}

impl From<ServiceArg> for Service {
    fn from(arg: ServiceArg) -> Self {
        match arg {
            ServiceArg::Embed => Service::Embed,
            ServiceArg::Verify => Service::Verify,
        }
    }
}

#[derive(Serialize)]
struct Diagnosis {
    width: u32,
    height: u32,
    resized_width: u32,
    resized_height: u32,
    brightness: Option<f32>,
    verdict: DiagnosticVerdict,
    message: &'static str,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Embed { image } => {
            let config = load_config(Service::Embed, cli.model_dir)?;
            let mut engine = load_engine(&config)?;
            let frame = read_frame(&image, config.target_width)?;

            let response =
                match pipeline::represent_first(&mut engine, &frame, &PipelineSettings::from(&config)) {
                    Ok(embedding) => EmbeddingResponse::success(embedding),
                    Err(pipeline::PipelineError::NoFace(verdict)) => {
                        EmbeddingResponse::failure(verdict.message())
                    }
                    Err(e) => return Err(e).context("embedding failed"),
                };
            print_json(&response)?;
        }
        Commands::Verify {
            image,
            reference,
            threshold,
        } => {
            let mut config = load_config(Service::Verify, cli.model_dir)?;
            if let Some(reference) = reference {
                config.reference_image = reference;
            }
            if let Some(threshold) = threshold {
                config.confidence_threshold = threshold;
            }
            config.validate()?;

            let reference = Reference::load(&config.reference_image, config.target_width)
                .with_context(|| format!("loading {}", config.reference_image.display()))?;
            let mut engine = load_engine(&config)?;
            let probe = read_frame(&image, config.target_width)?;

            let settings = PipelineSettings::from(&config);
            let response =
                match pipeline::verify_against(&mut engine, &probe, &reference.frame, &settings) {
                    Ok(verification) => {
                        eprintln!(
                            "engine: matched={} distance={:.4} threshold={:.2} ({})",
                            verification.matched,
                            verification.distance,
                            verification.threshold,
                            verification.metric
                        );
                        VerifyResponse::from(decide(&verification, config.confidence_threshold))
                    }
                    Err(pipeline::PipelineError::NoFace(verdict)) => {
                        VerifyResponse::failure(verdict.message())
                    }
                    Err(e) => return Err(e).context("verification failed"),
                };
            print_json(&response)?;
        }
        Commands::Diagnose { image } => {
            let config = load_config(Service::Embed, cli.model_dir)?;
            let frame = ImageFrame::open(&image)
                .with_context(|| format!("reading {}", image.display()))?;
            let (width, height) = (frame.width(), frame.height());

            let resized = downscale_to_width(frame, config.target_width);
            let brightness = mean_brightness(&luminance(&resized));
            let verdict = brightness
                .map(verdict_for_brightness)
                .unwrap_or(DiagnosticVerdict::Unknown);

            print_json(&Diagnosis {
                width,
                height,
                resized_width: resized.width(),
                resized_height: resized.height(),
                brightness,
                verdict,
                message: verdict.message(),
            })?;
        }
        Commands::Info { service } => {
            let config = load_config(service.into(), cli.model_dir)?;
            print_json(&config)?;
        }
    }

    Ok(())
}

fn load_config(service: Service, model_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::from_env(service)?;
    if let Some(dir) = model_dir {
        config.model_dir = dir;
    }
    config.validate()?;
    Ok(config)
}

fn load_engine(config: &Config) -> Result<OnnxFaceEngine> {
    OnnxFaceEngine::load(&config.model_dir, config.model, config.detector)
        .with_context(|| format!("loading models from {}", config.model_dir.display()))
}

fn read_frame(path: &Path, target_width: u32) -> Result<ImageFrame> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    pipeline::prepare(&bytes, target_width).with_context(|| format!("decoding {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
