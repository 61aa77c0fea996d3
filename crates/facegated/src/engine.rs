use std::sync::Arc;

use facegate_core::{Embedding, FaceEngine, ModelInfo, Verification};
use facegate_imaging::ImageFrame;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::pipeline::{self, PipelineError, PipelineSettings};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Represent {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<Embedding, PipelineError>>,
    },
    Verify {
        image: Vec<u8>,
        reference: Arc<ImageFrame>,
        reply: oneshot::Sender<Result<Verification, PipelineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    info: ModelInfo,
}

impl EngineHandle {
    /// Decode, downscale, and embed the first face of an uploaded image.
    pub async fn represent(&self, image: Vec<u8>) -> Result<Embedding, DispatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Represent {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| DispatchError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| DispatchError::ChannelClosed)??)
    }

    /// Decode, downscale, and compare an uploaded image against `reference`.
    pub async fn verify(
        &self,
        image: Vec<u8>,
        reference: Arc<ImageFrame>,
    ) -> Result<Verification, DispatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Verify {
                image,
                reference,
                reply: reply_tx,
            })
            .await
            .map_err(|_| DispatchError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| DispatchError::ChannelClosed)??)
    }

    pub fn model_info(&self) -> &ModelInfo {
        &self.info
    }
}

/// Move `engine` onto a dedicated OS thread and return a handle to it.
///
/// The thread runs until every handle is dropped. Requests queue up to
/// `queue` deep; senders wait when the queue is full.
pub fn spawn_engine<E>(
    mut engine: E,
    settings: PipelineSettings,
    queue: usize,
) -> std::io::Result<EngineHandle>
where
    E: FaceEngine + 'static,
{
    let info = engine.model_info();
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(queue.max(1));

    std::thread::Builder::new()
        .name("facegate-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Represent { image, reply } => {
                        let result = run_represent(&mut engine, &image, &settings);
                        let _ = reply.send(result);
                    }
                    EngineRequest::Verify {
                        image,
                        reference,
                        reply,
                    } => {
                        let result = run_verify(&mut engine, &image, &reference, &settings);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx, info })
}

fn run_represent<E: FaceEngine>(
    engine: &mut E,
    image: &[u8],
    settings: &PipelineSettings,
) -> Result<Embedding, PipelineError> {
    let started = std::time::Instant::now();
    let frame = pipeline::prepare(image, settings.target_width)?;
    let result = pipeline::represent_first(engine, &frame, settings);
    tracing::debug!(
        width = frame.width(),
        height = frame.height(),
        ok = result.is_ok(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "represent: done"
    );
    result
}

fn run_verify<E: FaceEngine>(
    engine: &mut E,
    image: &[u8],
    reference: &ImageFrame,
    settings: &PipelineSettings,
) -> Result<Verification, PipelineError> {
    let started = std::time::Instant::now();
    let probe = pipeline::prepare(image, settings.target_width)?;
    let result = pipeline::verify_against(engine, &probe, reference, settings);
    if let Ok(v) = &result {
        tracing::debug!(
            matched = v.matched,
            distance = v.distance,
            metric = %v.metric,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "verify: done"
        );
    }
    result
}
