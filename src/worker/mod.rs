//! Background thumbnail generation.
//!
//! The worker process consumes [`ThumbnailTask`]s from the job queue and
//! derives fixed-width copies of the source image. Sizes are best-effort:
//! each width's outcome is reported independently and the task only fails
//! when no size could be produced. Re-running a task overwrites the same
//! output paths, so reprocessing is idempotent.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{imageops::FilterType, DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::FileRecord;
use crate::store::{JobQueue, ThumbnailTask};
use crate::DbPool;

pub const THUMBNAIL_WIDTHS: [u32; 3] = [500, 250, 100];

const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Missing fileId")]
    MissingFileId,
    #[error("Missing userId")]
    MissingUserId,
    #[error("File not found")]
    FileNotFound,
    #[error("Failed to read source blob: {0}")]
    Source(String),
    #[error("Failed to decode source image: {0}")]
    Decode(String),
    #[error("All thumbnail sizes failed")]
    AllSizesFailed(ThumbnailReport),
    #[error("Worker task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Per-size outcome of one task.
#[derive(Debug, Default)]
pub struct ThumbnailReport {
    pub produced: Vec<(u32, String)>,
    pub failed: Vec<(u32, String)>,
}

pub struct ThumbnailWorker {
    db: DbPool,
    queue: Arc<dyn JobQueue>,
}

impl ThumbnailWorker {
    pub fn new(db: DbPool, queue: Arc<dyn JobQueue>) -> Self {
        Self { db, queue }
    }

    /// Consume tasks until the process is stopped. Tasks are handled one at
    /// a time; only the resizes within a task run concurrently.
    pub async fn run(self) {
        info!("Thumbnail worker started");

        loop {
            match self.queue.dequeue(DEQUEUE_TIMEOUT).await {
                Ok(Some(task)) => match process_task(&self.db, &task).await {
                    Ok(report) => {
                        info!(
                            file = %task.file_id,
                            produced = report.produced.len(),
                            failed = report.failed.len(),
                            "Thumbnail task completed"
                        );
                    }
                    Err(e) => {
                        error!(file = %task.file_id, error = %e, "Thumbnail task failed");
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Failed to poll job queue");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

/// Process one task: resolve the record by id and owner, decode the source
/// blob once, then produce every configured width concurrently.
pub async fn process_task(db: &DbPool, task: &ThumbnailTask) -> Result<ThumbnailReport, JobError> {
    if task.file_id.is_empty() {
        return Err(JobError::MissingFileId);
    }
    if task.user_id.is_empty() {
        return Err(JobError::MissingUserId);
    }

    let record = FileRecord::find_by_id_and_owner(db, &task.file_id, &task.user_id)
        .await
        .map_err(|e| JobError::Source(e.to_string()))?
        .ok_or(JobError::FileNotFound)?;
    let local_path = record.local_path.as_deref().ok_or(JobError::FileNotFound)?;

    let bytes = tokio::fs::read(local_path)
        .await
        .map_err(|e| JobError::Source(e.to_string()))?;
    let format = image::guess_format(&bytes).map_err(|e| JobError::Decode(e.to_string()))?;
    let source = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await?
        .map_err(|e| JobError::Decode(e.to_string()))?;

    let tasks = THUMBNAIL_WIDTHS
        .iter()
        .map(|&width| write_thumbnail(source.clone(), format, local_path.to_string(), width));
    let outcomes = futures::future::join_all(tasks).await;

    let mut report = ThumbnailReport::default();
    for (width, outcome) in THUMBNAIL_WIDTHS.iter().zip(outcomes) {
        match outcome {
            Ok(path) => report.produced.push((*width, path)),
            Err(e) => {
                warn!(file = %task.file_id, width, error = %e, "Thumbnail size failed");
                report.failed.push((*width, e.to_string()));
            }
        }
    }

    if report.produced.is_empty() {
        return Err(JobError::AllSizesFailed(report));
    }
    Ok(report)
}

/// Resize to a fixed width (aspect preserved) and write next to the source
/// blob as `<path>_<width>`.
async fn write_thumbnail(
    source: DynamicImage,
    format: ImageFormat,
    source_path: String,
    width: u32,
) -> Result<String, JobError> {
    let encoded = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, JobError> {
        let height = scaled_height(source.width(), source.height(), width);
        let resized = source.resize_exact(width, height, FilterType::Triangle);
        let mut buf = Vec::new();
        resized
            .write_to(&mut Cursor::new(&mut buf), format)
            .map_err(|e| JobError::Decode(e.to_string()))?;
        Ok(buf)
    })
    .await??;

    let output_path = format!("{source_path}_{width}");
    tokio::fs::write(&output_path, encoded)
        .await
        .map_err(|e| JobError::Source(e.to_string()))?;
    Ok(output_path)
}

fn scaled_height(src_width: u32, src_height: u32, target_width: u32) -> u32 {
    let ratio = f64::from(src_height) / f64::from(src_width);
    ((f64::from(target_width) * ratio).round() as u32).max(1)
}
