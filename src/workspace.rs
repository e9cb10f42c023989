//! Per-request scratch space
//!
//! Every generate request gets a run id naming its upload file, its output
//! directory and its archive. [`RunWorkspace`] owns those paths and deletes
//! them through [`RunWorkspace::cleanup`], or when dropped if a request ends
//! before reaching it.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::config::StorageConfig;

/// `<unix-millis>-<8 hex chars>`
pub fn new_run_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Upload file and output directory of one run
#[derive(Debug)]
pub struct RunWorkspace {
    run_id: String,
    upload_path: PathBuf,
    output_dir: PathBuf,
    archive_name: String,
    cleaned: bool,
}

impl RunWorkspace {
    /// Allocate a run id and create its output directory
    pub async fn create(storage: &StorageConfig, archive_prefix: &str) -> io::Result<Self> {
        let run_id = new_run_id();
        let upload_path = storage.upload_dir.join(format!("{}.docx", run_id));
        let output_dir = storage.output_dir.join(&run_id);
        let archive_name = format!("{}_{}.zip", archive_prefix, run_id);

        tokio::fs::create_dir_all(&storage.upload_dir).await?;
        tokio::fs::create_dir_all(&output_dir).await?;

        tracing::debug!(run_id = %run_id, "Created run workspace");

        Ok(Self {
            run_id,
            upload_path,
            output_dir,
            archive_name,
            cleaned: false,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Where the uploaded document is stored
    pub fn upload_path(&self) -> &Path {
        &self.upload_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<prefix>_<runId>.zip`
    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(&self.archive_name)
    }

    /// Remove the run's files without blocking the runtime
    pub async fn cleanup(mut self) {
        self.cleaned = true;
        log_removal(&self.run_id, "upload", tokio::fs::remove_file(&self.upload_path).await);
        log_removal(
            &self.run_id,
            "output directory",
            tokio::fs::remove_dir_all(&self.output_dir).await,
        );
        tracing::debug!(run_id = %self.run_id, "Cleaned up run workspace");
    }
}

fn log_removal(run_id: &str, what: &str, result: io::Result<()>) {
    if let Err(e) = result {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(run_id = %run_id, "Failed to remove {}: {}", what, e);
        }
    }
}

impl Drop for RunWorkspace {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        log_removal(&self.run_id, "upload", std::fs::remove_file(&self.upload_path));
        log_removal(
            &self.run_id,
            "output directory",
            std::fs::remove_dir_all(&self.output_dir),
        );
        tracing::debug!(run_id = %self.run_id, "Cleaned up run workspace on drop");
    }
}
