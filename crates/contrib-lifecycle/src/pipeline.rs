//! Download, install and remove work for a single contribution
//!
//! The controller only talks to the [`OperationPipeline`] trait. Every
//! implementation reports through the [`ProgressMonitor`] it is handed and
//! must end with exactly one terminal outcome.
//!
//! [`ArchivePipeline`] is the default implementation:
//! - streams `.tar.gz` archives with reqwest into a temporary file
//! - unpacks into a staging directory next to the target folder
//! - swaps the staged folder into place only after everything succeeded
//!
//! Contributions live at `<root>/<type folder>/<name>`.

use crate::monitor::ProgressMonitor;
use anyhow::Context;
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use contrib_core::types::{ContributionId, ContributionRecord, NetworkConfig};
use flate2::read::GzDecoder;
use futures::StreamExt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Marker written into a folder whose removal is deferred to restart
pub const PENDING_MARKER: &str = ".contrib-pending";

/// Pipeline failures, turned into a terminal outcome at the pipeline boundary
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Install failed: {0}")]
    Install(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Report this error as the operation's terminal outcome
    pub fn report(self, monitor: ProgressMonitor) {
        match self {
            PipelineError::Cancelled => monitor.report_cancelled(),
            other => monitor.fail(other.to_string()),
        }
    }
}

/// How a removal treats the local copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalMode {
    /// Delete the contribution folder now
    Immediate,
    /// Leave the folder in place; it is deleted at the next start
    DeferDeletion,
    /// Leave the folder in place; it is replaced at the next start
    DeferForUpdate,
}

impl RemovalMode {
    pub fn is_deferred(self) -> bool {
        !matches!(self, RemovalMode::Immediate)
    }

    fn marker_contents(self) -> &'static str {
        match self {
            RemovalMode::Immediate => "",
            RemovalMode::DeferDeletion => "deletion",
            RemovalMode::DeferForUpdate => "update",
        }
    }
}

#[async_trait]
pub trait OperationPipeline: Send + Sync {
    /// Download `source_url` and install it as `record`
    async fn download_and_install(
        &self,
        record: ContributionRecord,
        source_url: String,
        monitor: ProgressMonitor,
    );

    /// Remove the local copy of `record`
    async fn remove(&self, record: ContributionRecord, mode: RemovalMode, monitor: ProgressMonitor);

    /// Forget a deferred removal that was undone before restart
    fn discard_deferred(&self, _id: &ContributionId) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Filesystem- and HTTP-backed pipeline
pub struct ArchivePipeline {
    root: Utf8PathBuf,
    client: reqwest::Client,
    buffer_size: usize,
}

impl ArchivePipeline {
    pub fn new(root: impl Into<Utf8PathBuf>, network: &NetworkConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&network.user_agent)
            .connect_timeout(Duration::from_secs(network.http_timeout_secs))
            .timeout(Duration::from_secs(network.download_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            root: root.into(),
            client,
            buffer_size: network.download_chunk_size.max(4096),
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Folder holding the local copy of a contribution
    pub fn contribution_folder(&self, id: &ContributionId) -> Utf8PathBuf {
        self.root.join(id.kind.folder_name()).join(&id.name)
    }

    async fn install(
        &self,
        record: &ContributionRecord,
        source_url: &str,
        monitor: &mut ProgressMonitor,
    ) -> Result<(), PipelineError> {
        let url = Url::parse(source_url)
            .map_err(|e| PipelineError::Download(format!("Malformed URL {}: {}", source_url, e)))?;

        monitor.start();
        let archive = self.download(&url, monitor).await?;

        if monitor.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        monitor.set_indeterminate();

        let target = self.contribution_folder(&record.id);
        let parent = target
            .parent()
            .ok_or_else(|| PipelineError::Install(format!("No parent folder for {}", target)))?
            .to_owned();
        fs::create_dir_all(&parent)
            .map_err(|e| PipelineError::Install(format!("Cannot create {}: {}", parent, e)))?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&parent)
            .map_err(|e| PipelineError::Install(format!("Cannot create staging folder: {}", e)))?;

        let content = tokio::task::spawn_blocking({
            let archive_path = archive.path().to_path_buf();
            let staging_path = staging.path().to_path_buf();
            move || unpack_archive(&archive_path, &staging_path)
        })
        .await
        .map_err(|e| PipelineError::Install(format!("Unpack task failed: {}", e)))??;

        if monitor.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        swap_into_place(&content, target.as_std_path(), &staging)?;
        info!(contribution = %record.id, version = %record.version, "Installed to {}", target);
        Ok(())
    }

    async fn download(
        &self,
        url: &Url,
        monitor: &mut ProgressMonitor,
    ) -> Result<NamedTempFile, PipelineError> {
        debug!("Downloading {}", url);

        let response = tokio::select! {
            _ = monitor.cancelled() => return Err(PipelineError::Cancelled),
            response = self.client.get(url.clone()).send() => response,
        }
        .map_err(|e| PipelineError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Download(format!("{} returned HTTP {}", url, status)));
        }

        let total = response.content_length().filter(|len| *len > 0);
        if total.is_none() {
            monitor.set_indeterminate();
        }

        let temp = NamedTempFile::new()
            .map_err(|e| PipelineError::Download(format!("Cannot create temporary file: {}", e)))?;
        let mut writer = BufWriter::with_capacity(self.buffer_size, temp.as_file());
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        loop {
            let chunk = tokio::select! {
                _ = monitor.cancelled() => return Err(PipelineError::Cancelled),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else {
                break;
            };
            let chunk = chunk.map_err(|e| PipelineError::Download(e.to_string()))?;
            writer
                .write_all(&chunk)
                .map_err(|e| PipelineError::Download(format!("Write failed: {}", e)))?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total {
                let percent = (downloaded.saturating_mul(100) / total).min(100) as u8;
                monitor.set_progress(percent);
            }
        }

        writer
            .flush()
            .map_err(|e| PipelineError::Download(format!("Write failed: {}", e)))?;
        drop(writer);

        debug!("Downloaded {} bytes from {}", downloaded, url);
        Ok(temp)
    }

    async fn remove_local(
        &self,
        record: &ContributionRecord,
        mode: RemovalMode,
        monitor: &mut ProgressMonitor,
    ) -> Result<(), PipelineError> {
        monitor.start();
        if monitor.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        monitor.set_indeterminate();

        let folder = self.contribution_folder(&record.id);
        if !folder.exists() {
            debug!(contribution = %record.id, "Nothing to remove at {}", folder);
            return Ok(());
        }

        if mode.is_deferred() {
            fs::write(folder.join(PENDING_MARKER), mode.marker_contents())
                .map_err(|e| PipelineError::Install(format!("Cannot flag {}: {}", folder, e)))?;
            info!(contribution = %record.id, "Removal of {} deferred to restart", folder);
            return Ok(());
        }

        let path = folder.clone();
        tokio::task::spawn_blocking(move || fs::remove_dir_all(&path))
            .await
            .map_err(|e| PipelineError::Install(format!("Remove task failed: {}", e)))?
            .map_err(|e| PipelineError::Install(format!("Cannot delete {}: {}", folder, e)))?;

        info!(contribution = %record.id, "Removed {}", folder);
        Ok(())
    }
}

#[async_trait]
impl OperationPipeline for ArchivePipeline {
    async fn download_and_install(
        &self,
        record: ContributionRecord,
        source_url: String,
        mut monitor: ProgressMonitor,
    ) {
        match self.install(&record, &source_url, &mut monitor).await {
            Ok(()) => monitor.finish(),
            Err(e) => {
                warn!(contribution = %record.id, "{}", e);
                e.report(monitor);
            }
        }
    }

    async fn remove(
        &self,
        record: ContributionRecord,
        mode: RemovalMode,
        mut monitor: ProgressMonitor,
    ) {
        match self.remove_local(&record, mode, &mut monitor).await {
            Ok(()) => monitor.finish(),
            Err(e) => {
                warn!(contribution = %record.id, "{}", e);
                e.report(monitor);
            }
        }
    }

    fn discard_deferred(&self, id: &ContributionId) -> anyhow::Result<()> {
        let marker = self.contribution_folder(id).join(PENDING_MARKER);
        if marker.exists() {
            fs::remove_file(&marker).with_context(|| format!("Failed to remove {}", marker))?;
        }
        Ok(())
    }
}

/// Unpack a `.tar.gz` into `staging/content` and return the folder to install.
///
/// Archives usually wrap everything in one top-level folder; that folder is
/// used directly when it is the only entry.
fn unpack_archive(archive: &Path, staging: &Path) -> Result<std::path::PathBuf, PipelineError> {
    let file = fs::File::open(archive)
        .map_err(|e| PipelineError::Install(format!("Cannot open archive: {}", e)))?;
    let content = staging.join("content");
    fs::create_dir_all(&content)
        .map_err(|e| PipelineError::Install(format!("Cannot create staging folder: {}", e)))?;

    tar::Archive::new(GzDecoder::new(file))
        .unpack(&content)
        .map_err(|e| PipelineError::Install(format!("Corrupt archive: {}", e)))?;

    let entries: Vec<_> = fs::read_dir(&content)
        .map_err(|e| PipelineError::Install(format!("Cannot read staging folder: {}", e)))?
        .collect::<std::io::Result<_>>()
        .map_err(|e| PipelineError::Install(format!("Cannot read staging folder: {}", e)))?;

    if entries.is_empty() {
        return Err(PipelineError::Install("Archive is empty".to_string()));
    }

    match entries.as_slice() {
        [single] if single.path().is_dir() => Ok(single.path()),
        _ => Ok(content),
    }
}

/// Move `content` to `target`. An existing installation is moved aside
/// first and restored if the final rename fails.
fn swap_into_place(content: &Path, target: &Path, staging: &TempDir) -> Result<(), PipelineError> {
    let previous = staging.path().join("previous");
    let had_previous = target.exists();

    if had_previous {
        fs::rename(target, &previous).map_err(|e| {
            PipelineError::Install(format!("Cannot move aside {}: {}", target.display(), e))
        })?;
    }

    if let Err(e) = fs::rename(content, target) {
        if had_previous {
            if let Err(restore) = fs::rename(&previous, target) {
                warn!("Failed to restore {}: {}", target.display(), restore);
            }
        }
        return Err(PipelineError::Install(format!(
            "Cannot move into {}: {}",
            target.display(),
            e
        )));
    }

    Ok(())
}
