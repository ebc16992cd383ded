//! Temporary artifacts of a render job.
//!
//! A job owns two kinds of artifact:
//! - a private scratch directory ([`RenderWorkspace`]) holding the downloaded
//!   track, removed as soon as the job returns, whatever the outcome;
//! - the encoded output ([`RenderedVideo`]), which outlives the job and is
//!   removed by the caller once it has been delivered.
//!
//! Both are backed by `tempfile` handles, so an early return or a panic
//! still deletes them on drop.

use std::path::{Path, PathBuf};

use tempfile::{TempDir, TempPath};
use tracing::{debug, warn};

use reel_models::{RenderJobId, Track};

use crate::error::MediaResult;

/// Scratch directory owned by one render job.
#[derive(Debug)]
pub struct RenderWorkspace {
    dir: TempDir,
}

impl RenderWorkspace {
    /// Create a fresh directory for `job_id` under `root`.
    pub fn create(root: &Path, job_id: &RenderJobId) -> MediaResult<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("job-{}-", job_id))
            .tempdir_in(root)?;
        debug!(job_id = %job_id, path = %dir.path().display(), "Created render workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the downloaded audio for `track` is stored.
    pub fn audio_path(&self, track: &Track) -> PathBuf {
        let ext = track.file_extension().unwrap_or_else(|| "audio".to_string());
        self.dir.path().join(format!("track.{}", ext))
    }

    /// Allocate the output file next to (not inside) the workspace.
    ///
    /// The file is created empty so its name is reserved; it is deleted on
    /// drop unless handed over in a [`RenderedVideo`].
    pub fn allocate_output(root: &Path, job_id: &RenderJobId) -> MediaResult<TempPath> {
        let file = tempfile::Builder::new()
            .prefix(&format!("reel-{}-", job_id))
            .suffix(".mp4")
            .tempfile_in(root)?;
        Ok(file.into_temp_path())
    }

    /// Remove the directory and everything in it.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "Removed render workspace"),
            Err(e) => warn!(path = %path.display(), "Failed to remove render workspace: {}", e),
        }
    }
}

/// Encoded video awaiting delivery.
///
/// The file is deleted by [`RenderedVideo::cleanup`], or on drop.
#[derive(Debug)]
pub struct RenderedVideo {
    path: TempPath,
    job_id: RenderJobId,
    size_bytes: u64,
}

impl RenderedVideo {
    pub(crate) fn new(path: TempPath, job_id: RenderJobId, size_bytes: u64) -> Self {
        Self {
            path,
            job_id,
            size_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn job_id(&self) -> &RenderJobId {
        &self.job_id
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Delete the output file.
    pub fn cleanup(self) -> std::io::Result<()> {
        let job_id = self.job_id;
        self.path.close()?;
        debug!(job_id = %job_id, "Removed delivered video");
        Ok(())
    }
}
