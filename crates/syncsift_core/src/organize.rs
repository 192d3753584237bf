//! Quality-partitioned output placement.
//!
//! Accepted chunks land under `good_quality/`, rejected ones under
//! `poor_quality/`, one directory per chunk. Placement is staged in a
//! sibling directory and committed with a single rename, so partition
//! readers never observe a half-written chunk and re-running a batch
//! replaces prior results cleanly.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::extract::ChunkArtifacts;
use crate::models::QualityVerdict;
use crate::oracle::OracleOutputs;

/// Partition directory for accepted chunks.
pub const ACCEPTED_DIR: &str = "good_quality";

/// Partition directory for rejected chunks.
pub const REJECTED_DIR: &str = "poor_quality";

/// Subdirectory for scorer analysis records inside a chunk directory.
const ANALYSIS_SUBDIR: &str = "analysis";

/// Subdirectory for cropped face tracks inside a chunk directory.
const CROPPED_SUBDIR: &str = "cropped_faces";

/// Error from organizing chunk artifacts.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("i/o error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl OrganizeError {
    fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for organize operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Where a chunk's artifacts ended up.
#[derive(Debug, Clone)]
pub struct PlacedChunk {
    /// Whether it landed in the accepted partition.
    pub accepted: bool,

    /// The chunk's directory inside its partition.
    pub dir: PathBuf,

    /// Final paths of every placed file.
    pub files: Vec<PathBuf>,
}

/// Places chunk artifacts into quality partitions.
#[derive(Debug, Clone)]
pub struct OutputOrganizer {
    output_root: PathBuf,
}

impl OutputOrganizer {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// The output root both partitions live under.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Create both partition roots up front.
    pub fn ensure_partitions(&self) -> OrganizeResult<()> {
        for partition in [ACCEPTED_DIR, REJECTED_DIR] {
            let dir = self.output_root.join(partition);
            fs::create_dir_all(&dir)
                .map_err(|e| OrganizeError::io(format!("create {}", dir.display()), e))?;
        }
        Ok(())
    }

    /// Move one chunk's artifacts into its partition.
    ///
    /// Everything is first copied into a staging directory next to the
    /// destination, then renamed into place in one step. An existing
    /// chunk directory from a previous run is replaced.
    pub fn place(
        &self,
        chunk_name: &str,
        verdict: &QualityVerdict,
        artifacts: &ChunkArtifacts,
        outputs: &OracleOutputs,
    ) -> OrganizeResult<PlacedChunk> {
        let partition = if verdict.accepted {
            ACCEPTED_DIR
        } else {
            REJECTED_DIR
        };
        let partition_dir = self.output_root.join(partition);
        fs::create_dir_all(&partition_dir)
            .map_err(|e| OrganizeError::io(format!("create {}", partition_dir.display()), e))?;

        let final_dir = partition_dir.join(chunk_name);
        let staging = StagingDir::create(&partition_dir, chunk_name)?;

        let mut files = Vec::new();
        stage(&artifacts.clip, staging.path(), None, &mut files)?;
        stage(&artifacts.audio, staging.path(), None, &mut files)?;

        if let Some(record) = &outputs.offsets_record {
            stage(record, staging.path(), Some(ANALYSIS_SUBDIR), &mut files)?;
        }
        for track in &outputs.cropped_tracks {
            stage(track, staging.path(), Some(CROPPED_SUBDIR), &mut files)?;
        }
        if let Some(annotated) = &outputs.annotated_clip {
            stage(annotated, staging.path(), None, &mut files)?;
        }

        staging.commit(&final_dir)?;

        tracing::debug!("Placed {} into {}/", chunk_name, partition);

        let files = files.into_iter().map(|rel| final_dir.join(rel)).collect();
        Ok(PlacedChunk {
            accepted: verdict.accepted,
            dir: final_dir,
            files,
        })
    }
}

/// Copy one artifact into the staging tree, recording its relative path.
fn stage(
    src: &Path,
    staging_root: &Path,
    subdir: Option<&str>,
    files: &mut Vec<PathBuf>,
) -> OrganizeResult<()> {
    let Some(name) = src.file_name() else {
        return Err(OrganizeError::io(
            format!("stage {}", src.display()),
            io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no file name"),
        ));
    };

    let rel = match subdir {
        Some(dir) => PathBuf::from(dir).join(name),
        None => PathBuf::from(name),
    };
    let dest = staging_root.join(&rel);

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| OrganizeError::io(format!("create {}", parent.display()), e))?;
    }
    fs::copy(src, &dest).map_err(|e| {
        OrganizeError::io(
            format!("copy {} to {}", src.display(), dest.display()),
            e,
        )
    })?;

    files.push(rel);
    Ok(())
}

/// Staging directory that removes itself unless committed.
struct StagingDir {
    path: PathBuf,
    committed: bool,
}

impl StagingDir {
    /// Create `.staging.<name>` next to the final destination, so the
    /// commit rename stays on one filesystem.
    fn create(parent: &Path, name: &str) -> OrganizeResult<Self> {
        let path = parent.join(format!(".staging.{}", name));
        if path.exists() {
            // Leftover from an interrupted run.
            fs::remove_dir_all(&path)
                .map_err(|e| OrganizeError::io(format!("clear {}", path.display()), e))?;
        }
        fs::create_dir_all(&path)
            .map_err(|e| OrganizeError::io(format!("create {}", path.display()), e))?;

        Ok(Self {
            path,
            committed: false,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged tree into place, replacing any previous run's
    /// directory for this chunk.
    fn commit(mut self, final_dir: &Path) -> OrganizeResult<()> {
        if final_dir.exists() {
            fs::remove_dir_all(final_dir)
                .map_err(|e| OrganizeError::io(format!("replace {}", final_dir.display()), e))?;
        }
        fs::rename(&self.path, final_dir).map_err(|e| {
            OrganizeError::io(
                format!("rename {} to {}", self.path.display(), final_dir.display()),
                e,
            )
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}
