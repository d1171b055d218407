//! Archiver: single-entry zip compression with post-write verification

use crate::error::ArchiveError;
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Deflate level used for every archive
pub const COMPRESSION_LEVEL: i64 = 9;

/// Compresses one file into one archive
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Write `input` into a new archive at `output`, entry named after the input's base name
    async fn compress(&self, input: &Path, output: &Path) -> Result<(), ArchiveError>;

    /// Archive file extension, without the dot
    fn extension(&self) -> &'static str;
}

/// Zip archiver using deflate at maximum level
#[derive(Debug, Clone, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn compress(&self, input: &Path, output: &Path) -> Result<(), ArchiveError> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || compress_zip(&input, &output))
            .await
            .map_err(|e| ArchiveError::Task(e.to_string()))?
    }

    fn extension(&self) -> &'static str {
        "zip"
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn compress_zip(input: &Path, output: &Path) -> Result<(), ArchiveError> {
    let entry_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ArchiveError::Io {
            path: input.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "input has no file name"),
        })?;

    let mut source = BufReader::new(File::open(input).map_err(io_error(input))?);
    let target = File::create(output).map_err(io_error(output))?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
        .large_file(true);

    let mut zip = ZipWriter::new(target);
    zip.start_file(entry_name, options)?;
    std::io::copy(&mut source, &mut zip).map_err(io_error(output))?;

    let mut target = zip.finish()?;
    target.flush().map_err(io_error(output))?;
    target.sync_all().map_err(io_error(output))?;
    Ok(())
}

/// A verified archive produced from a dump
#[derive(Debug, Clone)]
pub struct ArchivedDump {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Best-effort cleanup steps that failed; the archive itself is valid
    pub warnings: Vec<String>,
}

/// Sibling archive path: same directory and stem, archiver's extension
pub fn archive_path_for(input: &Path, archiver: &dyn Archiver) -> PathBuf {
    input.with_extension(archiver.extension())
}

/// Compress `input`, verify the result is non-empty, then remove `input`.
///
/// A zero-byte archive is deleted and reported as [`ArchiveError::Empty`];
/// the input is kept in that case.
pub async fn archive_dump(archiver: &dyn Archiver, input: &Path) -> Result<ArchivedDump, ArchiveError> {
    let output = archive_path_for(input, archiver);

    if let Err(e) = archiver.compress(input, &output).await {
        remove_best_effort(&output).await;
        return Err(e);
    }

    let size_bytes = tokio::fs::metadata(&output)
        .await
        .map_err(io_error(&output))?
        .len();

    if size_bytes == 0 {
        if let Err(e) = tokio::fs::remove_file(&output).await {
            error!("Failed to remove empty archive {:?}: {}", output, e);
        }
        return Err(ArchiveError::Empty(output));
    }

    let mut warnings = Vec::new();
    match tokio::fs::remove_file(input).await {
        Ok(()) => debug!("Removed uncompressed dump {:?}", input),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!("Failed to remove uncompressed dump {:?}: {}", input, e);
            warnings.push(format!("Could not remove uncompressed dump {}: {}", input.display(), e));
        }
    }

    Ok(ArchivedDump {
        path: output,
        size_bytes,
        warnings,
    })
}

async fn remove_best_effort(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial archive {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial archive {:?}: {}", path, e),
    }
}

/// Archivers for tests
pub mod mock {
    use super::*;

    /// Misbehaving archivers
    #[derive(Debug, Clone, Copy)]
    pub enum MockArchiver {
        /// Leaves a zero-byte output file
        Empty,
        /// Fails without writing anything
        Failing,
    }

    #[async_trait]
    impl Archiver for MockArchiver {
        async fn compress(&self, _input: &Path, output: &Path) -> Result<(), ArchiveError> {
            match self {
                MockArchiver::Empty => {
                    tokio::fs::File::create(output).await.map_err(io_error(output))?;
                    Ok(())
                }
                MockArchiver::Failing => Err(ArchiveError::Io {
                    path: output.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                }),
            }
        }

        fn extension(&self) -> &'static str {
            "zip"
        }
    }
}
