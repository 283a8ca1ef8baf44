//! On-disk cache of fitted model artifacts, keyed by calendar year.

use crate::error::{DemandError, Result};
use crate::models::sarima::FittedSarima;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Persists fitted artifacts as `model_<key>.bin` (or `.bin.gz` when
/// compression is on) under a cache directory. Each writer streams into
/// its own uniquely named temporary file and renames it into place, so
/// neither a crashed write nor two racing writers can leave a corrupt
/// artifact under the final name; the last rename wins whole.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
    compress: bool,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            compress: false,
        }
    }

    /// Gzip-compress artifacts on disk. Plain artifacts written earlier
    /// remain loadable.
    pub fn with_compression(mut self) -> Self {
        self.compress = true;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: i32, compressed: bool) -> PathBuf {
        let name = if compressed {
            format!("model_{key}.bin.gz")
        } else {
            format!("model_{key}.bin")
        };
        self.dir.join(name)
    }

    /// Save an artifact under `key`, replacing any existing one.
    pub fn save(&self, key: i32, model: &FittedSarima) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| DemandError::CacheIo(format!("create {}: {e}", self.dir.display())))?;

        let bytes = serde_json::to_vec(model)
            .map_err(|e| DemandError::CacheIo(format!("encode model {key}: {e}")))?;

        let final_path = self.path_for(key, self.compress);
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| {
            DemandError::CacheIo(format!("create temp file in {}: {e}", self.dir.display()))
        })?;
        if self.compress {
            let mut encoder = GzEncoder::new(tmp.as_file(), Compression::default());
            encoder
                .write_all(&bytes)
                .and_then(|_| encoder.finish().map(|_| ()))
                .map_err(|e| {
                    DemandError::CacheIo(format!("write {}: {e}", tmp.path().display()))
                })?;
        } else {
            tmp.write_all(&bytes).map_err(|e| {
                DemandError::CacheIo(format!("write {}: {e}", tmp.path().display()))
            })?;
        }
        tmp.persist(&final_path).map_err(|e| {
            DemandError::CacheIo(format!("rename into {}: {e}", final_path.display()))
        })?;

        tracing::debug!(key, path = %final_path.display(), "persisted model artifact");
        Ok(())
    }

    /// Load the artifact for `key`. A missing artifact is `Ok(None)`;
    /// an unreadable or undecodable one is a `CacheIo` error, which
    /// callers typically downgrade to a cache miss.
    pub fn load(&self, key: i32) -> Result<Option<FittedSarima>> {
        for compressed in [self.compress, !self.compress] {
            let path = self.path_for(key, compressed);
            if !path.exists() {
                continue;
            }
            let bytes = read_artifact(&path, compressed)?;
            let model = serde_json::from_slice(&bytes)
                .map_err(|e| DemandError::CacheIo(format!("decode {}: {e}", path.display())))?;
            return Ok(Some(model));
        }
        Ok(None)
    }

    /// Remove the artifact for `key` if present.
    pub fn invalidate(&self, key: i32) -> Result<()> {
        for compressed in [false, true] {
            let path = self.path_for(key, compressed);
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    DemandError::CacheIo(format!("remove {}: {e}", path.display()))
                })?;
            }
        }
        Ok(())
    }
}

fn read_artifact(path: &Path, compressed: bool) -> Result<Vec<u8>> {
    let file =
        File::open(path).map_err(|e| DemandError::CacheIo(format!("open {}: {e}", path.display())))?;
    let mut bytes = Vec::new();
    if compressed {
        GzDecoder::new(file)
            .read_to_end(&mut bytes)
            .map_err(|e| DemandError::CacheIo(format!("read {}: {e}", path.display())))?;
    } else {
        let mut file = file;
        file.read_to_end(&mut bytes)
            .map_err(|e| DemandError::CacheIo(format!("read {}: {e}", path.display())))?;
    }
    Ok(bytes)
}
