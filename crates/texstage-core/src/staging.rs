//! Staging directory I/O.
//!
//! Downloaded maps land in the staging root; composites go to the output
//! directory. Every write goes to a `.part` temp file first and is renamed into
//! place, so a listing never shows a half-written raster.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::raster::{self, Raster};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.png` → `a.png.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Scratch location shared by all jobs. Only the single queue worker writes to it.
#[derive(Debug, Clone)]
pub struct StagingDir {
    root: PathBuf,
    output_dir: PathBuf,
}

impl StagingDir {
    pub fn new(root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Where downloaded source maps are written.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where composites are written.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Creates both directories if missing.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create staging dir: {}", self.root.display()))?;
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("create output dir: {}", self.output_dir.display()))?;
        Ok(())
    }

    /// Writes `bytes` to `dir/filename`, replacing any existing file.
    pub fn write_file(&self, dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;
        let final_path = dir.join(filename);
        let tmp = temp_path(&final_path);
        fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &final_path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), final_path.display()))?;
        tracing::debug!(path = %final_path.display(), bytes = bytes.len(), "wrote file");
        Ok(final_path)
    }

    /// Writes a downloaded map into the staging root.
    pub fn stage(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.write_file(&self.root, filename, bytes)
    }

    /// Regular file names in `dir`, sorted lexicographically. Temp files are skipped.
    /// A missing directory lists as empty.
    pub fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("list {}", dir.display())),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("list {}", dir.display()))?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!(name = ?entry.file_name(), "skipping non-UTF-8 file name");
                continue;
            };
            if name.ends_with(TEMP_SUFFIX) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Files currently staged in the root.
    pub fn list_staged(&self) -> Result<Vec<String>> {
        self.list_files(&self.root)
    }

    /// Decodes a staged map by name.
    pub fn read_raster(&self, filename: &str) -> Result<Raster> {
        raster::read_raster(&self.root.join(filename))
    }
}
