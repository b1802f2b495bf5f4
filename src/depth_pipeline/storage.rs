//! Output directory layout for captures and recordings

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::depth_pipeline::common::error::Result;

/// Extension of raw depth stream files.
pub const DEPTH_EXTENSION: &str = "adep";

/// File names derived from one user-supplied base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    dir: PathBuf,
    base: String,
}

impl OutputPaths {
    pub fn new<P: AsRef<Path>>(dir: P, base: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            base: base.to_string(),
        }
    }

    pub fn capture_depth(&self) -> PathBuf {
        self.dir
            .join(format!("{}_photo_depth.{}", self.base, DEPTH_EXTENSION))
    }

    pub fn capture_rgb(&self) -> PathBuf {
        self.dir.join(format!("{}_photo_rgb.jpg", self.base))
    }

    pub fn recording_depth(&self) -> PathBuf {
        self.dir.join(format!("{}_depth.{}", self.base, DEPTH_EXTENSION))
    }

    pub fn recording_rgb(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}_rgb.{}", self.base, extension))
    }
}

pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Names of the files in the output directory, sorted. A missing directory
/// has no files.
pub fn list_captured_files(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    debug!(dir = %dir.display(), count = names.len(), "Listed captured files");
    Ok(names)
}

/// Deletes every file in the output directory and returns how many were removed.
pub fn clear_captured_files(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for name in list_captured_files(dir)? {
        let path = dir.join(&name);
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot delete captured file");
                return Err(e.into());
            }
        }
    }
    info!(dir = %dir.display(), removed, "Captured files cleared");
    Ok(removed)
}

/// Formats a recording duration as `HH:MM:SS`.
pub fn format_record_timer(elapsed_secs: u64) -> String {
    let hours = elapsed_secs / 3600;
    let minutes = (elapsed_secs % 3600) / 60;
    let seconds = elapsed_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
