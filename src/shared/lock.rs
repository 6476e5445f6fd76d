use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

// Exclusive OS file lock held for the lifetime of a monitor.
// Two monitors on one receiver would split its byte stream between them.
pub struct SourceLock {
    file: File,
    path: PathBuf,
}

impl SourceLock {
    // Lock `path` and record which source the holder is reading.
    pub fn acquire(path: &Path, source: &str) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("creating lock directory failed: {}", parent.display())
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("opening lock file failed: {}", path.display()))?;

        file.try_lock_exclusive().with_context(|| {
            format!(
                "another monitor already holds {} (requested source {})",
                path.display(),
                source
            )
        })?;

        file.set_len(0)
            .with_context(|| format!("truncating lock file failed: {}", path.display()))?;
        writeln!(file, "{} {}", std::process::id(), source)
            .with_context(|| format!("writing lock file failed: {}", path.display()))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SourceLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
