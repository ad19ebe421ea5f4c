use anyhow::{anyhow, Result};
use std::fs::File;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Opens a file, naming its `kind` and path in the error.
pub fn open(path: &Path, kind: &str) -> Result<File> {
    match File::open(path) {
        Err(e) => Err(anyhow!("Opening {} file `{}`: {}", kind, path.display(), e)),
        Ok(file) => Ok(file),
    }
}

/// Removes `dir` and everything below it. A missing directory is fine.
pub fn rmdir(dir: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Recursively copies the contents of `src` into `dst`, creating directories
/// as needed. Returns the number of files copied.
pub fn copy_dir(src: &Path, dst: &Path) -> io::Result<usize> {
    let mut copied = 0;
    for result in WalkDir::new(src).min_depth(1) {
        let entry = result?;
        // strip_prefix() can't fail; every entry is below `src`
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
