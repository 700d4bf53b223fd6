//! Filesystem collaborators for the sorting pipeline: moves, renames, and
//! delivery archives. No decision logic lives here — callers pass in fully
//! decided inputs and these helpers carry them out with logging and error
//! context.

use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Create `path` (and parents) if it does not exist yet.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))?;
        info!("created folder {}", path.display());
    }
    Ok(())
}

/// Move one file, creating the destination's parent folders as needed.
/// Falls back to copy-and-delete when a plain rename cannot cross devices.
pub fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    if fs::rename(source, dest).is_err() {
        fs::copy(source, dest)
            .with_context(|| format!("copying {} to {}", source.display(), dest.display()))?;
        fs::remove_file(source)
            .with_context(|| format!("removing {}", source.display()))?;
    }
    info!("moved {} -> {}", source.display(), dest.display());
    Ok(())
}

/// Move a folder, retrying up to `max_retries` times with `delay` between
/// attempts. Network shares intermittently hold folders open, so one failed
/// rename is not conclusive.
pub fn move_folder(source: &Path, dest: &Path, max_retries: usize, delay: Duration) -> Result<()> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    let max_retries = max_retries.max(1);
    let mut last_err = None;
    for attempt in 1..=max_retries {
        match fs::rename(source, dest) {
            Ok(()) => {
                info!("moved {} -> {}", source.display(), dest.display());
                return Ok(());
            }
            Err(e) => {
                warn!(
                    "moving {} failed on attempt {attempt}/{max_retries}: {e}",
                    source.display()
                );
                last_err = Some(e);
                if attempt < max_retries {
                    thread::sleep(delay);
                }
            }
        }
    }
    Err(last_err.unwrap()).with_context(|| {
        format!(
            "moving {} to {} after {max_retries} attempts",
            source.display(),
            dest.display()
        )
    })
}

/// Rename a file so its name carries no `{…}` annotations; returns the new
/// path (or the original when there is nothing to strip).
pub fn strip_annotations_rename(path: &Path) -> Result<PathBuf> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        bail!("{} has no usable file name", path.display());
    };
    let stripped = ab1_set::filenames::strip_annotations(name);
    if stripped == name {
        return Ok(path.to_path_buf());
    }
    let new_path = path.with_file_name(&stripped);
    if new_path.exists() {
        warn!("not renaming {name}: {stripped} already exists");
        return Ok(path.to_path_buf());
    }
    fs::rename(path, &new_path)
        .with_context(|| format!("renaming {} to {stripped}", path.display()))?;
    info!("renamed {name} to {stripped}");
    Ok(new_path)
}

/// Archive the files directly inside `folder` into a deflate zip at
/// `zip_path`. `include` limits entries to the given extensions (`None`
/// takes every file); `exclude` always wins. Returns the number of files
/// archived.
pub fn zip_order(
    folder: &Path,
    zip_path: &Path,
    include: Option<&[&str]>,
    exclude: &[&str],
) -> Result<usize> {
    let has_ext = |name: &str, exts: &[&str]| {
        exts.iter()
            .any(|ext| name.to_ascii_lowercase().ends_with(&format!(".{ext}")))
    };

    if let Some(parent) = zip_path.parent() {
        ensure_dir(parent)?;
    }
    let file = File::create(zip_path).with_context(|| format!("creating {}", zip_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut names: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(folder).with_context(|| folder.display().to_string())? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
            warn!("skipping non-unicode file name in {}", folder.display());
            continue;
        };
        if let Some(include) = include {
            if !has_ext(&name, include) {
                continue;
            }
        }
        if has_ext(&name, exclude) {
            continue;
        }
        names.push((name, path));
    }
    names.sort();

    for (name, path) in &names {
        zip.start_file(name.as_str(), options)?;
        let mut reader = File::open(path).with_context(|| path.display().to_string())?;
        io::copy(&mut reader, &mut zip)
            .with_context(|| format!("archiving {}", path.display()))?;
    }
    zip.finish().context("finalizing zip archive")?;
    info!(
        "created {} with {} files",
        zip_path.display(),
        names.len()
    );
    Ok(names.len())
}

/// The entry names inside an existing zip archive.
pub fn zip_file_names(zip_path: &Path) -> Result<Vec<String>> {
    let file = File::open(zip_path).with_context(|| zip_path.display().to_string())?;
    let archive = ZipArchive::new(file).with_context(|| zip_path.display().to_string())?;
    Ok(archive.file_names().map(String::from).collect())
}
