//! Decode every model file under a directory

use std::path::{Path, PathBuf};
use std::time::Instant;

use walkdir::WalkDir;

use crate::cli::progress::{print_done, simple_bar};
use crate::converter::read_document;
use crate::formats::family_from_path;

fn collect_models(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| family_from_path(p).is_some())
        .collect();
    files.sort();
    files
}

/// Decode every `.mesh` and `.skeleton` under `dir` and report failures.
pub fn execute(dir: &Path, quiet: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let files = collect_models(dir);
    if files.is_empty() {
        println!("No .mesh or .skeleton files under {}", dir.display());
        return Ok(());
    }

    let pb = (!quiet).then(|| simple_bar(files.len() as u64, "Validating"));
    let mut failures = Vec::new();
    for path in &files {
        if let Err(e) = read_document(path) {
            tracing::debug!("{}: {e}", path.display());
            failures.push((path.clone(), e));
        }
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    println!("Checked {} files, {} failed", files.len(), failures.len());
    for (path, error) in &failures {
        println!("  {}: {error}", path.display());
    }
    print_done(start.elapsed());

    if !failures.is_empty() {
        anyhow::bail!("{} of {} files failed to decode", failures.len(), files.len());
    }
    Ok(())
}
