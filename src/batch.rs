use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::error::{NcmError, Result};
use crate::pipeline;

/// Outcome counts for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub restored: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Walks `root` recursively and collects every `.ncm` file exactly once.
fn collect(root: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(root)? {
        let path = entry?.path();

        if path.is_dir() {
            collect(&path, found)?;
        } else if path.extension().is_some_and(|ext| ext == "ncm") {
            found.push(path);
        }
    }

    Ok(())
}

/// Fans out one blocking pipeline task per discovered file.
///
/// Files share nothing, so a bad container is logged and counted without
/// touching its siblings. Only a panicked task aborts the batch, since
/// that is a programming fault rather than a bad input.
pub async fn run(root: PathBuf, out_dir: Option<PathBuf>) -> Result<BatchSummary> {
    let mut files = Vec::new();
    collect(&root, &mut files)?;

    info!("found {} ncm files under {:?}", files.len(), root);

    let mut tasks = Vec::with_capacity(files.len());
    for file in files {
        let out_dir = out_dir.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let outcome = pipeline::process_file(&file, out_dir.as_deref());
            (file, outcome)
        }));
    }

    let mut summary = BatchSummary::default();
    for task in tasks {
        let (file, outcome) = task
            .await
            .map_err(|join_error| NcmError::Io(std::io::Error::other(join_error)))?;

        match outcome {
            Ok(_) => summary.restored += 1,
            Err(NcmError::NotAnNcmFile) => {
                warn!("{:?} is not an ncm container, skipped", file);
                summary.skipped += 1;
            }
            Err(error) => {
                error!("{:?} failed: {}", file, error);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
