use std::fs::File;
use std::path::{Path, PathBuf};

use log::info;

use crate::container::{AudioKind, NcmContainer};
use crate::error::Result;
use crate::tag;

/// Runs the whole chain for one container: parse the header, stream the
/// payload into the output file, then write tags and cover art. Returns
/// the path of the restored audio file.
pub fn process_file(input: &Path, out_dir: Option<&Path>) -> Result<PathBuf> {
    let source = File::open(input)?;
    let mut container = NcmContainer::parse(source)?;

    let kind = container.extract(|kind| File::create(output_path(input, out_dir, kind)))?;
    let output = output_path(input, out_dir, kind);

    tag::write_tags(
        &output,
        kind,
        container.metadata.as_ref(),
        container.cover.as_ref(),
    )?;

    info!("restored {:?}", output);

    Ok(output)
}

/// The output keeps the input's base name with the extension swapped for
/// the sniffed kind, re-rooted into `out_dir` when one is given.
fn output_path(input: &Path, out_dir: Option<&Path>, kind: AudioKind) -> PathBuf {
    let renamed = input.with_extension(kind.extension());

    match (out_dir, renamed.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => renamed,
    }
}
