use thiserror::Error;

pub type Result<T> = std::result::Result<T, NcmError>;

/// Everything that can go wrong while restoring a single container.
///
/// Per-file failures are caught at the pipeline boundary, so none of these
/// ever aborts the rest of a batch. A magic mismatch is the only variant
/// that means "this is simply not our format".
#[derive(Debug, Error)]
pub enum NcmError {
    #[error("not an ncm container")]
    NotAnNcmFile,

    #[error("invalid container: {0}")]
    InvalidContainer(&'static str),

    #[error("truncated container while reading {0} bytes")]
    IoTruncated(usize),

    #[error("cannot skip {0} bytes forward")]
    IoSeekFailed(i64),

    #[error("crypto failure: {0}")]
    Crypto(&'static str),

    #[error("output path is not valid utf-8")]
    PathEncoding,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("tag write failed: {0}")]
    Tag(#[from] audiotags::Error),
}
