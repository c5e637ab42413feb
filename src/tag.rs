use std::path::Path;

use audiotags::{MimeType, Picture, Tag, TagType};

use crate::container::AudioKind;
use crate::error::{NcmError, Result};
use crate::meta::{CoverImage, ImageMime, Metadata};

/// Stamped into the comment field of every restored file.
pub const COMMENT: &str = "Restored from an ncm container";

/// Writes the recovered tags and cover art into the decrypted audio file.
/// The tag container internals (ID3v2 vs flac metadata blocks) are the
/// tagging library's business.
pub fn write_tags(
    path: &Path,
    kind: AudioKind,
    metadata: Option<&Metadata>,
    cover: Option<&CoverImage>,
) -> Result<()> {
    let tag_type = match kind {
        AudioKind::Mp3 => TagType::Id3v2,
        AudioKind::Flac => TagType::Flac,
    };

    let mut tag = Tag::new().with_tag_type(tag_type).read_from_path(path)?;

    if let Some(metadata) = metadata {
        tag.set_title(&metadata.name);
        tag.set_artist(&metadata.artist);
        tag.set_album_title(&metadata.album);
    }

    if let Some(cover) = cover {
        let mime_type = match cover.mime() {
            ImageMime::Png => MimeType::Png,
            ImageMime::Jpeg => MimeType::Jpeg,
        };
        tag.set_album_cover(Picture {
            mime_type,
            data: &cover.data,
        });
    }

    tag.set_comment(COMMENT.to_string());

    tag.write_to_path(path.to_str().ok_or(NcmError::PathEncoding)?)?;

    Ok(())
}
