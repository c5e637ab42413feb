use base64::Engine;
use log::warn;
use serde::Deserialize;
use serde_json::Value;

use crate::crypto::{aes_ecb_decrypt, META_KEY};
use crate::error::{NcmError, Result};

const META_XOR_MASK: u8 = 0x63;

// "163 key(Don't modify):", stripped before base64 decoding.
const META_PREFIX_LEN: usize = 22;

// "music:", stripped from the decrypted json.
const JSON_PREFIX_LEN: usize = 6;

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMeta {
    #[serde(rename = "musicName")]
    music_name: String,

    album: String,

    artist: Vec<Vec<Value>>,

    bitrate: i64,

    duration: i64,

    format: String,
}

/// Track description recovered from the metadata block. Every field keeps
/// its empty/zero default when the json omits it.
#[derive(Debug, Default, Clone)]
pub struct Metadata {
    pub name: String,
    pub album: String,
    pub artist: String,
    pub format: String,
    pub duration: i64,
    pub bitrate: i64,
}

/// Decodes the obfuscated metadata block: XOR mask, fixed prefix, base64,
/// AES-ECB, another fixed prefix, json.
///
/// Base64 and AES failures abort the file, but unparseable json only drops
/// the tags, so the audio is still restored.
pub fn decode_metadata(block: &[u8]) -> Result<Option<Metadata>> {
    let unmasked = block.iter().map(|b| b ^ META_XOR_MASK).collect::<Vec<u8>>();

    if unmasked.len() <= META_PREFIX_LEN {
        return Err(NcmError::InvalidContainer(
            "metadata block shorter than its prefix",
        ));
    }

    let decoded = base64::prelude::BASE64_STANDARD
        .decode(&unmasked[META_PREFIX_LEN..])
        .map_err(|_| NcmError::Crypto("metadata block is not valid base64"))?;

    let plain = aes_ecb_decrypt(&META_KEY, &decoded)?;

    if plain.len() <= JSON_PREFIX_LEN {
        return Err(NcmError::InvalidContainer(
            "metadata json shorter than its prefix",
        ));
    }

    let raw: RawMeta = match serde_json::from_slice(&plain[JSON_PREFIX_LEN..]) {
        Ok(raw) => raw,
        Err(error) => {
            warn!("metadata json is unreadable, tags will be skipped: {}", error);
            return Ok(None);
        }
    };

    Ok(Some(Metadata {
        name: raw.music_name,
        album: raw.album,
        artist: join_artists(&raw.artist),
        format: raw.format,
        duration: raw.duration,
        bitrate: raw.bitrate,
    }))
}

/// Joins artist names with `/`, iterating one entry short of the array.
/// The format's own client drops the last artist this way, so files we
/// retag stay byte-for-byte comparable with ones it produced.
fn join_artists(artists: &[Vec<Value>]) -> String {
    let mut joined = String::new();

    for entry in artists.iter().take(artists.len().saturating_sub(1)) {
        if let Some(name) = entry.first().and_then(Value::as_str) {
            joined.push_str(name);
            joined.push('/');
        }
    }

    joined
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
        }
    }
}

/// Raw embedded cover art. The container stores no content type, so it is
/// sniffed from the leading bytes.
#[derive(Debug, Clone)]
pub struct CoverImage {
    pub data: Vec<u8>,
}

impl CoverImage {
    pub fn mime(&self) -> ImageMime {
        if self.data.starts_with(&PNG_SIGNATURE) {
            ImageMime::Png
        } else {
            ImageMime::Jpeg
        }
    }
}
