use std::io::{Read, Seek, Write};

use crate::crypto::{recover_key, KeyBox};
use crate::error::{NcmError, Result};
use crate::meta::{decode_metadata, CoverImage, Metadata};
use crate::reader::ByteReader;

pub const MAGIC: [u8; 8] = *b"CTENFDAM";

/// Payload is decrypted through a bounded buffer of this size.
pub const PAYLOAD_CHUNK: usize = 0xF000;

/// Output container kind, decided once from the first decrypted bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKind {
    Mp3,
    Flac,
}

impl AudioKind {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioKind::Mp3 => "mp3",
            AudioKind::Flac => "flac",
        }
    }

    /// An ID3 header means mp3; everything else is written out as flac.
    pub fn sniff(first_bytes: &[u8]) -> AudioKind {
        if first_bytes.starts_with(b"ID3") {
            AudioKind::Mp3
        } else {
            AudioKind::Flac
        }
    }
}

/// A parsed container header, positioned at the start of the encrypted
/// audio payload.
pub struct NcmContainer<R> {
    reader: ByteReader<R>,
    key_box: KeyBox,
    pub metadata: Option<Metadata>,
    pub cover: Option<CoverImage>,
}

impl<R: Read + Seek> NcmContainer<R> {
    /// Walks the header strictly front to back: magic, key block, metadata
    /// block, skipped checksum fields, cover image. Any failure is fatal
    /// for this file.
    pub fn parse(source: R) -> Result<Self> {
        let mut reader = ByteReader::new(source);

        let magic = reader.read_exact(8)?;
        if magic != MAGIC {
            return Err(NcmError::NotAnNcmFile);
        }

        // format version, unused
        reader.skip(2)?;

        let key_length = reader.read_length()?;
        if key_length <= 0 {
            return Err(NcmError::InvalidContainer(
                "key block length must be positive",
            ));
        }
        let key_block = reader.read_exact(key_length as usize)?;
        let key_box = KeyBox::build(&recover_key(&key_block)?)?;

        let meta_length = reader.read_length()?;
        let metadata = if meta_length > 0 {
            decode_metadata(&reader.read_exact(meta_length as usize)?)?
        } else {
            None
        };

        // crc32 and charset fields, unused
        reader.skip(9)?;

        let image_length = reader.read_length()?;
        let cover = if image_length > 0 {
            Some(CoverImage {
                data: reader.read_exact(image_length as usize)?,
            })
        } else {
            None
        };

        Ok(Self {
            reader,
            key_box,
            metadata,
            cover,
        })
    }

    /// Streams the decrypted payload into a sink.
    ///
    /// The output kind is sniffed from the first decrypted chunk, then
    /// `open` is called exactly once to produce the sink. The chunk buffer
    /// is reused, so the whole payload is never held in memory.
    pub fn extract<W, F>(&mut self, open: F) -> Result<AudioKind>
    where
        W: Write,
        F: FnOnce(AudioKind) -> std::io::Result<W>,
    {
        let mut buffer = vec![0u8; PAYLOAD_CHUNK];
        let mut offset = 0u64;

        let first = self.reader.read_some(&mut buffer)?;
        self.key_box.apply(offset, &mut buffer[..first]);

        let kind = AudioKind::sniff(&buffer[..first]);
        let mut sink = open(kind)?;

        sink.write_all(&buffer[..first])?;
        offset += first as u64;

        loop {
            let length = self.reader.read_some(&mut buffer)?;
            if length == 0 {
                break;
            }

            self.key_box.apply(offset, &mut buffer[..length]);
            sink.write_all(&buffer[..length])?;
            offset += length as u64;
        }

        sink.flush()?;

        Ok(kind)
    }
}
