use std::io::{Read, Seek, SeekFrom};

use crate::error::{NcmError, Result};

/// Sequential binary reader over the container bytes.
///
/// Header reads are strict: a short read means the header is truncated and
/// the file cannot be decrypted, so there is no EOF tolerance before the
/// payload starts.
pub struct ByteReader<R> {
    inner: R,
}

impl<R: Read + Seek> ByteReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads exactly `n` bytes or fails with `IoTruncated`.
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; n];

        self.inner
            .read_exact(&mut buffer)
            .map_err(|_| NcmError::IoTruncated(n))?;

        Ok(buffer)
    }

    /// Reads one little-endian signed 32-bit length field.
    pub fn read_length(&mut self) -> Result<i32> {
        let mut buffer = [0u8; 4];

        self.inner
            .read_exact(&mut buffer)
            .map_err(|_| NcmError::IoTruncated(4))?;

        Ok(i32::from_le_bytes(buffer))
    }

    /// Advances the cursor by `n` bytes without looking at them.
    pub fn skip(&mut self, n: i64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Current(n))
            .map_err(|_| NcmError::IoSeekFailed(n))?;

        Ok(())
    }

    /// Reads up to `buffer.len()` bytes of payload. Returning 0 means the
    /// stream is exhausted; this is the loop-termination signal for the
    /// payload decryptor.
    pub fn read_some(&mut self, buffer: &mut [u8]) -> Result<usize> {
        Ok(self.inner.read(buffer)?)
    }
}
