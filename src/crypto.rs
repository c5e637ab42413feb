use aes::Aes128;
use block_modes::block_padding::Pkcs7;
use block_modes::{BlockMode, Ecb};

use crate::error::{NcmError, Result};

type Aes128Ecb = Ecb<Aes128, Pkcs7>;

/// AES key protecting the per-file audio key block.
pub const CORE_KEY: [u8; 16] = [
    0x68, 0x7A, 0x48, 0x52, 0x41, 0x6D, 0x73, 0x6F, 0x35, 0x6B, 0x49, 0x6E, 0x62, 0x61, 0x78, 0x57,
];

/// AES key protecting the metadata block.
pub const META_KEY: [u8; 16] = [
    0x23, 0x31, 0x34, 0x6C, 0x6A, 0x6B, 0x5F, 0x21, 0x5C, 0x5D, 0x26, 0x30, 0x55, 0x3C, 0x27, 0x28,
];

const KEY_XOR_MASK: u8 = 0x64;

// "neteasecloudmusic", stripped from the decrypted key plaintext.
const KEY_PREFIX_LEN: usize = 17;

/// Fixed-key AES-128-ECB decryption with PKCS#7 unpadding.
pub fn aes_ecb_decrypt(key: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(NcmError::Crypto(
            "ciphertext is not a whole number of aes blocks",
        ));
    }

    let cipher =
        Aes128Ecb::new_from_slices(key, &[]).map_err(|_| NcmError::Crypto("bad aes key"))?;

    cipher
        .decrypt_vec(ciphertext)
        .map_err(|_| NcmError::Crypto("aes padding check failed"))
}

#[cfg(test)]
pub(crate) fn aes_ecb_encrypt(key: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    Aes128Ecb::new_from_slices(key, &[])
        .unwrap()
        .encrypt_vec(plaintext)
}

/// Recovers the raw per-file audio key from the obfuscated key block:
/// XOR mask, AES-ECB decrypt, drop the fixed textual prefix.
pub fn recover_key(block: &[u8]) -> Result<Vec<u8>> {
    let masked = block.iter().map(|b| b ^ KEY_XOR_MASK).collect::<Vec<u8>>();

    let plain = aes_ecb_decrypt(&CORE_KEY, &masked)?;

    if plain.len() <= KEY_PREFIX_LEN {
        return Err(NcmError::Crypto("recovered key shorter than its prefix"));
    }

    Ok(plain[KEY_PREFIX_LEN..].to_vec())
}

/// 256-entry substitution box derived from the recovered audio key.
///
/// Building it is a pure function of the key bytes, and the result is
/// always a permutation of 0..=255.
pub struct KeyBox {
    entries: [u8; 256],
}

impl KeyBox {
    pub fn build(key: &[u8]) -> Result<KeyBox> {
        if key.is_empty() {
            return Err(NcmError::InvalidContainer("audio key is empty"));
        }

        let mut entries = [0u8; 256];
        for (i, slot) in entries.iter_mut().enumerate() {
            *slot = i as u8;
        }

        let mut last = 0usize;
        let mut offset = 0usize;

        for i in 0..256 {
            let swap = entries[i];
            let c = (swap as usize + last + key[offset] as usize) & 0xff;
            offset = (offset + 1) % key.len();
            entries[i] = entries[c];
            entries[c] = swap;
            last = c;
        }

        Ok(KeyBox { entries })
    }

    /// XORs `buffer` with the keystream starting at payload offset
    /// `offset`. The transform is its own inverse, and because the offset
    /// is the running byte position, chunked application gives the same
    /// result as transforming the whole payload at once.
    pub fn apply(&self, offset: u64, buffer: &mut [u8]) {
        for (index, byte) in buffer.iter_mut().enumerate() {
            let j = ((offset + index as u64 + 1) & 0xff) as usize;
            let a = self.entries[j] as usize;
            let b = self.entries[(a + j) & 0xff] as usize;
            *byte ^= self.entries[(a + b) & 0xff];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Recovered key and its key box from a known-good file, as produced by
    // the reference schedule.
    const KNOWN_KEY: [u8; 96] = [
        0x31, 0x31, 0x38, 0x31, 0x39, 0x38, 0x30, 0x33, 0x33, 0x32, 0x38, 0x35, 0x45, 0x37, 0x66,
        0x54, 0x34, 0x39, 0x78, 0x37, 0x64, 0x6F, 0x66, 0x39, 0x4F, 0x4B, 0x43, 0x67, 0x67, 0x39,
        0x63, 0x64, 0x76, 0x68, 0x45, 0x75, 0x65, 0x7A, 0x79, 0x33, 0x69, 0x5A, 0x43, 0x4C, 0x31,
        0x6E, 0x46, 0x76, 0x42, 0x46, 0x64, 0x31, 0x54, 0x34, 0x75, 0x53, 0x6B, 0x74, 0x41, 0x4A,
        0x4B, 0x6D, 0x77, 0x5A, 0x58, 0x73, 0x69, 0x6A, 0x50, 0x62, 0x69, 0x6A, 0x6C, 0x69, 0x69,
        0x6F, 0x6E, 0x56, 0x55, 0x58, 0x58, 0x67, 0x39, 0x70, 0x6C, 0x54, 0x62, 0x58, 0x45, 0x63,
        0x6C, 0x41, 0x45, 0x39, 0x4C, 0x62,
    ];

    const KNOWN_BOX: [u8; 256] = [
        0x43, 0x63, 0x9D, 0xE2, 0x5B, 0x4B, 0x55, 0xBB, 0x4C, 0xCF, 0x2A, 0x62, 0x0E, 0x48, 0x8A,
        0x15, 0x59, 0x52, 0xBA, 0x6C, 0xEF, 0x6D, 0x72, 0x39, 0xA0, 0x9A, 0xA9, 0x27, 0x66, 0xBC,
        0xF9, 0xC0, 0x47, 0xDF, 0x7D, 0xDE, 0x3B, 0x81, 0x04, 0xFF, 0x90, 0x77, 0x80, 0x50, 0x54,
        0xBD, 0x0D, 0x58, 0x34, 0x0A, 0x44, 0xA8, 0x5F, 0x99, 0xC6, 0xBE, 0x4E, 0x4D, 0x13, 0x17,
        0x83, 0x01, 0x35, 0x5C, 0xF4, 0x7B, 0x53, 0x31, 0x86, 0xD4, 0xB8, 0xAB, 0xD1, 0xB5, 0x68,
        0xDC, 0x96, 0xF1, 0x9C, 0xE8, 0x7A, 0x1B, 0xB0, 0x56, 0x22, 0x1A, 0x51, 0x92, 0xBF, 0xFA,
        0xB1, 0x19, 0x88, 0x26, 0x49, 0x08, 0xEB, 0xAC, 0x14, 0x28, 0xAD, 0x3A, 0x8C, 0x85, 0x84,
        0x2C, 0x82, 0xB3, 0xA6, 0xA2, 0xA3, 0x12, 0x78, 0xA1, 0x57, 0xAE, 0x00, 0x2F, 0xB6, 0x61,
        0xA5, 0x6F, 0x5A, 0x89, 0x29, 0x46, 0x2E, 0x4F, 0x36, 0x40, 0x07, 0x87, 0xA7, 0x65, 0x73,
        0xC4, 0x7C, 0x33, 0x1E, 0xE5, 0x10, 0xB4, 0xFD, 0xC9, 0xE0, 0xB7, 0x97, 0x32, 0x5D, 0x64,
        0x41, 0xF0, 0x20, 0xC3, 0x95, 0xFE, 0xD2, 0x21, 0xFB, 0x75, 0x3D, 0x0B, 0x3E, 0xF2, 0xD5,
        0xCB, 0xD6, 0xF7, 0x1F, 0x24, 0x45, 0x69, 0xB9, 0xDA, 0x6A, 0x76, 0x03, 0xF8, 0x70, 0x8E,
        0xC1, 0xC8, 0xD7, 0x4A, 0xD0, 0x9E, 0xCD, 0xA4, 0xCE, 0xAA, 0x1D, 0xED, 0xF6, 0x02, 0x60,
        0xE3, 0xDB, 0x8D, 0x09, 0xF3, 0x37, 0xE1, 0xC5, 0xCA, 0x8F, 0x2D, 0x7F, 0x74, 0x42, 0x6E,
        0x8B, 0x3F, 0x23, 0xC2, 0xD3, 0xCC, 0xD9, 0xEE, 0x98, 0xE6, 0x11, 0x05, 0xEA, 0xD8, 0xB2,
        0xE4, 0xF5, 0xE7, 0x71, 0x2B, 0x93, 0x9B, 0x3C, 0x30, 0xE9, 0xC7, 0x38, 0xEC, 0x18, 0x6B,
        0x79, 0xFC, 0xAF, 0x5E, 0x9F, 0x7E, 0x91, 0xDD, 0x16, 0x94, 0x0F, 0x06, 0x67, 0x25, 0x0C,
        0x1C,
    ];

    #[test]
    fn key_box_matches_known_schedule() {
        let key_box = KeyBox::build(&KNOWN_KEY).unwrap();

        assert_eq!(key_box.entries, KNOWN_BOX);
    }

    #[test]
    fn key_box_is_deterministic_permutation() {
        let first = KeyBox::build(b"a rather short key").unwrap();
        let second = KeyBox::build(b"a rather short key").unwrap();

        assert_eq!(first.entries, second.entries);

        let mut sorted = first.entries;
        sorted.sort_unstable();
        for (value, slot) in sorted.iter().enumerate() {
            assert_eq!(*slot, value as u8);
        }
    }

    #[test]
    fn single_byte_key_still_builds() {
        let key_box = KeyBox::build(&[0x42]).unwrap();

        let mut sorted = key_box.entries;
        sorted.sort_unstable();
        assert_eq!(sorted[0], 0);
        assert_eq!(sorted[255], 255);
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            KeyBox::build(&[]),
            Err(NcmError::InvalidContainer(_))
        ));
    }

    #[test]
    fn keystream_is_self_inverse() {
        let key_box = KeyBox::build(&KNOWN_KEY).unwrap();
        let original = (0..4096).map(|i| (i % 251) as u8).collect::<Vec<u8>>();

        let mut data = original.clone();
        key_box.apply(0, &mut data);
        assert_ne!(data, original);

        key_box.apply(0, &mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn keystream_is_continuous_across_chunks() {
        let key_box = KeyBox::build(b"0123456789abcdef").unwrap();
        let mut whole = (0..100_000u32).map(|i| (i * 7 % 256) as u8).collect::<Vec<u8>>();
        let mut chunked = whole.clone();

        key_box.apply(0, &mut whole);

        let mut offset = 0u64;
        for chunk in chunked.chunks_mut(0xF000) {
            key_box.apply(offset, chunk);
            offset += chunk.len() as u64;
        }

        assert_eq!(whole, chunked);
    }

    #[test]
    fn recover_key_inverts_the_obfuscation() {
        let mut plaintext = b"neteasecloudmusic".to_vec();
        plaintext.extend_from_slice(&KNOWN_KEY);

        let block = aes_ecb_encrypt(&CORE_KEY, &plaintext)
            .iter()
            .map(|b| b ^ 0x64)
            .collect::<Vec<u8>>();

        assert_eq!(recover_key(&block).unwrap(), KNOWN_KEY.to_vec());
    }

    #[test]
    fn ragged_ciphertext_is_a_crypto_error() {
        assert!(matches!(
            aes_ecb_decrypt(&CORE_KEY, &[0u8; 15]),
            Err(NcmError::Crypto(_))
        ));
        assert!(matches!(
            aes_ecb_decrypt(&CORE_KEY, &[]),
            Err(NcmError::Crypto(_))
        ));
    }
}
