//! Configuration of common encryption.

use crate::{
    Error, Result,
    boxes::FourCc,
    sample_group::{CencSampleEncryptionGroupEntry, SampleGroupExtension},
};
use std::collections::HashMap;
use uuid::Uuid;

/// AES-128 content key.
pub type ContentKey = [u8; 16];

/// Key id to content key map.
pub type KeyTable = HashMap<Uuid, ContentKey>;

/// Protection scheme written into the `schm` box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scheme {
    /// AES-CTR.
    #[default]
    Cenc,
    /// AES-CBC.
    Cbc1,
}

impl Scheme {
    pub fn scheme_type(&self) -> FourCc {
        match self {
            Self::Cenc => FourCc::new(*b"cenc"),
            Self::Cbc1 => FourCc::new(*b"cbc1"),
        }
    }
}

/// Options of a [`CencEncryptingTrack`](crate::CencEncryptingTrack).
///
/// # Example
///
/// ```
/// use mp4_authoring::{CencEncryptOptions, Scheme};
///
/// let options = CencEncryptOptions::builder()
///     .key("eb676abbcb345e96bbcf616630f1a3da", "100b6c20940f779a4589152b57d2dacb")?
///     .default_kid("eb676abbcb345e96bbcf616630f1a3da")?
///     .scheme(Scheme::Cenc)
///     .build();
///
/// assert!(options.default_kid.is_some());
/// # Ok::<(), mp4_authoring::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CencEncryptOptions {
    pub keys: KeyTable,
    /// Key id of samples outside every group. `None` leaves them in the clear.
    pub default_kid: Option<Uuid>,
    /// Key rotation groups, later entries win on overlap.
    pub groups: SampleGroupExtension<CencSampleEncryptionGroupEntry>,
    pub scheme: Scheme,
    /// Start IVs at zero instead of a random value.
    pub dummy_ivs: bool,
    /// Describe every keyed sample as one clear subsample.
    pub encrypt_but_all_clear: bool,
}

impl CencEncryptOptions {
    pub fn builder() -> CencEncryptOptionsBuilder {
        CencEncryptOptionsBuilder::default()
    }
}

/// Builder for [`CencEncryptOptions`].
#[derive(Default)]
pub struct CencEncryptOptionsBuilder {
    options: CencEncryptOptions,
}

impl CencEncryptOptionsBuilder {
    /// Add a KID/key pair.
    ///
    /// # Arguments
    ///
    /// * `kid` - The Key ID as a 32-character hexadecimal string (16 bytes)
    /// * `key` - The content key as a 32-character hexadecimal string (16 bytes)
    pub fn key(mut self, kid: &str, key: &str) -> Result<Self> {
        self.options
            .keys
            .insert(Uuid::from_bytes(parse_hex_16(kid)?), parse_hex_16(key)?);
        Ok(self)
    }

    /// Add a KID/key pair from raw values.
    pub fn key_bytes(mut self, kid: Uuid, key: ContentKey) -> Self {
        self.options.keys.insert(kid, key);
        self
    }

    /// Set the default key id from a 32-character hexadecimal string.
    pub fn default_kid(mut self, kid: &str) -> Result<Self> {
        self.options.default_kid = Some(Uuid::from_bytes(parse_hex_16(kid)?));
        Ok(self)
    }

    pub fn default_kid_bytes(mut self, kid: Uuid) -> Self {
        self.options.default_kid = Some(kid);
        self
    }

    /// Assign samples (0-based indices) to a key rotation group.
    pub fn group<I: IntoIterator<Item = usize>>(
        mut self,
        entry: CencSampleEncryptionGroupEntry,
        samples: I,
    ) -> Self {
        self.options.groups.add(entry, samples);
        self
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.options.scheme = scheme;
        self
    }

    pub fn dummy_ivs(mut self, dummy_ivs: bool) -> Self {
        self.options.dummy_ivs = dummy_ivs;
        self
    }

    pub fn encrypt_but_all_clear(mut self, encrypt_but_all_clear: bool) -> Self {
        self.options.encrypt_but_all_clear = encrypt_but_all_clear;
        self
    }

    pub fn build(self) -> CencEncryptOptions {
        self.options
    }
}

/// Parse a 16-byte hex string.
fn parse_hex_16(input: &str) -> Result<[u8; 16]> {
    let bytes = hex::decode(input.replace('-', ""))?;
    if bytes.len() != 16 {
        return Err(Error::HexWrongLength(bytes.len()));
    }
    let mut arr = [0u8; 16];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_with_key() {
        let options = CencEncryptOptions::builder()
            .key(
                "eb676abbcb345e96bbcf616630f1a3da",
                "100b6c20940f779a4589152b57d2dacb",
            )
            .unwrap()
            .dummy_ivs(true)
            .build();

        let kid = Uuid::parse_str("eb676abbcb345e96bbcf616630f1a3da").unwrap();
        assert_eq!(options.keys.get(&kid).unwrap()[0], 0x10);
        assert!(options.dummy_ivs);
        assert_eq!(options.scheme, Scheme::Cenc);
    }

    #[test]
    fn test_parse_hex_16() {
        assert!(parse_hex_16("eb676abb-cb34-5e96-bbcf-616630f1a3da").is_ok());
    }

    #[test]
    fn test_parse_hex_16_invalid() {
        assert!(matches!(parse_hex_16("invalid"), Err(Error::InvalidHex(_))));
        assert!(matches!(parse_hex_16("abcd"), Err(Error::HexWrongLength(2))));
    }

    #[test]
    fn test_scheme_type() {
        assert_eq!(Scheme::Cbc1.scheme_type().to_string(), "cbc1");
    }
}
