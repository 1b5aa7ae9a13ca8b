//! OpenPGP public keys, as far as we care about them.
//!
//! We don't parse OpenPGP here. The [validator](crate::gpg::Validator) hands
//! us the key's printable ID and its raw material, we hold onto both until
//! someone confirms, and then the [certifier](crate::gpg::Certifier) gets the
//! material back. The ID is the only part of a key that ever makes it into a
//! notification, so it gets checked on the way in.

use crate::error::{Error, Result};
use serde_derive::{Deserialize, Serialize};

/// An opaque OpenPGP public key.
///
/// Deserializing goes through [PublicKey::new], so a key read back off disk
/// gets the same scrutiny as one fresh from the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
#[serde(try_from = "UncheckedKey")]
pub struct PublicKey {
    /// The key's printable identifier (key ID or fingerprint).
    key_id: String,
    /// The key material itself, armored or binary, whatever the validator
    /// gave us.
    #[serde(with = "crate::util::ser::human_bytes")]
    material: Vec<u8>,
}

/// What a key looks like on the wire before anyone has checked it.
#[derive(Deserialize)]
struct UncheckedKey {
    key_id: String,
    #[serde(with = "crate::util::ser::human_bytes")]
    material: Vec<u8>,
}

impl TryFrom<UncheckedKey> for PublicKey {
    type Error = Error;
    fn try_from(unchecked: UncheckedKey) -> Result<Self> {
        Self::new(unchecked.key_id, unchecked.material)
    }
}

impl PublicKey {
    /// Wrap up a key. The ID must be non-empty ASCII alphanumerics (no spaces,
    /// no markup, nothing a sender could sneak into a message) and the
    /// material must be non-empty.
    pub fn new<T: Into<String>>(key_id: T, material: Vec<u8>) -> Result<Self> {
        let key_id = key_id.into();
        if key_id.is_empty() || !key_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            Err(Error::KeyInvalid)?;
        }
        if material.is_empty() {
            Err(Error::KeyInvalid)?;
        }
        Ok(Self { key_id, material })
    }

    /// The ID shown to humans, uppercased the way gpg prints them.
    pub fn fingerprint(&self) -> String {
        self.key_id.to_ascii_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates() {
        let key = PublicKey::new("3b2f9cc0a1d4e5f6", b"-----BEGIN PGP PUBLIC KEY BLOCK-----".to_vec()).unwrap();
        assert_eq!(key.key_id(), "3b2f9cc0a1d4e5f6");
        assert_eq!(key.fingerprint(), "3B2F9CC0A1D4E5F6");

        assert_eq!(PublicKey::new("", vec![1, 2, 3]), Err(Error::KeyInvalid));
        assert_eq!(PublicKey::new("3b2f 9cc0", vec![1, 2, 3]), Err(Error::KeyInvalid));
        assert_eq!(PublicKey::new("{{fingerprint}}", vec![1, 2, 3]), Err(Error::KeyInvalid));
        assert_eq!(PublicKey::new("3b2f9cc0", vec![]), Err(Error::KeyInvalid));
    }

    #[test]
    fn yaml_roundtrip_keeps_bytes() {
        let material: Vec<u8> = (0..=255).collect();
        let key = PublicKey::new("abcd1234", material.clone()).unwrap();
        let yaml = serde_yaml::to_string(&key).unwrap();
        let key2: PublicKey = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(key2.material(), &material);
        assert_eq!(key, key2);
    }

    #[test]
    fn deserialize_validates() {
        let material = crate::util::ser::base64_encode(b"-----BEGIN PGP PUBLIC KEY BLOCK-----");
        let good = format!("key_id: abcd1234\nmaterial: {}\n", material);
        assert!(serde_yaml::from_str::<PublicKey>(&good).is_ok());

        let sneaky = format!("key_id: \"<script>Click http://evil\"\nmaterial: {}\n", material);
        let err = serde_yaml::from_str::<PublicKey>(&sneaky).unwrap_err();
        assert!(err.to_string().contains("public key is invalid"));
        assert!(serde_yaml::from_str::<PublicKey>("key_id: abcd1234\nmaterial: \"\"\n").is_err());
    }
}
