//! Nonces are the capability tokens that tie a confirmation back to the
//! request that started it.
//!
//! When a signed request comes in, we mint a fresh nonce, park the request in
//! the [store](crate::store) under it, and mail the nonce (as hex) to the
//! address the request claims. Whoever shows up later holding that nonce has
//! proven they can read that mailbox. That's the whole trick, so the nonce had
//! better be unguessable: 32 bytes straight from a CSPRNG, and if the CSPRNG
//! can't deliver, we don't make a nonce at all.

use crate::error::{Error, Result};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// How many bytes are in a nonce.
pub const NONCE_LENGTH: usize = 32;

/// How many characters are in a hex-encoded nonce.
pub const NONCE_HEX_LENGTH: usize = NONCE_LENGTH * 2;

/// A fixed-length random token. Usable as a map key; compared in constant
/// time.
#[derive(Clone, Copy, Hash)]
pub struct Nonce([u8; NONCE_LENGTH]);

impl Nonce {
    /// Create a new nonce using the operating system's random source.
    pub fn generate() -> Result<Self> {
        Self::generate_with(&mut OsRng)
    }

    /// Create a new nonce from the given random source. If the source fails to
    /// fill every byte we bail with [`Error::RandomSource`].
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let mut randbuf = [0u8; NONCE_LENGTH];
        rng.try_fill_bytes(&mut randbuf)
            .map_err(|_| Error::RandomSource)?;
        Ok(Self(randbuf))
    }

    /// Wrap some existing bytes as a nonce.
    pub fn from_bytes(bytes: [u8; NONCE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Grab the raw bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_LENGTH] {
        &self.0
    }

    /// Lowercase hex, always [`NONCE_HEX_LENGTH`] characters.
    pub fn encode(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a nonce from its hex form.
    ///
    /// Anything that isn't hex is [`Error::InvalidNonceFormat`]. Hex that
    /// decodes to anything other than [`NONCE_LENGTH`] bytes is
    /// [`Error::InvalidNonceLength`].
    pub fn decode(string: &str) -> Result<Self> {
        let bytes = hex::decode(string)
            .map_err(|_| Error::InvalidNonceFormat)?;
        let len = bytes.len();
        let arr: [u8; NONCE_LENGTH] = bytes.try_into()
            .map_err(|_| Error::InvalidNonceLength(len))?;
        Ok(Self(arr))
    }

    /// A short tag that identifies this nonce in log output without writing
    /// the nonce itself to the logs (anyone reading the logs could otherwise
    /// confirm other people's keys).
    pub fn log_id(&self) -> String {
        let hash = blake3::hash(&self.0);
        hex::encode(&hash.as_bytes()[0..6])
    }
}

/// Scan some free text (say, the body of a reply mail) for something that
/// looks like a hex nonce and decode it.
///
/// Only whole runs of exactly [`NONCE_HEX_LENGTH`] hex characters count, so a
/// longer hex blob (a message ID, a long hash) doesn't get chopped up into a
/// nonce by accident. A v5/v6 OpenPGP fingerprint is the same length as a
/// nonce though, so when there's more than one candidate, the one right after
/// a `nonce=` (from a quoted confirmation link) wins, and failing that the
/// last one does. Replies quote the confirmation below whatever the sender
/// wrote.
pub fn find_in_text(text: &str) -> Option<Nonce> {
    const MARKER: &str = "nonce=";
    let mut last = None;
    for run in text.split(|c: char| !c.is_ascii_hexdigit()) {
        if run.len() != NONCE_HEX_LENGTH {
            continue;
        }
        let nonce = match Nonce::decode(run) {
            Ok(nonce) => nonce,
            Err(_) => continue,
        };
        let start = run.as_ptr() as usize - text.as_ptr() as usize;
        let linked = text.get(start.saturating_sub(MARKER.len())..start)
            .map_or(false, |before| before.eq_ignore_ascii_case(MARKER));
        if linked {
            return Some(nonce);
        }
        last = Some(nonce);
    }
    last
}

impl ConstantTimeEq for Nonce {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for Nonce {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for Nonce {}

impl std::fmt::Display for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // keep the actual token out of debug output
        write!(f, "Nonce({})", self.log_id())
    }
}

impl FromStr for Nonce {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for Nonce {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where S: Serializer,
    {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where D: Deserializer<'de>,
    {
        let s = <String>::deserialize(deserializer)?;
        Nonce::decode(&s).map_err(de::Error::custom)
    }
}
