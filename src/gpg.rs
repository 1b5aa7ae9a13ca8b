//! The OpenPGP side of things, as far as the core sees it.
//!
//! Parsing mail, checking signatures, decrypting, and producing certifications
//! all happen elsewhere. The core only needs two things from that world: a way
//! to turn a raw inbound message into "this mailbox wants this key certified,"
//! and a way to actually certify a key for a mailbox.

use crate::{error::Result, key::PublicKey};

/// What a successfully validated inbound message boils down to.
#[derive(Debug, Clone, PartialEq, getset::Getters)]
#[getset(get = "pub")]
pub struct ValidatedRequest {
    /// The mailbox the message came from.
    email: String,
    /// The key the sender wants certified.
    key: PublicKey,
}

impl ValidatedRequest {
    pub fn new<T: Into<String>>(email: T, key: PublicKey) -> Self {
        Self {
            email: email.into(),
            key,
        }
    }

    pub fn into_parts(self) -> (String, PublicKey) {
        (self.email, self.key)
    }
}

/// Checks an inbound message and pulls out the claimant and their key.
///
/// Implementations report a bad message (unsigned, signed by some other key,
/// no key attached, etc) as [Error::Validation](crate::error::Error::Validation).
pub trait Validator: Send + Sync {
    fn verify_and_extract(&self, raw: &[u8]) -> Result<ValidatedRequest>;
}

/// Produces the server's certification of a key for a mailbox.
///
/// The returned bytes are the signed key, ready to attach to a mail. Whatever
/// error an implementation returns is reported by the resolver as a signing
/// failure; nothing retries.
pub trait Certifier: Send + Sync {
    fn certify(&self, email: &str, key: &PublicKey) -> Result<Vec<u8>>;
}
