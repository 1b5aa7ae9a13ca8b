//! The main error enum for the project lives here, and documents the various
//! conditions that can arise while issuing and resolving confirmation nonces.

use thiserror::Error;

/// This is our error enum. It contains an entry for any part of the system in
/// which an expectation is not met or a problem occurs.
#[derive(Error, Debug)]
pub enum Error {
    /// A config value makes no sense (a file store with no path, a template
    /// missing its placeholder, etc).
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The configuration could not be parsed at all.
    #[error("configuration parse error")]
    ConfigParse(#[from] serde_yaml::Error),

    /// A nonce string wasn't hex. Could be garbage, could be a mangled link.
    #[error("nonce is not valid hex")]
    InvalidNonceFormat,

    /// A nonce string decoded fine but to the wrong number of bytes.
    #[error("nonce has invalid length: {0}")]
    InvalidNonceLength(usize),

    /// An IO error, generally from the file-backed store.
    #[error("io error {0:?}")]
    IoError(#[from] std::io::Error),

    /// The key material handed to us is empty or its ID isn't printable.
    #[error("public key is invalid")]
    KeyInvalid,

    /// The nonce isn't in the store. Unknown, expired, already used, or never
    /// issued: we don't say which.
    #[error("nonce not found")]
    NonceNotFound,

    /// The random source errored out or came up short. No nonce for you.
    #[error("random source failed")]
    RandomSource,

    /// The mail collaborator could not send a message.
    #[error("failed to send mail: {0}")]
    SendFailed(String),

    /// The signing collaborator is not wired in.
    #[error("signer is not available")]
    SignerUnavailable,

    /// The signing collaborator failed to certify a key.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// An entry in the durable store could not be read back.
    #[error("store entry is corrupt: {0}")]
    StoreCorrupt(String),

    /// Someone panicked while holding a store lock.
    #[error("store lock poisoned")]
    StoreLockPoisoned,

    /// The request store is not wired in.
    #[error("store is not available")]
    StoreUnavailable,

    /// A notification template is missing a placeholder it needs.
    #[error("invalid template: {0}")]
    TemplateInvalid(String),

    /// An inbound message didn't pass validation (bad signature, no key, no
    /// sender, etc).
    #[error("message validation failed: {0}")]
    Validation(String),
}

impl Error {
    /// Whether this error should be shown to an outside caller as the one
    /// uniform "that token didn't work" rejection. Anything that would help
    /// someone guess which tokens exist lands here.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::InvalidNonceFormat | Self::InvalidNonceLength(_) | Self::NonceNotFound)
    }

    /// Whether this error is a wiring/backend fault an operator needs to hear
    /// about, as opposed to bad input from a sender.
    pub fn is_operator_fault(&self) -> bool {
        matches!(
            self,
            Self::ConfigInvalid(_)
                | Self::ConfigParse(_)
                | Self::IoError(_)
                | Self::RandomSource
                | Self::SignerUnavailable
                | Self::StoreCorrupt(_)
                | Self::StoreLockPoisoned
                | Self::StoreUnavailable
                | Self::TemplateInvalid(_)
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::StoreLockPoisoned
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        // std::io::Error and serde_yaml::Error are not eq-able, so compare the
        // debug output and move on with our lives.
        format!("{:?}", self) == format!("{:?}", other)
    }
}

/// Wraps `std::result::Result` around our `Error` enum
pub type Result<T> = std::result::Result<T, Error>;
