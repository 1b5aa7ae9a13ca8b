//! Welcome to the mailsign core, the part of a mail-based key validation
//! server that decides whether a stranger gets their OpenPGP key signed.
//!
//! The deal the server offers is simple: mail us a signed request with your
//! public key attached, prove you can read mail at the address you sent it
//! from, and we'll certify that key for that address. Proving the mailbox part
//! is done with a nonce. We mint a random token, remember which request it
//! belongs to, and mail it (encrypted to your key) to the address you claim.
//! Hand the token back and you get your key, signed.
//!
//! That protocol is what lives here:
//!
//! 1. [Nonces](nonce), the unguessable capability tokens themselves.
//! 1. The [request store](store), which remembers what each nonce was issued
//! for between intake and confirmation (in memory, on disk, or not at all).
//! 1. The [resolver](confirm), which turns a nonce back into a request, has
//! the key certified, and builds the mail that carries it back.
//! 1. [Intake](intake), the thin layer that takes a validated inbound mail
//! and kicks off the whole thing.
//!
//! Parsing mail, verifying signatures, producing certifications, and actually
//! sending mail happen elsewhere; the core talks to those through the
//! [gpg] and [mail] traits.

pub mod error;
pub(crate) mod util;
pub mod config;
pub mod confirm;
pub mod gpg;
pub mod intake;
pub mod key;
pub mod mail;
pub mod nonce;
pub mod request;
pub mod store;
pub mod template;

pub use util::Timestamp;
