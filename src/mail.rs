//! Outbound mail, as far as the core sees it.
//!
//! We don't speak SMTP. We build an [OutgoingMail] describing what should be
//! sent to whom, and a [Mailer] takes it from there (signing it with the
//! server key, encrypting it to the recipient, actually delivering it).

use crate::{error::Result, gpg::Certifier, key::PublicKey};
use std::sync::Arc;

/// A mail waiting to go out.
#[derive(Clone, getset::Getters)]
#[getset(get = "pub")]
pub struct OutgoingMail {
    /// The rendered body text.
    message: String,
    /// Who it goes to.
    recipient_email: String,
    /// The key to encrypt it to, if any.
    recipient_key: Option<PublicKey>,
    /// The signed key, for signed-key mails.
    attachment: Option<Vec<u8>>,
    /// The server-side signer, for mailers that sign what they send.
    #[getset(skip)]
    signer: Option<Arc<dyn Certifier>>,
}

impl OutgoingMail {
    /// A confirmation mail: just text, encrypted to the key being confirmed.
    pub fn confirmation<T: Into<String>>(message: String, recipient_email: T, recipient_key: PublicKey) -> Self {
        Self {
            message,
            recipient_email: recipient_email.into(),
            recipient_key: Some(recipient_key),
            attachment: None,
            signer: None,
        }
    }

    /// A signed-key mail: text plus the certified key as an attachment.
    pub fn signed_key<T: Into<String>>(message: String, recipient_email: T, recipient_key: PublicKey, attachment: Vec<u8>, signer: Arc<dyn Certifier>) -> Self {
        Self {
            message,
            recipient_email: recipient_email.into(),
            recipient_key: Some(recipient_key),
            attachment: Some(attachment),
            signer: Some(signer),
        }
    }

    /// The signer attached to this mail, if any.
    pub fn signer(&self) -> Option<&Arc<dyn Certifier>> {
        self.signer.as_ref()
    }
}

impl std::fmt::Debug for OutgoingMail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutgoingMail")
            .field("recipient_email", &self.recipient_email)
            .field("recipient_key", &self.recipient_key.as_ref().map(|k| k.key_id()))
            .field("attachment_len", &self.attachment.as_ref().map(|a| a.len()))
            .field("has_signer", &self.signer.is_some())
            .finish()
    }
}

/// Sends mail. Failures should come back as
/// [Error::SendFailed](crate::error::Error::SendFailed).
pub trait Mailer: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<()>;
}
