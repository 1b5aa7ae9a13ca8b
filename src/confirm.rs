//! Resolving a nonce: the moment a stranger either gets their key signed or
//! doesn't.
//!
//! Someone shows up with a nonce (by clicking a link or replying to the
//! confirmation mail). If the store has a request under it, we pull the
//! request out, have the certifier sign the requester's key for the
//! requester's mailbox, and hand back a mail carrying the signed key. If it
//! doesn't, they get the same flat "not found" no matter why.
//!
//! A request is removed from the store the moment it's resolved, so the same
//! link can't be used to get the same key signed twice. The lookup and the
//! removal are one atomic [take](crate::store::RequestStore::take), so two
//! clicks racing each other can't both win either. If signing fails, or the
//! signed key can't be mailed out, the request is put back so the link still
//! works once things are fixed. A signature nobody ever received doesn't
//! count as the link being used.

use crate::{
    error::{Error, Result},
    gpg::Certifier,
    mail::OutgoingMail,
    nonce::Nonce,
    request::PendingRequest,
    store::RequestStore,
    template::Templates,
    util::Timestamp,
};
use chrono::Duration;
use std::sync::Arc;

/// Resolves nonces into signed-key mails.
///
/// Either collaborator may be missing (a server started without a signing
/// key, or with its store torn down). That's a wiring problem, and `confirm`
/// says so loudly with [Error::SignerUnavailable] or [Error::StoreUnavailable]
/// rather than pretending the nonce wasn't found.
#[derive(Clone)]
pub struct Resolver {
    store: Option<Arc<dyn RequestStore>>,
    signer: Option<Arc<dyn Certifier>>,
    templates: Arc<Templates>,
    ttl: Option<Duration>,
}

impl Resolver {
    pub fn new(store: Option<Arc<dyn RequestStore>>, signer: Option<Arc<dyn Certifier>>, templates: Arc<Templates>) -> Self {
        Self {
            store,
            signer,
            templates,
            ttl: None,
        }
    }

    /// Requests older than `ttl` are treated as if they don't exist.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Resolve a nonce as of right now.
    pub fn confirm(&self, nonce: &Nonce) -> Result<OutgoingMail> {
        self.confirm_at(nonce, &Timestamp::now())
    }

    /// Resolve a nonce as of `now`.
    pub fn confirm_at(&self, nonce: &Nonce, now: &Timestamp) -> Result<OutgoingMail> {
        resolve(nonce, self.store.as_deref(), self.signer.as_ref(), &self.templates, self.ttl.as_ref(), now)
    }

    /// Resolve a token exactly as some outside party handed it to us.
    ///
    /// A token that doesn't even decode is rejected the same way as a token
    /// we've never heard of: [Error::NonceNotFound]. The real reason only goes
    /// to the debug log.
    pub fn confirm_token(&self, token: &str) -> Result<OutgoingMail> {
        let nonce = match Nonce::decode(token.trim()) {
            Ok(nonce) => nonce,
            Err(err) => {
                tracing::debug!(error = %err, "rejecting malformed confirmation token");
                Err(Error::NonceNotFound)?
            }
        };
        self.confirm(&nonce)
    }

    /// Hand a resolved request back to the store, for when the signed key it
    /// produced never made it out the door. The request's clock restarts.
    pub fn restore(&self, nonce: &Nonce, request: PendingRequest) -> Result<()> {
        let store = self.store.as_ref().ok_or(Error::StoreUnavailable)?;
        tracing::info!(nonce = %nonce.log_id(), "restoring undelivered request");
        store.set(nonce, request)
    }

    /// Drop expired requests from the store. Does nothing without a TTL.
    pub fn purge_expired(&self, now: &Timestamp) -> Result<usize> {
        let store = self.store.as_ref().ok_or(Error::StoreUnavailable)?;
        match self.ttl.as_ref() {
            Some(ttl) => {
                let purged = store.purge_expired(ttl, now)?;
                if purged > 0 {
                    tracing::info!(purged, "purged expired requests");
                }
                Ok(purged)
            }
            None => Ok(0),
        }
    }
}

/// Resolve a nonce against a store and signer with no expiry.
pub fn confirm(nonce: &Nonce, store: Option<&dyn RequestStore>, signer: Option<&Arc<dyn Certifier>>, templates: &Templates) -> Result<OutgoingMail> {
    resolve(nonce, store, signer, templates, None, &Timestamp::now())
}

fn resolve(
    nonce: &Nonce,
    store: Option<&dyn RequestStore>,
    signer: Option<&Arc<dyn Certifier>>,
    templates: &Templates,
    ttl: Option<&Duration>,
    now: &Timestamp,
) -> Result<OutgoingMail> {
    let signer = match signer {
        Some(signer) => signer,
        None => {
            tracing::error!(nonce = %nonce.log_id(), "skipping nonce confirmation, signer is not available");
            Err(Error::SignerUnavailable)?
        }
    };
    let store = match store {
        Some(store) => store,
        None => {
            tracing::error!(nonce = %nonce.log_id(), "skipping nonce confirmation, store is not available");
            Err(Error::StoreUnavailable)?
        }
    };

    let request = match store.take(nonce)? {
        Some(request) => request,
        None => {
            tracing::info!(nonce = %nonce.log_id(), "cannot confirm nonce, not found");
            Err(Error::NonceNotFound)?
        }
    };
    if let Some(ttl) = ttl {
        if request.is_expired(ttl, now) {
            tracing::info!(nonce = %nonce.log_id(), created = %request.created().to_rfc3339(), "cannot confirm nonce, expired");
            Err(Error::NonceNotFound)?;
        }
    }

    tracing::info!(nonce = %nonce.log_id(), key = %request.key().key_id(), email = %request.email(), "signing key");
    let signed = match signer.certify(request.email(), request.key()) {
        Ok(signed) => signed,
        Err(err) => {
            tracing::error!(nonce = %nonce.log_id(), error = %err, "signing failed, restoring request");
            restore(store, nonce, request);
            return Err(match err {
                Error::SigningFailed(msg) => Error::SigningFailed(msg),
                other => Error::SigningFailed(other.to_string()),
            });
        }
    };

    let message = templates.render_signed_key(&request.key().fingerprint());
    let (email, key) = request.into_parts();
    Ok(OutgoingMail::signed_key(message, email, key, signed, signer.clone()))
}

/// Put a taken request back. Failing to do so only costs the requester their
/// link, so it's logged rather than returned.
fn restore(store: &dyn RequestStore, nonce: &Nonce, request: PendingRequest) {
    if let Err(err) = store.set(nonce, request) {
        tracing::error!(nonce = %nonce.log_id(), error = %err, "could not restore request");
    }
}
