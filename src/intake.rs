//! Intake: turning an inbound request mail into a pending request and a
//! confirmation mail.
//!
//! The [validator](crate::gpg::Validator) decides whether the mail is good
//! enough to act on. If it is, we mint a nonce, park `{email, key}` under it,
//! and mail the nonce to the claimed address (encrypted to the claimed key,
//! so only someone holding both the mailbox and the key can read it).
//!
//! A bad mail is an [Error::Validation]. Anything else going wrong (validator
//! backend down, no randomness, store down, mail won't send) comes back as its
//! own error, so an operator can tell "somebody sent us junk" apart from
//! "we're broken."

use crate::{
    confirm::Resolver,
    error::{Error, Result},
    gpg::Validator,
    mail::{Mailer, OutgoingMail},
    nonce::{self, Nonce},
    request::PendingRequest,
    store::RequestStore,
    template::Templates,
};
use std::sync::Arc;
use url::Url;

/// The intake pipeline.
pub struct Intake {
    validator: Arc<dyn Validator>,
    store: Arc<dyn RequestStore>,
    mailer: Arc<dyn Mailer>,
    templates: Arc<Templates>,
    confirm_url: Option<Url>,
}

impl Intake {
    pub fn new(
        validator: Arc<dyn Validator>,
        store: Arc<dyn RequestStore>,
        mailer: Arc<dyn Mailer>,
        templates: Arc<Templates>,
        confirm_url: Option<Url>,
    ) -> Self {
        Self {
            validator,
            store,
            mailer,
            templates,
            confirm_url,
        }
    }

    /// Process one raw inbound request mail. On success, returns the nonce
    /// that was issued (and mailed out).
    pub fn process(&self, raw: &[u8]) -> Result<Nonce> {
        let validated = self.validator.verify_and_extract(raw)
            .map_err(|err| {
                match &err {
                    Error::Validation(_) => tracing::info!(error = %err, "rejecting inbound message"),
                    _ => tracing::error!(error = %err, "validator failed"),
                }
                err
            })?;
        let (email, key) = validated.into_parts();

        let nonce = Nonce::generate()
            .map_err(|err| {
                tracing::error!(error = %err, "cannot generate nonce");
                err
            })?;
        self.store.set(&nonce, PendingRequest::new(email.clone(), key.clone()))
            .map_err(|err| {
                tracing::error!(nonce = %nonce.log_id(), error = %err, "cannot store pending request");
                err
            })?;
        tracing::info!(nonce = %nonce.log_id(), key = %key.key_id(), email = %email, "issued confirmation nonce");

        let message = self.templates.render_confirmation(&nonce, self.confirm_url.as_ref());
        let mail = OutgoingMail::confirmation(message, email, key);
        if let Err(err) = self.mailer.send(&mail) {
            tracing::error!(nonce = %nonce.log_id(), error = %err, "cannot send confirmation mail");
            // nobody will ever see this nonce, so don't leave it lying around
            if let Err(del_err) = self.store.delete(&nonce) {
                tracing::warn!(nonce = %nonce.log_id(), error = %del_err, "cannot remove undeliverable request");
            }
            Err(err)?;
        }
        Ok(nonce)
    }

    /// Process a reply to a confirmation mail: find the token in the text,
    /// resolve it, and send the signed key off. A reply without a recognizable
    /// token is rejected exactly like one with an unknown token.
    pub fn process_reply(&self, text: &str, resolver: &Resolver) -> Result<OutgoingMail> {
        let nonce = match nonce::find_in_text(text) {
            Some(nonce) => nonce,
            None => {
                tracing::debug!("no confirmation token found in reply");
                Err(Error::NonceNotFound)?
            }
        };
        let mail = resolver.confirm(&nonce)?;
        if let Err(err) = self.mailer.send(&mail) {
            tracing::error!(nonce = %nonce.log_id(), error = %err, "cannot send signed key");
            // the signature never left, so the link shouldn't be spent either
            if let Some(key) = mail.recipient_key().clone() {
                if let Err(restore_err) = resolver.restore(&nonce, PendingRequest::new(mail.recipient_email().clone(), key)) {
                    tracing::warn!(nonce = %nonce.log_id(), error = %restore_err, "cannot restore request after failed delivery");
                }
            }
            Err(err)?;
        }
        tracing::info!(nonce = %nonce.log_id(), email = %mail.recipient_email(), "sent signed key");
        Ok(mail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gpg::Certifier,
        store::{DisabledStore, MemoryStore},
        util::test::{sample_key, FakeCertifier, FakeMailer, FakeValidator},
    };

    struct Harness {
        store: Arc<dyn RequestStore>,
        mailer: Arc<FakeMailer>,
        certifier: Arc<FakeCertifier>,
        intake: Intake,
        resolver: Resolver,
    }

    fn harness(store: Arc<dyn RequestStore>, validator: FakeValidator, mailer: FakeMailer, confirm_url: Option<Url>) -> Harness {
        let templates = Arc::new(Templates::default());
        let mailer = Arc::new(mailer);
        let certifier = Arc::new(FakeCertifier::new(b"SIGNED KEY".to_vec()));
        let signer: Arc<dyn Certifier> = certifier.clone();
        let mailer_dyn: Arc<dyn Mailer> = mailer.clone();
        let intake = Intake::new(Arc::new(validator), store.clone(), mailer_dyn, templates.clone(), confirm_url);
        let resolver = Resolver::new(Some(store.clone()), Some(signer), templates);
        Harness { store, mailer, certifier, intake, resolver }
    }

    #[test]
    fn issues_and_mails_nonce() {
        let url = Url::parse("https://validation.example.com/confirm").unwrap();
        let h = harness(Arc::new(MemoryStore::new()), FakeValidator::accepting("alice@example.com", sample_key("a11ce")), FakeMailer::new(), Some(url));

        let nonce = h.intake.process(b"From: alice@example.com\r\n\r\nsign me").unwrap();
        let stored = h.store.get(&nonce).unwrap().unwrap();
        assert_eq!(stored.email(), "alice@example.com");
        assert_eq!(stored.key(), &sample_key("a11ce"));

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient_email(), "alice@example.com");
        assert_eq!(sent[0].recipient_key(), &Some(sample_key("a11ce")));
        assert_eq!(sent[0].attachment(), &None);
        assert!(sent[0].message().contains(&format!("https://validation.example.com/confirm?nonce={}", nonce)));
    }

    #[test]
    fn validation_failure_is_distinct() {
        let h = harness(Arc::new(MemoryStore::new()), FakeValidator::rejecting("not signed"), FakeMailer::new(), None);
        let err = h.intake.process(b"garbage").unwrap_err();
        assert_eq!(err, Error::Validation(String::from("not signed")));
        assert!(!err.is_operator_fault());
        assert!(h.store.is_empty().unwrap());
        assert!(h.mailer.sent().is_empty());
    }

    #[test]
    fn validator_faults_pass_through() {
        let h = harness(Arc::new(MemoryStore::new()), FakeValidator::broken(), FakeMailer::new(), None);
        let err = h.intake.process(b"sign me").unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
        assert!(err.is_operator_fault());
        assert!(h.store.is_empty().unwrap());
    }

    #[test]
    fn send_failure_drops_request() {
        let h = harness(Arc::new(MemoryStore::new()), FakeValidator::accepting("alice@example.com", sample_key("a11ce")), FakeMailer::failing(), None);
        let err = h.intake.process(b"sign me").unwrap_err();
        assert!(matches!(err, Error::SendFailed(_)));
        assert!(h.store.is_empty().unwrap());
    }

    #[test]
    fn disabled_store_still_mails() {
        let h = harness(Arc::new(DisabledStore::new()), FakeValidator::accepting("alice@example.com", sample_key("a11ce")), FakeMailer::new(), None);
        let nonce = h.intake.process(b"sign me").unwrap();
        assert_eq!(h.mailer.sent().len(), 1);
        // ...but the nonce goes nowhere
        assert_eq!(h.resolver.confirm(&nonce).unwrap_err(), Error::NonceNotFound);
    }

    #[test]
    fn reply_round_trip() {
        crate::util::test::init_tracing();
        let h = harness(Arc::new(MemoryStore::new()), FakeValidator::accepting("alice@example.com", sample_key("a11ce")), FakeMailer::new(), None);
        let nonce = h.intake.process(b"sign me").unwrap();
        let confirmation = h.mailer.sent()[0].message().clone();

        let reply = format!("Yes that was me!\n\n> {}", confirmation.replace('\n', "\n> "));
        let signed = h.intake.process_reply(&reply, &h.resolver).unwrap();
        assert_eq!(signed.recipient_email(), "alice@example.com");
        assert_eq!(signed.attachment(), &Some(b"SIGNED KEY".to_vec()));
        assert_eq!(h.certifier.calls().len(), 1);

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].attachment(), &Some(b"SIGNED KEY".to_vec()));

        // replaying the same reply gets nowhere
        assert_eq!(h.intake.process_reply(&reply, &h.resolver).unwrap_err(), Error::NonceNotFound);
        assert_eq!(h.store.get(&nonce).unwrap(), None);
        assert_eq!(h.certifier.calls().len(), 1);
        assert_eq!(h.mailer.sent().len(), 2);
    }

    #[test]
    fn reply_survives_mail_outage() {
        let h = harness(Arc::new(MemoryStore::new()), FakeValidator::accepting("alice@example.com", sample_key("a11ce")), FakeMailer::new(), None);
        let nonce = h.intake.process(b"sign me").unwrap();
        let reply = h.mailer.sent()[0].message().clone();

        h.mailer.set_failing(true);
        assert!(matches!(h.intake.process_reply(&reply, &h.resolver), Err(Error::SendFailed(_))));
        let parked = h.store.get(&nonce).unwrap().unwrap();
        assert_eq!(parked.email(), "alice@example.com");
        assert_eq!(parked.key(), &sample_key("a11ce"));
        assert_eq!(h.mailer.sent().len(), 1);

        h.mailer.set_failing(false);
        let signed = h.intake.process_reply(&reply, &h.resolver).unwrap();
        assert_eq!(signed.attachment(), &Some(b"SIGNED KEY".to_vec()));
        assert_eq!(h.mailer.sent().len(), 2);
        assert_eq!(h.store.get(&nonce).unwrap(), None);
    }

    #[test]
    fn reply_without_token() {
        let h = harness(Arc::new(MemoryStore::new()), FakeValidator::accepting("alice@example.com", sample_key("a11ce")), FakeMailer::new(), None);
        assert_eq!(h.intake.process_reply("ok sure", &h.resolver).unwrap_err(), Error::NonceNotFound);
        assert!(h.certifier.calls().is_empty());
    }
}
