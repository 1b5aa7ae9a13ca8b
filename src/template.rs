//! The text of the mails we send.
//!
//! There are exactly two: the confirmation mail (carrying the nonce) and the
//! signed-key mail (carrying the certification). Both are built once at
//! startup, checked for the placeholders they need, and then handed around
//! explicitly to whatever sends mail.
//!
//! Templates only ever get filled with values we control or have checked: a
//! nonce we generated, a URL from our own config, and a key ID that
//! [PublicKey](crate::key::PublicKey) already vetted. Nothing a sender wrote
//! freehand ever ends up in a notification.

use crate::{
    error::{Error, Result},
    nonce::Nonce,
};
use url::Url;

const PLACEHOLDER_FINGERPRINT: &str = "{fingerprint}";
const PLACEHOLDER_NONCE: &str = "{nonce}";
const PLACEHOLDER_LINK: &str = "{link}";

const DEFAULT_CONFIRMATION: &str = "\
Hello,

somebody (hopefully you) asked us to certify an OpenPGP key for this address.
If that was you, confirm by opening the link below:

    {link}

or by replying to this message with the following code left intact:

    {nonce}

If it wasn't you, ignore this message and nothing will happen.
";

const DEFAULT_SIGNED_KEY: &str = "\
Hello,

your address has been confirmed. Attached is your key {fingerprint}, now
signed by this server. Import it with your OpenPGP software to pick up the
new certification.
";

/// The pair of notification templates.
#[derive(Debug, Clone, PartialEq)]
pub struct Templates {
    confirmation: String,
    signed_key: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            confirmation: String::from(DEFAULT_CONFIRMATION),
            signed_key: String::from(DEFAULT_SIGNED_KEY),
        }
    }
}

impl Templates {
    /// Build a template set. The confirmation template needs at least one of
    /// `{nonce}` or `{link}` (otherwise nobody can ever confirm) and the
    /// signed-key template needs `{fingerprint}`.
    pub fn new(confirmation: &str, signed_key: &str) -> Result<Self> {
        if !confirmation.contains(PLACEHOLDER_NONCE) && !confirmation.contains(PLACEHOLDER_LINK) {
            Err(Error::TemplateInvalid(format!("confirmation template needs {} or {}", PLACEHOLDER_NONCE, PLACEHOLDER_LINK)))?;
        }
        if !signed_key.contains(PLACEHOLDER_FINGERPRINT) {
            Err(Error::TemplateInvalid(format!("signed-key template needs {}", PLACEHOLDER_FINGERPRINT)))?;
        }
        Ok(Self {
            confirmation: String::from(confirmation),
            signed_key: String::from(signed_key),
        })
    }

    /// The raw confirmation template.
    pub fn confirmation(&self) -> &str {
        &self.confirmation
    }

    /// The raw signed-key template.
    pub fn signed_key(&self) -> &str {
        &self.signed_key
    }

    /// Fill in the confirmation mail. Without a base URL, `{link}` gets the
    /// bare token.
    pub fn render_confirmation(&self, nonce: &Nonce, base_url: Option<&Url>) -> String {
        let token = nonce.encode();
        let link = match base_url {
            Some(base) => confirm_link(base, nonce).to_string(),
            None => token.clone(),
        };
        self.confirmation
            .replace(PLACEHOLDER_NONCE, &token)
            .replace(PLACEHOLDER_LINK, &link)
    }

    /// Fill in the signed-key mail.
    pub fn render_signed_key(&self, fingerprint: &str) -> String {
        self.signed_key.replace(PLACEHOLDER_FINGERPRINT, fingerprint)
    }
}

/// Build the confirmation link for a nonce: the base URL with the nonce
/// tacked on as a `nonce` query parameter (replacing any existing one).
pub fn confirm_link(base: &Url, nonce: &Nonce) -> Url {
    let mut url = base.clone();
    let kept = base.query_pairs()
        .filter(|(k, _)| k != "nonce")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect::<Vec<_>>();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("nonce", &nonce.encode());
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nonce::NONCE_LENGTH;

    #[test]
    fn defaults_are_valid() {
        let defaults = Templates::default();
        assert_eq!(Templates::new(defaults.confirmation(), defaults.signed_key()).unwrap(), defaults);
    }

    #[test]
    fn rejects_missing_placeholders() {
        assert!(matches!(Templates::new("click here", "{fingerprint}"), Err(Error::TemplateInvalid(_))));
        assert!(matches!(Templates::new("{nonce}", "your key is signed"), Err(Error::TemplateInvalid(_))));
        assert!(Templates::new("{link}", "{fingerprint}").is_ok());
        assert!(Templates::new("{nonce}", "{fingerprint}").is_ok());
    }

    #[test]
    fn renders_signed_key() {
        let templates = Templates::new("{nonce}", "key {fingerprint} signed ({fingerprint})").unwrap();
        assert_eq!(templates.render_signed_key("DEADBEEF"), "key DEADBEEF signed (DEADBEEF)");
        let message = Templates::default().render_signed_key("0123ABCD");
        assert!(message.contains("0123ABCD"));
        assert!(!message.contains(PLACEHOLDER_FINGERPRINT));
    }

    #[test]
    fn renders_confirmation() {
        let nonce = Nonce::from_bytes([0x42; NONCE_LENGTH]);
        let templates = Templates::new("code {nonce} link {link}", "{fingerprint}").unwrap();

        let bare = templates.render_confirmation(&nonce, None);
        assert_eq!(bare, format!("code {} link {}", nonce, nonce));

        let base = Url::parse("https://validation.example.com/confirm").unwrap();
        let linked = templates.render_confirmation(&nonce, Some(&base));
        assert_eq!(linked, format!("code {} link https://validation.example.com/confirm?nonce={}", nonce, nonce));
    }

    #[test]
    fn link_replaces_existing_nonce() {
        let nonce = Nonce::from_bytes([0x01; NONCE_LENGTH]);
        let base = Url::parse("https://example.com/c?lang=de&nonce=old").unwrap();
        let link = confirm_link(&base, &nonce);
        assert_eq!(link.as_str(), format!("https://example.com/c?lang=de&nonce={}", nonce));
        let found = link.query_pairs().find(|(k, _)| k == "nonce").map(|(_, v)| v.into_owned());
        assert_eq!(Nonce::decode(&found.unwrap()).unwrap(), nonce);
    }
}
