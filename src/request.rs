//! A pending request is what we park in the store between "someone mailed us
//! a signed key" and "that someone clicked the confirmation link." It's the
//! claimed mailbox plus the key they want certified.

use crate::{key::PublicKey, util::Timestamp};
use chrono::Duration;
use serde_derive::{Deserialize, Serialize};

/// The value bound to a [nonce](crate::nonce::Nonce) in the request store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct PendingRequest {
    /// The mailbox the requester claims to control.
    email: String,
    /// The key they want us to certify for that mailbox.
    key: PublicKey,
    /// When we issued the request.
    created: Timestamp,
}

impl PendingRequest {
    /// Create a new request, stamped with the current time.
    pub fn new<T: Into<String>>(email: T, key: PublicKey) -> Self {
        Self::new_at(email, key, Timestamp::now())
    }

    /// Create a new request with an explicit creation time.
    pub fn new_at<T: Into<String>>(email: T, key: PublicKey, created: Timestamp) -> Self {
        Self {
            email: email.into(),
            key,
            created,
        }
    }

    /// Whether this request has been sitting around longer than `ttl` as of
    /// `now`.
    pub fn is_expired(&self, ttl: &Duration, now: &Timestamp) -> bool {
        self.created.age(now) > *ttl
    }

    /// Break the request into its email and key.
    pub fn into_parts(self) -> (String, PublicKey) {
        (self.email, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test::sample_key;

    #[test]
    fn expiry() {
        let created: Timestamp = "2021-03-01T00:00:00Z".parse().unwrap();
        let req = PendingRequest::new_at("alice@example.com", sample_key("a1"), created);
        let ttl = Duration::hours(24);
        assert!(!req.is_expired(&ttl, &"2021-03-01T23:59:59Z".parse().unwrap()));
        assert!(!req.is_expired(&ttl, &"2021-03-02T00:00:00Z".parse().unwrap()));
        assert!(req.is_expired(&ttl, &"2021-03-02T00:00:01Z".parse().unwrap()));
    }

    #[test]
    fn parts() {
        let req = PendingRequest::new("bob@example.com", sample_key("b0b"));
        assert_eq!(req.email(), "bob@example.com");
        let (email, key) = req.into_parts();
        assert_eq!(email, "bob@example.com");
        assert_eq!(key, sample_key("b0b"));
    }
}
