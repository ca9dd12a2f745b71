//! Inbound webhook authentication.
//!
//! Slack signs every request with `v0=HMAC-SHA256(secret, "v0:{ts}:{body}")`
//! and sends the result in `X-Slack-Signature` alongside
//! `X-Slack-Request-Timestamp`. A request is accepted only when the
//! timestamp is within five minutes of the local clock and the signature
//! matches byte for byte.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Maximum distance between the request timestamp and the local clock.
pub const MAX_REQUEST_AGE_SECS: i64 = 300;

/// Signature scheme version prefix.
const VERSION: &str = "v0";

/// Verifies inbound requests against a configured signing secret.
#[derive(Debug, Clone, Default)]
pub struct RequestAuthenticator {
    signing_secret: Option<String>,
}

impl RequestAuthenticator {
    pub fn new(signing_secret: Option<String>) -> Self {
        Self {
            signing_secret: signing_secret.filter(|s| !s.is_empty()),
        }
    }

    /// Verify against the current wall clock.
    pub fn verify(&self, signature: &str, timestamp_secs: i64, raw_body: &[u8]) -> bool {
        verify(
            signature,
            timestamp_secs,
            raw_body,
            self.signing_secret.as_deref(),
        )
    }
}

/// Verify a request signature using the current time.
pub fn verify(
    signature: &str,
    timestamp_secs: i64,
    raw_body: &[u8],
    signing_secret: Option<&str>,
) -> bool {
    verify_at(
        signature,
        timestamp_secs,
        raw_body,
        signing_secret,
        chrono::Utc::now().timestamp(),
    )
}

/// Verify a request signature as of `now` (epoch seconds).
///
/// Never panics; every failure is `false`.
pub fn verify_at(
    signature: &str,
    timestamp_secs: i64,
    raw_body: &[u8],
    signing_secret: Option<&str>,
    now: i64,
) -> bool {
    let secret = match signing_secret {
        Some(secret) if !secret.is_empty() => secret,
        _ => {
            warn!("Signing secret not configured; rejecting request");
            return false;
        }
    };

    if now.abs_diff(timestamp_secs) > MAX_REQUEST_AGE_SECS as u64 {
        warn!(
            "Request timestamp outside the {}s window (ts={}, now={})",
            MAX_REQUEST_AGE_SECS, timestamp_secs, now
        );
        return false;
    }

    let Some(expected) = sign(secret, timestamp_secs, raw_body) else {
        return false;
    };

    let expected = expected.as_bytes();
    let supplied = signature.as_bytes();
    if expected.len() != supplied.len() {
        warn!("Request signature has unexpected length");
        return false;
    }

    if bool::from(expected.ct_eq(supplied)) {
        true
    } else {
        warn!("Request signature mismatch");
        false
    }
}

/// Compute the `v0=<hex>` signature for a request.
///
/// Returns `None` only if the MAC cannot be keyed, which HMAC never refuses.
pub fn sign(signing_secret: &str, timestamp_secs: i64, raw_body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes()).ok()?;
    mac.update(format!("{VERSION}:{timestamp_secs}:").as_bytes());
    mac.update(raw_body);
    let digest = mac.finalize().into_bytes();
    Some(format!("{VERSION}={}", hex::encode(digest)))
}
