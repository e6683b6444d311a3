use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::types::TicketRequest;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed request before it is treated as a replay.
pub const TIMESTAMP_TOLERANCE_SECS: u64 = 60 * 5;

pub const USAGE: &str = "Usage: /ticket [-v] [-p] TICKET_ID";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("request timestamp is not a unix timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("request timestamp is {drift}s away from now, possible replay")]
    Stale { drift: u64 },
    #[error("signature is not a v0 hex digest")]
    Malformed,
    #[error("signature does not match")]
    Mismatch,
}

/// Checks `X-Slack-Signature` against the shared signing secret.
///
/// See https://api.slack.com/authentication/verifying-requests-from-slack
#[derive(Clone)]
pub struct SignatureVerifier {
    signing_secret: String,
}

impl SignatureVerifier {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
        }
    }

    pub fn verify(&self, body: &str, timestamp: &str, signature: &str) -> Result<(), SignatureError> {
        self.verify_at(body, timestamp, signature, Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        body: &str,
        timestamp: &str,
        signature: &str,
        now: i64,
    ) -> Result<(), SignatureError> {
        if timestamp.is_empty() {
            return Err(SignatureError::MissingHeader("X-Slack-Request-Timestamp"));
        }
        if signature.is_empty() {
            return Err(SignatureError::MissingHeader("X-Slack-Signature"));
        }

        let request_timestamp: i64 = timestamp
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_string()))?;
        let drift = now.abs_diff(request_timestamp);
        if drift > TIMESTAMP_TOLERANCE_SECS {
            return Err(SignatureError::Stale { drift });
        }

        let digest = signature
            .strip_prefix("v0=")
            .and_then(|hex_digest| hex::decode(hex_digest).ok())
            .ok_or(SignatureError::Malformed)?;

        // verify_slice compares in constant time
        self.mac_for(timestamp, body)
            .verify_slice(&digest)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Produces the `v0=` signature Slack would send for this body.
    pub fn sign(&self, body: &str, timestamp: &str) -> String {
        let result = self.mac_for(timestamp, body).finalize();
        format!("v0={}", hex::encode(result.into_bytes()))
    }

    fn mac_for(&self, timestamp: &str, body: &str) -> HmacSha256 {
        let base_string = format!("v0:{}:{}", timestamp, body);
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(base_string.as_bytes());
        mac
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing ticket id")]
    MissingTicketId,
    #[error("`{0}` is not a valid ticket id")]
    InvalidTicketId(String),
    #[error("unknown flag `-{0}`")]
    UnknownFlag(char),
    #[error("unexpected argument `{0}`")]
    UnexpectedArgument(String),
}

/// Parses `[-v] [-p] TICKET_ID` in any order.
///
/// Flags can be clustered (`-vp`) or repeated separately (`-v -p`). Only one
/// ticket id is accepted; a second positional token is rejected.
pub fn parse_command_text(text: &str) -> Result<TicketRequest, ParseError> {
    let mut ticket_id = None;
    let mut verbose = false;
    let mut public = false;

    for token in text.split_whitespace() {
        if let Some(cluster) = token.strip_prefix('-').filter(|c| !c.is_empty()) {
            for flag in cluster.chars() {
                match flag {
                    'v' => verbose = true,
                    'p' => public = true,
                    other => return Err(ParseError::UnknownFlag(other)),
                }
            }
            continue;
        }

        if ticket_id.is_some() {
            return Err(ParseError::UnexpectedArgument(token.to_string()));
        }
        let id = token
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| ParseError::InvalidTicketId(token.to_string()))?;
        ticket_id = Some(id);
    }

    Ok(TicketRequest {
        ticket_id: ticket_id.ok_or(ParseError::MissingTicketId)?,
        verbose,
        public,
    })
}
