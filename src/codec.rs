//! Encrypting and decrypting the session payload.
//!
//! The plaintext is a versioned JSON envelope holding the session mapping and an optional
//! expiry. It is sealed with AES-GCM into `nonce || ciphertext || tag`.
//!
//! Note: the on-wire format is versioned, but it is still considered an implementation detail
//! and may evolve.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    error::SessionError,
    secret::{NONCE_LEN, Secret, TAG_LEN},
    session::SessionData,
};

const VERSION: u8 = 1;

/// Smallest sealed buffer that can possibly verify.
pub const MIN_SEALED_LEN: usize = NONCE_LEN + TAG_LEN;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    v: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    data: SessionData,
}

/// Seal a session without an embedded expiry.
pub fn encode(session: &SessionData, secret: &Secret) -> Result<Vec<u8>, SessionError> {
    seal(session, secret, None)
}

/// Seal a session that [`decode`] rejects once `expires_at` has passed.
pub fn encode_until(
    session: &SessionData,
    secret: &Secret,
    expires_at: OffsetDateTime,
) -> Result<Vec<u8>, SessionError> {
    seal(session, secret, Some(expires_at.unix_timestamp()))
}

fn seal(session: &SessionData, secret: &Secret, exp: Option<i64>) -> Result<Vec<u8>, SessionError> {
    let envelope = Envelope {
        v: VERSION,
        exp,
        data: session.clone(),
    };

    let plaintext =
        serde_json::to_vec(&envelope).map_err(|err| SessionError::Encode(err.to_string()))?;

    secret
        .seal(&plaintext)
        .map_err(|err| SessionError::Encode(err.to_string()))
}

/// Verify, decrypt and deserialize a sealed session.
pub fn decode(sealed: &[u8], secret: &Secret) -> Result<SessionData, SessionError> {
    if sealed.len() < MIN_SEALED_LEN {
        return Err(SessionError::MalformedPayload(format!(
            "sealed payload is {} bytes, expected at least {MIN_SEALED_LEN}",
            sealed.len()
        )));
    }

    let plaintext = secret
        .open(sealed)
        .map_err(|_| SessionError::TamperedOrCorrupt)?;

    let envelope: Envelope = serde_json::from_slice(&plaintext)
        .map_err(|err| SessionError::MalformedPayload(err.to_string()))?;

    if envelope.v != VERSION {
        return Err(SessionError::MalformedPayload(format!(
            "unsupported session envelope version: {}",
            envelope.v
        )));
    }

    if let Some(exp) = envelope.exp
        && exp <= OffsetDateTime::now_utc().unix_timestamp()
    {
        return Err(SessionError::Expired);
    }

    Ok(envelope.data)
}
