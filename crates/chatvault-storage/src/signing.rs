//! HMAC-signed read URLs for backends without native presigning.
//!
//! URL format: `{base_url}/{key}?expires={unix_ms}&signature={hex}` where the
//! signature is HMAC-SHA256(secret, "{key}\n{expires}"). Each key segment is
//! percent-encoded. Expiry is checked against the injected [`Clock`].

use crate::keys::validate_key;
use crate::traits::{StorageError, StorageResult};
use chatvault_core::Clock;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct UrlSigner {
    secret: Arc<[u8]>,
    base_url: String,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(secret: impl AsRef<[u8]>, base_url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        let base_url: String = base_url.into();
        Self {
            secret: Arc::from(secret.as_ref()),
            base_url: base_url.trim_end_matches('/').to_string(),
            clock,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sign `storage_key` for `expires_in` from the clock's current time.
    pub fn sign(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String> {
        validate_key(storage_key)?;

        let ttl_ms = i64::try_from(expires_in.as_millis()).map_err(|_| {
            StorageError::SigningFailed(format!("TTL too large: {:?}", expires_in))
        })?;
        let expires = self
            .clock
            .now()
            .timestamp_millis()
            .checked_add(ttl_ms)
            .ok_or_else(|| StorageError::SigningFailed(format!("TTL too large: {:?}", expires_in)))?;

        let signature = hex::encode(self.mac(storage_key, expires)?.finalize().into_bytes());

        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.base_url,
            encode_key(storage_key),
            expires,
            signature
        ))
    }

    /// Verify a URL produced by [`UrlSigner::sign`] and return the storage key it grants.
    ///
    /// The signature is checked before the expiry so a tampered expiry is reported
    /// as an invalid signature.
    pub fn verify(&self, url: &str) -> StorageResult<String> {
        let invalid = || StorageError::InvalidSignature(url.to_string());

        let rest = url
            .strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(invalid)?;
        let (encoded_key, query) = rest.split_once('?').ok_or_else(invalid)?;

        let storage_key = decode_key(encoded_key).ok_or_else(invalid)?;
        validate_key(&storage_key)?;

        let mut expires = None;
        let mut signature = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("expires", value)) => expires = value.parse::<i64>().ok(),
                Some(("signature", value)) => signature = hex::decode(value).ok(),
                _ => {}
            }
        }
        let expires = expires.ok_or_else(invalid)?;
        let signature = signature.ok_or_else(invalid)?;

        self.mac(&storage_key, expires)?
            .verify_slice(&signature)
            .map_err(|_| invalid())?;

        if self.clock.now().timestamp_millis() > expires {
            return Err(StorageError::Expired(storage_key));
        }

        Ok(storage_key)
    }

    fn mac(&self, storage_key: &str, expires: i64) -> StorageResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| StorageError::ConfigError(format!("Invalid signing secret: {}", e)))?;
        mac.update(storage_key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }
}

fn encode_key(storage_key: &str) -> String {
    storage_key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_key(encoded: &str) -> Option<String> {
    encoded
        .split('/')
        .map(|segment| urlencoding::decode(segment).ok().map(|s| s.into_owned()))
        .collect::<Option<Vec<_>>>()
        .map(|segments| segments.join("/"))
}
