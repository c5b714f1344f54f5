//! HMAC-SHA256 request signing for the exchange REST API.
//!
//! The signed payload is `timestamp_ms + METHOD + path_with_query + body`.
//! The secret never appears in `Debug` output or error messages.

use super::DataSourceError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_KEY: &str = "FTX-KEY";
pub const HEADER_SIGN: &str = "FTX-SIGN";
pub const HEADER_TS: &str = "FTX-TS";
pub const HEADER_SUBACCOUNT: &str = "FTX-SUBACCOUNT";

#[derive(Clone, Default)]
pub struct FtxAuth {
    key: String,
    secret: String,
    subaccount: Option<String>,
}

impl FtxAuth {
    pub fn new(key: impl Into<String>, secret: impl Into<String>, subaccount: Option<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            subaccount: subaccount.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn subaccount(&self) -> Option<&str> {
        self.subaccount.as_deref()
    }

    /// Hex HMAC-SHA256 of the request.
    pub fn signature(
        &self,
        timestamp_ms: i64,
        method: &str,
        path_with_query: &str,
        body: &[u8],
    ) -> Result<String, DataSourceError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| DataSourceError::Other("invalid signing key".to_string()))?;
        mac.update(timestamp_ms.to_string().as_bytes());
        mac.update(method.as_bytes());
        mac.update(path_with_query.as_bytes());
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Authentication headers for a request.
    pub fn headers(
        &self,
        timestamp_ms: i64,
        method: &str,
        path_with_query: &str,
        body: &[u8],
    ) -> Result<Vec<(&'static str, String)>, DataSourceError> {
        let mut headers = vec![
            (HEADER_KEY, self.key.clone()),
            (
                HEADER_SIGN,
                self.signature(timestamp_ms, method, path_with_query, body)?,
            ),
            (HEADER_TS, timestamp_ms.to_string()),
        ];
        if let Some(subaccount) = &self.subaccount {
            headers.push((HEADER_SUBACCOUNT, urlencoding::encode(subaccount).into_owned()));
        }
        Ok(headers)
    }
}

impl fmt::Debug for FtxAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtxAuth")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("subaccount", &self.subaccount)
            .finish()
    }
}
