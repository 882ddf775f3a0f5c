//! TC3-HMAC-SHA256 request signing.
//!
//! Only the shape shipyard sends is supported: `POST /` with a JSON body and
//! the signed headers `content-type`, `host` and `x-tc-action`.

use chrono::DateTime;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::credential::Credential;
use crate::error::{TencentError, TencentResult};

pub const ALGORITHM: &str = "TC3-HMAC-SHA256";
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host;x-tc-action";

type HmacSha256 = Hmac<Sha256>;

/// Everything that goes into one signature.
#[derive(Debug, Clone, Copy)]
pub struct SigningInput<'a> {
    pub service: &'a str,
    pub host: &'a str,
    pub action: &'a str,
    pub payload: &'a [u8],
    /// Unix seconds; also sent as `X-TC-Timestamp`.
    pub timestamp: i64,
}

impl SigningInput<'_> {
    pub fn canonical_request(&self) -> String {
        format!(
            "POST\n/\n\ncontent-type:{CONTENT_TYPE}\nhost:{}\nx-tc-action:{}\n\n{SIGNED_HEADERS}\n{}",
            self.host,
            self.action.to_ascii_lowercase(),
            sha256_hex(self.payload)
        )
    }

    /// UTC date of the timestamp, `YYYY-MM-DD`.
    pub fn date(&self) -> TencentResult<String> {
        DateTime::from_timestamp(self.timestamp, 0)
            .map(|t| t.format("%Y-%m-%d").to_string())
            .ok_or_else(|| TencentError::Signing(format!("timestamp {} out of range", self.timestamp)))
    }

    pub fn credential_scope(&self) -> TencentResult<String> {
        Ok(format!("{}/{}/tc3_request", self.date()?, self.service))
    }

    pub fn string_to_sign(&self) -> TencentResult<String> {
        Ok(format!(
            "{ALGORITHM}\n{}\n{}\n{}",
            self.timestamp,
            self.credential_scope()?,
            sha256_hex(self.canonical_request().as_bytes())
        ))
    }
}

/// Value of the `Authorization` header for `input`.
pub fn authorization(credential: &Credential, input: &SigningInput<'_>) -> TencentResult<String> {
    let date = input.date()?;
    let secret_date = hmac_sha256(format!("TC3{}", credential.secret_key).as_bytes(), date.as_bytes())?;
    let secret_service = hmac_sha256(&secret_date, input.service.as_bytes())?;
    let secret_signing = hmac_sha256(&secret_service, b"tc3_request")?;
    let signature = hex::encode(hmac_sha256(
        &secret_signing,
        input.string_to_sign()?.as_bytes(),
    )?);

    Ok(format!(
        "{ALGORITHM} Credential={}/{}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
        credential.secret_id,
        input.credential_scope()?
    ))
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> TencentResult<Vec<u8>> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| TencentError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
