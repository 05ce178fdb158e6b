//! AWS signature (version 2) for S3 REST requests.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use cloudface_common::SensitiveString;

type HmacSha1 = Hmac<Sha1>;

/// Format a timestamp for the `x-amz-date` header.
pub fn amz_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Builds the `Authorization` header for S3 requests.
///
/// Signing is stateless apart from the key pair, so every request is
/// signed with its own method, content type, date and resource.
#[derive(Debug, Clone)]
pub struct Signer {
    access_key_id: String,
    secret_key: SensitiveString,
}

impl Signer {
    pub fn new(access_key_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_key: SensitiveString::new(secret_key),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The canonical string S3 expects to be signed.
    ///
    /// Content-MD5 and Date are left empty; the date travels in the
    /// `x-amz-date` header, which is the only canonicalized amz header.
    pub fn string_to_sign(method: &str, content_type: &str, amz_date: &str, resource: &str) -> String {
        format!(
            "{}\n\n{}\n\nx-amz-date:{}\n{}",
            method, content_type, amz_date, resource
        )
    }

    /// base64(HMAC-SHA1(secret key, string to sign)).
    pub fn sign(&self, string_to_sign: &str) -> String {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.expose().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(string_to_sign.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// `AWS {access key id}:{signature}` for one request.
    pub fn authorization(&self, method: &str, content_type: &str, amz_date: &str, resource: &str) -> String {
        let string_to_sign = Self::string_to_sign(method, content_type, amz_date, resource);
        format!("AWS {}:{}", self.access_key_id, self.sign(&string_to_sign))
    }
}
