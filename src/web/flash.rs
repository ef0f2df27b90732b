//! One-shot flash messages
//!
//! Messages survive one redirect in a `flash` cookie holding the JSON list
//! and an HMAC-SHA256 tag, both base64url encoded and joined by a dot. The
//! next rendered page reads the cookie and clears it.

use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::views::Flash;

type HmacSha256 = Hmac<Sha256>;

pub const FLASH_COOKIE_NAME: &str = "flash";

/// Flash messages live only until the next page load
const FLASH_MAX_AGE_SECS: u64 = 60;

#[derive(Clone)]
pub struct FlashSigner {
    mac: HmacSha256,
}

impl FlashSigner {
    pub fn new(secret: &[u8]) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow::anyhow!("Invalid flash signing key: {}", e))?;
        Ok(Self { mac })
    }

    fn mac(&self) -> HmacSha256 {
        self.mac.clone()
    }

    /// Cookie value for `messages`.
    pub fn encode(&self, messages: &[Flash]) -> String {
        let json = serde_json::to_vec(messages).unwrap_or_else(|_| b"[]".to_vec());
        let mut mac = self.mac();
        mac.update(&json);
        let tag = mac.finalize().into_bytes();
        format!(
            "{}.{}",
            BASE64URL_NOPAD.encode(&json),
            BASE64URL_NOPAD.encode(&tag)
        )
    }

    /// Messages from a cookie value. Tampered or malformed values yield
    /// nothing.
    pub fn decode(&self, value: &str) -> Vec<Flash> {
        let Some((payload, tag)) = value.split_once('.') else {
            return Vec::new();
        };
        let (Ok(json), Ok(tag)) = (
            BASE64URL_NOPAD.decode(payload.as_bytes()),
            BASE64URL_NOPAD.decode(tag.as_bytes()),
        ) else {
            return Vec::new();
        };

        let mut mac = self.mac();
        mac.update(&json);
        if mac.verify_slice(&tag).is_err() {
            tracing::warn!("Discarding flash cookie with a bad signature");
            return Vec::new();
        }
        serde_json::from_slice(&json).unwrap_or_default()
    }

    /// `Set-Cookie` value carrying `messages`.
    pub fn set_cookie(&self, messages: &[Flash], secure: bool) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            FLASH_COOKIE_NAME,
            self.encode(messages),
            FLASH_MAX_AGE_SECS,
            if secure { "; Secure" } else { "" }
        )
    }
}

/// `Set-Cookie` value removing the flash cookie.
pub fn clear_cookie() -> &'static str {
    "flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
}
