use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Dashboard API token.
///
/// `Debug` and `Display` both print `[REDACTED]`; use
/// [`expose`](Self::expose) only when building the `Authorization` header.
/// The backing buffer is zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Read-only access to the raw token.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// A token made only of whitespace counts as missing.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Clone for ApiToken {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for ApiToken {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TokenVisitor;

        impl Visitor<'_> for TokenVisitor {
            type Value = ApiToken;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an API token string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ApiToken, E> {
                Ok(ApiToken::new(v))
            }

            // Environment providers hand numeric-looking values over as numbers
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ApiToken, E> {
                Ok(ApiToken::new(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ApiToken, E> {
                Ok(ApiToken::new(v.to_string()))
            }
        }

        d.deserialize_any(TokenVisitor)
    }
}
