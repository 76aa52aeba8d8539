//! Wire shape of a storage node's `GET /api/sno` response.
//!
//! Node versions disagree on number formats: byte counters arrive as
//! integers or as floats (`5e9`), and flags such as `disqualified` are either
//! booleans or nullable timestamps. The deserializers here accept all of them.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDto {
    #[serde(rename = "nodeID")]
    pub node_id: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub disk_space: DiskSpaceDto,

    #[serde(default)]
    pub bandwidth: BandwidthDto,

    #[serde(default)]
    pub satellites: Option<Vec<SatelliteDto>>,

    #[serde(default)]
    pub last_contact_success: Option<String>,

    #[serde(default)]
    pub last_pinged: Option<String>,

    #[serde(default)]
    pub reputation: Option<ReputationDto>,

    #[serde(default, deserialize_with = "flag")]
    pub disqualified: bool,

    #[serde(default, deserialize_with = "byte_count")]
    pub uptime: u64,

    #[serde(default, alias = "estimatedPayout")]
    pub earnings: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiskSpaceDto {
    #[serde(default, deserialize_with = "byte_count")]
    pub used: u64,
    #[serde(default, deserialize_with = "byte_count")]
    pub available: u64,
    #[serde(default, deserialize_with = "byte_count")]
    pub trash: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BandwidthDto {
    #[serde(default, deserialize_with = "byte_count")]
    pub used: u64,
    #[serde(default, deserialize_with = "byte_count")]
    pub available: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SatelliteDto {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "flag")]
    pub disqualified: bool,
    #[serde(default, deserialize_with = "flag")]
    pub suspended: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationDto {
    #[serde(default)]
    pub audit_score: Option<f64>,
    #[serde(default)]
    pub suspension_score: Option<f64>,
}

/// Non-negative integer from any JSON number; `null` and negatives are 0.
pub fn byte_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    struct ByteCount;

    impl<'de> Visitor<'de> for ByteCount {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative number")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            Ok(u64::try_from(v).unwrap_or(0))
        }

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
            if !v.is_finite() {
                return Err(E::custom("byte count is not finite"));
            }
            if v <= 0.0 {
                return Ok(0);
            }
            // `as` saturates at u64::MAX
            Ok(v.round() as u64)
        }

        fn visit_unit<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }

        fn visit_none<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<u64, D2::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(ByteCount)
}

/// `true`/`false`, or a nullable value where anything non-empty means set.
pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    struct Flag;

    impl<'de> Visitor<'de> for Flag {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean, a timestamp or null")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            Ok(!v.trim().is_empty())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }

        fn visit_none<E: de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<bool, D2::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(Flag)
}
