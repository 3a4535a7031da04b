//! Localities and locality-scoped identifiers.
//!
//! Every persistent identifier handed back to the orchestrator is prefixed
//! with the locality the resource lives in: a region (`fr-par`) for regional
//! resources, a zone (`fr-par-1`) for zonal ones. This crate owns the two
//! locality types and the codec for the identifier flavors built on them.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

pub mod id;

static REGION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]{2}-[a-z]{3}$").unwrap());
static ZONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]{2}-[a-z]{3}-\d+$").unwrap());

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("expected a region like fr-par, got {0:?}")]
    InvalidRegion(String),

    #[error("expected a zone like fr-par-1, got {0:?}")]
    InvalidZone(String),

    #[error("expected an identifier like {expected}, got {actual:?}")]
    MalformedId {
        expected: &'static str,
        actual: String,
    },
}

/// A region, the locality of regional resources. Format: `xx-yyy`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if REGION_RE.is_match(s) {
            Ok(Region(s.to_string()))
        } else {
            Err(Error::InvalidRegion(s.to_string()))
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A zone, the locality of zonal resources. Format: `xx-yyy-N`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Zone(String);

impl Zone {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The region this zone belongs to.
    pub fn region(&self) -> Region {
        let cut = self.0.rfind('-').unwrap();
        Region(self.0[..cut].to_string())
    }
}

impl FromStr for Zone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if ZONE_RE.is_match(s) {
            Ok(Zone(s.to_string()))
        } else {
            Err(Error::InvalidZone(s.to_string()))
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reports whether `s` is a bare UUID (no locality prefix).
pub fn is_uuid(s: &str) -> bool {
    uuid::Uuid::parse_str(s).is_ok()
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::{is_uuid, Error, Region, Zone};

    #[test]
    fn region_parses() {
        let r = Region::from_str("fr-par").unwrap();
        assert_eq!(r.as_str(), "fr-par");
        assert_eq!(r.to_string(), "fr-par");
    }

    #[test]
    fn region_rejects_zone_and_garbage() {
        assert_eq!(
            Region::from_str("fr-par-1").unwrap_err(),
            Error::InvalidRegion("fr-par-1".to_string())
        );
        assert!(Region::from_str("").is_err());
        assert!(Region::from_str("FR-PAR").is_err());
        assert!(Region::from_str("fr/par").is_err());
    }

    #[test]
    fn zone_parses_and_yields_region() {
        let z = Zone::from_str("nl-ams-2").unwrap();
        assert_eq!(z.as_str(), "nl-ams-2");
        assert_eq!(z.region(), Region::from_str("nl-ams").unwrap());
    }

    #[test]
    fn zone_rejects_region() {
        assert_eq!(
            Zone::from_str("nl-ams").unwrap_err(),
            Error::InvalidZone("nl-ams".to_string())
        );
    }

    #[test]
    fn uuid_detection() {
        assert!(is_uuid("11111111-1111-1111-1111-111111111111"));
        assert!(!is_uuid("EM-A115X-SSD"));
        assert!(!is_uuid("fr-par-1/11111111-1111-1111-1111-111111111111"));
    }
}
