//! The identifier codec.
//!
//! Flavors:
//! * zoned: `fr-par-1/<uuid>`
//! * regional: `fr-par/<uuid>`
//! * nested: `<locality>/<outer>/<inner>`
//! * object: `<region>/<bucket>/<key>` (the key may itself contain `/`)
//! * ACL: `<region>/<bucket>[/<canned-acl>][@<owner-id>]`
//!
//! Parsing an identifier with the wrong locality flavor is an error; a
//! handler must never silently fall back to a default locality.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Region, Zone};

/// Formats a zonal identifier.
pub fn zoned(zone: &Zone, id: &str) -> String {
    format!("{zone}/{id}")
}

/// Formats a regional identifier.
pub fn regional(region: &Region, id: &str) -> String {
    format!("{region}/{id}")
}

/// Formats a nested zonal identifier.
pub fn zoned_nested(zone: &Zone, outer: &str, inner: &str) -> String {
    format!("{zone}/{outer}/{inner}")
}

pub fn parse_zoned(s: &str) -> Result<(Zone, String), Error> {
    let (locality, rest) = split_locality(s, "fr-par-1/<id>")?;
    let zone = Zone::from_str(locality).map_err(|_| Error::MalformedId {
        expected: "fr-par-1/<id>",
        actual: s.to_string(),
    })?;
    if rest.is_empty() || rest.contains('/') {
        return Err(Error::MalformedId {
            expected: "fr-par-1/<id>",
            actual: s.to_string(),
        });
    }
    Ok((zone, rest.to_string()))
}

pub fn parse_regional(s: &str) -> Result<(Region, String), Error> {
    let (locality, rest) = split_locality(s, "fr-par/<id>")?;
    let region = Region::from_str(locality).map_err(|_| Error::MalformedId {
        expected: "fr-par/<id>",
        actual: s.to_string(),
    })?;
    if rest.is_empty() || rest.contains('/') {
        return Err(Error::MalformedId {
            expected: "fr-par/<id>",
            actual: s.to_string(),
        });
    }
    Ok((region, rest.to_string()))
}

pub fn parse_zoned_nested(s: &str) -> Result<(Zone, String, String), Error> {
    const EXPECTED: &str = "fr-par-1/<outer-id>/<inner-id>";
    let (locality, rest) = split_locality(s, EXPECTED)?;
    let zone = Zone::from_str(locality).map_err(|_| Error::MalformedId {
        expected: EXPECTED,
        actual: s.to_string(),
    })?;
    match rest.split_once('/') {
        Some((outer, inner)) if !outer.is_empty() && !inner.is_empty() && !inner.contains('/') => {
            Ok((zone, outer.to_string(), inner.to_string()))
        }
        _ => Err(Error::MalformedId {
            expected: EXPECTED,
            actual: s.to_string(),
        }),
    }
}

/// Formats an object identifier, `<region>/<bucket>/<key>`.
pub fn object(region: &Region, bucket: &str, key: &str) -> String {
    format!("{region}/{bucket}/{key}")
}

/// Parses an object identifier. The key is everything after the second
/// slash and may contain further slashes.
pub fn parse_object(s: &str) -> Result<(Region, String, String), Error> {
    const EXPECTED: &str = "fr-par/<bucket>/<key>";
    let (locality, rest) = split_locality(s, EXPECTED)?;
    let region = Region::from_str(locality).map_err(|_| Error::MalformedId {
        expected: EXPECTED,
        actual: s.to_string(),
    })?;
    match rest.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            Ok((region, bucket.to_string(), key.to_string()))
        }
        _ => Err(Error::MalformedId {
            expected: EXPECTED,
            actual: s.to_string(),
        }),
    }
}

/// A bucket-ACL identifier: `<region>/<bucket>[/<canned-acl>][@<owner-id>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclId {
    pub region: Region,
    pub bucket: String,
    pub canned_acl: Option<String>,
    pub expected_owner: Option<String>,
}

impl fmt::Display for AclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.bucket)?;
        if let Some(acl) = &self.canned_acl {
            write!(f, "/{acl}")?;
        }
        if let Some(owner) = &self.expected_owner {
            write!(f, "@{owner}")?;
        }
        Ok(())
    }
}

impl FromStr for AclId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const EXPECTED: &str = "fr-par/<bucket>[/<canned-acl>][@<owner-id>]";
        let malformed = || Error::MalformedId {
            expected: EXPECTED,
            actual: s.to_string(),
        };
        let (head, expected_owner) = match s.rsplit_once('@') {
            Some((head, owner)) if !owner.is_empty() => (head, Some(owner.to_string())),
            Some(_) => return Err(malformed()),
            None => (s, None),
        };
        let (locality, rest) = split_locality(head, EXPECTED)?;
        let region = Region::from_str(locality).map_err(|_| malformed())?;
        let (bucket, canned_acl) = match rest.split_once('/') {
            Some((bucket, acl)) if !bucket.is_empty() && !acl.is_empty() && !acl.contains('/') => {
                (bucket.to_string(), Some(acl.to_string()))
            }
            Some(_) => return Err(malformed()),
            None if !rest.is_empty() => (rest.to_string(), None),
            None => return Err(malformed()),
        };
        Ok(AclId {
            region,
            bucket,
            canned_acl,
            expected_owner,
        })
    }
}

/// Strips a locality prefix if one is present, returning the raw part.
/// Accepts bare identifiers unchanged, so it is safe on user input that may
/// or may not carry a locality.
pub fn strip(s: &str) -> &str {
    match s.split_once('/') {
        Some((_, rest)) => rest,
        None => s,
    }
}

/// Ensures a zonal identifier carries its locality prefix.
pub fn expand_zoned(zone: &Zone, s: &str) -> String {
    if s.contains('/') {
        s.to_string()
    } else {
        zoned(zone, s)
    }
}

fn split_locality<'a>(s: &'a str, expected: &'static str) -> Result<(&'a str, &'a str), Error> {
    s.split_once('/').ok_or(Error::MalformedId {
        expected,
        actual: s.to_string(),
    })
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    fn zone() -> Zone {
        Zone::from_str("fr-par-1").unwrap()
    }

    fn region() -> Region {
        Region::from_str("fr-par").unwrap()
    }

    const UUID: &str = "11111111-1111-1111-1111-111111111111";

    #[test]
    fn zoned_round_trip() {
        let formatted = zoned(&zone(), UUID);
        assert_eq!(formatted, format!("fr-par-1/{UUID}"));
        let (z, id) = parse_zoned(&formatted).unwrap();
        assert_eq!(z, zone());
        assert_eq!(id, UUID);
    }

    #[test]
    fn regional_round_trip() {
        let formatted = regional(&region(), UUID);
        let (r, id) = parse_regional(&formatted).unwrap();
        assert_eq!(r, region());
        assert_eq!(id, UUID);
    }

    #[test]
    fn wrong_flavor_is_an_error() {
        // A regional id handed to the zonal parser must fail, not default.
        assert!(parse_zoned(&regional(&region(), UUID)).is_err());
        assert!(parse_regional(&zoned(&zone(), UUID)).is_err());
    }

    #[test]
    fn nested_round_trip() {
        let formatted = zoned_nested(&zone(), "outer", "inner");
        let (z, outer, inner) = parse_zoned_nested(&formatted).unwrap();
        assert_eq!(z, zone());
        assert_eq!(outer, "outer");
        assert_eq!(inner, "inner");
    }

    #[test]
    fn nested_rejects_plain_ids() {
        assert!(parse_zoned_nested(&zoned(&zone(), UUID)).is_err());
    }

    #[test]
    fn object_key_keeps_embedded_slashes() {
        let formatted = object(&region(), "my-bucket", "path/to/file.txt");
        let (r, bucket, key) = parse_object(&formatted).unwrap();
        assert_eq!(r, region());
        assert_eq!(bucket, "my-bucket");
        assert_eq!(key, "path/to/file.txt");
    }

    #[test]
    fn acl_id_all_forms() {
        let plain = AclId::from_str("fr-par/my-bucket").unwrap();
        assert_eq!(plain.bucket, "my-bucket");
        assert_eq!(plain.canned_acl, None);
        assert_eq!(plain.expected_owner, None);

        let canned = AclId::from_str("fr-par/my-bucket/private").unwrap();
        assert_eq!(canned.canned_acl.as_deref(), Some("private"));

        let owned = AclId::from_str("fr-par/my-bucket/private@1234").unwrap();
        assert_eq!(owned.expected_owner.as_deref(), Some("1234"));
        assert_eq!(owned.to_string(), "fr-par/my-bucket/private@1234");

        let owner_no_acl = AclId::from_str("fr-par/my-bucket@1234").unwrap();
        assert_eq!(owner_no_acl.canned_acl, None);
        assert_eq!(owner_no_acl.expected_owner.as_deref(), Some("1234"));
    }

    #[test]
    fn strip_and_expand() {
        assert_eq!(strip("fr-par-1/abc"), "abc");
        assert_eq!(strip("abc"), "abc");
        assert_eq!(expand_zoned(&zone(), "abc"), "fr-par-1/abc");
        assert_eq!(expand_zoned(&zone(), "fr-par-2/abc"), "fr-par-2/abc");
    }
}
