//! The standard diff suppressors.
//!
//! Each suppressor exists twice: a plain equivalence predicate over strings
//! (unit-testable, reusable inside handlers) and a wrapper matching the
//! [`Suppressor`](crate::attr::Suppressor) signature the schema layer wires
//! into attribute descriptors.

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use ipnet::IpNet;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::data::ResourceData;

/// Equality after stripping any locality prefix from both sides.
pub fn eq_locality_stripped(old: &str, new: &str) -> bool {
    scw_locality::id::strip(old) == scw_locality::id::strip(new)
}

pub fn eq_ignore_case(old: &str, new: &str) -> bool {
    old.eq_ignore_ascii_case(new)
}

/// Case-insensitive with `-` and `_` treated as the same character.
pub fn eq_ignore_case_and_hyphen(old: &str, new: &str) -> bool {
    let norm = |s: &str| s.to_ascii_lowercase().replace('-', "_");
    norm(old) == norm(new)
}

/// Equality of parsed durations, so `1h` and `60m` do not diff.
pub fn eq_duration(old: &str, new: &str) -> bool {
    match (parse_duration(old), parse_duration(new)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Parses `90s`, `30m`, `1h`, and compounds like `1h30m`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    if s.is_empty() {
        return None;
    }
    let mut total = Duration::ZERO;
    let mut digits = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let amount: u64 = digits.parse().ok()?;
        digits.clear();
        let unit = match c {
            'h' => Duration::from_secs(3600),
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                Duration::from_millis(1)
            }
            'm' => Duration::from_secs(60),
            's' => Duration::from_secs(1),
            _ => return None,
        };
        total += unit * u32::try_from(amount).ok()?;
    }
    if digits.is_empty() {
        Some(total)
    } else {
        None
    }
}

/// Equality of parsed RFC-3339 instants, offset-insensitive.
pub fn eq_rfc3339(old: &str, new: &str) -> bool {
    match (
        OffsetDateTime::parse(old, &Rfc3339),
        OffsetDateTime::parse(new, &Rfc3339),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Equality of a bare IP and its single-host CIDR form, or of two CIDRs.
pub fn eq_ip_or_cidr(old: &str, new: &str) -> bool {
    match (parse_net(old), parse_net(new)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn parse_net(s: &str) -> Option<IpNet> {
    if let Ok(net) = IpNet::from_str(s) {
        return Some(net);
    }
    let addr = IpAddr::from_str(s).ok()?;
    let host_len = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    IpNet::new(addr, host_len).ok()
}

/// Order-insensitive equality of two JSON lists, compared as multisets of
/// canonicalized elements.
pub fn eq_unordered_lists(old: &Value, new: &Value) -> bool {
    match (old.as_array(), new.as_array()) {
        (Some(a), Some(b)) => {
            if a.len() != b.len() {
                return false;
            }
            let canon = |items: &[Value]| {
                let mut keys: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                keys.sort();
                keys
            };
            canon(a) == canon(b)
        }
        _ => false,
    }
}

/// Semantic equivalence of two policy documents: key order and whitespace
/// are ignored by parsing, and single-element arrays compare equal to their
/// bare element (`"Action": "s3:*"` vs `"Action": ["s3:*"]`).
pub fn eq_policy(old: &str, new: &str) -> bool {
    match (
        serde_json::from_str::<Value>(old),
        serde_json::from_str::<Value>(new),
    ) {
        (Ok(a), Ok(b)) => normalize_policy(a) == normalize_policy(b),
        _ => false,
    }
}

fn normalize_policy(value: Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut items: Vec<Value> = items.into_iter().map(normalize_policy).collect();
            if items.len() == 1 {
                items.pop().unwrap()
            } else {
                Value::Array(items)
            }
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_policy(v)))
                .collect(),
        ),
        other => other,
    }
}

// Suppressor-signature wrappers.

fn both_strings<'a>(old: &'a Value, new: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((old.as_str()?, new.as_str()?))
}

pub fn locality_stripped(_key: &str, old: &Value, new: &Value, _data: &ResourceData) -> bool {
    both_strings(old, new).is_some_and(|(o, n)| eq_locality_stripped(o, n))
}

pub fn ignore_case(_key: &str, old: &Value, new: &Value, _data: &ResourceData) -> bool {
    both_strings(old, new).is_some_and(|(o, n)| eq_ignore_case(o, n))
}

pub fn ignore_case_and_hyphen(_key: &str, old: &Value, new: &Value, _data: &ResourceData) -> bool {
    both_strings(old, new).is_some_and(|(o, n)| eq_ignore_case_and_hyphen(o, n))
}

pub fn duration(_key: &str, old: &Value, new: &Value, _data: &ResourceData) -> bool {
    both_strings(old, new).is_some_and(|(o, n)| eq_duration(o, n))
}

pub fn time_rfc3339(_key: &str, old: &Value, new: &Value, _data: &ResourceData) -> bool {
    both_strings(old, new).is_some_and(|(o, n)| eq_rfc3339(o, n))
}

pub fn ip_or_cidr(_key: &str, old: &Value, new: &Value, _data: &ResourceData) -> bool {
    both_strings(old, new).is_some_and(|(o, n)| eq_ip_or_cidr(o, n))
}

pub fn policy(_key: &str, old: &Value, new: &Value, _data: &ResourceData) -> bool {
    both_strings(old, new).is_some_and(|(o, n)| eq_policy(o, n))
}

/// List-order-insensitive suppressor. The diff key addresses one element
/// (`ssh_key_ids.0`); the comparison is over the whole list at the
/// attribute's base path.
pub fn order_insensitive(key: &str, _old: &Value, _new: &Value, data: &ResourceData) -> bool {
    let base = base_path(key);
    match (data.get_prior(base), data.get_desired(base)) {
        (Some(old_list), Some(new_list)) => eq_unordered_lists(old_list, new_list),
        _ => false,
    }
}

fn base_path(key: &str) -> &str {
    match key.rsplit_once('.') {
        Some((base, last)) if last.chars().all(|c| c.is_ascii_digit()) => base,
        _ => key,
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn ignore_case_pairs() {
        assert!(eq_ignore_case("Ab", "aB"));
        assert!(!eq_ignore_case("ab", "ba"));
    }

    #[test]
    fn ignore_case_and_hyphen_pairs() {
        assert!(eq_ignore_case_and_hyphen("a-b", "A_B"));
        assert!(!eq_ignore_case_and_hyphen("a-b", "ab"));
    }

    #[test]
    fn durations() {
        assert!(eq_duration("1h", "60m"));
        assert!(eq_duration("1h30m", "90m"));
        assert!(!eq_duration("1h", "61m"));
        assert!(!eq_duration("1h", "bogus"));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("10"), None);
    }

    #[test]
    fn rfc3339_offsets_are_equal_instants() {
        assert!(eq_rfc3339(
            "2025-01-01T00:00:00Z",
            "2025-01-01T01:00:00+01:00"
        ));
        assert!(!eq_rfc3339("2025-01-01T00:00:00Z", "2025-01-01T00:00:01Z"));
    }

    #[test]
    fn ip_and_single_host_cidr() {
        assert!(eq_ip_or_cidr("192.0.2.1", "192.0.2.1/32"));
        assert!(eq_ip_or_cidr("2001:db8::1", "2001:db8::1/128"));
        assert!(!eq_ip_or_cidr("192.0.2.1", "192.0.2.2/32"));
        assert!(eq_ip_or_cidr("10.0.0.0/24", "10.0.0.0/24"));
    }

    #[test]
    fn locality_prefixes_are_stripped() {
        assert!(eq_locality_stripped("fr-par-1/abc", "abc"));
        assert!(eq_locality_stripped("fr-par-1/abc", "fr-par-2/abc"));
        assert!(!eq_locality_stripped("abc", "def"));
    }

    #[test]
    fn value_wrappers_suppress_only_string_pairs() {
        let data = ResourceData::default();
        assert!(locality_stripped(
            "id",
            &json!("fr-par-1/abc"),
            &json!("abc"),
            &data
        ));
        assert!(!locality_stripped("id", &json!("fr-par-1/abc"), &json!(3), &data));
        assert!(ignore_case("k", &json!("A"), &json!("a"), &data));
    }

    #[test]
    fn unordered_lists() {
        assert!(eq_unordered_lists(&json!(["a", "b"]), &json!(["b", "a"])));
        assert!(!eq_unordered_lists(&json!(["a", "b"]), &json!(["a"])));
        assert!(!eq_unordered_lists(&json!(["a", "a"]), &json!(["a", "b"])));
    }

    #[test]
    fn order_insensitive_uses_base_path() {
        let data = ResourceData::new(
            None,
            json!({"ssh_key_ids": ["k1", "k2"]}),
            json!({"ssh_key_ids": ["k2", "k1"]}),
        );
        assert!(order_insensitive(
            "ssh_key_ids.0",
            &json!("k1"),
            &json!("k2"),
            &data
        ));
    }

    #[test]
    fn policy_equivalence() {
        let a = r#"{"Version":"2023-04-17","Statement":[{"Action":["s3:*"],"Effect":"Allow"}]}"#;
        let b = r#"{
            "Statement": [ { "Effect": "Allow", "Action": "s3:*" } ],
            "Version": "2023-04-17"
        }"#;
        assert!(eq_policy(a, b));
        let c = r#"{"Version":"2023-04-17","Statement":[{"Action":"s3:Get*","Effect":"Allow"}]}"#;
        assert!(!eq_policy(a, c));
    }
}
