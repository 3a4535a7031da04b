//! Stable set-element hashing.
//!
//! Set-valued attributes identify their elements by a hash of a
//! semantic key string the handler builds. The hash must be stable across
//! process restarts, so it is a fixed FNV-1a rather than the std hasher.

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the key string.
pub fn hash_string(key: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod test {
    use super::hash_string;

    #[test]
    fn stable_known_values() {
        // pinned so a refactor can't silently change recorded set identities
        assert_eq!(hash_string(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(hash_string("a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(hash_string(hash_input().as_str()), hash_string(&hash_input()));
    }

    #[test]
    fn distinct_keys_distinct_hashes() {
        assert_ne!(hash_string("3-GLACIER-"), hash_string("3-STANDARD-"));
    }

    fn hash_input() -> String {
        "fr-par-1/6f3c-pn-1-ipam-a-ipam-b".to_string()
    }
}
