//! Canonical cache identity for storage targets.
//!
//! Two targets that differ only in host order, or in options that are
//! explicitly `null`/`false` versus simply absent, must land in the same
//! cache entry. This module folds those distinctions away and digests the
//! canonical form, so the registry can use plain hash-map lookups.

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::StorageTarget;

/// Canonical identity of a [`StorageTarget`] within a cache domain.
///
/// Derivation is pure: identical targets yield identical keys across calls
/// and process lifetime. Distinct targets collide only with the probability
/// of a SHA-256 collision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{domain}:{digest}")]
pub struct CacheKey {
    domain: String,
    digest: String,
}

impl CacheKey {
    /// Derive the cache key for `target` in the given domain.
    ///
    /// `None` selects the default (unnamed) domain. Requests in different
    /// domains never share cache entries, even for identical targets.
    pub fn derive(target: &StorageTarget, domain: Option<&str>) -> Self {
        let domain = domain.unwrap_or_default().to_string();

        let mut hasher = Sha256::new();
        hasher.update(domain.as_bytes());
        hasher.update([0u8]);
        hasher.update(canonical_form(target).as_bytes());

        Self {
            domain,
            digest: hex::encode(hasher.finalize()),
        }
    }

    /// The cache domain this key belongs to; empty for the default domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Hex digest of the canonical target form.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Serialize the identity-relevant parts of a target deterministically.
///
/// Hosts are compared as a set: sorted and deduplicated. Options go through
/// [`normalize_options`]. `serde_json` objects serialize with sorted keys,
/// so map iteration order never leaks into the digest.
fn canonical_form(target: &StorageTarget) -> String {
    let mut hosts: Vec<&str> = target.hosts.iter().map(String::as_str).collect();
    hosts.sort_unstable();
    hosts.dedup();

    json!({
        "scheme": target.scheme,
        "hosts": hosts,
        "database": target.database,
        "username": target.username,
        "password": target.password,
        "options": Value::Object(normalize_options(&target.options)),
    })
    .to_string()
}

/// Fold unset-equivalent option values away, recursively.
///
/// `null` and `false` mean "this option is not in effect", exactly like an
/// absent key, so all three collapse to the same representation. Objects are
/// normalized entry-by-entry and dropped entirely once empty. Arrays are
/// kept verbatim: `[false]` is a value, not an unset marker.
pub fn normalize_options(options: &Map<String, Value>) -> Map<String, Value> {
    options
        .iter()
        .filter_map(|(key, value)| normalize_value(value).map(|value| (key.clone(), value)))
        .collect()
}

fn normalize_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Object(map) => {
            let normalized = normalize_options(map);
            if normalized.is_empty() {
                None
            } else {
                Some(Value::Object(normalized))
            }
        }
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(url: &str) -> CacheKey {
        CacheKey::derive(&StorageTarget::parse(url).unwrap(), None)
    }

    #[test]
    fn host_order_is_irrelevant() {
        assert_eq!(
            key("mongodb://h1:27017,h2:27017/db"),
            key("mongodb://h2:27017,h1:27017/db")
        );
    }

    #[test]
    fn duplicate_hosts_collapse() {
        assert_eq!(key("mongodb://h1,h1,h2/db"), key("mongodb://h2,h1/db"));
    }

    #[test]
    fn falsy_options_equal_absent() {
        assert_eq!(key("mongodb://h1/db?journal=false"), key("mongodb://h1/db"));

        let explicit_null = StorageTarget::parse("mongodb://h1/db")
            .unwrap()
            .with_option("journal", Value::Null);
        assert_eq!(CacheKey::derive(&explicit_null, None), key("mongodb://h1/db"));
    }

    #[test]
    fn nested_objects_normalize_deeply() {
        let base = StorageTarget::parse("mongodb://h1/db").unwrap();
        let with_empty = base
            .clone()
            .with_option("tls", json!({"insecure": false, "ca": null}));
        let with_value = base
            .clone()
            .with_option("tls", json!({"insecure": false, "ca": "/etc/ca.pem"}));

        // The nested object folds away entirely once every entry is unset.
        assert_eq!(
            CacheKey::derive(&with_empty, None),
            CacheKey::derive(&base, None)
        );
        assert_ne!(
            CacheKey::derive(&with_value, None),
            CacheKey::derive(&base, None)
        );
    }

    #[test]
    fn significant_differences_change_the_key() {
        assert_ne!(key("mongodb://h1/db"), key("mongodb://h2/db"));
        assert_ne!(key("mongodb://h1/db"), key("mongodb://h1/other"));
        assert_ne!(key("mongodb://h1/db?w=2"), key("mongodb://h1/db"));
        // Zero and empty string are real values, not unset markers.
        assert_ne!(key("mongodb://h1/db?w=0"), key("mongodb://h1/db"));
        assert_ne!(key("mongodb://h1/db?replicaSet="), key("mongodb://h1/db"));
    }

    #[test]
    fn domains_partition_keys() {
        let target = StorageTarget::parse("mongodb://h1/db").unwrap();

        assert_eq!(
            CacheKey::derive(&target, Some("x")),
            CacheKey::derive(&target, Some("x"))
        );
        assert_ne!(
            CacheKey::derive(&target, Some("x")),
            CacheKey::derive(&target, Some("y"))
        );
        assert_ne!(
            CacheKey::derive(&target, Some("x")),
            CacheKey::derive(&target, None)
        );
    }
}
