//! Combining client defaults with per-call configuration.

use serde_json::{Map, Value};

use super::{ClientDefaults, RequestConfig};
use crate::headers;

/// Produce the effective config for one call.
///
/// - Scalars (`timeout`, `credentials`) take the call's value, else the default.
/// - Headers merge by name: defaults first, call headers replace same-name entries.
/// - `base_url` takes the call's value when present and non-empty, else the default.
/// - `options` merge recursively with [`deep_merge`].
///
/// # Example
///
/// ```
/// use fexios::{merge_config, ClientDefaults, RequestConfig};
///
/// let mut defaults = ClientDefaults::with_base_url("https://api.example.com");
/// defaults.headers.insert("a", "1".parse().unwrap());
/// defaults.headers.insert("b", "2".parse().unwrap());
///
/// let call = RequestConfig::get("/users").header("b", "3").header("c", "4");
/// let effective = merge_config(&defaults, call);
///
/// assert_eq!(effective.headers.get("a").unwrap(), "1");
/// assert_eq!(effective.headers.get("b").unwrap(), "3");
/// assert_eq!(effective.headers.get("c").unwrap(), "4");
/// assert_eq!(effective.base_url.as_deref(), Some("https://api.example.com"));
/// ```
pub fn merge_config<T>(defaults: &ClientDefaults, config: RequestConfig<T>) -> RequestConfig<T> {
    let mut merged_headers = defaults.headers.clone();
    headers::overlay(&mut merged_headers, config.headers);

    let mut options = defaults.options.clone();
    deep_merge(&mut options, config.options);

    RequestConfig {
        url: config.url,
        method: config.method,
        headers: merged_headers,
        base_url: pick_base_url(config.base_url, defaults.base_url.as_ref()),
        data: config.data,
        timeout: config.timeout.or(defaults.timeout),
        credentials: config.credentials.or(defaults.credentials),
        options,
    }
}

/// Merge two sets of client defaults, with the same rules as [`merge_config`].
pub fn merge_defaults(base: &ClientDefaults, overrides: ClientDefaults) -> ClientDefaults {
    let mut merged_headers = base.headers.clone();
    headers::overlay(&mut merged_headers, overrides.headers);

    let mut options = base.options.clone();
    deep_merge(&mut options, overrides.options);

    ClientDefaults {
        base_url: pick_base_url(overrides.base_url, base.base_url.as_ref()),
        headers: merged_headers,
        timeout: overrides.timeout.or(base.timeout),
        credentials: overrides.credentials.or(base.credentials),
        options,
    }
}

/// Recursively merge `source` into `target`.
///
/// When both sides hold an object under the same key the objects are merged;
/// otherwise the source value replaces the target value. Arrays are replaced
/// whole, never merged element-wise.
pub fn deep_merge(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match value {
            Value::Object(incoming) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => deep_merge(existing, incoming),
                _ => {
                    target.insert(key, Value::Object(incoming));
                }
            },
            other => {
                target.insert(key, other);
            }
        }
    }
}

fn pick_base_url(preferred: Option<String>, fallback: Option<&String>) -> Option<String> {
    preferred
        .filter(|base| !base.is_empty())
        .or_else(|| fallback.cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use serde_json::json;
    use std::time::Duration;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn defaults() -> ClientDefaults {
        let mut defaults = ClientDefaults::with_base_url("https://api.example.com");
        defaults.headers.insert("a", "1".parse().unwrap());
        defaults.headers.insert("b", "2".parse().unwrap());
        defaults.timeout = Some(Duration::from_secs(10));
        defaults.credentials = Some(Credentials::SameOrigin);
        defaults
    }

    #[test]
    fn test_headers_merge_by_name() {
        let call = RequestConfig::get("/x").header("b", "3").header("c", "4");
        let merged = merge_config(&defaults(), call);

        assert_eq!(merged.headers.len(), 3);
        assert_eq!(merged.headers.get("a").unwrap(), "1");
        assert_eq!(merged.headers.get("b").unwrap(), "3");
        assert_eq!(merged.headers.get("c").unwrap(), "4");
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let mut defaults = ClientDefaults::default();
        defaults.headers.insert("content-type", "application/json".parse().unwrap());

        let call = RequestConfig::get("/x").header("Content-Type", "text/plain");
        let merged = merge_config(&defaults, call);

        assert_eq!(merged.headers.len(), 1);
        assert_eq!(merged.headers.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn test_scalars_override_wins_else_default() {
        let merged = merge_config(&defaults(), RequestConfig::get("/x"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(10)));
        assert_eq!(merged.credentials, Some(Credentials::SameOrigin));

        let call = RequestConfig::get("/x")
            .timeout(Duration::from_secs(1))
            .credentials(Credentials::Omit);
        let merged = merge_config(&defaults(), call);
        assert_eq!(merged.timeout, Some(Duration::from_secs(1)));
        assert_eq!(merged.credentials, Some(Credentials::Omit));
    }

    #[test]
    fn test_base_url_fallback() {
        let merged = merge_config(&defaults(), RequestConfig::get("/x"));
        assert_eq!(merged.base_url.as_deref(), Some("https://api.example.com"));

        let merged = merge_config(&defaults(), RequestConfig::get("/x").base_url(""));
        assert_eq!(merged.base_url.as_deref(), Some("https://api.example.com"));

        let call = RequestConfig::get("/x").base_url("https://eu.example.com");
        let merged = merge_config(&defaults(), call);
        assert_eq!(merged.base_url.as_deref(), Some("https://eu.example.com"));
    }

    #[test]
    fn test_absolute_url_bypasses_default_base() {
        let call = RequestConfig::get("https://cdn.example.net/logo.png");
        let merged = merge_config(&defaults(), call);
        assert_eq!(
            merged.resolved_url().unwrap().as_str(),
            "https://cdn.example.net/logo.png"
        );
    }

    #[test]
    fn test_deep_merge_nested_objects() {
        let mut target = object(json!({
            "retry": { "max": 3, "codes": [500, 502] },
            "trace": true
        }));
        let source = object(json!({
            "retry": { "codes": [503], "backoff": "linear" },
            "trace": { "sample": 0.5 }
        }));

        deep_merge(&mut target, source);

        assert_eq!(
            Value::Object(target),
            json!({
                "retry": { "max": 3, "codes": [503], "backoff": "linear" },
                "trace": { "sample": 0.5 }
            })
        );
    }

    #[test]
    fn test_deep_merge_scalar_replaces_object() {
        let mut target = object(json!({ "cache": { "ttl": 60 } }));
        deep_merge(&mut target, object(json!({ "cache": false })));
        assert_eq!(Value::Object(target), json!({ "cache": false }));
    }

    #[test]
    fn test_merge_defaults_for_derived_client() {
        let mut overrides = ClientDefaults::with_base_url("https://v2.example.com");
        overrides.headers.insert("b", "9".parse().unwrap());

        let merged = merge_defaults(&defaults(), overrides);
        assert_eq!(merged.base_url.as_deref(), Some("https://v2.example.com"));
        assert_eq!(merged.headers.get("a").unwrap(), "1");
        assert_eq!(merged.headers.get("b").unwrap(), "9");
        assert_eq!(merged.timeout, Some(Duration::from_secs(10)));
    }
}
