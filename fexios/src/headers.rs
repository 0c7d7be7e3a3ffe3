//! Header helpers shared by configuration and dispatch.

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::Error;

/// Collapse a header map so every name carries exactly one value.
///
/// Repeated values are joined with `", "` in arrival order, which is how a
/// fetch-style `Headers` object exposes them.
pub fn flatten(headers: &HeaderMap) -> HeaderMap {
    let mut flat = HeaderMap::with_capacity(headers.keys_len());
    for name in headers.keys() {
        let mut values = headers.get_all(name).iter();
        let Some(first) = values.next() else {
            continue;
        };
        let mut joined = first.as_bytes().to_vec();
        for value in values {
            joined.extend_from_slice(b", ");
            joined.extend_from_slice(value.as_bytes());
        }
        // Joining valid values with ", " always yields a valid value.
        if let Ok(value) = HeaderValue::from_bytes(&joined) {
            flat.insert(name.clone(), value);
        }
    }
    flat
}

/// Parse a name/value pair into typed header parts.
pub fn parse_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::InvalidRequest(format!("invalid header name: {}", name)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| Error::InvalidRequest(format!("invalid header value for {}", name)))?;
    Ok((name, value))
}

/// Overlay `overrides` onto `base`, one level deep.
///
/// Every name present in `overrides` replaces all values of that name in
/// `base`; names absent from `overrides` are kept.
pub(crate) fn overlay(base: &mut HeaderMap, overrides: HeaderMap) {
    let mut current: Option<HeaderName> = None;
    for (name, value) in overrides {
        // `None` marks a further value of the previous name.
        match name {
            Some(name) => {
                base.insert(name.clone(), value);
                current = Some(name);
            }
            None => {
                if let Some(name) = &current {
                    base.append(name.clone(), value);
                }
            }
        }
    }
}
