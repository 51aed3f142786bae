use crate::error::Error;
use hyper::{
    header::{HeaderName, HeaderValue},
    HeaderMap,
};
use std::collections::HashMap;

/// Flattens response headers to one value per lowercase name, the first one
/// received. Values that are not visible ASCII are skipped.
pub fn extract_headers(header_map: &HeaderMap) -> HashMap<String, String> {
    header_map
        .keys()
        .filter_map(|name| {
            let value = header_map.get(name)?.to_str().ok()?;
            Some((name.as_str().to_owned(), value.to_owned()))
        })
        .collect()
}

/// Copies descriptor headers onto an outgoing request. A name given twice in
/// different cases ends up with the last value written.
pub fn put_headers(
    header_map: &mut HeaderMap<HeaderValue>,
    headers: &HashMap<String, String>,
) -> Result<(), Error> {
    for (name, value) in headers {
        header_map.insert(
            HeaderName::from_bytes(name.as_bytes())?,
            HeaderValue::from_str(value)?,
        );
    }

    Ok(())
}

/// Joins a base url and a request path with exactly one `/` between them.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
