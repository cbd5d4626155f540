//! # Key Layout
//!
//! Every projection namespace owns two key ranges in the shared store.

const RECORD_TAG: &str = "rec";
const INDEX_TAG: &str = "idx";

fn compose(namespace: &str, tag: &str, key: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(namespace.len() + tag.len() + key.len() + 2);
    out.extend_from_slice(namespace.as_bytes());
    out.push(b':');
    out.extend_from_slice(tag.as_bytes());
    out.push(b':');
    out.extend_from_slice(key.as_bytes());
    out
}

/// `<ns>:rec:<id>`
#[must_use]
pub fn record_key(namespace: &str, id: &str) -> Vec<u8> {
    compose(namespace, RECORD_TAG, id)
}

/// `<ns>:idx:<secondary>`
#[must_use]
pub fn index_key(namespace: &str, secondary: &str) -> Vec<u8> {
    compose(namespace, INDEX_TAG, secondary)
}

/// Prefix covering every record of a namespace.
#[must_use]
pub fn record_prefix(namespace: &str) -> Vec<u8> {
    compose(namespace, RECORD_TAG, "")
}
