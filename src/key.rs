//! Storage keys for incoming webhooks.
//!
//! A key looks like `webhook-<slug>-<unix seconds>`. Two deliveries to the
//! same path within one second share a key; the later write wins.

use chrono::{DateTime, Utc};

pub const KEY_PREFIX: &str = "webhook-";

/// Reduces a URL path to lower-case `[a-z0-9_-]`, with single hyphens
/// between segments and none at either end.
pub fn slugify(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    let mut slug = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        let ch = if ch.is_ascii_alphanumeric() || ch == '_' {
            ch.to_ascii_lowercase()
        } else {
            '-'
        };
        if ch == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(ch);
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("root");
    }
    slug
}

pub fn generate_key(path: &str, arrived_at: DateTime<Utc>) -> String {
    format!("{}{}-{}", KEY_PREFIX, slugify(path), arrived_at.timestamp())
}
