//! URL handling for Campus-Harvest
//!
//! Normalization collapses equivalent URLs into one frontier entry; the scope
//! decides which hosts a run may touch.

mod normalize;
mod scope;

pub use normalize::{normalize, normalize_url};
pub use scope::{extract_host, in_scope, matches_wildcard, Scope};

use url::Url;

/// Returns the `http://` form of an `https://` URL, or None for other schemes
///
/// Used by the fetcher for protocol downgrade.
pub fn downgrade_to_http(url: &Url) -> Option<Url> {
    if url.scheme() != "https" {
        return None;
    }

    let mut downgraded = url.clone();
    // Explicit ports are carried over unchanged
    downgraded.set_scheme("http").ok()?;
    Some(downgraded)
}
