//! URL path canonicalization.
//!
//! Stored paths always have a single leading slash, no trailing slash
//! (except the root `/`) and no empty segments.

/// Canonicalize a page path. Never fails.
pub fn normalize(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.trim().split('/').filter(|s| !s.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }

    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Join a base path and a child segment, then normalize.
pub fn join(base: &str, child: &str) -> String {
    normalize(&format!("{base}/{child}"))
}
