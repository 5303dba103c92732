//! URL slugs
//!
//! `slugify` normalises a title; `unique_slug` resolves collisions with
//! numbered suffixes and, after `MAX_SLUG_ATTEMPTS`, a random suffix.

use crate::errors::Result;
use std::future::Future;

/// Numbered candidates tried before falling back to a random suffix
pub const MAX_SLUG_ATTEMPTS: usize = 25;

/// Maximum slug length in characters
pub const MAX_SLUG_LEN: usize = 80;

const FALLBACK_SLUG: &str = "untitled";

/// Lowercase ASCII alphanumerics separated by single dashes
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// `base-suffix`, with `base` shortened so the result fits `MAX_SLUG_LEN`
fn with_suffix(base: &str, suffix: &str) -> String {
    let room = MAX_SLUG_LEN.saturating_sub(suffix.len() + 1);
    let head: String = base.chars().take(room).collect();
    format!("{}-{}", head.trim_end_matches('-'), suffix)
}

/// Find a slug not reported as taken by `exists`
///
/// Tries `base`, `base-2`, ... `base-25`; when every candidate is taken,
/// returns `base-<8 hex chars>` without a further lookup.
pub async fn unique_slug<F, Fut>(base: &str, mut exists: F) -> Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let candidate = if attempt == 1 {
            base.to_string()
        } else {
            with_suffix(base, &attempt.to_string())
        };

        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }

    let suffix: [u8; 4] = rand::random();
    let slug = with_suffix(base, &hex::encode(suffix));

    tracing::warn!(
        base = %base,
        slug = %slug,
        attempts = MAX_SLUG_ATTEMPTS,
        "Slug candidates exhausted, using random suffix"
    );

    Ok(slug)
}
