//! Key path derivation for the listing index.
//!
//! Every chunk-0 row stores the key's `depth` (slash count) and `parent`
//! (longest prefix ending in `/`), which the slash-delimiter listing scans
//! instead of walking all keys.

pub fn depth(key: &str) -> i64 {
    key.matches('/').count() as i64
}

/// Longest prefix of `key` ending in `/`, computed after stripping a single
/// trailing `/`. Empty string when the key has no parent directory.
pub fn parent(key: &str) -> String {
    let trimmed = key.strip_suffix('/').unwrap_or(key);
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..=idx].to_string(),
        None => String::new(),
    }
}

/// Exclusive upper bound for the half-open key range `[prefix, upper)`.
///
/// Prefixes are matched as ranges, never as SQL LIKE patterns, so `%` and
/// `_` stay literal. Returns `None` for an empty prefix or when the final
/// character has no successor scalar value.
pub fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let last = prefix.chars().last()?;
    let bumped = char::from_u32(last as u32 + 1)?;
    let mut upper = prefix[..prefix.len() - last.len_utf8()].to_string();
    upper.push(bumped);
    Some(upper)
}
