//! Key sanitizer.
//!
//! Document keys can be any string; native field names must look like
//! `[A-Za-z][A-Za-z0-9_]*` and fit the host's identifier length. Each key of
//! one record is cleaned independently, then collisions within the record
//! are resolved by appending the smallest free integer suffix.
//!
//! ```rust
//! use ndbson::sanitize::sanitize_keys;
//!
//! let names = sanitize_keys(["_id", "1x", "a b", "a b"], "id_", 63).unwrap();
//! assert_eq!(names, vec!["id_", "x1x", "a_b", "a_b0"]);
//! ```

use crate::{Error, Result};
use std::collections::HashSet;

/// The document key that holds an object identifier.
pub const ID_KEY: &str = "_id";

const DIGIT_ESCAPE: char = 'x';
const PLACEHOLDER: &str = "x";

/// Cleans one key without regard to its siblings.
///
/// Leading non-alphanumeric characters are dropped, a leading digit gains an
/// `x` prefix, every run of other characters becomes one underscore, and the
/// result is cut to `max_len` characters. An empty result becomes `x`.
///
/// # Examples
///
/// ```rust
/// use ndbson::sanitize::sanitize_key;
///
/// assert_eq!(sanitize_key("$gt", "id_", 63), "gt");
/// assert_eq!(sanitize_key("first name", "id_", 63), "first_name");
/// assert_eq!(sanitize_key("2nd", "id_", 63), "x2nd");
/// assert_eq!(sanitize_key("...", "id_", 63), "x");
/// ```
#[must_use]
pub fn sanitize_key(raw: &str, id_field: &str, max_len: usize) -> String {
    if raw == ID_KEY {
        return id_field.to_string();
    }
    let trimmed = raw.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
    let mut name = String::with_capacity(trimmed.len().min(max_len) + 1);
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        name.push(DIGIT_ESCAPE);
    }
    let mut in_run = false;
    for c in trimmed.chars() {
        if name.len() >= max_len {
            break;
        }
        if c.is_ascii_alphanumeric() {
            name.push(c);
            in_run = false;
        } else if !in_run {
            name.push('_');
            in_run = true;
        }
    }
    name.truncate(max_len);
    if name.is_empty() {
        name.push_str(PLACEHOLDER);
    }
    name
}

/// Cleans the keys of one record and makes them unique.
///
/// # Errors
///
/// Returns [`Error::KeyCollision`] if a duplicate name cannot take a suffix
/// without exceeding `max_len`.
pub fn sanitize_keys<'a, I>(keys: I, id_field: &str, max_len: usize) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let keys = keys.into_iter();
    let mut names = Vec::with_capacity(keys.size_hint().0);
    let mut taken = HashSet::new();
    for raw in keys {
        let base = sanitize_key(raw, id_field, max_len);
        let name = if taken.contains(&base) {
            unique_name(&base, &taken, max_len)?
        } else {
            base
        };
        if name != raw {
            tracing::trace!(key = raw, field = %name, "renamed document key");
        }
        taken.insert(name.clone());
        names.push(name);
    }
    Ok(names)
}

fn unique_name(base: &str, taken: &HashSet<String>, max_len: usize) -> Result<String> {
    for suffix in 0usize.. {
        let candidate = format!("{}{}", base, suffix);
        if candidate.len() > max_len {
            break;
        }
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(Error::KeyCollision {
        key: base.to_string(),
        limit: max_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_key_maps_to_id_field() {
        assert_eq!(sanitize_key("_id", "id_", 63), "id_");
        assert_eq!(sanitize_key("_id", "oid", 63), "oid");
        assert_eq!(sanitize_key("__id", "id_", 63), "id");
    }

    #[test]
    fn test_runs_collapse_to_one_underscore() {
        assert_eq!(sanitize_key("a  -- b", "id_", 63), "a_b");
        assert_eq!(sanitize_key("a.b.", "id_", 63), "a_b_");
        assert_eq!(sanitize_key("naïve", "id_", 63), "na_ve");
    }

    #[test]
    fn test_truncates_to_limit() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_key(&long, "id_", 63).len(), 63);
        assert_eq!(sanitize_key("123456", "id_", 4), "x123");
    }

    #[test]
    fn test_collisions_take_smallest_free_suffix() {
        let names = sanitize_keys(["a b", "a-b", "a_b0", "a.b"], "id_", 63).unwrap();
        assert_eq!(names, vec!["a_b", "a_b0", "a_b00", "a_b1"]);
    }

    #[test]
    fn test_id_field_collision() {
        let names = sanitize_keys(["_id", "id_"], "id_", 63).unwrap();
        assert_eq!(names, vec!["id_", "id_0"]);
    }

    #[test]
    fn test_unresolvable_collision_fails() {
        let err = sanitize_keys(["abc", "abc"], "id_", 3).unwrap_err();
        assert_eq!(
            err,
            Error::KeyCollision {
                key: "abc".to_string(),
                limit: 3
            }
        );
    }

    #[test]
    fn test_placeholder_for_empty() {
        let names = sanitize_keys(["", "!!", "x"], "id_", 63).unwrap();
        assert_eq!(names, vec!["x", "x0", "x1"]);
    }
}
