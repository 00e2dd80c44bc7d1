//! Preference key rules.
//!
//! The remote store only accepts keys and values up to a fixed number of
//! bytes, and rejects some characters in keys altogether. Every key
//! that reaches the [`PreferenceStore`](crate::PreferenceStore) has gone
//! through [`sanitize_key`].

use lazy_static::lazy_static;
use regex::Regex;

use crate::ConfigError;

/// Keys (prefix included) must be strictly shorter than this many bytes.
pub const MAX_KEY_LENGTH: usize = 255;

/// Maximum number of bytes held by a single remote value.
pub const SLOT_LENGTH: usize = 255;

/// Hard ceiling on the number of slots a long value may occupy.
pub const MAX_CHUNKS: usize = 100;

/// Infix shared by every slot of a long value.
pub const COMBINED_INFIX: &str = "-combined";

lazy_static! {
    static ref FORBIDDEN_CHARACTERS: Regex = Regex::new(r#"[:\\/"' {}.%]"#).unwrap();
}

/// Prepend `prefix` to `key` and strip every character the remote store
/// refuses (`: \ / " ' space { } . %`).
///
/// # Errors
///
/// Returns [`ConfigError::KeyTooLong`] when the result has
/// [`MAX_KEY_LENGTH`] bytes or more.
///
/// # Example
///
/// ```rust
/// use prefsync_core::sanitize_key;
///
/// assert_eq!(sanitize_key("app-", "a:b/c").unwrap(), "app-abc");
/// assert_eq!(sanitize_key("", "map.zoom level").unwrap(), "mapzoomlevel");
/// ```
pub fn sanitize_key(prefix: &str, key: &str) -> Result<String, ConfigError> {
    let joined = format!("{}{}", prefix, key);
    let sanitized = FORBIDDEN_CHARACTERS.replace_all(&joined, "").into_owned();

    let length = sanitized.len();
    if length >= MAX_KEY_LENGTH {
        return Err(ConfigError::KeyTooLong {
            key: sanitized,
            length,
        });
    }

    Ok(sanitized)
}

/// Key of the slot holding the number of chunks of the long value `base`.
pub fn length_slot_key(base: &str) -> String {
    format!("{}{}-length", base, COMBINED_INFIX)
}

/// Key of chunk `index` of the long value `base`.
pub fn chunk_slot_key(base: &str, index: usize) -> String {
    format!("{}{}-{}", base, COMBINED_INFIX, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_forbidden_characters_after_prefixing() {
        assert_eq!(sanitize_key("app-", "a:b/c").unwrap(), "app-abc");
        assert_eq!(
            sanitize_key("app-", r#"we "quote" {it} 100%"#).unwrap(),
            "app-wequoteit100"
        );
        assert_eq!(sanitize_key("", r"back\slash's.dot").unwrap(), "backslashsdot");
    }

    #[test]
    fn prefix_is_sanitized_too() {
        assert_eq!(sanitize_key("my app:", "theme").unwrap(), "myapptheme");
    }

    #[test]
    fn empty_prefix_leaves_clean_key_alone() {
        assert_eq!(
            sanitize_key("", "app-notes-combined-3").unwrap(),
            "app-notes-combined-3"
        );
    }

    #[test]
    fn rejects_key_at_limit() {
        let key = "k".repeat(MAX_KEY_LENGTH - 4);
        let err = sanitize_key("app-", &key).unwrap_err();
        assert_eq!(
            err,
            ConfigError::KeyTooLong {
                key: format!("app-{}", key),
                length: MAX_KEY_LENGTH,
            }
        );
    }

    #[test]
    fn accepts_key_just_below_limit() {
        let key = "k".repeat(MAX_KEY_LENGTH - 5);
        let sanitized = sanitize_key("app-", &key).unwrap();
        assert_eq!(sanitized.len(), MAX_KEY_LENGTH - 1);
    }

    #[test]
    fn length_is_measured_after_stripping() {
        let key = ".".repeat(400) + "x";
        assert_eq!(sanitize_key("app-", &key).unwrap(), "app-x");
    }

    #[test]
    fn each_forbidden_character_is_stripped() {
        for c in [':', '\\', '/', '"', '\'', ' ', '{', '}', '.', '%'] {
            assert_eq!(sanitize_key("", &format!("a{c}b")).unwrap(), "ab");
        }
        for c in ['-', '_', 'a', '0', 'é'] {
            assert_eq!(sanitize_key("", &format!("a{c}b")).unwrap(), format!("a{c}b"));
        }
    }

    #[test]
    fn length_is_counted_in_bytes() {
        let key = "é".repeat(126);
        assert_eq!(sanitize_key("", &key).unwrap().len(), 252);

        let err = sanitize_key("app-", &key).unwrap_err();
        assert_eq!(
            err,
            ConfigError::KeyTooLong {
                key: format!("app-{}", key),
                length: 256,
            }
        );
    }

    #[test]
    fn slot_keys() {
        assert_eq!(length_slot_key("app-notes"), "app-notes-combined-length");
        assert_eq!(chunk_slot_key("app-notes", 0), "app-notes-combined-0");
        assert_eq!(chunk_slot_key("app-notes", 12), "app-notes-combined-12");
    }
}
