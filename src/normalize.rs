#![forbid(unsafe_code)]

//! Column-name normalization.
//!
//! API responses flatten into dotted camelCase paths such as
//! `statistics.viewCount` or `contentDetails.relatedPlaylists.uploads`. The
//! warehouse tables use lowercase snake_case names without the facet prefix,
//! so those become `view_count` and `related_playlists_uploads`.

/// Facet prefixes stripped from every flattened key.
pub const FACET_PREFIXES: &[&str] = &["snippet.", "contentDetails.", "statistics."];

/// Parameters of the key transform. Kept as plain data so the normalizer
/// itself stays a free function.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRules<'a> {
    /// Substrings removed (every occurrence) before case conversion.
    pub prefixes: &'a [&'a str],
    /// Inserted at lower/digit → upper transitions and in place of `.`.
    pub separator: char,
}

impl ColumnRules<'static> {
    pub const DEFAULT: ColumnRules<'static> = ColumnRules {
        prefixes: FACET_PREFIXES,
        separator: '_',
    };
}

impl Default for ColumnRules<'static> {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Normalizes a single key with [`ColumnRules::DEFAULT`].
pub fn normalize_key(raw: &str) -> String {
    normalize_key_with(raw, &ColumnRules::DEFAULT)
}

pub fn normalize_key_with(raw: &str, rules: &ColumnRules<'_>) -> String {
    let mut stripped = raw.to_string();
    for prefix in rules.prefixes {
        if !prefix.is_empty() {
            stripped = stripped.replace(prefix, "");
        }
    }

    let mut out = String::with_capacity(stripped.len() + 4);
    let mut previous: Option<char> = None;
    for ch in stripped.chars() {
        if ch.is_uppercase()
            && previous.is_some_and(|prev| prev.is_lowercase() || prev.is_ascii_digit())
        {
            out.push(rules.separator);
        }
        if ch == '.' {
            out.push(rules.separator);
        } else {
            out.extend(ch.to_lowercase());
        }
        previous = Some(ch);
    }
    out
}

/// Normalizes every key, preserving length and order.
pub fn normalize_columns<S: AsRef<str>>(keys: &[S]) -> Vec<String> {
    keys.iter().map(|key| normalize_key(key.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_facet_prefix_and_snake_cases() {
        assert_eq!(normalize_key("statistics.viewCount"), "view_count");
        assert_eq!(normalize_key("snippet.title"), "title");
        assert_eq!(normalize_key("contentDetails.duration"), "duration");
    }

    #[test]
    fn nested_paths_join_with_underscores() {
        assert_eq!(
            normalize_key("contentDetails.relatedPlaylists.uploads"),
            "related_playlists_uploads"
        );
        assert_eq!(
            normalize_key("snippet.thumbnails.default.url"),
            "thumbnails_default_url"
        );
        assert_eq!(
            normalize_key("snippet.localized.title"),
            "localized_title"
        );
    }

    #[test]
    fn already_normalized_keys_are_unchanged() {
        for key in ["view_count", "related_playlists_uploads", "id", "etag"] {
            assert_eq!(normalize_key(key), key);
            assert_eq!(normalize_key(&normalize_key(key)), key);
        }
    }

    #[test]
    fn leading_capital_gets_no_underscore() {
        assert_eq!(normalize_key("Title"), "title");
        assert_eq!(normalize_key("ViewCount"), "view_count");
    }

    #[test]
    fn digit_to_upper_is_a_boundary() {
        assert_eq!(normalize_key("thumbnail4Url"), "thumbnail4_url");
    }

    #[test]
    fn consecutive_capitals_do_not_split() {
        assert_eq!(normalize_key("videoURL"), "video_url");
        assert_eq!(normalize_key("HDRSupport"), "hdrsupport");
    }

    #[test]
    fn custom_rules_are_honoured() {
        let rules = ColumnRules {
            prefixes: &["status."],
            separator: '-',
        };
        assert_eq!(
            normalize_key_with("status.privacyStatus", &rules),
            "privacy-status"
        );
        assert_eq!(
            normalize_key_with("snippet.channelId", &rules),
            "snippet-channel-id"
        );
    }

    #[test]
    fn normalize_columns_keeps_length_and_order() {
        let raw = ["id", "snippet.publishedAt", "statistics.likeCount"];
        assert_eq!(
            normalize_columns(&raw),
            vec!["id", "published_at", "like_count"]
        );
        assert!(normalize_columns::<&str>(&[]).is_empty());
    }
}
