//! Thread identity derived from a forum thread URL.
//!
//! A thread URL such as `https://forum.example/threads/jpd113-su25-b5-mc.4934/`
//! maps to the display name `JPD113_SU25_B5_MC` and the archive key `JPD113`.
//! Both are used as the on-disk namespace for captured images and documents.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of leading display-name characters that form the archive key.
pub const ARCHIVE_KEY_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Invalid thread URL format: {0}")]
    MissingThreadSegment(String),
    #[error("Thread URL has an empty slug: {0}")]
    EmptySlug(String),
    #[error("Thread slug is not a usable folder name: {0}")]
    UnsafeSlug(String),
}

/// Stable archive identity of a single forum thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadIdentity {
    /// Short grouping key (the course code), at most six characters.
    pub archive_key: String,
    /// Normalized full thread name, used as the archive folder name.
    pub display_name: String,
}

fn thread_segment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/threads/([^/]+)/").expect("valid thread regex"))
}

fn numeric_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.\d+$").expect("valid suffix regex"))
}

impl ThreadIdentity {
    /// Parse a thread URL into its identity.
    ///
    /// The key is a plain character prefix of the display name, so short
    /// course codes may be cut mid-token (`AB-CDEF-1` → `AB_CDE`).
    pub fn parse(url: &str) -> Result<Self, IdentityError> {
        let slug = thread_segment()
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| IdentityError::MissingThreadSegment(url.to_string()))?;

        let slug = numeric_suffix().replace(slug, "");
        if slug.is_empty() {
            return Err(IdentityError::EmptySlug(url.to_string()));
        }

        let display_name = slug.to_uppercase().replace('-', "_");
        if display_name.chars().all(|c| c == '.')
            || display_name.contains("..")
            || display_name.contains('\\')
        {
            return Err(IdentityError::UnsafeSlug(url.to_string()));
        }
        let archive_key = display_name.chars().take(ARCHIVE_KEY_LEN).collect();

        Ok(Self {
            archive_key,
            display_name,
        })
    }

    /// Job identifier used by the job registry for this thread.
    pub fn job_id(&self) -> String {
        format!("{}:{}", self.archive_key, self.display_name)
    }
}

impl fmt::Display for ThreadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.archive_key, self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_numeric_suffix() {
        let id = ThreadIdentity::parse("https://fuoverflow.com/threads/jpd113-su25-b5-mc.4934/")
            .unwrap();
        assert_eq!(id.display_name, "JPD113_SU25_B5_MC");
        assert_eq!(id.archive_key, "JPD113");
    }

    #[test]
    fn test_parse_without_suffix() {
        let id = ThreadIdentity::parse("https://fuoverflow.com/threads/swe201c-fa24/").unwrap();
        assert_eq!(id.display_name, "SWE201C_FA24");
        assert_eq!(id.archive_key, "SWE201");
    }

    #[test]
    fn test_archive_key_is_character_prefix() {
        let id = ThreadIdentity::parse("https://fuoverflow.com/threads/ab-cdef-1.12/").unwrap();
        assert_eq!(id.display_name, "AB_CDEF_1");
        assert_eq!(id.archive_key, "AB_CDE");
    }

    #[test]
    fn test_short_name_keeps_whole_key() {
        let id = ThreadIdentity::parse("https://fuoverflow.com/threads/mae.7/").unwrap();
        assert_eq!(id.display_name, "MAE");
        assert_eq!(id.archive_key, "MAE");
    }

    #[test]
    fn test_only_trailing_digits_are_stripped() {
        let id = ThreadIdentity::parse("https://fuoverflow.com/threads/prn211.v2-test.99/")
            .unwrap();
        assert_eq!(id.display_name, "PRN211.V2_TEST");
    }

    #[test]
    fn test_missing_threads_segment() {
        let err = ThreadIdentity::parse("https://fuoverflow.com/forums/jpd113.12/").unwrap_err();
        assert!(matches!(err, IdentityError::MissingThreadSegment(_)));
    }

    #[test]
    fn test_requires_trailing_slash_after_slug() {
        assert!(ThreadIdentity::parse("https://fuoverflow.com/threads/jpd113.4934").is_err());
    }

    #[test]
    fn test_numeric_only_slug_is_rejected() {
        let err = ThreadIdentity::parse("https://fuoverflow.com/threads/.4934/").unwrap_err();
        assert!(matches!(err, IdentityError::EmptySlug(_)));
    }

    #[test]
    fn test_dot_segment_is_rejected() {
        let err = ThreadIdentity::parse("https://fuoverflow.com/threads/../x/").unwrap_err();
        assert!(matches!(err, IdentityError::UnsafeSlug(_)));
    }

    #[test]
    fn test_double_dot_inside_slug_is_rejected() {
        let err = ThreadIdentity::parse("https://fuoverflow.com/threads/a..b.12/").unwrap_err();
        assert!(matches!(err, IdentityError::UnsafeSlug(_)));

        let ok = ThreadIdentity::parse("https://fuoverflow.com/threads/a.b.12/").unwrap();
        assert_eq!(ok.display_name, "A.B");
    }

    #[test]
    fn test_job_id_combines_key_and_name() {
        let id = ThreadIdentity::parse("https://fuoverflow.com/threads/jpd113-su25.1/").unwrap();
        assert_eq!(id.job_id(), "JPD113:JPD113_SU25");
    }
}
