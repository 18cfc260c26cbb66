//! Filename sanitization and extension derivation
//!
//! Every name this crate writes to disk or offers to HTTP clients goes through
//! [`sanitize`] or [`sanitize_stem`]. Both are deterministic and idempotent:
//! sanitizing an already-sanitized name returns it unchanged.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Maximum length of a sanitized name, in code points (extension included)
pub const MAX_NAME_CHARS: usize = 255;

/// Longest suffix still treated as an extension
const MAX_EXTENSION_CHARS: usize = 32;

/// Fallback used whenever sanitizing leaves nothing
const FALLBACK_NAME: &str = "file";

/// Windows device names that cannot be used as a file stem
const RESERVED_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Runs of anything other than letters, digits, `_`, space and `-`
#[allow(clippy::expect_used)]
static INVALID_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{L}\p{N}_ \-]+").expect("invalid-chars regex is valid") // Static pattern
});

#[allow(clippy::expect_used)]
static SEPARATOR_RUNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[_\-]{2,}").expect("separator-runs regex is valid") // Static pattern
});

/// Sanitize a filename that may carry an extension
///
/// The extension (the text after the last `.`) is kept when it is short and
/// alphanumeric; otherwise the whole input is treated as a stem. The result
/// never contains path separators, never names a reserved device, never
/// exceeds [`MAX_NAME_CHARS`] code points and never has an empty stem.
///
/// # Examples
///
/// ```
/// use media_dl::filename::sanitize;
///
/// assert_eq!(sanitize("Café del Mar.mp4"), "Cafe_del_Mar.mp4");
/// assert_eq!(sanitize("../../etc/passwd"), "etc-passwd");
/// assert_eq!(sanitize("CON.txt"), "CON_.txt");
/// assert_eq!(sanitize(""), "file");
/// ```
#[must_use]
pub fn sanitize(name: &str) -> String {
    match split_extension(name) {
        Some((stem, ext)) => {
            let budget = MAX_NAME_CHARS - 1 - ext.chars().count();
            format!("{}.{}", sanitize_with_budget(stem, budget), ext)
        }
        None => sanitize_with_budget(name, MAX_NAME_CHARS),
    }
}

/// Sanitize a free-form title into a filename stem (no extension detection)
///
/// ```
/// use media_dl::filename::sanitize_stem;
///
/// assert_eq!(sanitize_stem("Test Video"), "Test_Video");
/// assert_eq!(sanitize_stem("Mr. Smith: the sequel"), "Mr_Smith_the_sequel");
/// ```
#[must_use]
pub fn sanitize_stem(title: &str) -> String {
    sanitize_with_budget(title, MAX_NAME_CHARS)
}

/// File extension for a MIME type such as `video/mp4; codecs="avc1"`
///
/// ```
/// use media_dl::filename::extension_for;
///
/// assert_eq!(extension_for("video/mp4; codecs=\"avc1.64001F\""), "mp4");
/// assert_eq!(extension_for("video/x-matroska"), "mkv");
/// assert_eq!(extension_for(""), "bin");
/// ```
#[must_use]
pub fn extension_for(mime_type: &str) -> String {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let (kind, subtype) = essence.split_once('/').unwrap_or(("", essence.as_str()));

    let mapped = match (kind, subtype) {
        (_, "x-matroska") => "mkv",
        (_, "quicktime") => "mov",
        (_, "3gpp") => "3gp",
        (_, "x-msvideo") => "avi",
        ("audio", "mpeg") => "mp3",
        ("audio", "mp4") => "m4a",
        (_, other) => other.trim_start_matches("x-"),
    };

    let ext: String = mapped.chars().filter(char::is_ascii_alphanumeric).collect();
    if ext.is_empty() || ext.len() > MAX_EXTENSION_CHARS {
        "bin".to_string()
    } else {
        ext
    }
}

/// Split `name` into (stem, sanitized extension) when it has a usable extension
fn split_extension(name: &str) -> Option<(&str, String)> {
    let file_part = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let dot = file_part.rfind('.')?;
    let raw_ext = &file_part[dot + 1..];
    if raw_ext.is_empty() || !raw_ext.chars().all(char::is_alphanumeric) {
        return None;
    }

    let ext: String = strip_marks(raw_ext)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    if ext.is_empty() || ext.chars().count() > MAX_EXTENSION_CHARS {
        return None;
    }

    let stem_len = name.len() - raw_ext.len() - 1;
    Some((&name[..stem_len], ext))
}

/// NFKD-decompose and drop combining marks and control characters
fn strip_marks(value: &str) -> String {
    value
        .nfkd()
        .filter(|c| !is_combining_mark(*c) && !c.is_control())
        .collect()
}

fn sanitize_with_budget(stem: &str, budget: usize) -> String {
    let decomposed = strip_marks(stem);

    let s = decomposed.replace(['/', '\\'], "-");
    let s = s.trim().replace(' ', "_");
    let s = INVALID_CHARS.replace_all(&s, "_");
    let s = SEPARATOR_RUNS.replace_all(&s, "_");
    let mut s = s.trim_matches(['_', '-', ' ']).to_string();

    if s.is_empty() {
        s = FALLBACK_NAME.to_string();
    }

    if RESERVED_NAMES.contains(&s.to_lowercase().as_str()) {
        s.push('_');
    }

    if s.chars().count() > budget {
        let truncated: String = s.chars().take(budget).collect();
        s = truncated.trim_end_matches(['_', '-', ' ']).to_string();
        if s.is_empty() {
            s = FALLBACK_NAME.to_string();
        }
    }

    s
}
