//! Filename canonicalization.
//!
//! Raw video filenames carry a lot of noise: separators used instead of
//! spaces, resolution and codec tags, player/projection markers. This module
//! reduces a filename to words that are worth searching for, and widens
//! catalog-style IDs (`PXVR 258`) into the spellings catalogs index them
//! under (`PXVR00258`, `PXVR258`).
//!
//! The transformation is not guaranteed to be idempotent. Apply it once, to
//! raw filenames.

use once_cell::sync::Lazy;
use regex::Regex;

/// Tokens dropped from filenames (compared case-insensitively).
const NOISE_TOKENS: &[&str] = &[
    "180", "180x180", "2880x1440", "3d", "3dh", "3dv", "30fps", "30m", "360",
    "3840x1920", "4k", "5k", "5400x2700", "60fps", "6k", "7k", "7680x3840",
    "8k", "fb360", "fisheye190", "funscript", "cmscript", "h264", "h265", "hevc",
    "hq", "hsp", "lq", "lr", "mkv", "mkx200", "mkx220", "mono", "mp4", "oculus",
    "oculus5k", "oculusrift", "original", "rf52", "smartphone", "srt", "ssa", "tb",
    "uhq", "vrca220", "vp9",
];

/// Width that numeric IDs are padded to in the zero-padded variant
const PADDED_ID_WIDTH: usize = 5;

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[._+-]").unwrap());
// ASCII whitespace only; other spaces such as U+00A0 stay inside tokens.
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\t\n\f\r ]+").unwrap());
static RESOLUTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+p$").unwrap());
static CATALOG_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-zA-Z]+)[\t\n\f\r ]+([0-9]+)").unwrap());

/// Canonicalize a raw filename into search text.
///
/// # Example
/// ```
/// use scenedex_core::canonicalize;
/// assert_eq!(canonicalize("My.Scene_1080p.h264.mp4"), "My Scene");
/// assert_eq!(canonicalize("PXVR-258.mp4"), "PXVR 258 PXVR00258 PXVR258");
/// ```
pub fn canonicalize(filename: &str) -> String {
    let name = strip_extension(filename);

    let name = SEPARATORS.replace_all(name, " ");
    let name = WHITESPACE.replace_all(&name, " ");
    let name = name.trim();

    let kept: Vec<&str> = name.split(' ').filter(|t| !is_noise_token(t)).collect();

    let mut result = kept.join(" ").replace(" s ", "'s ");
    append_id_variants(&mut result);
    result
}

/// Returns true if a filename token carries no searchable meaning.
///
/// Covers the fixed tag list plus resolution markers such as `1080p`.
pub fn is_noise_token(token: &str) -> bool {
    if NOISE_TOKENS.iter().any(|n| n.eq_ignore_ascii_case(token)) {
        return true;
    }
    RESOLUTION.is_match(&token.to_lowercase())
}

/// Remove the extension of the last path element, dot included.
fn strip_extension(filename: &str) -> &str {
    match filename.rfind(['.', '/']) {
        Some(idx) if filename[idx..].starts_with('.') => &filename[..idx],
        _ => filename,
    }
}

/// Append padded and concatenated spellings of every `LETTERS DIGITS` pair.
///
/// Matches are taken from the text before anything is appended; each
/// variant is skipped when the growing result already contains it.
fn append_id_variants(result: &mut String) {
    let pairs: Vec<(String, String)> = CATALOG_ID
        .captures_iter(result)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect();

    for (prefix, digits) in pairs {
        if let Ok(number) = digits.parse::<u64>() {
            let padded = format!("{}{:0width$}", prefix, number, width = PADDED_ID_WIDTH);
            push_variant(result, &padded);
        }

        let joined = format!("{}{}", prefix, digits);
        push_variant(result, &joined);
    }
}

fn push_variant(result: &mut String, variant: &str) {
    if !result.contains(variant) {
        result.push(' ');
        result.push_str(variant);
    }
}
