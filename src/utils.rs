//! String-level helpers shared by metadata extraction and scoring.

use crate::constants::REGEXPS;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use url::Url;

/// Check whether a string parses as an absolute URL.
pub fn is_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Similarity of `text_b` against `text_a` over lowercased word tokens.
///
/// Returns `1 - distance`, where distance is the joined length of the
/// tokens unique to `text_b` over the joined length of all of `text_b`'s
/// tokens. A result above 0.75 is treated as "the same title" by callers.
pub fn text_similarity(text_a: &str, text_b: &str) -> f64 {
    let a_lower = text_a.to_lowercase();
    let b_lower = text_b.to_lowercase();
    let tokens_a: Vec<&str> = REGEXPS
        .tokenize
        .split(&a_lower)
        .filter(|t| !t.is_empty())
        .collect();
    let tokens_b: Vec<&str> = REGEXPS
        .tokenize
        .split(&b_lower)
        .filter(|t| !t.is_empty())
        .collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let uniq_b: Vec<&str> = tokens_b
        .iter()
        .filter(|token| !tokens_a.contains(token))
        .copied()
        .collect();

    let distance_b = uniq_b.join(" ").len() as f64 / tokens_b.join(" ").len() as f64;
    1.0 - distance_b
}

static NAMED_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(quot|amp|apos|lt|gt);").unwrap());
static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)&#(?:x([0-9a-f]{1,6})|([0-9]{1,7}));").unwrap());

/// Unescape the named HTML entities and numeric character references that
/// commonly appear in metadata content.
///
/// Invalid code points (0, beyond U+10FFFF, or surrogates) are replaced
/// with U+FFFD.
pub fn unescape_html_entities(text: &str) -> String {
    let named = NAMED_ENTITY.replace_all(text, |caps: &Captures| {
        match caps.get(1).map(|m| m.as_str()) {
            Some("quot") => "\"",
            Some("amp") => "&",
            Some("apos") => "'",
            Some("lt") => "<",
            Some("gt") => ">",
            _ => "",
        }
    });

    NUMERIC_ENTITY
        .replace_all(&named, |caps: &Captures| {
            let num = if let Some(hex) = caps.get(1) {
                u32::from_str_radix(hex.as_str(), 16).unwrap_or(0xfffd)
            } else {
                caps[2].parse::<u32>().unwrap_or(0xfffd)
            };
            let num = if num == 0 || num > 0x10ffff || (0xd800..=0xdfff).contains(&num) {
                0xfffd
            } else {
                num
            };
            char::from_u32(num).unwrap_or('\u{fffd}').to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_detection() {
        assert!(is_url("https://example.com/article"));
        assert!(!is_url("not a url"));
    }

    #[test]
    fn similarity_of_identical_titles_is_one() {
        let sim = text_similarity("Breaking News Today", "breaking news today");
        assert!((sim - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn similarity_drops_with_extra_tokens() {
        let sim = text_similarity("Breaking News", "Breaking News on Some Site");
        assert!(sim < 0.75);
    }

    #[test]
    fn similarity_empty_is_zero() {
        assert_eq!(text_similarity("", "anything"), 0.0);
    }

    #[test]
    fn unescape_named_entities() {
        assert_eq!(
            unescape_html_entities("&lt;b&gt; &quot;x&quot; &amp; &apos;y&apos;"),
            "<b> \"x\" & 'y'"
        );
    }

    #[test]
    fn unescape_numeric_entities() {
        assert_eq!(unescape_html_entities("caf&#233; &#x2014; ok"), "café — ok");
    }

    #[test]
    fn invalid_code_points_become_replacement_char() {
        assert_eq!(unescape_html_entities("&#0;"), "\u{fffd}");
        assert_eq!(unescape_html_entities("&#xd800;"), "\u{fffd}");
        assert_eq!(unescape_html_entities("&#1114112;"), "\u{fffd}");
    }
}
