//! Quick readability check without full parsing.
//!
//! [`is_probably_readerable`] predicts whether the full extraction pipeline
//! is likely to find an article, using only cheap text-length signals. It is
//! independent of the extractor and never mutates the document.

use crate::constants::REGEXPS;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

static DISPLAY_NONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)display\s*:\s*none").unwrap());
static VISIBILITY_HIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)visibility\s*:\s*hidden").unwrap());

/// Caller-supplied visibility predicate, replacing the default style and
/// attribute checks.
pub type VisibilityChecker = fn(ElementRef<'_>) -> bool;

/// Options for the readability pre-flight check.
///
/// ## Example
///
/// ```rust
/// use lector::{is_probably_readerable, ReaderableOptions};
///
/// let html = "<html>...</html>";
///
/// let options = ReaderableOptions {
///     min_content_length: 200,
///     min_score: 30.0,
///     ..ReaderableOptions::default()
/// };
///
/// let readerable = is_probably_readerable(html, Some(options));
/// ```
#[derive(Debug, Clone)]
pub struct ReaderableOptions {
    /// Minimum trimmed text length before a candidate contributes to the
    /// score.
    ///
    /// Default: `140`
    pub min_content_length: usize,

    /// Score the accumulated candidates must exceed.
    ///
    /// Default: `20.0`
    pub min_score: f64,

    /// Optional replacement for the built-in visibility check.
    pub visibility_checker: Option<VisibilityChecker>,
}

impl Default for ReaderableOptions {
    fn default() -> Self {
        Self {
            min_content_length: 140,
            min_score: 20.0,
            visibility_checker: None,
        }
    }
}

fn is_node_visible(node: ElementRef<'_>) -> bool {
    if let Some(style) = node.value().attr("style") {
        if DISPLAY_NONE.is_match(style) || VISIBILITY_HIDDEN.is_match(style) {
            return false;
        }
    }
    if node.value().attr("hidden").is_some() {
        return false;
    }
    if let Some(aria_hidden) = node.value().attr("aria-hidden") {
        let is_fallback_image = node
            .value()
            .attr("class")
            .map(|class| class.contains("fallback-image"))
            .unwrap_or(false);
        if aria_hidden == "true" && !is_fallback_image {
            return false;
        }
    }
    true
}

fn has_ancestor_li(node: ElementRef<'_>) -> bool {
    let mut parent = node.parent();
    while let Some(current) = parent {
        if let Some(element) = ElementRef::wrap(current) {
            if element.value().name().eq_ignore_ascii_case("li") {
                return true;
            }
        }
        parent = current.parent();
    }
    false
}

/// Quick check to determine whether a document likely contains an
/// extractable article.
///
/// Scans `<p>`, `<pre>`, and `<article>` elements, plus `<div>`s that hold a
/// direct `<br>`, and accumulates `sqrt(length - min_content_length)` over
/// the visible candidates that pass the unlikely-candidate filter. Returns
/// `true` as soon as the running score exceeds `min_score`.
///
/// ## Example
///
/// ```rust
/// use lector::is_probably_readerable;
///
/// let paragraph = format!("<p>{}</p>", "A sentence with several words. ".repeat(20));
/// let article_html = format!(
///     "<html><body><article>{}</article></body></html>",
///     paragraph.repeat(3)
/// );
/// assert!(is_probably_readerable(&article_html, None));
///
/// assert!(!is_probably_readerable("<html><body><p>Short</p></body></html>", None));
/// ```
pub fn is_probably_readerable(html: &str, options: Option<ReaderableOptions>) -> bool {
    let document = Html::parse_document(html);
    check_document(&document, options)
}

/// The probe over an already-parsed document view.
pub fn check_document(document: &Html, options: Option<ReaderableOptions>) -> bool {
    let options = options.unwrap_or_default();
    let visible = options.visibility_checker.unwrap_or(is_node_visible);

    let node_selector = Selector::parse("p, pre, article").expect("static selector");
    let br_selector = Selector::parse("div > br").expect("static selector");

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates: Vec<ElementRef> = Vec::new();

    for node in document.select(&node_selector) {
        if seen.insert(format!("{:?}", node.id())) {
            candidates.push(node);
        }
    }
    for br in document.select(&br_selector) {
        if let Some(parent) = br.parent().and_then(ElementRef::wrap) {
            if seen.insert(format!("{:?}", parent.id())) {
                candidates.push(parent);
            }
        }
    }

    let mut score = 0.0;
    for node in candidates {
        if !visible(node) {
            continue;
        }

        let match_string = format!(
            "{} {}",
            node.value().attr("class").unwrap_or(""),
            node.value().attr("id").unwrap_or("")
        );
        if REGEXPS.unlikely_candidates.is_match(&match_string)
            && !REGEXPS.ok_maybe_its_a_candidate.is_match(&match_string)
        {
            continue;
        }

        if node.value().name().eq_ignore_ascii_case("p") && has_ancestor_li(node) {
            continue;
        }

        let text = node.text().collect::<String>();
        let text_length = text.trim().chars().count();
        if text_length < options.min_content_length {
            continue;
        }

        score += ((text_length - options.min_content_length) as f64).sqrt();
        if score > options.min_score {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(text: &str, n: usize) -> String {
        let body: String = (0..n).map(|_| format!("<p>{}</p>", text)).collect();
        format!("<html><body><article>{}</article></body></html>", body)
    }

    #[test]
    fn long_articles_are_readerable() {
        let html = paragraphs(&"hello there ".repeat(50), 3);
        assert!(is_probably_readerable(&html, None));
    }

    #[test]
    fn short_fragments_are_not() {
        let html = paragraphs("hello there ", 1);
        assert!(!is_probably_readerable(&html, None));
    }

    #[test]
    fn single_borderline_paragraph_scores_too_low() {
        // 12 repetitions clear the length gate but sqrt(len - 140) stays
        // far below the default score threshold.
        let html = paragraphs(&"hello there ".repeat(12), 1);
        assert!(!is_probably_readerable(&html, None));
    }

    #[test]
    fn single_long_paragraph_passes() {
        let html = paragraphs(&"hello there ".repeat(50), 1);
        assert!(is_probably_readerable(&html, None));
    }

    #[test]
    fn thresholds_are_configurable() {
        let html = paragraphs(&"hello there ".repeat(12), 1);
        let options = ReaderableOptions {
            min_content_length: 120,
            min_score: 4.0,
            ..ReaderableOptions::default()
        };
        assert!(is_probably_readerable(&html, Some(options)));
    }

    #[test]
    fn hidden_candidates_do_not_count() {
        let text = "hello there ".repeat(50);
        let html = format!(
            "<html><body><p style=\"display:none\">{}</p></body></html>",
            text
        );
        assert!(!is_probably_readerable(&html, None));
    }

    #[test]
    fn unlikely_containers_are_skipped() {
        let text = "hello there ".repeat(50);
        let html = format!(
            "<html><body><p class=\"sidebar\">{}</p></body></html>",
            text
        );
        assert!(!is_probably_readerable(&html, None));
    }

    #[test]
    fn list_paragraphs_are_skipped() {
        let text = "hello there ".repeat(50);
        let html = format!(
            "<html><body><ul><li><p>{}</p></li></ul></body></html>",
            text
        );
        assert!(!is_probably_readerable(&html, None));
    }

    #[test]
    fn div_with_br_counts_as_candidate() {
        let text = "hello there ".repeat(50);
        let html = format!("<html><body><div>{}<br>{}</div></body></html>", text, text);
        assert!(is_probably_readerable(&html, None));
    }

    #[test]
    fn custom_visibility_checker_wins() {
        let html = paragraphs(&"hello there ".repeat(50), 3);
        let options = ReaderableOptions {
            visibility_checker: Some(|_| false),
            ..ReaderableOptions::default()
        };
        assert!(!is_probably_readerable(&html, Some(options)));
    }
}
