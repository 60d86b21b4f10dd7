//! Article data structure representing the parsed output.
//!
//! This module defines the [`Article`] struct, which contains all extracted
//! content and metadata from a successfully parsed web page.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lector::Readability;
//!
//! let html = r#"<html><body><article><h1>My Article</h1><p>Content...</p></article></body></html>"#;
//! let readability = Readability::new(html, Some("https://example.com"), None).unwrap();
//!
//! if let Ok(Some(article)) = readability.parse() {
//!     println!("Title: {:?}", article.title);
//!     println!("Length: {} characters", article.length);
//!     println!("Author: {:?}", article.byline);
//!
//!     if let Some(content) = article.content {
//!         println!("HTML: {}", content);
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// A successfully parsed article with extracted content and metadata.
///
/// All string fields are optional because not every page carries every
/// metadata field; `length` and `readerable` are always present.
///
/// ## Serialization
///
/// `Article` implements serde's `Serialize` and `Deserialize`, so results
/// can be saved to JSON directly:
///
/// ```rust,no_run
/// use lector::Readability;
/// # let html = "<html></html>";
/// # let readability = Readability::new(html, None, None).unwrap();
///
/// if let Ok(Some(article)) = readability.parse() {
///     let json = serde_json::to_string_pretty(&article).unwrap();
///     println!("{}", json);
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// The article title from metadata or the refined document title.
    ///
    /// JSON-LD structured data wins, then OpenGraph/Twitter/Dublin Core
    /// meta tags, then the `<title>` tag cleaned of site-name decorations.
    pub title: Option<String>,

    /// Cleaned HTML content of the article, wrapped in the
    /// `readability-page-1` container.
    pub content: Option<String>,

    /// Plain text content with all markup removed.
    pub text_content: Option<String>,

    /// Length of the plain text content, in characters.
    pub length: usize,

    /// Article description or short excerpt.
    ///
    /// Taken from metadata when available, otherwise from the first
    /// paragraph of the extracted content.
    pub excerpt: Option<String>,

    /// Author name(s), comma-separated when there are several.
    ///
    /// Sources, in order: JSON-LD author data, meta author tags, and
    /// byline elements found while scoring the page.
    pub byline: Option<String>,

    /// Text direction: the first non-empty `dir` attribute walking up from
    /// the chosen content to the document root.
    pub dir: Option<String>,

    /// Name of the website or publication.
    pub site_name: Option<String>,

    /// Language code from `<html lang>` or the `content-language` header
    /// equivalent.
    pub lang: Option<String>,

    /// Publication timestamp, typically ISO 8601, from JSON-LD or
    /// `article:published_time`.
    pub published_time: Option<String>,

    /// Result of the readerable pre-flight probe for this document.
    pub readerable: bool,
}

impl Default for Article {
    fn default() -> Self {
        Self {
            title: None,
            content: None,
            text_content: None,
            length: 0,
            excerpt: None,
            byline: None,
            dir: None,
            site_name: None,
            lang: None,
            published_time: None,
            readerable: false,
        }
    }
}

impl Article {
    pub fn new() -> Self {
        Self::default()
    }
}
