//! Main Readability struct and parse implementation.
//!
//! This module contains the primary [`Readability`] struct which orchestrates
//! the entire article extraction pipeline.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lector::Readability;
//!
//! let html = std::fs::read_to_string("article.html").unwrap();
//! let url = "https://example.com/article";
//!
//! let readability = Readability::new(&html, Some(url), None)?;
//!
//! if let Some(article) = readability.parse()? {
//!     println!("Title: {:?}", article.title);
//!     println!("Author: {:?}", article.byline);
//!     println!("Content length: {} chars", article.length);
//!
//!     if let Some(content) = article.content {
//!         std::fs::write("output.html", content)?;
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::{
    article::Article,
    cleaner,
    content_extractor::grab_article,
    dom_utils,
    error::{ReadabilityError, Result},
    metadata::{get_article_metadata, get_json_ld, Metadata},
    options::ReadabilityOptions,
    post_processor, readerable, serializer, utils,
};
use kuchikikiki::NodeRef;
use scraper::Html;

/// A custom serializer for the final article element.
pub type Serializer = Box<dyn Fn(&NodeRef) -> String>;

/// The main article extractor.
///
/// Construct with [`Readability::new`], then call
/// [`parse()`](Readability::parse) to run the pipeline: element-cap gate,
/// readerable probe, metadata harvesting, preprocessing, candidate scoring,
/// and post-processing.
///
/// ## Example
///
/// ```rust,no_run
/// use lector::Readability;
///
/// let html = r#"
///     <html>
///     <head><title>Article Title</title></head>
///     <body>
///         <article>
///             <h1>Article Title</h1>
///             <p>First paragraph of content...</p>
///             <p>Second paragraph of content...</p>
///         </article>
///     </body>
///     </html>
/// "#;
///
/// let readability = Readability::new(html, None, None)?;
/// match readability.parse()? {
///     Some(article) => println!("Extracted {} characters", article.length),
///     None => println!("Could not extract article content"),
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Readability {
    /// The mutable DOM the pipeline operates on
    document: NodeRef,

    /// Read-only view for metadata extraction and the readerable probe
    meta_view: Html,

    /// Original HTML string, retained for explicit-boolean detection
    html: String,

    /// Base URL for resolving relative links
    base_url: Option<String>,

    /// Configuration options
    options: ReadabilityOptions,

    /// Optional custom serializer for the article element
    serializer: Option<Serializer>,
}

impl Readability {
    /// Create a new Readability instance
    ///
    /// # Arguments
    /// * `html` - The HTML content to parse
    /// * `url` - Optional document URI for resolving relative links
    /// * `options` - Optional configuration options
    pub fn new(html: &str, url: Option<&str>, options: Option<ReadabilityOptions>) -> Result<Self> {
        let base_url = url
            .map(|u| {
                if utils::is_url(u) {
                    Ok(u.to_string())
                } else {
                    Err(ReadabilityError::InvalidUrl(u.to_string()))
                }
            })
            .transpose()?;

        Ok(Self {
            document: dom_utils::parse_document(html),
            meta_view: Html::parse_document(html),
            html: html.to_string(),
            base_url,
            options: options.unwrap_or_default(),
            serializer: None,
        })
    }

    /// Create a Readability instance over an already-parsed document.
    ///
    /// The pipeline mutates the given tree in place; callers that need the
    /// original document afterwards should parse a fresh copy instead.
    pub fn from_document(
        document: NodeRef,
        url: Option<&str>,
        options: Option<ReadabilityOptions>,
    ) -> Result<Self> {
        let base_url = url
            .map(|u| {
                if utils::is_url(u) {
                    Ok(u.to_string())
                } else {
                    Err(ReadabilityError::InvalidUrl(u.to_string()))
                }
            })
            .transpose()?;

        let html = dom_utils::serialize(&document);
        let meta_view = Html::parse_document(&html);

        Ok(Self {
            document,
            meta_view,
            html,
            base_url,
            options: options.unwrap_or_default(),
            serializer: None,
        })
    }

    /// Replace the built-in serializer. The callback receives the final
    /// article element and produces the `content` string.
    pub fn with_serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Run the extraction pipeline.
    ///
    /// Returns `Ok(None)` when no article could be extracted. The only
    /// error produced by the pipeline itself is the element-cap breach;
    /// heuristic failures inside the pipeline never abort extraction.
    pub fn parse(self) -> Result<Option<Article>> {
        if self.options.max_elems_to_parse > 0 {
            let num_elements = dom_utils::element_count(&self.document);
            if num_elements > self.options.max_elems_to_parse {
                return Err(ReadabilityError::TooManyElements(num_elements));
            }
        }

        let readerable = readerable::check_document(&self.meta_view, None);

        let json_ld = if self.options.disable_json_ld {
            Metadata::default()
        } else {
            get_json_ld(&self.meta_view)
        };
        let metadata = get_article_metadata(&self.meta_view, json_ld);

        cleaner::prep_document(&self.document);

        let title = metadata.title.clone().unwrap_or_default();
        let Some(grabbed) = grab_article(
            &self.document,
            &title,
            metadata.byline.is_some(),
            &self.options,
        ) else {
            self.log("no article content found after all attempts");
            return Ok(None);
        };
        self.log(&format!(
            "grabbed article with {} characters",
            grabbed.text_length
        ));

        let article_content = grabbed.article_content;
        post_processor::post_process_content(
            &article_content,
            &self.document,
            self.base_url.as_deref(),
            &self.options,
        );

        let excerpt = metadata.excerpt.clone().or_else(|| {
            article_content
                .select_first("p")
                .ok()
                .map(|p| dom_utils::inner_text(p.as_node(), false))
                .filter(|text| !text.is_empty())
        });

        let text_content = article_content.text_contents();
        let length = dom_utils::char_len(&text_content);

        let content = match &self.serializer {
            Some(serialize) => serialize(&article_content),
            None => serializer::serialize_article(
                &article_content,
                &self.html,
                self.options.use_xml_serializer,
            ),
        };

        let byline = metadata.byline.clone().or(grabbed.byline);

        Ok(Some(Article {
            title: metadata.title.map(|t| t.trim().to_string()),
            content: Some(content),
            text_content: Some(text_content),
            length,
            excerpt: excerpt.map(|e| e.trim().to_string()),
            byline: byline.map(|b| b.trim().to_string()),
            dir: grabbed.dir,
            site_name: metadata.site_name,
            lang: metadata.lang,
            published_time: metadata.published_time,
            readerable,
        }))
    }

    /// Log a debug message (if debug mode is enabled)
    fn log(&self, message: &str) {
        if self.options.debug {
            eprintln!("Reader: (Readability) {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "This sentence has enough words and letters to contribute to \
                            scoring, with a comma or two, and a period at the end.";

    fn article_html(n: usize) -> String {
        let body: String = (0..n).map(|_| format!("<p>{}</p>", SENTENCE)).collect();
        format!(
            "<html><head><title>A Sufficiently Long Example Title</title></head>\
             <body><article>{}</article></body></html>",
            body
        )
    }

    #[test]
    fn new_accepts_plain_html() {
        let result = Readability::new("<html><body><p>Test</p></body></html>", None, None);
        assert!(result.is_ok());
    }

    #[test]
    fn new_rejects_invalid_urls() {
        let result = Readability::new("<html></html>", Some("not a url"), None);
        assert!(matches!(result, Err(ReadabilityError::InvalidUrl(_))));
    }

    #[test]
    fn from_document_parses_a_live_tree() {
        let doc = crate::dom_utils::parse_document(&article_html(6));
        let options = ReadabilityOptions::builder().char_threshold(100).build();
        let readability = Readability::from_document(doc, None, Some(options)).unwrap();
        let article = readability.parse().unwrap().expect("article expected");
        assert!(article.text_content.unwrap().contains("enough words"));
    }

    #[test]
    fn parse_extracts_article() {
        let options = ReadabilityOptions::builder().char_threshold(100).build();
        let readability = Readability::new(&article_html(6), None, Some(options)).unwrap();
        let article = readability.parse().unwrap().expect("article expected");

        assert_eq!(
            article.title.as_deref(),
            Some("A Sufficiently Long Example Title")
        );
        assert!(article.length > 100);
        assert!(article.content.unwrap().contains("readability-page-1"));
        assert!(article.text_content.unwrap().contains("enough words"));
    }

    #[test]
    fn element_cap_aborts_with_exact_message() {
        let options = ReadabilityOptions::builder().max_elems_to_parse(1).build();
        let readability =
            Readability::new("<html><body><p>a</p><p>b</p></body></html>", None, Some(options))
                .unwrap();
        let error = readability.parse().unwrap_err();
        assert!(error
            .to_string()
            .starts_with("Aborting parsing document; "));
        assert!(error.to_string().ends_with(" elements found"));
    }

    #[test]
    fn excerpt_falls_back_to_first_paragraph() {
        let options = ReadabilityOptions::builder().char_threshold(100).build();
        let readability = Readability::new(&article_html(6), None, Some(options)).unwrap();
        let article = readability.parse().unwrap().expect("article expected");
        assert_eq!(article.excerpt.as_deref(), Some(SENTENCE));
    }

    #[test]
    fn meta_description_beats_content_excerpt() {
        let html = article_html(6).replace(
            "</title>",
            "</title><meta name=\"description\" content=\"A summary.\">",
        );
        let options = ReadabilityOptions::builder().char_threshold(100).build();
        let readability = Readability::new(&html, None, Some(options)).unwrap();
        let article = readability.parse().unwrap().expect("article expected");
        assert_eq!(article.excerpt.as_deref(), Some("A summary."));
    }

    #[test]
    fn custom_serializer_controls_content() {
        let options = ReadabilityOptions::builder().char_threshold(100).build();
        let readability = Readability::new(&article_html(6), None, Some(options))
            .unwrap()
            .with_serializer(Box::new(|node| {
                format!("custom:{}", node.text_contents().len())
            }));
        let article = readability.parse().unwrap().expect("article expected");
        assert!(article.content.unwrap().starts_with("custom:"));
    }
}
