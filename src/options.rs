//! Configuration options for article extraction.
//!
//! This module provides [`ReadabilityOptions`] and [`ReadabilityOptionsBuilder`]
//! for configuring the behavior of the content extraction algorithm.
//!
//! ## Example
//!
//! ```rust
//! use lector::{Readability, ReadabilityOptions};
//!
//! let html = "<html><body><article><p>Content...</p></article></body></html>";
//!
//! // Using default options
//! let readability = Readability::new(html, None, None).unwrap();
//!
//! // Using builder for custom options
//! let options = ReadabilityOptions::builder()
//!     .char_threshold(300)
//!     .nb_top_candidates(10)
//!     .keep_classes(true)
//!     .build();
//!
//! let readability = Readability::new(html, None, Some(options)).unwrap();
//! ```

use crate::constants::{DEFAULT_CHAR_THRESHOLD, DEFAULT_N_TOP_CANDIDATES};
use regex::Regex;

/// Configuration options for the extraction pipeline.
///
/// Controls scoring thresholds, element limits, metadata extraction, and
/// serialization behavior.
///
/// ## Creating Options
///
/// ```rust
/// use lector::ReadabilityOptions;
///
/// let defaults = ReadabilityOptions::default();
///
/// let custom = ReadabilityOptions::builder()
///     .char_threshold(300)
///     .nb_top_candidates(10)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ReadabilityOptions {
    /// Enable debug logging to stderr.
    ///
    /// When enabled, the parser reports attempt transitions and candidate
    /// selection to stderr. Useful for understanding why extraction failed.
    ///
    /// Default: `false`
    pub debug: bool,

    /// Maximum number of elements to parse.
    ///
    /// A safety limit against extremely large documents. When the document
    /// exceeds the cap, [`Readability::parse`](crate::Readability::parse)
    /// fails with [`ReadabilityError::TooManyElements`](crate::ReadabilityError).
    /// Set to 0 to disable the limit.
    ///
    /// Default: `0` (no limit)
    pub max_elems_to_parse: usize,

    /// Number of top candidates to consider when analyzing content.
    ///
    /// The parser scores all potential article containers and keeps this
    /// many of the highest-scoring candidates for the final selection.
    ///
    /// Default: `5`
    pub nb_top_candidates: usize,

    /// Minimum number of characters required for article content.
    ///
    /// If an extraction attempt produces fewer characters than this, the
    /// parser relaxes one heuristic flag and retries.
    ///
    /// Default: `500`
    pub char_threshold: usize,

    /// CSS classes to preserve during cleaning.
    ///
    /// Classes in this list survive the class-stripping pass, alongside the
    /// always-preserved `page` class.
    ///
    /// Default: `vec!["page"]`
    pub classes_to_preserve: Vec<String>,

    /// Keep all CSS classes in the output HTML.
    ///
    /// When `true`, the class-stripping pass is skipped entirely.
    ///
    /// Default: `false`
    pub keep_classes: bool,

    /// Disable JSON-LD metadata extraction.
    ///
    /// When `true`, `<script type="application/ld+json">` blocks are ignored
    /// and metadata comes from `<meta>` tags alone.
    ///
    /// Default: `false`
    pub disable_json_ld: bool,

    /// Custom regex for allowed video URLs.
    ///
    /// Embeds whose attributes match this regex survive cleaning. By default
    /// the parser recognizes common platforms like YouTube and Vimeo.
    ///
    /// Default: `None` (uses the built-in regex)
    ///
    /// ## Example
    ///
    /// ```rust
    /// use lector::ReadabilityOptions;
    /// use regex::Regex;
    ///
    /// let video_regex = Regex::new(r"(?i)myvideoplatform\.com").unwrap();
    /// let options = ReadabilityOptions::builder()
    ///     .allowed_video_regex(video_regex)
    ///     .build();
    /// ```
    pub allowed_video_regex: Option<Regex>,

    /// Modifier for the link-density thresholds in conditional cleaning.
    ///
    /// Positive values make the cleaner more tolerant of links, negative
    /// values less tolerant.
    ///
    /// Default: `0.0`
    pub link_density_modifier: f64,

    /// Serialize the article content with the XML dialect.
    ///
    /// The XML form self-closes void elements and keeps explicit boolean
    /// attribute values (`name="name"`).
    ///
    /// Default: `false`
    pub use_xml_serializer: bool,
}

impl Default for ReadabilityOptions {
    fn default() -> Self {
        Self {
            debug: false,
            max_elems_to_parse: 0,
            nb_top_candidates: DEFAULT_N_TOP_CANDIDATES,
            char_threshold: DEFAULT_CHAR_THRESHOLD,
            classes_to_preserve: vec!["page".to_string()],
            keep_classes: false,
            disable_json_ld: false,
            allowed_video_regex: None,
            link_density_modifier: 0.0,
            use_xml_serializer: false,
        }
    }
}

impl ReadabilityOptions {
    /// Creates a new builder for ReadabilityOptions
    pub fn builder() -> ReadabilityOptionsBuilder {
        ReadabilityOptionsBuilder::default()
    }
}

/// Builder for [`ReadabilityOptions`].
///
/// ## Example
///
/// ```rust
/// use lector::ReadabilityOptions;
///
/// let options = ReadabilityOptions::builder()
///     .char_threshold(300)
///     .nb_top_candidates(10)
///     .debug(true)
///     .keep_classes(true)
///     .build();
/// ```
#[derive(Default)]
pub struct ReadabilityOptionsBuilder {
    debug: Option<bool>,
    max_elems_to_parse: Option<usize>,
    nb_top_candidates: Option<usize>,
    char_threshold: Option<usize>,
    classes_to_preserve: Option<Vec<String>>,
    keep_classes: Option<bool>,
    disable_json_ld: Option<bool>,
    allowed_video_regex: Option<Regex>,
    link_density_modifier: Option<f64>,
    use_xml_serializer: Option<bool>,
}

impl ReadabilityOptionsBuilder {
    /// Enable or disable debug logging
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Set maximum number of elements to parse
    pub fn max_elems_to_parse(mut self, max: usize) -> Self {
        self.max_elems_to_parse = Some(max);
        self
    }

    /// Set number of top candidates to consider
    pub fn nb_top_candidates(mut self, nb: usize) -> Self {
        self.nb_top_candidates = Some(nb);
        self
    }

    /// Set character threshold
    pub fn char_threshold(mut self, threshold: usize) -> Self {
        self.char_threshold = Some(threshold);
        self
    }

    /// Set classes to preserve
    pub fn classes_to_preserve(mut self, classes: Vec<String>) -> Self {
        self.classes_to_preserve = Some(classes);
        self
    }

    /// Keep all CSS classes
    pub fn keep_classes(mut self, keep: bool) -> Self {
        self.keep_classes = Some(keep);
        self
    }

    /// Disable JSON-LD extraction
    pub fn disable_json_ld(mut self, disable: bool) -> Self {
        self.disable_json_ld = Some(disable);
        self
    }

    /// Set allowed video regex
    pub fn allowed_video_regex(mut self, regex: Regex) -> Self {
        self.allowed_video_regex = Some(regex);
        self
    }

    /// Set link density modifier
    pub fn link_density_modifier(mut self, modifier: f64) -> Self {
        self.link_density_modifier = Some(modifier);
        self
    }

    /// Serialize output with the XML dialect
    pub fn use_xml_serializer(mut self, use_xml: bool) -> Self {
        self.use_xml_serializer = Some(use_xml);
        self
    }

    /// Build the ReadabilityOptions
    pub fn build(self) -> ReadabilityOptions {
        let defaults = ReadabilityOptions::default();
        ReadabilityOptions {
            debug: self.debug.unwrap_or(defaults.debug),
            max_elems_to_parse: self
                .max_elems_to_parse
                .unwrap_or(defaults.max_elems_to_parse),
            nb_top_candidates: self.nb_top_candidates.unwrap_or(defaults.nb_top_candidates),
            char_threshold: self.char_threshold.unwrap_or(defaults.char_threshold),
            classes_to_preserve: self
                .classes_to_preserve
                .unwrap_or(defaults.classes_to_preserve),
            keep_classes: self.keep_classes.unwrap_or(defaults.keep_classes),
            disable_json_ld: self.disable_json_ld.unwrap_or(defaults.disable_json_ld),
            allowed_video_regex: self.allowed_video_regex.or(defaults.allowed_video_regex),
            link_density_modifier: self
                .link_density_modifier
                .unwrap_or(defaults.link_density_modifier),
            use_xml_serializer: self
                .use_xml_serializer
                .unwrap_or(defaults.use_xml_serializer),
        }
    }
}
