//! # lector
//!
//! An article extraction library for Rust, implementing the Readability
//! algorithm used by browser reader modes.
//!
//! ## Overview
//!
//! lector pulls the primary readable article out of an arbitrary HTML page,
//! removing clutter such as advertisements, navigation, and share widgets.
//! Alongside the cleaned content it extracts metadata: title, author
//! (byline), description, site name, language, text direction, and publish
//! date.
//!
//! ## Key Features
//!
//! - **Content extraction**: candidate scoring over a mutable DOM with
//!   sibling aggregation and conditional cleaning
//! - **Metadata extraction**: JSON-LD structured data, OpenGraph, Twitter
//!   Cards, Dublin Core, and refined document titles
//! - **Adaptive retries**: progressively relaxed heuristics when a page
//!   yields too little content
//! - **Pre-flight check**: a fast probe to skip pages that are unlikely to
//!   contain an article
//! - **Configurable output**: preserved classes, XML serialization with
//!   explicit boolean attributes, custom serializers
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use lector::{Readability, ReadabilityOptions};
//!
//! let html = r#"<html><body><article><h1>Title</h1><p>Content...</p></article></body></html>"#;
//! let url = "https://example.com/article";
//!
//! let readability = Readability::new(html, Some(url), None).unwrap();
//!
//! if let Ok(Some(article)) = readability.parse() {
//!     println!("Title: {:?}", article.title);
//!     println!("Content: {:?}", article.content);
//!     println!("Author: {:?}", article.byline);
//! }
//! ```
//!
//! ## Pre-flight Check
//!
//! Use [`is_probably_readerable`] to cheaply filter out pages before paying
//! for a full parse:
//!
//! ```rust,no_run
//! use lector::is_probably_readerable;
//!
//! let html = "<html>...</html>";
//!
//! if is_probably_readerable(html, None) {
//!     // Proceed with full parsing
//! } else {
//!     // Skip parsing or use an alternative strategy
//! }
//! ```
//!
//! ## Error Handling
//!
//! Heuristic failures never abort extraction; a page where nothing could be
//! extracted parses to `Ok(None)`. The only pipeline error is the element
//! cap:
//!
//! ```rust
//! use lector::{Readability, ReadabilityOptions};
//!
//! let html = "<html><body><p>a</p><p>b</p></body></html>";
//! let options = ReadabilityOptions::builder().max_elems_to_parse(1).build();
//!
//! let readability = Readability::new(html, None, Some(options)).unwrap();
//! assert!(readability.parse().is_err());
//! ```
//!
//! ## Algorithm
//!
//! The pipeline runs in stages. The document is parsed and gated against an
//! element cap, then probed for readability. Metadata is harvested from
//! JSON-LD and meta tags. Preprocessing strips scripts, styles, and
//! comments, rescues `<noscript>` images, and collapses `<br>` runs. The
//! grabber then scores candidate containers by text signals and link
//! density, assembles the best candidate with its qualifying siblings, and
//! cleans the result; if the output is too short it restores the document
//! and retries with looser heuristics. Post-processing resolves relative
//! URLs, simplifies nested wrappers, and strips presentation classes.

mod article;
mod cleaner;
mod constants;
mod content_extractor;
mod dom_utils;
mod error;
mod metadata;
mod options;
mod post_processor;
mod readability;
mod readerable;
mod scoring;
mod serializer;
mod utils;

// Public exports
pub use article::Article;
pub use error::{ReadabilityError, Result};
pub use kuchikikiki::NodeRef;
pub use options::ReadabilityOptions;
pub use readability::{Readability, Serializer};
pub use readerable::{is_probably_readerable, ReaderableOptions, VisibilityChecker};
