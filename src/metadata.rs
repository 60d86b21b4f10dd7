//! Metadata extraction from HTML documents (JSON-LD, meta tags, title
//! refinement).

use crate::constants::REGEXPS;
use crate::utils;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;

/// Metadata extracted from the document
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<String>,
    pub lang: Option<String>,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn type_matches_article(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .map(|t| REGEXPS.json_ld_article_types.is_match(t))
        .unwrap_or(false)
}

/// Extract structured article metadata from
/// `<script type="application/ld+json">` blocks.
///
/// Only schema.org contexts are honored; the first script that yields an
/// Article-typed object wins.
pub fn get_json_ld(document: &Html) -> Metadata {
    let mut metadata = Metadata::default();
    let script_selector = selector("script[type='application/ld+json']");

    for script in document.select(&script_selector) {
        let raw = script.text().collect::<String>();
        let content = raw
            .trim()
            .trim_start_matches("<![CDATA[")
            .trim_end_matches("]]>")
            .trim();

        let Ok(mut parsed) = serde_json::from_str::<Value>(content) else {
            continue;
        };

        if let Some(array) = parsed.as_array() {
            let Some(article) = array
                .iter()
                .find(|item| type_matches_article(item.get("@type")))
            else {
                continue;
            };
            parsed = article.clone();
        }

        let has_schema_context = match parsed.get("@context") {
            Some(Value::String(context)) => REGEXPS.schema_org_url.is_match(context),
            Some(Value::Object(context)) => context
                .get("@vocab")
                .and_then(Value::as_str)
                .map(|vocab| REGEXPS.schema_org_url.is_match(vocab))
                .unwrap_or(false),
            _ => false,
        };
        if !has_schema_context {
            continue;
        }

        if parsed.get("@type").is_none() {
            if let Some(graph) = parsed.get("@graph").and_then(Value::as_array) {
                if let Some(article) = graph
                    .iter()
                    .find(|item| type_matches_article(item.get("@type")))
                {
                    parsed = article.clone();
                }
            }
        }

        if !type_matches_article(parsed.get("@type")) {
            continue;
        }

        let name = parsed.get("name").and_then(Value::as_str);
        let headline = parsed.get("headline").and_then(Value::as_str);
        match (name, headline) {
            (Some(name), Some(headline)) if name != headline => {
                // Some sites put the site name in "name" and the real title
                // in "headline"; arbitrate against the document title.
                let doc_title = raw_document_title(document).unwrap_or_default();
                let name_matches = utils::text_similarity(name, &doc_title) > 0.75;
                let headline_matches = utils::text_similarity(headline, &doc_title) > 0.75;
                if headline_matches && !name_matches {
                    metadata.title = Some(headline.trim().to_string());
                } else {
                    metadata.title = Some(name.trim().to_string());
                }
            }
            (Some(name), _) => metadata.title = Some(name.trim().to_string()),
            (None, Some(headline)) => metadata.title = Some(headline.trim().to_string()),
            (None, None) => {}
        }

        if let Some(author) = parsed.get("author") {
            if let Some(author_name) = author.get("name").and_then(Value::as_str) {
                metadata.byline = Some(author_name.trim().to_string());
            } else if let Some(authors) = author.as_array() {
                let names: Vec<String> = authors
                    .iter()
                    .filter_map(|a| a.get("name").and_then(Value::as_str))
                    .map(|n| n.trim().to_string())
                    .collect();
                if !names.is_empty() {
                    metadata.byline = Some(names.join(", "));
                }
            }
        }

        if let Some(description) = parsed.get("description").and_then(Value::as_str) {
            metadata.excerpt = Some(description.trim().to_string());
        }

        if let Some(publisher_name) = parsed
            .get("publisher")
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
        {
            metadata.site_name = Some(publisher_name.trim().to_string());
        }

        if let Some(date_published) = parsed.get("datePublished").and_then(Value::as_str) {
            metadata.published_time = Some(date_published.trim().to_string());
        }

        break;
    }

    metadata
}

/// Combine JSON-LD metadata with `<meta>` tag values.
///
/// JSON-LD wins per field; meta tags fall back through a fixed priority
/// list; the document title is the last resort for the title.
pub fn get_article_metadata(document: &Html, json_ld: Metadata) -> Metadata {
    let mut values: HashMap<String, String> = HashMap::new();
    let meta_selector = selector("meta");

    for meta in document.select(&meta_selector) {
        let element_name = meta.value().attr("name");
        let element_property = meta.value().attr("property");
        let Some(content) = meta.value().attr("content").filter(|c| !c.is_empty()) else {
            continue;
        };

        let mut property_matched = false;
        if let Some(property) = element_property {
            for prop in property.split_whitespace() {
                if let Some(found) = REGEXPS.meta_property.find(prop) {
                    let key = found
                        .as_str()
                        .to_lowercase()
                        .replace(char::is_whitespace, "");
                    values.insert(key, content.trim().to_string());
                    property_matched = true;
                }
            }
        }

        if !property_matched {
            if let Some(name) = element_name {
                if REGEXPS.meta_name.is_match(name) {
                    let key = name
                        .to_lowercase()
                        .replace(char::is_whitespace, "")
                        .replace('.', ":");
                    values.insert(key, content.trim().to_string());
                }
            }
        }
    }

    let pick = |keys: &[&str]| -> Option<String> {
        keys.iter().find_map(|key| values.get(*key).cloned())
    };

    let mut metadata = Metadata::default();

    metadata.title = json_ld.title.or_else(|| {
        pick(&[
            "dc:title",
            "dcterm:title",
            "og:title",
            "weibo:article:title",
            "weibo:webpage:title",
            "title",
            "twitter:title",
            "parsely-title",
        ])
    });
    if metadata.title.is_none() {
        metadata.title = get_article_title(document);
    }

    metadata.byline = json_ld.byline.or_else(|| {
        pick(&["dc:creator", "dcterm:creator", "author", "parsely-author"])
    });

    metadata.excerpt = json_ld.excerpt.or_else(|| {
        pick(&[
            "dc:description",
            "dcterm:description",
            "og:description",
            "weibo:article:description",
            "weibo:webpage:description",
            "description",
            "twitter:description",
        ])
    });

    metadata.site_name = json_ld.site_name.or_else(|| pick(&["og:site_name"]));

    metadata.published_time = json_ld
        .published_time
        .or_else(|| pick(&["article:published_time", "parsely-pub-date"]));

    metadata.lang = extract_language(document);

    metadata.title = metadata
        .title
        .map(|t| utils::unescape_html_entities(t.trim()));
    metadata.byline = metadata
        .byline
        .map(|b| utils::unescape_html_entities(b.trim()));
    metadata.excerpt = metadata
        .excerpt
        .map(|e| utils::unescape_html_entities(e.trim()));
    metadata.site_name = metadata
        .site_name
        .map(|s| utils::unescape_html_entities(s.trim()));
    metadata.published_time = metadata
        .published_time
        .map(|p| utils::unescape_html_entities(p.trim()));

    metadata
}

/// Raw, untrimmed-except-whitespace `<title>` text.
fn raw_document_title(document: &Html) -> Option<String> {
    document
        .select(&selector("title"))
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
}

fn heading_texts(document: &Html, css: &str) -> Vec<String> {
    document
        .select(&selector(css))
        .map(|h| h.text().collect::<String>().trim().to_string())
        .collect()
}

fn after_first(title: &str, separators: bool) -> String {
    if separators {
        match title.find(&['|', '-', '\\', '/', '>', '»', '–', '—'][..]) {
            Some(pos) => title[pos..].chars().skip(1).collect::<String>(),
            None => title.to_string(),
        }
    } else {
        match title.find(':') {
            Some(pos) => title[pos + 1..].to_string(),
            None => title.to_string(),
        }
    }
}

/// Derive a title from the document `<title>`, trimming site-name suffixes
/// separated by `|`, `-`, `:` and similar dividers.
pub fn get_article_title(document: &Html) -> Option<String> {
    let orig_title = raw_document_title(document)?;
    if orig_title.is_empty() {
        return None;
    }

    let mut cur_title = orig_title.clone();
    let mut title_had_hierarchical_separators = false;

    if REGEXPS.title_separators.is_match(&cur_title) {
        title_had_hierarchical_separators =
            REGEXPS.title_hierarchical_separators.is_match(&cur_title);

        // Keep everything before the last separator.
        if let Some(found) = REGEXPS
            .title_separators
            .find_iter(&orig_title)
            .last()
        {
            cur_title = orig_title[..found.start()].to_string();
        }

        if utils::word_count(&cur_title) < 3 {
            cur_title = after_first(&orig_title, true);
        }
    } else if cur_title.contains(": ") {
        let headings = heading_texts(document, "h1, h2");
        let trimmed = cur_title.trim().to_string();
        let heading_matches = headings.iter().any(|h| h == &trimmed);

        if !heading_matches {
            if let Some(pos) = orig_title.rfind(':') {
                cur_title = orig_title[pos + 1..].to_string();
                if utils::word_count(&cur_title) < 3 {
                    cur_title = after_first(&orig_title, false);
                } else if let Some(first) = orig_title.find(':') {
                    if utils::word_count(&orig_title[..first]) > 5 {
                        cur_title = orig_title.clone();
                    }
                }
            }
        }
    } else if cur_title.chars().count() > 150 || cur_title.chars().count() < 15 {
        let h1s = heading_texts(document, "h1");
        if h1s.len() == 1 {
            cur_title = h1s[0].clone();
        }
    }

    cur_title = REGEXPS
        .normalize
        .replace_all(cur_title.trim(), " ")
        .into_owned();

    // A short refined title is suspect unless the original really was split
    // by a single hierarchical separator.
    let cur_word_count = utils::word_count(&cur_title);
    if cur_word_count <= 4 {
        let stripped = REGEXPS
            .title_separator_run
            .replace_all(&orig_title, "")
            .into_owned();
        if !title_had_hierarchical_separators
            || cur_word_count != utils::word_count(&stripped).saturating_sub(1)
        {
            cur_title = orig_title.trim().to_string();
        }
    }

    Some(cur_title)
}

/// Language from `<html lang>` or a `content-language` meta tag.
pub fn extract_language(document: &Html) -> Option<String> {
    if let Some(html) = document.select(&selector("html")).next() {
        if let Some(lang) = html.value().attr("lang") {
            let lang = lang.trim();
            if !lang.is_empty() {
                return Some(lang.to_string());
            }
        }
    }

    document
        .select(&selector("meta[http-equiv]"))
        .find(|meta| {
            meta.value()
                .attr("http-equiv")
                .map(|v| v.eq_ignore_ascii_case("content-language"))
                .unwrap_or(false)
        })
        .and_then(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}
