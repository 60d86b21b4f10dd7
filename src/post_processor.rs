//! Post-processing of the extracted article: absolute URLs, wrapper
//! simplification, and class stripping.

use crate::constants::{CLASSES_TO_PRESERVE, REGEXPS};
use crate::dom_utils;
use crate::options::ReadabilityOptions;
use kuchikikiki::NodeRef;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static FILE_DRIVE_PIPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(file:///[A-Za-z])\|").unwrap());

/// Run the full post-processing chain over the article content.
pub fn post_process_content(
    article: &NodeRef,
    doc: &NodeRef,
    document_uri: Option<&str>,
    options: &ReadabilityOptions,
) {
    if let Some(document_uri) = document_uri {
        if let Some((document_url, base_url)) = resolve_base(doc, document_uri) {
            fix_relative_uris(article, &document_url, &base_url);
        }
    }

    simplify_nested_elements(article);

    if !options.keep_classes {
        let mut preserved: Vec<String> = CLASSES_TO_PRESERVE
            .iter()
            .map(|s| s.to_string())
            .collect();
        for class in &options.classes_to_preserve {
            if !preserved.contains(class) {
                preserved.push(class.clone());
            }
        }
        clean_classes(article, &preserved);
    }
}

/// Old-style `file:///C|/` drive spellings confuse the URL parser.
fn normalize_file_drive(uri: &str) -> String {
    FILE_DRIVE_PIPE.replace(uri, "$1:").into_owned()
}

/// The effective base: `<base href>` resolved against the document URI, or
/// the document URI itself.
pub fn resolve_base(doc: &NodeRef, document_uri: &str) -> Option<(Url, Url)> {
    let document_url = Url::parse(&normalize_file_drive(document_uri)).ok()?;

    let base_url = doc
        .select_first("base[href]")
        .ok()
        .and_then(|base| dom_utils::get_attr(base.as_node(), "href"))
        .and_then(|href| document_url.join(href.trim()).ok())
        .unwrap_or_else(|| document_url.clone());

    Some((document_url, base_url))
}

fn to_absolute_uri(uri: &str, document_url: &Url, base_url: &Url) -> String {
    // In-page fragments stay untouched when no separate base was set.
    if base_url == document_url && uri.starts_with('#') {
        return uri.to_string();
    }
    base_url
        .join(uri)
        .map(|absolute| absolute.to_string())
        .unwrap_or_else(|_| uri.to_string())
}

/// Rewrite link and media URLs to absolute form. `javascript:` links are
/// unwrapped into plain text or a `<span>`.
fn fix_relative_uris(article: &NodeRef, document_url: &Url, base_url: &Url) {
    let links: Vec<NodeRef> = article
        .select("a")
        .map(|matches| matches.map(|m| m.as_node().clone()).collect())
        .unwrap_or_default();

    for link in links {
        let Some(href) = dom_utils::get_attr(&link, "href") else {
            continue;
        };
        if href.is_empty() {
            continue;
        }

        if href.starts_with("javascript:") {
            let children: Vec<NodeRef> = link.children().collect();
            if children.len() == 1 && children[0].as_text().is_some() {
                let text = NodeRef::new_text(link.text_contents());
                dom_utils::replace_node(&link, &text);
            } else {
                let container = dom_utils::create_element("span");
                for child in children {
                    container.append(child);
                }
                dom_utils::replace_node(&link, &container);
            }
        } else {
            dom_utils::set_attr(&link, "href", &to_absolute_uri(&href, document_url, base_url));
        }
    }

    let media: Vec<NodeRef> = ["img", "picture", "figure", "video", "audio", "source"]
        .iter()
        .flat_map(|tag| {
            article
                .select(tag)
                .map(|matches| matches.map(|m| m.as_node().clone()).collect::<Vec<_>>())
                .unwrap_or_default()
        })
        .collect();

    for element in media {
        if let Some(src) = dom_utils::get_attr(&element, "src") {
            dom_utils::set_attr(&element, "src", &to_absolute_uri(&src, document_url, base_url));
        }
        if let Some(poster) = dom_utils::get_attr(&element, "poster") {
            dom_utils::set_attr(
                &element,
                "poster",
                &to_absolute_uri(&poster, document_url, base_url),
            );
        }
        if let Some(srcset) = dom_utils::get_attr(&element, "srcset") {
            let rewritten = REGEXPS
                .srcset_url
                .replace_all(&srcset, |caps: &regex::Captures| {
                    format!(
                        "{}{}{}",
                        to_absolute_uri(&caps[1], document_url, base_url),
                        caps.get(2).map(|m| m.as_str()).unwrap_or(""),
                        &caps[3],
                    )
                })
                .into_owned();
            dom_utils::set_attr(&element, "srcset", &rewritten);
        }
    }
}

/// Collapse pointless `<div>`/`<section>` nesting: drop empty wrappers and
/// merge lone-child wrappers into their child.
fn simplify_nested_elements(article: &NodeRef) {
    let mut node_opt = Some(article.clone());
    while let Some(node) = node_opt {
        let keeps_readability_id = dom_utils::get_attr(&node, "id")
            .map(|id| id.starts_with("readability"))
            .unwrap_or(false);

        if node.parent().is_some()
            && dom_utils::node_has_any_tag(&node, &["div", "section"])
            && !keeps_readability_id
        {
            if dom_utils::is_element_without_content(&node) {
                node_opt = dom_utils::remove_and_get_next(&node);
                continue;
            }
            if dom_utils::has_single_tag_inside_element(&node, "div")
                || dom_utils::has_single_tag_inside_element(&node, "section")
            {
                if let Some(child) = dom_utils::first_element_child(&node) {
                    for (name, value) in dom_utils::attr_pairs(&node) {
                        dom_utils::set_attr(&child, &name, &value);
                    }
                    dom_utils::replace_node(&node, &child);
                    node_opt = Some(child);
                    continue;
                }
            }
        }

        node_opt = dom_utils::get_next_node(&node, false);
    }
}

/// Strip `class` attributes, keeping only preserved names.
fn clean_classes(node: &NodeRef, preserved: &[String]) {
    if let Some(class) = dom_utils::get_attr(node, "class") {
        let kept = class
            .split_whitespace()
            .filter(|name| preserved.iter().any(|p| p == name))
            .collect::<Vec<_>>()
            .join(" ");
        if kept.is_empty() {
            dom_utils::remove_attr(node, "class");
        } else {
            dom_utils::set_attr(node, "class", &kept);
        }
    }

    for child in dom_utils::element_children(node) {
        clean_classes(&child, preserved);
    }
}
