//! Article serialization: the default HTML form, an XML dialect that keeps
//! explicit boolean attribute values, and the promotion step that restores
//! `name="name"` spellings found in the original source.

use crate::dom_utils;
use kuchikikiki::NodeRef;

/// Boolean attributes that HTML sources sometimes spell out as
/// `name="name"`. Serializers normalize them away, so explicit spellings
/// are re-detected against the retained source text.
const BOOLEAN_ATTRIBUTES: [&str; 24] = [
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "selected",
    "typemustmatch",
];

/// Attributes that tie an output element back to its spelling in the
/// source document.
const IDENTITY_ATTRIBUTES: [&str; 7] = [
    "id",
    "itemid",
    "src",
    "data-media-id",
    "data-media-uuid",
    "data-media-type",
    "data-media-aop",
];

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Serialize the final article. Boolean attributes that the source spelled
/// explicitly are promoted back to `name="name"` first, so they survive in
/// both output dialects.
pub fn serialize_article(article: &NodeRef, source_html: &str, use_xml: bool) -> String {
    promote_explicit_booleans(article, source_html);
    if use_xml {
        serialize_xml(article)
    } else {
        dom_utils::serialize(article)
    }
}

fn source_spells_attr(source: &str, name: &str, value: &str) -> bool {
    source.contains(&format!("{}=\"{}\"", name, value))
        || source.contains(&format!("{}='{}'", name, value))
}

fn element_identified_in_source(node: &NodeRef, source: &str) -> bool {
    for attribute in IDENTITY_ATTRIBUTES {
        if let Some(value) = dom_utils::get_attr(node, attribute) {
            if !value.is_empty() && source_spells_attr(source, attribute, &value) {
                return true;
            }
        }
    }

    if let (Some(itemtype), Some(itemprop)) = (
        dom_utils::get_attr(node, "itemtype"),
        dom_utils::get_attr(node, "itemprop"),
    ) {
        if source_spells_attr(source, "itemtype", &itemtype)
            && source_spells_attr(source, "itemprop", &itemprop)
        {
            return true;
        }
    }

    false
}

/// Restore explicit `name="name"` boolean values that parsing collapsed to
/// empty strings, for elements the source identifies.
fn promote_explicit_booleans(article: &NodeRef, source: &str) {
    let explicit: Vec<&str> = BOOLEAN_ATTRIBUTES
        .iter()
        .copied()
        .filter(|name| source_spells_attr(source, name, name))
        .collect();
    if explicit.is_empty() {
        return;
    }

    let elements: Vec<NodeRef> = article
        .inclusive_descendants()
        .filter(|n| n.as_element().is_some())
        .collect();

    for element in elements {
        let empty_booleans: Vec<String> = dom_utils::attr_pairs(&element)
            .into_iter()
            .filter(|(name, value)| value.is_empty() && explicit.contains(&name.as_str()))
            .map(|(name, _)| name)
            .collect();
        if empty_booleans.is_empty() {
            continue;
        }
        if !element_identified_in_source(&element, source) {
            continue;
        }
        for name in empty_booleans {
            dom_utils::set_attr(&element, &name, &name);
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// XML-dialect serialization: void elements self-close, attribute values are
/// emitted verbatim (so promoted booleans keep their `name="name"` form).
pub fn serialize_xml(node: &NodeRef) -> String {
    let mut out = String::new();
    write_xml(node, &mut out);
    out
}

fn write_xml(node: &NodeRef, out: &mut String) {
    if let Some(element) = node.as_element() {
        let tag = element.name.local.as_ref().to_ascii_lowercase();
        out.push('<');
        out.push_str(&tag);
        for (name, attr) in element.attributes.borrow().map.iter() {
            out.push(' ');
            out.push_str(name.local.as_ref());
            out.push_str("=\"");
            escape_attr(&attr.value, out);
            out.push('"');
        }
        if VOID_ELEMENTS.contains(&tag.as_str()) {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in node.children() {
            write_xml(&child, out);
        }
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    } else if let Some(text) = node.as_text() {
        escape_text(&text.borrow(), out);
    } else if node.as_comment().is_some() {
        // Comments never survive preprocessing.
    } else {
        for child in node.children() {
            write_xml(&child, out);
        }
    }
}
