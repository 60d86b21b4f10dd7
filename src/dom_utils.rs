//! DOM helpers shared by the preprocessing, grabbing, and cleaning passes.
//!
//! Everything here operates on kuchikikiki's [`NodeRef`] tree, which is the
//! mutable DOM the extraction pipeline runs against. Read-only harvesting
//! (metadata, the readerable probe) uses scraper views instead and does not
//! go through this module.

use crate::constants::{GrabFlags, PHRASING_ELEMS, REGEXPS};
use html5ever::{ns, LocalName, QualName};
use kuchikikiki::traits::*;
use kuchikikiki::{Attribute, ExpandedName, NodeRef};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

static DISPLAY_NONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)display\s*:\s*none").unwrap());
static VISIBILITY_HIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)visibility\s*:\s*hidden").unwrap());

/// Parse a full HTML document into a mutable tree.
pub fn parse_document(html: &str) -> NodeRef {
    kuchikikiki::parse_html().one(html)
}

/// The `<body>` element of a parsed document, or the document itself when
/// the input had none.
pub fn document_body(doc: &NodeRef) -> NodeRef {
    doc.select_first("body")
        .map(|b| b.as_node().clone())
        .unwrap_or_else(|_| doc.clone())
}

/// Stable identity for per-element annotations: the pointer behind the
/// `NodeRef`'s shared node. Valid only while the tree is alive, which is
/// exactly the lifetime of a grab attempt.
pub fn node_key(node: &NodeRef) -> usize {
    Rc::as_ptr(&node.0) as *const () as usize
}

/// Number of element nodes in the tree, for the element-cap gate.
pub fn element_count(doc: &NodeRef) -> usize {
    doc.descendants()
        .filter(|n| n.as_element().is_some())
        .count()
}

pub fn is_element(node: &NodeRef) -> bool {
    node.as_element().is_some()
}

/// Lowercased tag name of an element node.
pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(|e| e.name.local.as_ref().to_ascii_lowercase())
}

pub fn node_has_tag(node: &NodeRef, tag: &str) -> bool {
    node.as_element()
        .map(|e| e.name.local.as_ref().eq_ignore_ascii_case(tag))
        .unwrap_or(false)
}

pub fn node_has_any_tag(node: &NodeRef, tags: &[&str]) -> bool {
    tags.iter().any(|tag| node_has_tag(node, tag))
}

pub fn get_attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|e| e.attributes.borrow().get(name).map(str::to_string))
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().insert(name, value.to_string());
    }
}

pub fn remove_attr(node: &NodeRef, name: &str) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().remove(name);
    }
}

pub fn has_attr(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .map(|e| e.attributes.borrow().contains(name))
        .unwrap_or(false)
}

/// All attribute `(name, value)` pairs of an element.
pub fn attr_pairs(node: &NodeRef) -> Vec<(String, String)> {
    node.as_element()
        .map(|e| {
            e.attributes
                .borrow()
                .map
                .iter()
                .map(|(name, attr)| (name.local.as_ref().to_string(), attr.value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// The "class id" string the class-based heuristics match against.
pub fn match_string(node: &NodeRef) -> String {
    format!(
        "{} {}",
        get_attr(node, "class").unwrap_or_default(),
        get_attr(node, "id").unwrap_or_default()
    )
}

/// Create a detached HTML element.
pub fn create_element(tag: &str) -> NodeRef {
    NodeRef::new_element(
        QualName::new(None, ns!(html), LocalName::from(tag)),
        Vec::<(ExpandedName, Attribute)>::new(),
    )
}

/// Rename an element in place: a new element with the same attributes and
/// children takes the node's position in the tree. Returns the new node.
pub fn set_node_tag(node: &NodeRef, tag: &str) -> NodeRef {
    let replacement = create_element(tag);

    if let (Some(old), Some(new)) = (node.as_element(), replacement.as_element()) {
        let old_attrs = old.attributes.borrow();
        let mut new_attrs = new.attributes.borrow_mut();
        for (name, attr) in old_attrs.map.iter() {
            new_attrs.insert(name.local.as_ref(), attr.value.clone());
        }
    }

    for child in node.children().collect::<Vec<_>>() {
        replacement.append(child);
    }

    if node.parent().is_some() {
        node.insert_after(replacement.clone());
        node.detach();
    }

    replacement
}

/// Replace `node` with `replacement` at the same tree position.
pub fn replace_node(node: &NodeRef, replacement: &NodeRef) {
    node.insert_after(replacement.clone());
    node.detach();
}

pub fn first_element_child(node: &NodeRef) -> Option<NodeRef> {
    node.children().find(is_element)
}

pub fn element_children(node: &NodeRef) -> Vec<NodeRef> {
    node.children().filter(is_element).collect()
}

pub fn next_element_sibling(node: &NodeRef) -> Option<NodeRef> {
    let mut current = node.next_sibling();
    while let Some(sibling) = current {
        if is_element(&sibling) {
            return Some(sibling);
        }
        current = sibling.next_sibling();
    }
    None
}

pub fn previous_element_sibling(node: &NodeRef) -> Option<NodeRef> {
    let mut current = node.previous_sibling();
    while let Some(sibling) = current {
        if is_element(&sibling) {
            return Some(sibling);
        }
        current = sibling.previous_sibling();
    }
    None
}

/// Starting from `node` itself, skip forward over whitespace-only text
/// nodes and return the first substantial node (element or non-blank text).
pub fn next_significant_node(mut node: Option<NodeRef>) -> Option<NodeRef> {
    while let Some(current) = node {
        if is_element(&current) {
            return Some(current);
        }
        if let Some(text) = current.as_text() {
            if !REGEXPS.whitespace.is_match(&text.borrow()) {
                return Some(current);
            }
        }
        node = current.next_sibling();
    }
    None
}

/// Document-order traversal over elements: first child, else next sibling,
/// else the nearest ancestor's next sibling.
pub fn get_next_node(node: &NodeRef, ignore_self_and_kids: bool) -> Option<NodeRef> {
    if !ignore_self_and_kids {
        if let Some(child) = first_element_child(node) {
            return Some(child);
        }
    }
    if let Some(sibling) = next_element_sibling(node) {
        return Some(sibling);
    }
    let mut parent = node.parent();
    while let Some(current) = parent {
        if let Some(sibling) = next_element_sibling(&current) {
            return Some(sibling);
        }
        parent = current.parent();
    }
    None
}

/// Drop `node` from the tree and return the next element in document order
/// as if the node's subtree had never been there.
pub fn remove_and_get_next(node: &NodeRef) -> Option<NodeRef> {
    let next = get_next_node(node, true);
    node.detach();
    next
}

/// Element ancestors of a node, nearest first, up to `max_depth`
/// (`0` = unlimited).
pub fn get_node_ancestors(node: &NodeRef, max_depth: usize) -> Vec<NodeRef> {
    let mut ancestors = Vec::new();
    let mut current = node.parent();
    while let Some(parent) = current {
        if !is_element(&parent) {
            break;
        }
        ancestors.push(parent.clone());
        if max_depth != 0 && ancestors.len() >= max_depth {
            break;
        }
        current = parent.parent();
    }
    ancestors
}

/// Whether an ancestor within `max_depth` (negative = unlimited) has the
/// given tag and passes `filter`.
pub fn has_ancestor_tag<F>(node: &NodeRef, tag: &str, max_depth: i32, mut filter: F) -> bool
where
    F: FnMut(&NodeRef) -> bool,
{
    let mut depth = 0;
    let mut current = node.parent();
    while let Some(parent) = current {
        if max_depth > 0 && depth > max_depth {
            return false;
        }
        if node_has_tag(&parent, tag) && filter(&parent) {
            return true;
        }
        depth += 1;
        current = parent.parent();
    }
    false
}

/// Trimmed text content; `normalize` collapses internal whitespace runs.
pub fn inner_text(node: &NodeRef, normalize: bool) -> String {
    let text = node.text_contents();
    let trimmed = text.trim();
    if normalize {
        REGEXPS.normalize.replace_all(trimmed, " ").into_owned()
    } else {
        trimmed.to_string()
    }
}

/// Character count of a string, in Unicode scalars.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Serialize a node, including the node itself.
pub fn serialize(node: &NodeRef) -> String {
    let mut buffer = Vec::new();
    if node.serialize(&mut buffer).is_err() {
        return node.text_contents();
    }
    String::from_utf8(buffer).unwrap_or_else(|_| node.text_contents())
}

/// Serialize only a node's children, i.e. its inner HTML.
pub fn serialize_children(node: &NodeRef) -> String {
    let mut buffer = Vec::new();
    for child in node.children() {
        if child.serialize(&mut buffer).is_err() {
            return node.text_contents();
        }
    }
    String::from_utf8(buffer).unwrap_or_else(|_| node.text_contents())
}

/// Parse an HTML fragment and return the `<body>` wrapper holding its nodes.
pub fn parse_fragment(html: &str) -> NodeRef {
    let doc = kuchikikiki::parse_html().one(html);
    document_body(&doc)
}

/// Replace a node's children with the parse of `html`.
pub fn set_inner_html(node: &NodeRef, html: &str) {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
    let fragment = parse_fragment(html);
    for child in fragment.children().collect::<Vec<_>>() {
        node.append(child);
    }
}

/// Whitespace as the `<br>`-collapse pass sees it: blank text or `<br>`.
pub fn is_whitespace(node: &NodeRef) -> bool {
    if let Some(text) = node.as_text() {
        return text.borrow().trim().is_empty();
    }
    node_has_tag(node, "br")
}

/// Phrasing content: text nodes, the phrasing whitelist, and `a`/`del`/`ins`
/// when every child is itself phrasing.
pub fn is_phrasing_content(node: &NodeRef) -> bool {
    if node.as_text().is_some() {
        return true;
    }
    let Some(tag) = tag_name(node) else {
        return false;
    };
    if PHRASING_ELEMS.contains(&tag.as_str()) {
        return true;
    }
    matches!(tag.as_str(), "a" | "del" | "ins")
        && node.children().all(|child| is_phrasing_content(&child))
}

/// Visibility heuristic: inline styles, the `hidden` attribute, and
/// `aria-hidden` (with a carve-out for fallback images).
pub fn is_probably_visible(node: &NodeRef) -> bool {
    if let Some(style) = get_attr(node, "style") {
        if DISPLAY_NONE.is_match(&style) || VISIBILITY_HIDDEN.is_match(&style) {
            return false;
        }
    }
    if has_attr(node, "hidden") {
        return false;
    }
    if let Some(aria_hidden) = get_attr(node, "aria-hidden") {
        let is_fallback_image = get_attr(node, "class")
            .map(|class| class.contains("fallback-image"))
            .unwrap_or(false);
        if aria_hidden == "true" && !is_fallback_image {
            return false;
        }
    }
    true
}

/// No text, and no children besides `<br>`/`<hr>`.
pub fn is_element_without_content(node: &NodeRef) -> bool {
    if !is_element(node) {
        return false;
    }
    if !node.text_contents().trim().is_empty() {
        return false;
    }
    let children = element_children(node);
    let br_hr_count = children
        .iter()
        .filter(|child| node_has_tag(child, "br") || node_has_tag(child, "hr"))
        .count();
    children.is_empty() || children.len() == br_hr_count
}

/// Exactly one element child with the given tag, and no substantial text.
pub fn has_single_tag_inside_element(node: &NodeRef, tag: &str) -> bool {
    let children = element_children(node);
    if children.len() != 1 || !node_has_tag(&children[0], tag) {
        return false;
    }
    !node.children().any(|child| {
        child
            .as_text()
            .map(|text| REGEXPS.has_content.is_match(&text.borrow()))
            .unwrap_or(false)
    })
}

/// Whether the subtree contains a block-level element from the div-to-p set.
pub fn has_child_block_element(node: &NodeRef) -> bool {
    node.children().any(|child| {
        node_has_any_tag(&child, &crate::constants::DIV_TO_P_ELEMS)
            || has_child_block_element(&child)
    })
}

/// Link density without caching; [`GrabContext::link_density`] is the cached
/// variant used inside a grab attempt.
pub fn get_link_density(node: &NodeRef) -> f64 {
    let text_length = char_len(&inner_text(node, true));
    if text_length == 0 {
        return 0.0;
    }
    let mut link_length = 0.0;
    if let Ok(links) = node.select("a") {
        for link in links {
            let link_node = link.as_node();
            let coefficient = match get_attr(link_node, "href") {
                Some(href) if REGEXPS.hash_url.is_match(&href) => 0.3,
                _ => 1.0,
            };
            link_length += char_len(&inner_text(link_node, true)) as f64 * coefficient;
        }
    }
    link_length / text_length as f64
}

/// Combined text length of descendants with the given tags over the node's
/// own text length.
pub fn get_text_density(node: &NodeRef, tags: &[&str]) -> f64 {
    let text_length = char_len(&inner_text(node, true));
    if text_length == 0 {
        return 0.0;
    }
    let selector = tags.join(", ");
    let mut children_length = 0usize;
    if let Ok(matches) = node.select(&selector) {
        for child in matches {
            children_length += char_len(&inner_text(child.as_node(), true));
        }
    }
    children_length as f64 / text_length as f64
}

/// Per-attempt state for the grabber: flag set, score annotations keyed by
/// node identity, the data-table flags, and the mutation-aware caches.
///
/// A context never outlives one grab attempt. When the body snapshot is
/// restored for a retry, the context is dropped wholesale, which clears
/// every annotation at once.
pub struct GrabContext {
    pub flags: GrabFlags,
    epoch: Cell<u64>,
    scores: RefCell<HashMap<usize, f64>>,
    data_tables: RefCell<HashMap<usize, bool>>,
    link_density_cache: RefCell<HashMap<usize, (u64, f64)>>,
    text_len_cache: RefCell<HashMap<usize, (u64, usize)>>,
    phrasing_cache: RefCell<HashMap<usize, (u64, bool)>>,
}

impl GrabContext {
    pub fn new(flags: GrabFlags) -> Self {
        Self {
            flags,
            epoch: Cell::new(0),
            scores: RefCell::new(HashMap::new()),
            data_tables: RefCell::new(HashMap::new()),
            link_density_cache: RefCell::new(HashMap::new()),
            text_len_cache: RefCell::new(HashMap::new()),
            phrasing_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn flag_is_active(&self, flag: GrabFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Advance the mutation epoch. Cached values computed before the bump
    /// are recomputed on next access.
    pub fn bump(&self) {
        self.epoch.set(self.epoch.get() + 1);
    }

    pub fn has_score(&self, node: &NodeRef) -> bool {
        self.scores.borrow().contains_key(&node_key(node))
    }

    pub fn get_score(&self, node: &NodeRef) -> Option<f64> {
        self.scores.borrow().get(&node_key(node)).copied()
    }

    pub fn set_score(&self, node: &NodeRef, score: f64) {
        self.scores.borrow_mut().insert(node_key(node), score);
    }

    pub fn add_score(&self, node: &NodeRef, delta: f64) {
        if let Some(score) = self.scores.borrow_mut().get_mut(&node_key(node)) {
            *score += delta;
        }
    }

    pub fn mark_data_table(&self, node: &NodeRef, is_data: bool) {
        self.data_tables.borrow_mut().insert(node_key(node), is_data);
    }

    pub fn is_data_table(&self, node: &NodeRef) -> bool {
        self.data_tables
            .borrow()
            .get(&node_key(node))
            .copied()
            .unwrap_or(false)
    }

    /// Cached trimmed text length.
    pub fn text_length(&self, node: &NodeRef) -> usize {
        let key = node_key(node);
        let epoch = self.epoch.get();
        if let Some(&(cached_epoch, value)) = self.text_len_cache.borrow().get(&key) {
            if cached_epoch == epoch {
                return value;
            }
        }
        let value = char_len(&inner_text(node, true));
        self.text_len_cache.borrow_mut().insert(key, (epoch, value));
        value
    }

    /// Cached link density, recomputed after any mutation epoch bump.
    pub fn link_density(&self, node: &NodeRef) -> f64 {
        let key = node_key(node);
        let epoch = self.epoch.get();
        if let Some(&(cached_epoch, value)) = self.link_density_cache.borrow().get(&key) {
            if cached_epoch == epoch {
                return value;
            }
        }
        let value = get_link_density(node);
        self.link_density_cache
            .borrow_mut()
            .insert(key, (epoch, value));
        value
    }

    /// Cached phrasing-content check.
    pub fn is_phrasing(&self, node: &NodeRef) -> bool {
        if node.as_element().is_none() {
            return is_phrasing_content(node);
        }
        let key = node_key(node);
        let epoch = self.epoch.get();
        if let Some(&(cached_epoch, value)) = self.phrasing_cache.borrow().get(&key) {
            if cached_epoch == epoch {
                return value;
            }
        }
        let value = is_phrasing_content(node);
        self.phrasing_cache.borrow_mut().insert(key, (epoch, value));
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(html: &str) -> NodeRef {
        document_body(&parse_document(html))
    }

    #[test]
    fn tag_and_attr_access() {
        let body = body_of(r#"<div id="main" CLASS="outer">x</div>"#);
        let div = body.select_first("div").unwrap().as_node().clone();
        assert_eq!(tag_name(&div).as_deref(), Some("div"));
        assert_eq!(get_attr(&div, "id").as_deref(), Some("main"));
        assert_eq!(get_attr(&div, "class").as_deref(), Some("outer"));
        assert_eq!(match_string(&div), "outer main");
    }

    #[test]
    fn set_node_tag_keeps_attributes_and_children() {
        let body = body_of(r#"<font color="red"><b>hi</b> there</font>"#);
        let font = body.select_first("font").unwrap().as_node().clone();
        let span = set_node_tag(&font, "span");
        assert_eq!(tag_name(&span).as_deref(), Some("span"));
        assert_eq!(get_attr(&span, "color").as_deref(), Some("red"));
        assert_eq!(span.text_contents(), "hi there");
        assert!(body.select_first("font").is_err());
        assert!(body.select_first("span").is_ok());
    }

    #[test]
    fn next_node_walks_document_order() {
        let body = body_of("<div><p>a</p></div><section>b</section>");
        let div = body.select_first("div").unwrap().as_node().clone();
        let p = get_next_node(&div, false).unwrap();
        assert_eq!(tag_name(&p).as_deref(), Some("p"));
        let section = get_next_node(&p, false).unwrap();
        assert_eq!(tag_name(&section).as_deref(), Some("section"));
        assert!(get_next_node(&section, false).is_none());
    }

    #[test]
    fn remove_and_get_next_skips_subtree() {
        let body = body_of("<div><p>a</p></div><p>b</p>");
        let div = body.select_first("div").unwrap().as_node().clone();
        let next = remove_and_get_next(&div).unwrap();
        assert_eq!(inner_text(&next, true), "b");
        assert_eq!(body.text_contents().trim(), "b");
    }

    #[test]
    fn link_density_weights_hash_links() {
        let body = body_of(r##"<p><a href="#top">12345</a>67890</p>"##);
        let p = body.select_first("p").unwrap().as_node().clone();
        let density = get_link_density(&p);
        assert!((density - 0.15).abs() < 1e-9);
    }

    #[test]
    fn phrasing_content_recurses_into_anchors() {
        let body = body_of("<a><b>x</b></a><a><div>y</div></a>");
        let anchors: Vec<NodeRef> = body
            .select("a")
            .unwrap()
            .map(|a| a.as_node().clone())
            .collect();
        assert!(is_phrasing_content(&anchors[0]));
        assert!(!is_phrasing_content(&anchors[1]));
    }

    #[test]
    fn visibility_rules() {
        let body = body_of(
            r#"<p style="display:none">a</p><p hidden>b</p>
               <p aria-hidden="true">c</p>
               <p aria-hidden="true" class="fallback-image">d</p><p>e</p>"#,
        );
        let nodes: Vec<NodeRef> = body
            .select("p")
            .unwrap()
            .map(|p| p.as_node().clone())
            .collect();
        assert!(!is_probably_visible(&nodes[0]));
        assert!(!is_probably_visible(&nodes[1]));
        assert!(!is_probably_visible(&nodes[2]));
        assert!(is_probably_visible(&nodes[3]));
        assert!(is_probably_visible(&nodes[4]));
    }

    #[test]
    fn empty_wrapper_detection() {
        let body = body_of("<div><br><hr></div><div><p>text</p></div>");
        let divs: Vec<NodeRef> = body
            .select("div")
            .unwrap()
            .map(|d| d.as_node().clone())
            .collect();
        assert!(is_element_without_content(&divs[0]));
        assert!(!is_element_without_content(&divs[1]));
    }

    #[test]
    fn single_tag_check_rejects_stray_text() {
        let body = body_of("<div><p>only</p></div><div><p>x</p> tail</div>");
        let divs: Vec<NodeRef> = body
            .select("div")
            .unwrap()
            .map(|d| d.as_node().clone())
            .collect();
        assert!(has_single_tag_inside_element(&divs[0], "p"));
        assert!(!has_single_tag_inside_element(&divs[1], "p"));
    }

    #[test]
    fn grab_context_cache_invalidation() {
        let body = body_of("<p>short text here</p>");
        let p = body.select_first("p").unwrap().as_node().clone();
        let ctx = GrabContext::new(GrabFlags::all());
        let before = ctx.text_length(&p);
        p.append(NodeRef::new_text(" and considerably more text"));
        assert_eq!(ctx.text_length(&p), before);
        ctx.bump();
        assert!(ctx.text_length(&p) > before);
    }

    #[test]
    fn inner_html_roundtrip() {
        let body = body_of("<div>old</div>");
        let div = body.select_first("div").unwrap().as_node().clone();
        set_inner_html(&div, "<p>new <b>content</b></p>");
        assert_eq!(div.text_contents(), "new content");
        assert!(serialize_children(&div).contains("<b>content</b>"));
    }
}
