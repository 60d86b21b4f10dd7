//! Document preprocessing and article cleanup passes.
//!
//! `prep_document` runs once before the grabber: it strips scripts, styles,
//! and comments, rescues images hidden behind `<noscript>`, collapses `<br>`
//! runs into paragraphs, and renames `<font>` to `<span>`. `prep_article`
//! runs inside each grab attempt on the assembled article and removes the
//! clutter the scoring pass let through.

use crate::constants::{
    GrabFlags, DEFAULT_CHAR_THRESHOLD, DEPRECATED_SIZE_ATTRIBUTE_ELEMS, DIV_TO_P_ELEMS,
    PRESENTATIONAL_ATTRIBUTES, REGEXPS,
};
use crate::dom_utils::{self, GrabContext};
use crate::options::ReadabilityOptions;
use crate::scoring;
use kuchikikiki::NodeRef;

/// Run the preprocessing passes over a freshly parsed document.
pub fn prep_document(doc: &NodeRef) {
    remove_tags(doc, &["script"]);
    unwrap_noscript_images(doc);
    remove_tags(doc, &["noscript", "style"]);
    remove_comments(doc);
    let body = dom_utils::document_body(doc);
    replace_brs(&body);
    rename_all(doc, "font", "span");
}

fn collect_nodes(root: &NodeRef, css: &str) -> Vec<NodeRef> {
    root.select(css)
        .map(|matches| matches.map(|m| m.as_node().clone()).collect())
        .unwrap_or_default()
}

fn is_attached_to(node: &NodeRef, root: &NodeRef) -> bool {
    node.ancestors().any(|ancestor| &ancestor == root)
}

fn remove_tags(root: &NodeRef, tags: &[&str]) {
    for tag in tags {
        for node in collect_nodes(root, tag) {
            node.detach();
        }
    }
}

fn rename_all(root: &NodeRef, from: &str, to: &str) {
    for node in collect_nodes(root, from) {
        dom_utils::set_node_tag(&node, to);
    }
}

fn remove_comments(node: &NodeRef) {
    let comments: Vec<NodeRef> = node
        .inclusive_descendants()
        .filter(|n| n.as_comment().is_some())
        .collect();
    for comment in comments {
        comment.detach();
    }
}

/// A node that is an `<img>`, or wraps exactly one through single-child
/// elements with no stray text.
fn is_single_image(node: &NodeRef) -> bool {
    let mut current = node.clone();
    loop {
        if dom_utils::node_has_tag(&current, "img") {
            return true;
        }
        let children = dom_utils::element_children(&current);
        if children.len() != 1 || !current.text_contents().trim().is_empty() {
            return false;
        }
        current = children[0].clone();
    }
}

/// The markup inside a `<noscript>`. Parsers treat noscript content as raw
/// text when scripting is on, so prefer the text form over serialization.
fn noscript_inner_html(noscript: &NodeRef) -> String {
    let has_element_children = noscript.children().any(|c| c.as_element().is_some());
    if has_element_children {
        dom_utils::serialize_children(noscript)
    } else {
        noscript.text_contents()
    }
}

/// Find load-failure placeholder images and replace them with the real
/// image markup kept inside an adjacent `<noscript>`.
fn unwrap_noscript_images(doc: &NodeRef) {
    // Placeholder <img> with no usable source attribute at all.
    for img in collect_nodes(doc, "img") {
        let keeps = dom_utils::attr_pairs(&img).iter().any(|(name, value)| {
            matches!(name.as_str(), "src" | "srcset" | "data-src" | "data-srcset")
                || REGEXPS.img_extensions.is_match(value)
        });
        if !keeps {
            img.detach();
        }
    }

    for noscript in collect_nodes(doc, "noscript") {
        let tmp = dom_utils::create_element("div");
        dom_utils::set_inner_html(&tmp, &noscript_inner_html(&noscript));
        if !is_single_image(&tmp) {
            continue;
        }

        let Some(prev_element) = dom_utils::previous_element_sibling(&noscript) else {
            continue;
        };
        if !is_single_image(&prev_element) {
            continue;
        }

        let prev_img = if dom_utils::node_has_tag(&prev_element, "img") {
            prev_element.clone()
        } else {
            match collect_nodes(&prev_element, "img").into_iter().next() {
                Some(img) => img,
                None => continue,
            }
        };
        let Some(new_img) = collect_nodes(&tmp, "img").into_iter().next() else {
            continue;
        };

        // Carry attributes from the placeholder over to the real image,
        // stashing conflicting values under data-old-*.
        for (name, value) in dom_utils::attr_pairs(&prev_img) {
            if value.is_empty() {
                continue;
            }
            if !(name == "src" || name == "srcset" || REGEXPS.img_extensions.is_match(&value)) {
                continue;
            }
            if dom_utils::get_attr(&new_img, &name).as_deref() == Some(value.as_str()) {
                continue;
            }
            let attr_name = if dom_utils::has_attr(&new_img, &name) {
                format!("data-old-{}", name)
            } else {
                name
            };
            dom_utils::set_attr(&new_img, &attr_name, &value);
        }

        if let Some(replacement) = dom_utils::first_element_child(&tmp) {
            dom_utils::replace_node(&prev_element, &replacement);
        }
    }
}

/// Collapse runs of two or more `<br>`s into paragraph breaks, absorbing the
/// phrasing content that follows into the new `<p>`.
pub fn replace_brs(root: &NodeRef) {
    for br in collect_nodes(root, "br") {
        if br.parent().is_none() {
            continue;
        }

        let mut next = br.next_sibling();
        let mut replaced = false;

        // Eat any <br>s that follow, separated only by whitespace.
        while let Some(current) = dom_utils::next_significant_node(next) {
            if !dom_utils::node_has_tag(&current, "br") {
                break;
            }
            replaced = true;
            let sibling = current.next_sibling();
            current.detach();
            next = sibling;
        }

        if !replaced {
            continue;
        }

        let p = dom_utils::create_element("p");
        dom_utils::replace_node(&br, &p);

        let mut next = p.next_sibling();
        while let Some(sibling) = next {
            // A double <br> means another paragraph break coming up.
            if dom_utils::node_has_tag(&sibling, "br") {
                if let Some(after) = dom_utils::next_significant_node(sibling.next_sibling()) {
                    if dom_utils::node_has_tag(&after, "br") {
                        break;
                    }
                }
            }
            if !dom_utils::is_phrasing_content(&sibling) {
                break;
            }
            let following = sibling.next_sibling();
            p.append(sibling);
            next = following;
        }

        while let Some(last) = p.last_child() {
            if !dom_utils::is_whitespace(&last) {
                break;
            }
            last.detach();
        }

        if let Some(parent) = p.parent() {
            if dom_utils::node_has_tag(&parent, "p") {
                dom_utils::set_node_tag(&parent, "div");
            }
        }
    }
}

/// Clean the assembled article in place. Ordering of the passes matters and
/// mirrors the scoring pipeline's expectations.
pub fn prep_article(article: &NodeRef, ctx: &GrabContext, options: &ReadabilityOptions) {
    clean_styles(article);
    ctx.bump();

    mark_data_tables(ctx, article);
    fix_lazy_images(article);
    ctx.bump();

    clean_conditionally(ctx, article, "form", options);
    clean_conditionally(ctx, article, "fieldset", options);
    clean(article, "object", options);
    clean(article, "embed", options);
    clean(article, "footer", options);
    clean(article, "link", options);
    clean(article, "aside", options);
    ctx.bump();

    // Share widgets inside each top-level article chunk.
    for top_child in dom_utils::element_children(article) {
        clean_matched_nodes(&top_child, |node, match_string| {
            REGEXPS.share_elements.is_match(match_string)
                && dom_utils::char_len(&node.text_contents()) < DEFAULT_CHAR_THRESHOLD
        });
    }
    ctx.bump();

    clean(article, "iframe", options);
    clean(article, "input", options);
    clean(article, "textarea", options);
    clean(article, "select", options);
    clean(article, "button", options);
    clean_headers(ctx, article);
    ctx.bump();

    clean_conditionally(ctx, article, "table", options);
    clean_conditionally(ctx, article, "ul", options);
    clean_conditionally(ctx, article, "div", options);
    ctx.bump();

    rename_all(article, "h1", "h2");

    for paragraph in collect_nodes(article, "p") {
        let media_count = ["img", "embed", "object", "iframe"]
            .iter()
            .map(|tag| collect_nodes(&paragraph, tag).len())
            .sum::<usize>();
        if media_count == 0 && dom_utils::inner_text(&paragraph, false).is_empty() {
            paragraph.detach();
        }
    }

    for br in collect_nodes(article, "br") {
        if let Some(next) = dom_utils::next_significant_node(br.next_sibling()) {
            if dom_utils::node_has_tag(&next, "p") {
                br.detach();
            }
        }
    }

    collapse_single_cell_tables(article);
    ctx.bump();
}

/// Strip presentational attributes recursively, leaving `<svg>` subtrees
/// untouched.
fn clean_styles(node: &NodeRef) {
    if !dom_utils::is_element(node) || dom_utils::node_has_tag(node, "svg") {
        return;
    }

    for attribute in PRESENTATIONAL_ATTRIBUTES {
        dom_utils::remove_attr(node, attribute);
    }
    if dom_utils::node_has_any_tag(node, &DEPRECATED_SIZE_ATTRIBUTE_ELEMS) {
        dom_utils::remove_attr(node, "width");
        dom_utils::remove_attr(node, "height");
    }

    for child in dom_utils::element_children(node) {
        clean_styles(&child);
    }
}

/// Decide for every `<table>` whether it carries data or layout.
pub fn mark_data_tables(ctx: &GrabContext, root: &NodeRef) {
    for table in collect_nodes(root, "table") {
        let is_data = detect_data_table(&table);
        ctx.mark_data_table(&table, is_data);
    }
}

fn detect_data_table(table: &NodeRef) -> bool {
    if dom_utils::get_attr(table, "role").as_deref() == Some("presentation") {
        return false;
    }
    if dom_utils::get_attr(table, "datatable").as_deref() == Some("0") {
        return false;
    }
    if dom_utils::get_attr(table, "summary")
        .map(|s| !s.is_empty())
        .unwrap_or(false)
    {
        return true;
    }

    if let Some(caption) = collect_nodes(table, "caption").into_iter().next() {
        if caption.children().next().is_some() {
            return true;
        }
    }

    for tag in ["col", "colgroup", "tfoot", "thead", "th"] {
        if !collect_nodes(table, tag).is_empty() {
            return true;
        }
    }

    if !collect_nodes(table, "table").is_empty() {
        return false;
    }

    let (rows, columns) = get_row_and_column_count(table);
    if rows == 1 || columns == 1 {
        return false;
    }
    if rows >= 10 || columns > 4 {
        return true;
    }
    rows * columns > 10
}

fn get_row_and_column_count(table: &NodeRef) -> (usize, usize) {
    let mut rows = 0usize;
    let mut columns = 0usize;
    for tr in collect_nodes(table, "tr") {
        let rowspan = dom_utils::get_attr(&tr, "rowspan")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        rows += rowspan.max(1);

        let mut columns_in_row = 0usize;
        for cell in collect_nodes(&tr, "td") {
            let colspan = dom_utils::get_attr(&cell, "colspan")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);
            columns_in_row += colspan.max(1);
        }
        columns = columns.max(columns_in_row);
    }
    (rows, columns)
}

/// Recover image sources that lazy-loading scripts kept in data attributes.
fn fix_lazy_images(root: &NodeRef) {
    for elem in ["img", "picture", "figure"]
        .iter()
        .flat_map(|tag| collect_nodes(root, tag))
    {
        // A tiny base64 placeholder src can be dropped when a real
        // source lives in another attribute.
        if let Some(src) = dom_utils::get_attr(&elem, "src") {
            if let Some(captures) = REGEXPS.b64_data_url.captures(&src) {
                if &captures[1] != "image/svg+xml" {
                    let src_could_be_removed = dom_utils::attr_pairs(&elem)
                        .iter()
                        .any(|(name, value)| {
                            name != "src" && REGEXPS.img_extensions.is_match(value)
                        });
                    if src_could_be_removed {
                        if let Some(found) = src.to_lowercase().find("base64") {
                            let payload_length = src.len().saturating_sub(found + 7);
                            if payload_length < 133 {
                                dom_utils::remove_attr(&elem, "src");
                            }
                        }
                    }
                }
            }
        }

        let has_src = dom_utils::get_attr(&elem, "src").is_some();
        let has_srcset = dom_utils::get_attr(&elem, "srcset")
            .map(|s| s != "null")
            .unwrap_or(false);
        let is_lazy = dom_utils::get_attr(&elem, "class")
            .map(|c| c.to_lowercase().contains("lazy"))
            .unwrap_or(false);
        if (has_src || has_srcset) && !is_lazy {
            continue;
        }

        for (name, value) in dom_utils::attr_pairs(&elem) {
            if matches!(name.as_str(), "src" | "srcset" | "alt") {
                continue;
            }
            let copy_to = if REGEXPS.srcset_candidate.is_match(&value) {
                Some("srcset")
            } else if REGEXPS.src_candidate.is_match(&value) {
                Some("src")
            } else {
                None
            };
            let Some(copy_to) = copy_to else { continue };

            if dom_utils::node_has_tag(&elem, "img") || dom_utils::node_has_tag(&elem, "picture") {
                dom_utils::set_attr(&elem, copy_to, &value);
            } else if dom_utils::node_has_tag(&elem, "figure")
                && collect_nodes(&elem, "img").is_empty()
                && collect_nodes(&elem, "picture").is_empty()
            {
                let img = dom_utils::create_element("img");
                dom_utils::set_attr(&img, copy_to, &value);
                elem.append(img);
            }
        }
    }
}

fn allowed_video_regex(options: &ReadabilityOptions) -> &regex::Regex {
    options.allowed_video_regex.as_ref().unwrap_or(&REGEXPS.videos)
}

fn embed_has_allowed_video(node: &NodeRef, options: &ReadabilityOptions) -> bool {
    let videos = allowed_video_regex(options);
    for (_, value) in dom_utils::attr_pairs(node) {
        if videos.is_match(&value) {
            return true;
        }
    }
    dom_utils::node_has_tag(node, "object")
        && videos.is_match(&dom_utils::serialize_children(node))
}

/// Remove all elements with the given tag, sparing embeds that carry an
/// allowed video.
fn clean(root: &NodeRef, tag: &str, options: &ReadabilityOptions) {
    let is_embed = matches!(tag, "object" | "embed" | "iframe");
    for node in collect_nodes(root, tag) {
        if !is_attached_to(&node, root) {
            continue;
        }
        if is_embed && embed_has_allowed_video(&node, options) {
            continue;
        }
        node.detach();
    }
}

/// Walk the subtree under `root` and drop nodes matched by `filter`.
fn clean_matched_nodes<F>(root: &NodeRef, filter: F)
where
    F: Fn(&NodeRef, &str) -> bool,
{
    let end_of_search = dom_utils::get_next_node(root, true);
    let mut next = dom_utils::get_next_node(root, false);
    while let Some(node) = next {
        if end_of_search.as_ref() == Some(&node) {
            break;
        }
        if filter(&node, &dom_utils::match_string(&node)) {
            next = dom_utils::remove_and_get_next(&node);
        } else {
            next = dom_utils::get_next_node(&node, false);
        }
    }
}

/// Drop `<h1>`/`<h2>` headers whose class weight is negative.
fn clean_headers(ctx: &GrabContext, root: &NodeRef) {
    for tag in ["h1", "h2"] {
        for heading in collect_nodes(root, tag) {
            if !is_attached_to(&heading, root) {
                continue;
            }
            if scoring::get_class_weight(ctx, &heading) < 0.0 {
                heading.detach();
            }
        }
    }
}

/// Conditionally remove elements of the given tag, keeping anything that
/// looks like real content.
pub fn clean_conditionally(
    ctx: &GrabContext,
    root: &NodeRef,
    tag: &str,
    options: &ReadabilityOptions,
) {
    if !ctx.flag_is_active(GrabFlags::CLEAN_CONDITIONALLY) {
        return;
    }

    for node in collect_nodes(root, tag) {
        if !is_attached_to(&node, root) {
            continue;
        }
        if should_remove_conditionally(ctx, &node, tag, options) {
            node.detach();
        }
    }
}

fn should_remove_conditionally(
    ctx: &GrabContext,
    node: &NodeRef,
    tag: &str,
    options: &ReadabilityOptions,
) -> bool {
    let mut is_list = matches!(tag, "ul" | "ol");
    if !is_list {
        let node_text_len = ctx.text_length(node);
        if node_text_len > 0 {
            let list_length: usize = collect_nodes(node, "ul")
                .iter()
                .chain(collect_nodes(node, "ol").iter())
                .map(|list| ctx.text_length(list))
                .sum();
            is_list = list_length as f64 / node_text_len as f64 > 0.9;
        }
    }

    if tag == "table" && ctx.is_data_table(node) {
        return false;
    }
    if dom_utils::has_ancestor_tag(node, "table", -1, |t| ctx.is_data_table(t)) {
        return false;
    }
    if dom_utils::has_ancestor_tag(node, "code", 3, |_| true) {
        return false;
    }
    // A data table further down also protects this node.
    if collect_nodes(node, "table")
        .iter()
        .any(|table| ctx.is_data_table(table))
    {
        return false;
    }

    let weight = scoring::get_class_weight(ctx, node);
    if weight < 0.0 {
        return true;
    }

    let comma_count = node.text_contents().matches(',').count();
    if comma_count >= 10 {
        return false;
    }

    let p = collect_nodes(node, "p").len() as f64;
    let img = collect_nodes(node, "img").len() as f64;
    let li = collect_nodes(node, "li").len() as f64 - 100.0;
    let input = collect_nodes(node, "input").len() as f64;
    let heading_density =
        dom_utils::get_text_density(node, &["h1", "h2", "h3", "h4", "h5", "h6"]);

    let mut embed_count = 0usize;
    for embed_tag in ["object", "embed", "iframe"] {
        for embed in collect_nodes(node, embed_tag) {
            if embed_has_allowed_video(&embed, options) {
                return false;
            }
            embed_count += 1;
        }
    }

    let inner_text = dom_utils::inner_text(node, true);
    if REGEXPS.ad_words.is_match(&inner_text) || REGEXPS.loading_words.is_match(&inner_text) {
        return true;
    }

    let content_length = dom_utils::char_len(&inner_text);
    let link_density = ctx.link_density(node);
    let mut textish_tags = vec!["span", "li", "td"];
    textish_tags.extend_from_slice(&DIV_TO_P_ELEMS);
    let text_density = dom_utils::get_text_density(node, &textish_tags);
    let is_figure_child = dom_utils::has_ancestor_tag(node, "figure", 3, |_| true);
    let modifier = options.link_density_modifier;

    let have_to_remove = (img > 1.0 && p / img < 0.5 && !is_figure_child)
        || (!is_list && li > p)
        || input > (p / 3.0).floor()
        || (!is_list
            && heading_density < 0.9
            && content_length < 25
            && (img == 0.0 || img > 2.0)
            && !is_figure_child
            && link_density > 0.0)
        || (!is_list && weight < 25.0 && link_density > 0.2 + modifier)
        || (weight >= 25.0 && link_density > 0.5 + modifier)
        || ((embed_count == 1 && content_length < 75) || embed_count > 1)
        || (img == 0.0 && text_density == 0.0);

    if is_list && have_to_remove {
        for child in dom_utils::element_children(node) {
            if dom_utils::element_children(&child).len() > 1 {
                return have_to_remove;
            }
        }
        let li_count = collect_nodes(node, "li").len() as f64;
        if img == li_count {
            return false;
        }
    }

    have_to_remove
}

/// Replace `<table><tbody><tr><td>…</td></tr></tbody></table>` shells with
/// the lone cell, renamed according to its content.
fn collapse_single_cell_tables(root: &NodeRef) {
    for table in collect_nodes(root, "table") {
        if !is_attached_to(&table, root) {
            continue;
        }
        let tbody = if dom_utils::has_single_tag_inside_element(&table, "tbody") {
            dom_utils::first_element_child(&table).unwrap_or_else(|| table.clone())
        } else {
            table.clone()
        };
        if !dom_utils::has_single_tag_inside_element(&tbody, "tr") {
            continue;
        }
        let Some(row) = dom_utils::first_element_child(&tbody) else {
            continue;
        };
        if !dom_utils::has_single_tag_inside_element(&row, "td") {
            continue;
        }
        let Some(cell) = dom_utils::first_element_child(&row) else {
            continue;
        };

        let all_phrasing = cell
            .children()
            .all(|child| dom_utils::is_phrasing_content(&child));
        let cell = dom_utils::set_node_tag(&cell, if all_phrasing { "p" } else { "div" });
        dom_utils::replace_node(&table, &cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom_utils::{document_body, parse_document, serialize_children};

    fn prepped(html: &str) -> NodeRef {
        let doc = parse_document(html);
        prep_document(&doc);
        document_body(&doc)
    }

    fn default_options() -> ReadabilityOptions {
        ReadabilityOptions::default()
    }

    #[test]
    fn prep_removes_scripts_styles_comments() {
        let body = prepped(
            "<body><script>var x;</script><style>p{}</style><!-- note --><p>kept</p></body>",
        );
        let html = serialize_children(&body);
        assert!(!html.contains("script"));
        assert!(!html.contains("style"));
        assert!(!html.contains("note"));
        assert!(html.contains("kept"));
    }

    #[test]
    fn prep_renames_font_to_span() {
        let body = prepped(r#"<body><font size="2">text</font></body>"#);
        let html = serialize_children(&body);
        assert!(html.contains("<span"));
        assert!(!html.contains("<font"));
    }

    #[test]
    fn double_br_becomes_paragraph() {
        let body = prepped("<body><div>first<br> <br>second part</div></body>");
        let div = body.select_first("div").unwrap().as_node().clone();
        let paragraphs = collect_nodes(&div, "p");
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].text_contents().trim(), "second part");
        assert_eq!(collect_nodes(&div, "br").len(), 0);
    }

    #[test]
    fn single_br_is_left_alone() {
        let body = prepped("<body><div>one<br>two</div></body>");
        let div = body.select_first("div").unwrap().as_node().clone();
        assert_eq!(collect_nodes(&div, "br").len(), 1);
        assert_eq!(collect_nodes(&div, "p").len(), 0);
    }

    #[test]
    fn noscript_image_replaces_placeholder() {
        let body = prepped(concat!(
            "<body><div>",
            r#"<img src="placeholder.gif">"#,
            r#"<noscript><img src="real.jpg" alt="real"></noscript>"#,
            "</div></body>",
        ));
        let imgs = collect_nodes(&body, "img");
        assert_eq!(imgs.len(), 1);
        assert_eq!(
            dom_utils::get_attr(&imgs[0], "src").as_deref(),
            Some("real.jpg")
        );
        assert_eq!(
            dom_utils::get_attr(&imgs[0], "data-old-src").as_deref(),
            Some("placeholder.gif")
        );
        assert!(collect_nodes(&body, "noscript").is_empty());
    }

    #[test]
    fn attributeless_images_are_dropped() {
        let body = prepped("<body><img><p>text</p></body>");
        assert!(collect_nodes(&body, "img").is_empty());
    }

    #[test]
    fn layout_table_is_not_data_table() {
        let body = prepped(
            "<body><table><tr><td>a</td></tr></table>\
             <table summary=\"stats\"><tr><td>b</td></tr></table></body>",
        );
        let tables = collect_nodes(&body, "table");
        assert!(!detect_data_table(&tables[0]));
        assert!(detect_data_table(&tables[1]));
    }

    #[test]
    fn th_descendant_marks_data_table() {
        let body = prepped("<body><table><tr><th>h</th><td>v</td></tr></table></body>");
        let table = body.select_first("table").unwrap().as_node().clone();
        assert!(detect_data_table(&table));
    }

    #[test]
    fn large_grid_is_data_table() {
        let mut rows = String::new();
        for _ in 0..4 {
            rows.push_str("<tr><td>a</td><td>b</td><td>c</td></tr>");
        }
        let body = prepped(&format!("<body><table>{}</table></body>", rows));
        let table = body.select_first("table").unwrap().as_node().clone();
        assert!(detect_data_table(&table));
    }

    #[test]
    fn lazy_image_gets_src_from_data_attribute() {
        let body = prepped(r#"<body><img class="lazy" data-lazy-src="photo.jpg"></body>"#);
        let img = body.select_first("img").unwrap().as_node().clone();
        fix_lazy_images(&body);
        assert_eq!(dom_utils::get_attr(&img, "src").as_deref(), Some("photo.jpg"));
    }

    #[test]
    fn conditional_cleaning_drops_link_farms() {
        let body = prepped(&format!(
            "<body><div id=\"article\"><div>{}</div><div>{}</div></div></body>",
            "<p>Plain prose that keeps going for a while, long enough to count as content for the cleaner.</p>",
            (0..12)
                .map(|i| format!("<a href=\"/l{}\">link number {}</a> ", i, i))
                .collect::<String>(),
        ));
        let article = body.select_first("#article").unwrap().as_node().clone();
        let ctx = GrabContext::new(GrabFlags::all());
        clean_conditionally(&ctx, &article, "div", &default_options());
        let html = serialize_children(&article);
        assert!(html.contains("Plain prose"));
        assert!(!html.contains("link number"));
    }

    #[test]
    fn conditional_cleaning_respects_flag() {
        let body = prepped(
            "<body><div id=\"article\"><div><a href=\"/a\">only links here</a></div></div></body>",
        );
        let article = body.select_first("#article").unwrap().as_node().clone();
        let ctx = GrabContext::new(GrabFlags::all() - GrabFlags::CLEAN_CONDITIONALLY);
        clean_conditionally(&ctx, &article, "div", &default_options());
        assert!(serialize_children(&article).contains("only links"));
    }

    #[test]
    fn allowed_video_embed_survives() {
        let body = prepped(concat!(
            "<body><div id=\"article\"><div>",
            r#"<iframe src="https://www.youtube.com/embed/abc123"></iframe>"#,
            "</div></div></body>",
        ));
        let article = body.select_first("#article").unwrap().as_node().clone();
        clean(&article, "iframe", &default_options());
        assert!(serialize_children(&article).contains("youtube.com"));
    }

    #[test]
    fn share_widgets_are_removed() {
        let body = prepped(concat!(
            "<body><div id=\"article\"><div>",
            r#"<div class="share-buttons">Share this</div>"#,
            "<p>Real text of the article.</p>",
            "</div></div></body>",
        ));
        let article = body.select_first("#article").unwrap().as_node().clone();
        for child in dom_utils::element_children(&article) {
            clean_matched_nodes(&child, |node, match_string| {
                REGEXPS.share_elements.is_match(match_string)
                    && dom_utils::char_len(&node.text_contents()) < DEFAULT_CHAR_THRESHOLD
            });
        }
        let html = serialize_children(&article);
        assert!(!html.contains("Share this"));
        assert!(html.contains("Real text"));
    }

    #[test]
    fn single_cell_table_collapses_to_paragraph() {
        let body =
            prepped("<body><table><tbody><tr><td>just text</td></tr></tbody></table></body>");
        collapse_single_cell_tables(&body);
        assert!(collect_nodes(&body, "table").is_empty());
        let p = body.select_first("p").unwrap().as_node().clone();
        assert_eq!(p.text_contents(), "just text");
    }

    #[test]
    fn prep_article_removes_empty_paragraphs_and_renames_h1() {
        let body = prepped(
            "<body><div id=\"article\"><h1>Title</h1><p>  </p><p>Content line.</p></div></body>",
        );
        let article = body.select_first("#article").unwrap().as_node().clone();
        let ctx = GrabContext::new(GrabFlags::all());
        prep_article(&article, &ctx, &default_options());
        let html = serialize_children(&article);
        assert!(html.contains("<h2>Title</h2>"));
        assert!(!html.contains("<h1>"));
        assert_eq!(collect_nodes(&article, "p").len(), 1);
    }
}
