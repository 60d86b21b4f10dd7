//! The article grabber: repeated scoring passes over the document body that
//! return the best article subtree.
//!
//! Each attempt snapshots the body, prepares and scores nodes, assembles the
//! article around the top candidate, and cleans it. When the result is too
//! short the snapshot is restored, one flag is relaxed, and the whole pass
//! runs again; annotations never survive across attempts.

use crate::cleaner;
use crate::constants::{
    GrabFlags, ALTER_TO_DIV_EXCEPTIONS, DEFAULT_TAGS_TO_SCORE, REGEXPS, UNLIKELY_ROLES,
};
use crate::dom_utils::{self, GrabContext};
use crate::options::ReadabilityOptions;
use crate::scoring;
use crate::utils;
use kuchikikiki::NodeRef;

/// Outcome of a successful grab.
pub struct GrabResult {
    /// The assembled article, owned by the `readability-page-1` wrapper.
    pub article_content: NodeRef,
    /// Byline harvested from the page while preparing nodes.
    pub byline: Option<String>,
    /// First non-empty `dir` attribute from the top candidate's ancestry.
    pub dir: Option<String>,
    /// Character count of the article text.
    pub text_length: usize,
}

struct Attempt {
    article_content: NodeRef,
    text_length: usize,
    dir: Option<String>,
}

/// Extract the main article subtree from a preprocessed document.
///
/// `title` is the already-extracted article title, used to drop a duplicated
/// header; `metadata_has_byline` suppresses byline harvesting when metadata
/// already supplied one.
pub fn grab_article(
    doc: &NodeRef,
    title: &str,
    metadata_has_byline: bool,
    options: &ReadabilityOptions,
) -> Option<GrabResult> {
    let body = dom_utils::document_body(doc);
    if !dom_utils::node_has_tag(&body, "body") {
        return None;
    }

    let page_cache_html = dom_utils::serialize_children(&body);
    let mut flags = GrabFlags::all();
    let mut attempts: Vec<Attempt> = Vec::new();
    let mut article_byline: Option<String> = None;

    loop {
        let ctx = GrabContext::new(flags);
        let (article_content, top_candidate, parent_of_top, needed_to_create) = run_attempt(
            doc,
            &body,
            &ctx,
            title,
            metadata_has_byline,
            &mut article_byline,
            options,
        );

        let dir = extract_direction(&parent_of_top, &top_candidate);
        let text_length =
            dom_utils::char_len(&dom_utils::inner_text(&article_content, true));

        if text_length >= options.char_threshold {
            finish_article(&article_content, &top_candidate, needed_to_create);
            return Some(GrabResult {
                article_content,
                byline: article_byline,
                dir,
                text_length,
            });
        }

        if options.debug {
            eprintln!(
                "Reader: (Readability) attempt produced {} chars with flags {:?}",
                text_length, flags
            );
        }

        finish_article(&article_content, &top_candidate, needed_to_create);
        dom_utils::set_inner_html(&body, &page_cache_html);
        attempts.push(Attempt {
            article_content,
            text_length,
            dir,
        });

        if flags.contains(GrabFlags::STRIP_UNLIKELYS) {
            flags.remove(GrabFlags::STRIP_UNLIKELYS);
        } else if flags.contains(GrabFlags::WEIGHT_CLASSES) {
            flags.remove(GrabFlags::WEIGHT_CLASSES);
        } else if flags.contains(GrabFlags::CLEAN_CONDITIONALLY) {
            flags.remove(GrabFlags::CLEAN_CONDITIONALLY);
        } else {
            // No looser setting left; take the longest attempt if it found
            // anything at all.
            attempts.sort_by(|a, b| b.text_length.cmp(&a.text_length));
            let best = attempts.into_iter().next()?;
            if best.text_length == 0 {
                return None;
            }
            return Some(GrabResult {
                article_content: best.article_content,
                byline: article_byline,
                dir: best.dir,
                text_length: best.text_length,
            });
        }
    }
}

/// One full prepare/score/select/assemble/clean pass. Returns the article
/// div, the top candidate, its original parent, and whether the candidate
/// had to be synthesized.
fn run_attempt(
    doc: &NodeRef,
    body: &NodeRef,
    ctx: &GrabContext,
    title: &str,
    metadata_has_byline: bool,
    article_byline: &mut Option<String>,
    options: &ReadabilityOptions,
) -> (NodeRef, NodeRef, NodeRef, bool) {
    let elements_to_score = prepare_nodes(doc, ctx, title, metadata_has_byline, article_byline);
    ctx.bump();

    let candidates = score_elements(ctx, elements_to_score);
    let top_candidates = select_top_candidates(ctx, candidates, options.nb_top_candidates);

    let mut needed_to_create_top_candidate = false;
    let top_candidate = match top_candidates.first() {
        Some(candidate) if !dom_utils::node_has_tag(candidate, "body") => {
            promote_top_candidate(ctx, candidate.clone(), &top_candidates)
        }
        _ => {
            // Nothing scored; wrap everything in the body and use that.
            needed_to_create_top_candidate = true;
            let wrapper = dom_utils::create_element("div");
            for child in body.children().collect::<Vec<_>>() {
                wrapper.append(child);
            }
            body.append(wrapper.clone());
            scoring::initialize_node(ctx, &wrapper);
            ctx.bump();
            wrapper
        }
    };

    let parent_of_top = top_candidate.parent().unwrap_or_else(|| body.clone());
    let article_content = assemble_article(ctx, &top_candidate, &parent_of_top);
    ctx.bump();

    cleaner::prep_article(&article_content, ctx, options);

    (
        article_content,
        top_candidate,
        parent_of_top,
        needed_to_create_top_candidate,
    )
}

/// Walk the document in order, dropping hidden and unlikely nodes, picking
/// up the byline, and normalizing `<div>`s; returns the scoring queue.
fn prepare_nodes(
    doc: &NodeRef,
    ctx: &GrabContext,
    title: &str,
    metadata_has_byline: bool,
    article_byline: &mut Option<String>,
) -> Vec<NodeRef> {
    let strip_unlikelys = ctx.flag_is_active(GrabFlags::STRIP_UNLIKELYS);
    let mut elements_to_score: Vec<NodeRef> = Vec::new();
    let mut should_remove_title_header = true;

    let mut node_opt = doc
        .select_first("html")
        .ok()
        .map(|n| n.as_node().clone())
        .or_else(|| Some(dom_utils::document_body(doc)));

    while let Some(node) = node_opt {
        let Some(tag) = dom_utils::tag_name(&node) else {
            node_opt = dom_utils::get_next_node(&node, false);
            continue;
        };
        let match_string = dom_utils::match_string(&node);

        if !dom_utils::is_probably_visible(&node) {
            node_opt = dom_utils::remove_and_get_next(&node);
            continue;
        }

        if dom_utils::get_attr(&node, "aria-modal").as_deref() == Some("true")
            && dom_utils::get_attr(&node, "role").as_deref() == Some("dialog")
        {
            node_opt = dom_utils::remove_and_get_next(&node);
            continue;
        }

        if article_byline.is_none() && !metadata_has_byline {
            if let Some(byline) = check_byline(&node, &match_string) {
                *article_byline = Some(byline);
                node_opt = dom_utils::remove_and_get_next(&node);
                continue;
            }
        }

        if should_remove_title_header && header_duplicates_title(&node, &tag, title) {
            should_remove_title_header = false;
            node_opt = dom_utils::remove_and_get_next(&node);
            continue;
        }

        if strip_unlikelys {
            if REGEXPS.unlikely_candidates.is_match(&match_string)
                && !REGEXPS.ok_maybe_its_a_candidate.is_match(&match_string)
                && !dom_utils::has_ancestor_tag(&node, "table", 3, |_| true)
                && !dom_utils::has_ancestor_tag(&node, "code", 3, |_| true)
                && tag != "body"
                && tag != "a"
            {
                node_opt = dom_utils::remove_and_get_next(&node);
                continue;
            }

            if let Some(role) = dom_utils::get_attr(&node, "role") {
                if UNLIKELY_ROLES.contains(&role.as_str()) {
                    node_opt = dom_utils::remove_and_get_next(&node);
                    continue;
                }
            }
        }

        if matches!(
            tag.as_str(),
            "div" | "section" | "header" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
        ) && dom_utils::is_element_without_content(&node)
        {
            node_opt = dom_utils::remove_and_get_next(&node);
            continue;
        }

        if DEFAULT_TAGS_TO_SCORE.contains(&tag.as_str()) {
            elements_to_score.push(node.clone());
        }

        if tag == "div" {
            wrap_phrasing_runs(ctx, &node);

            if dom_utils::has_single_tag_inside_element(&node, "p")
                && dom_utils::get_link_density(&node) < 0.25
            {
                if let Some(paragraph) = dom_utils::first_element_child(&node) {
                    dom_utils::replace_node(&node, &paragraph);
                    elements_to_score.push(paragraph.clone());
                    node_opt = dom_utils::get_next_node(&paragraph, false);
                    continue;
                }
            } else if !dom_utils::has_child_block_element(&node) {
                let paragraph = dom_utils::set_node_tag(&node, "p");
                elements_to_score.push(paragraph.clone());
                node_opt = dom_utils::get_next_node(&paragraph, false);
                continue;
            }
        }

        node_opt = dom_utils::get_next_node(&node, false);
    }

    elements_to_score
}

/// Group runs of phrasing children of a `<div>` into `<p>` wrappers.
fn wrap_phrasing_runs(ctx: &GrabContext, node: &NodeRef) {
    let mut paragraph: Option<NodeRef> = None;
    let mut child_opt = node.first_child();

    while let Some(child) = child_opt {
        let next_sibling = child.next_sibling();

        if ctx.is_phrasing(&child) {
            if let Some(p) = &paragraph {
                p.append(child);
            } else if !dom_utils::is_whitespace(&child) {
                let p = dom_utils::create_element("p");
                dom_utils::replace_node(&child, &p);
                p.append(child);
                paragraph = Some(p);
            }
        } else if let Some(p) = paragraph.take() {
            while let Some(last) = p.last_child() {
                if !dom_utils::is_whitespace(&last) {
                    break;
                }
                last.detach();
            }
        }

        child_opt = next_sibling;
    }
}

fn check_byline(node: &NodeRef, match_string: &str) -> Option<String> {
    let rel_is_author = dom_utils::get_attr(node, "rel").as_deref() == Some("author");
    let itemprop_author = dom_utils::get_attr(node, "itemprop")
        .map(|v| v.contains("author"))
        .unwrap_or(false);

    if rel_is_author || itemprop_author || REGEXPS.byline.is_match(match_string) {
        let text = node.text_contents().trim().to_string();
        let length = dom_utils::char_len(&text);
        if length > 0 && length < 100 {
            return Some(text);
        }
    }
    None
}

fn header_duplicates_title(node: &NodeRef, tag: &str, title: &str) -> bool {
    if tag != "h1" && tag != "h2" {
        return false;
    }
    if title.is_empty() {
        return false;
    }
    utils::text_similarity(title, &dom_utils::inner_text(node, false)) > 0.75
}

/// Score every queued element into its ancestor chain; returns the nodes
/// that received an annotation.
fn score_elements(ctx: &GrabContext, elements_to_score: Vec<NodeRef>) -> Vec<NodeRef> {
    let mut candidates: Vec<NodeRef> = Vec::new();

    for element in elements_to_score {
        let Some(parent) = element.parent() else {
            continue;
        };
        if !dom_utils::is_element(&parent) {
            continue;
        }

        let inner = dom_utils::inner_text(&element, true);
        if dom_utils::char_len(&inner) < 25 {
            continue;
        }

        let ancestors = dom_utils::get_node_ancestors(&element, 5);
        if ancestors.is_empty() {
            continue;
        }

        let content_score = scoring::content_score_for(&inner);

        for (level, ancestor) in ancestors.iter().enumerate() {
            // The root element has no element parent and stays unscored.
            let has_element_parent = ancestor
                .parent()
                .map(|p| dom_utils::is_element(&p))
                .unwrap_or(false);
            if !has_element_parent {
                continue;
            }

            if !ctx.has_score(ancestor) {
                scoring::initialize_node(ctx, ancestor);
                candidates.push(ancestor.clone());
            }

            let divider = match level {
                0 => 1.0,
                1 => 2.0,
                level => (level * 3) as f64,
            };
            ctx.add_score(ancestor, content_score / divider);
        }
    }

    candidates
}

/// Apply the link-density penalty and keep the N best candidates, ordered
/// best first.
fn select_top_candidates(
    ctx: &GrabContext,
    candidates: Vec<NodeRef>,
    nb_top_candidates: usize,
) -> Vec<NodeRef> {
    let mut top_candidates: Vec<NodeRef> = Vec::new();

    for candidate in candidates {
        let score =
            ctx.get_score(&candidate).unwrap_or(0.0) * (1.0 - ctx.link_density(&candidate));
        ctx.set_score(&candidate, score);

        for slot in 0..nb_top_candidates {
            let score_at_slot = top_candidates
                .get(slot)
                .and_then(|c| ctx.get_score(c));
            match score_at_slot {
                None => {
                    top_candidates.insert(slot.min(top_candidates.len()), candidate.clone());
                    break;
                }
                Some(existing) if score > existing => {
                    top_candidates.insert(slot, candidate.clone());
                    if top_candidates.len() > nb_top_candidates {
                        top_candidates.pop();
                    }
                    break;
                }
                Some(_) => {}
            }
        }
    }

    top_candidates
}

/// Walk up from the initial winner looking for a better ancestor: one shared
/// by most other top candidates, one with a rising score, or a lone-child
/// parent chain.
fn promote_top_candidate(
    ctx: &GrabContext,
    mut top_candidate: NodeRef,
    top_candidates: &[NodeRef],
) -> NodeRef {
    const MINIMUM_TOP_CANDIDATES: usize = 3;

    let top_score = ctx.get_score(&top_candidate).unwrap_or(0.0);
    if top_score > 0.0 {
        let alternative_ancestors: Vec<Vec<NodeRef>> = top_candidates
            .iter()
            .skip(1)
            .filter(|candidate| {
                ctx.get_score(candidate).unwrap_or(0.0) / top_score >= 0.75
            })
            .map(|candidate| dom_utils::get_node_ancestors(candidate, 0))
            .collect();

        if alternative_ancestors.len() >= MINIMUM_TOP_CANDIDATES {
            let mut parent_opt = top_candidate.parent();
            while let Some(parent) = parent_opt {
                if !dom_utils::is_element(&parent) || dom_utils::node_has_tag(&parent, "body") {
                    break;
                }
                let lists_containing = alternative_ancestors
                    .iter()
                    .filter(|ancestors| ancestors.contains(&parent))
                    .count();
                if lists_containing >= MINIMUM_TOP_CANDIDATES {
                    top_candidate = parent;
                    break;
                }
                parent_opt = parent.parent();
            }
        }
    }

    if !ctx.has_score(&top_candidate) {
        scoring::initialize_node(ctx, &top_candidate);
    }

    // Prefer an ancestor whose score is still climbing; stop once scores
    // fall off sharply.
    let mut last_score = ctx.get_score(&top_candidate).unwrap_or(0.0);
    let score_threshold = last_score / 3.0;
    let mut parent_opt = top_candidate.parent();
    while let Some(parent) = parent_opt {
        if !dom_utils::is_element(&parent) || dom_utils::node_has_tag(&parent, "body") {
            break;
        }
        let Some(parent_score) = ctx.get_score(&parent) else {
            parent_opt = parent.parent();
            continue;
        };
        if parent_score < score_threshold {
            break;
        }
        if parent_score > last_score {
            top_candidate = parent;
            break;
        }
        last_score = parent_score;
        parent_opt = parent.parent();
    }

    // A candidate that is its parent's only child moves up so siblings can
    // join later.
    let mut parent_opt = top_candidate.parent();
    while let Some(parent) = parent_opt {
        if !dom_utils::is_element(&parent)
            || dom_utils::node_has_tag(&parent, "body")
            || dom_utils::element_children(&parent).len() != 1
        {
            break;
        }
        top_candidate = parent;
        parent_opt = top_candidate.parent();
    }

    if !ctx.has_score(&top_candidate) {
        scoring::initialize_node(ctx, &top_candidate);
    }

    top_candidate
}

/// Gather the top candidate and any siblings that look like they belong to
/// the same article into a fresh `<div>`.
fn assemble_article(
    ctx: &GrabContext,
    top_candidate: &NodeRef,
    parent_of_top: &NodeRef,
) -> NodeRef {
    let article_content = dom_utils::create_element("div");
    let top_score = ctx.get_score(top_candidate).unwrap_or(0.0);
    let sibling_score_threshold = (top_score * 0.2).max(10.0);
    let top_class = dom_utils::get_attr(top_candidate, "class").unwrap_or_default();

    for sibling in dom_utils::element_children(parent_of_top) {
        let mut append = sibling == *top_candidate;

        if !append {
            let mut content_bonus = 0.0;
            if !top_class.is_empty()
                && dom_utils::get_attr(&sibling, "class").as_deref() == Some(top_class.as_str())
            {
                content_bonus += top_score * 0.2;
            }

            if let Some(sibling_score) = ctx.get_score(&sibling) {
                if sibling_score + content_bonus >= sibling_score_threshold {
                    append = true;
                }
            }

            if !append && dom_utils::node_has_tag(&sibling, "p") {
                let link_density = ctx.link_density(&sibling);
                let node_content = dom_utils::inner_text(&sibling, true);
                let node_length = dom_utils::char_len(&node_content);

                if node_length > 80 && link_density < 0.25 {
                    append = true;
                } else if node_length < 80
                    && node_length > 0
                    && link_density == 0.0
                    && REGEXPS.sentence_dot.is_match(&node_content)
                {
                    append = true;
                }
            }
        }

        if append {
            let sibling = if dom_utils::tag_name(&sibling)
                .map(|tag| ALTER_TO_DIV_EXCEPTIONS.contains(&tag.as_str()))
                .unwrap_or(false)
            {
                sibling
            } else {
                dom_utils::set_node_tag(&sibling, "div")
            };
            article_content.append(sibling);
        }
    }

    article_content
}

/// Give the article its `readability-page-1` wrapper.
fn finish_article(article_content: &NodeRef, top_candidate: &NodeRef, needed_to_create: bool) {
    if needed_to_create {
        dom_utils::set_attr(top_candidate, "id", "readability-page-1");
        dom_utils::set_attr(top_candidate, "class", "page");
    } else {
        let wrapper = dom_utils::create_element("div");
        dom_utils::set_attr(&wrapper, "id", "readability-page-1");
        dom_utils::set_attr(&wrapper, "class", "page");
        for child in article_content.children().collect::<Vec<_>>() {
            wrapper.append(child);
        }
        article_content.append(wrapper);
    }
}

/// First non-empty `dir` attribute walking the candidate's ancestry.
fn extract_direction(parent_of_top: &NodeRef, top_candidate: &NodeRef) -> Option<String> {
    let mut chain = vec![parent_of_top.clone(), top_candidate.clone()];
    chain.extend(dom_utils::get_node_ancestors(parent_of_top, 0));

    for node in chain {
        if let Some(dir) = dom_utils::get_attr(&node, "dir") {
            if !dir.is_empty() {
                return Some(dir);
            }
        }
    }
    None
}
