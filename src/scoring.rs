//! Candidate score bookkeeping for the grabber.

use crate::constants::{GrabFlags, REGEXPS};
use crate::dom_utils::{self, GrabContext};
use kuchikikiki::NodeRef;

/// Class/id weight: ±25 per positive/negative regex match, computed
/// independently for the `class` and `id` attributes. Returns 0 when the
/// attempt runs without class weighting.
pub fn get_class_weight(ctx: &GrabContext, node: &NodeRef) -> f64 {
    if !ctx.flag_is_active(GrabFlags::WEIGHT_CLASSES) {
        return 0.0;
    }

    let mut weight = 0.0;

    if let Some(class) = dom_utils::get_attr(node, "class") {
        if !class.is_empty() {
            if REGEXPS.negative.is_match(&class) {
                weight -= 25.0;
            }
            if REGEXPS.positive.is_match(&class) {
                weight += 25.0;
            }
        }
    }

    if let Some(id) = dom_utils::get_attr(node, "id") {
        if !id.is_empty() {
            if REGEXPS.negative.is_match(&id) {
                weight -= 25.0;
            }
            if REGEXPS.positive.is_match(&id) {
                weight += 25.0;
            }
        }
    }

    weight
}

/// Attach the initial score annotation to a node: a base score by tag plus
/// the class weight.
pub fn initialize_node(ctx: &GrabContext, node: &NodeRef) {
    let base = match dom_utils::tag_name(node).as_deref() {
        Some("div") => 5.0,
        Some("pre") | Some("td") | Some("blockquote") => 3.0,
        Some("address") | Some("ol") | Some("ul") | Some("dl") | Some("dd") | Some("dt")
        | Some("li") | Some("form") => -3.0,
        Some("h1") | Some("h2") | Some("h3") | Some("h4") | Some("h5") | Some("h6")
        | Some("th") => -5.0,
        _ => 0.0,
    };
    ctx.set_score(node, base + get_class_weight(ctx, node));
}

/// Content score contributed by one scored element: a base point, one point
/// per comma-separated chunk, and up to three points for text length.
pub fn content_score_for(inner_text: &str) -> f64 {
    let mut score = 1.0;
    score += REGEXPS.commas.split(inner_text).count() as f64;
    score += (dom_utils::char_len(inner_text) / 100).min(3) as f64;
    score
}
