//! Shared regex tables, tag sets, and flag definitions used across the
//! extraction pipeline.

use bitflags::bitflags;
use once_cell::sync::Lazy;
use regex::Regex;

bitflags! {
    /// Flags controlling how aggressive a single grab attempt is.
    ///
    /// All three start enabled; each retry drops one, in declaration order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GrabFlags: u8 {
        const STRIP_UNLIKELYS = 0x1;
        const WEIGHT_CLASSES = 0x2;
        const CLEAN_CONDITIONALLY = 0x4;
    }
}

/// Elements that seed the scoring queue directly.
pub const DEFAULT_TAGS_TO_SCORE: [&str; 9] =
    ["section", "h2", "h3", "h4", "h5", "h6", "p", "td", "pre"];

/// Block-level elements that stop a `<div>` from being downgraded to `<p>`.
pub const DIV_TO_P_ELEMS: [&str; 9] = [
    "blockquote", "dl", "div", "img", "ol", "p", "pre", "table", "ul",
];

/// Tags that survive sibling aggregation without being renamed to `<div>`.
pub const ALTER_TO_DIV_EXCEPTIONS: [&str; 6] = ["div", "article", "section", "p", "ol", "ul"];

/// Attributes stripped during the presentational cleanup pass.
pub const PRESENTATIONAL_ATTRIBUTES: [&str; 12] = [
    "align",
    "background",
    "bgcolor",
    "border",
    "cellpadding",
    "cellspacing",
    "frame",
    "hspace",
    "rules",
    "style",
    "valign",
    "vspace",
];

/// Elements that additionally lose their `width`/`height` attributes.
pub const DEPRECATED_SIZE_ATTRIBUTE_ELEMS: [&str; 5] = ["table", "th", "td", "hr", "pre"];

/// The HTML phrasing-content whitelist. `a`, `del`, and `ins` are phrasing
/// only when every child is phrasing; see `dom_utils::is_phrasing_content`.
pub const PHRASING_ELEMS: [&str; 39] = [
    "abbr", "audio", "b", "bdo", "br", "button", "cite", "code", "data", "datalist", "dfn", "em",
    "embed", "i", "img", "input", "kbd", "label", "mark", "math", "meter", "noscript", "object",
    "output", "progress", "q", "ruby", "samp", "script", "select", "small", "span", "strong",
    "sub", "sup", "textarea", "time", "var", "wbr",
];

/// ARIA roles that disqualify an element during the unlikely-candidate pass.
pub const UNLIKELY_ROLES: [&str; 7] = [
    "menu",
    "menubar",
    "complementary",
    "navigation",
    "alert",
    "alertdialog",
    "dialog",
];

/// Classes kept by the class-stripping pass regardless of configuration.
pub const CLASSES_TO_PRESERVE: [&str; 1] = ["page"];

/// Minimum final text length before the grabber relaxes a flag and retries.
pub const DEFAULT_CHAR_THRESHOLD: usize = 500;

/// Number of scored candidates kept when picking the top candidate.
pub const DEFAULT_N_TOP_CANDIDATES: usize = 5;

/// Compiled regular expressions for the content heuristics.
pub struct Regexps {
    pub unlikely_candidates: Regex,
    pub ok_maybe_its_a_candidate: Regex,
    pub positive: Regex,
    pub negative: Regex,
    pub byline: Regex,
    pub videos: Regex,
    pub share_elements: Regex,
    pub normalize: Regex,
    pub whitespace: Regex,
    pub has_content: Regex,
    pub hash_url: Regex,
    pub srcset_url: Regex,
    pub b64_data_url: Regex,
    pub commas: Regex,
    pub json_ld_article_types: Regex,
    pub schema_org_url: Regex,
    pub ad_words: Regex,
    pub loading_words: Regex,
    pub tokenize: Regex,
    pub img_extensions: Regex,
    pub srcset_candidate: Regex,
    pub src_candidate: Regex,
    pub sentence_dot: Regex,
    pub title_separators: Regex,
    pub title_hierarchical_separators: Regex,
    pub title_separator_run: Regex,
    pub meta_property: Regex,
    pub meta_name: Regex,
}

impl Regexps {
    fn new() -> Self {
        Self {
            unlikely_candidates: Regex::new(
                r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote"
            ).unwrap(),

            ok_maybe_its_a_candidate: Regex::new(
                r"(?i)and|article|body|column|content|main|mathjax|shadow"
            ).unwrap(),

            positive: Regex::new(
                r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story"
            ).unwrap(),

            negative: Regex::new(
                r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|footer|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|widget"
            ).unwrap(),

            byline: Regex::new(
                r"(?i)byline|author|dateline|writtenby|p-author"
            ).unwrap(),

            videos: Regex::new(
                r"(?i)//(www\.)?((dailymotion|youtube|youtube-nocookie|player\.vimeo|v\.qq|bilibili|live\.bilibili)\.com|(archive|upload\.wikimedia)\.org|player\.twitch\.tv)"
            ).unwrap(),

            share_elements: Regex::new(
                r"(\b|_)(share|sharedaddy)(\b|_)"
            ).unwrap(),

            normalize: Regex::new(r"\s{2,}").unwrap(),

            whitespace: Regex::new(r"^\s*$").unwrap(),

            has_content: Regex::new(r"\S").unwrap(),

            hash_url: Regex::new(r"^#.+").unwrap(),

            srcset_url: Regex::new(r"(\S+)(\s+[\d.]+[xw])?(\s*(?:,|$))").unwrap(),

            b64_data_url: Regex::new(r"(?i)^data:\s*([^\s;,]+)\s*;\s*base64\s*,").unwrap(),

            // Commas as used in Latin, Sindhi, Chinese and various other scripts
            commas: Regex::new(
                r"\u{002C}|\u{060C}|\u{FE50}|\u{FE10}|\u{FE11}|\u{2E41}|\u{2E34}|\u{2E32}|\u{FF0C}"
            ).unwrap(),

            // Schema.org Article types
            json_ld_article_types: Regex::new(
                r"^Article|AdvertiserContentArticle|NewsArticle|AnalysisNewsArticle|AskPublicNewsArticle|BackgroundNewsArticle|OpinionNewsArticle|ReportageNewsArticle|ReviewNewsArticle|Report|SatiricalArticle|ScholarlyArticle|MedicalScholarlyArticle|SocialMediaPosting|BlogPosting|LiveBlogPosting|DiscussionForumPosting|TechArticle|APIReference$"
            ).unwrap(),

            schema_org_url: Regex::new(r"(?i)^https?://schema\.org/?$").unwrap(),

            // Words commonly used for ad blocks or loading indicators
            ad_words: Regex::new(
                r"(?i)^(ad(vertising|vertisement)?|pub(licité)?|werb(ung)?|广告|Реклама|Anuncio)$"
            ).unwrap(),

            loading_words: Regex::new(
                r"(?i)^((loading|正在加载|Загрузка|chargement|cargando)(…|\.\.\.)?)$"
            ).unwrap(),

            // ASCII word boundary; the crate-level \W is Unicode-aware
            tokenize: Regex::new(r"[^0-9A-Za-z_]+").unwrap(),

            img_extensions: Regex::new(r"(?i)\.(jpg|jpeg|png|webp)").unwrap(),

            srcset_candidate: Regex::new(r"(?i)\.(jpg|jpeg|png|webp)\s+\d").unwrap(),

            src_candidate: Regex::new(r"(?i)^\s*\S+\.(jpg|jpeg|png|webp)\S*\s*$").unwrap(),

            sentence_dot: Regex::new(r"\.( |$)").unwrap(),

            title_separators: Regex::new(r" [\|\-\\/>»–—] ").unwrap(),

            title_hierarchical_separators: Regex::new(r" [\\/>»] ").unwrap(),

            title_separator_run: Regex::new(r"[\|\-\\/>»–—]+").unwrap(),

            meta_property: Regex::new(
                r"(?i)\s*(article|dc|dcterm|og|twitter)\s*:\s*(author|creator|description|published_time|title|site_name)\s*"
            ).unwrap(),

            meta_name: Regex::new(
                r"(?i)^\s*(?:(?:dc|dcterm|og|twitter|parsely|weibo:(?:article|webpage))\s*[-\.:]\s*)?(author|creator|pub-date|description|title|site_name)\s*$"
            ).unwrap(),
        }
    }
}

/// Global regex table, compiled once and shared across extractions.
pub static REGEXPS: Lazy<Regexps> = Lazy::new(Regexps::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlikely_candidates_needs_counter_match() {
        assert!(REGEXPS.unlikely_candidates.is_match("sidebar-ad navigation"));
        assert!(REGEXPS.ok_maybe_its_a_candidate.is_match("article-body"));
        assert!(!REGEXPS.unlikely_candidates.is_match("prose"));
    }

    #[test]
    fn video_hosts_match() {
        assert!(REGEXPS.videos.is_match("https://www.youtube.com/embed/xyz"));
        assert!(REGEXPS.videos.is_match("//player.vimeo.com/video/123"));
        assert!(!REGEXPS.videos.is_match("https://example.com/video.mp4"));
    }

    #[test]
    fn comma_class_covers_fullwidth_comma() {
        assert_eq!(REGEXPS.commas.find_iter("a,b，c、d").count(), 2);
    }

    #[test]
    fn ad_words_are_anchored() {
        assert!(REGEXPS.ad_words.is_match("Advertisement"));
        assert!(REGEXPS.ad_words.is_match("广告"));
        assert!(!REGEXPS.ad_words.is_match("advertisement disclosure policy"));
    }

    #[test]
    fn title_separator_detection() {
        assert!(REGEXPS.title_separators.is_match("Headline | Site"));
        assert!(REGEXPS.title_separators.is_match("Headline – Site"));
        assert!(REGEXPS.title_hierarchical_separators.is_match("A / B"));
        assert!(!REGEXPS.title_hierarchical_separators.is_match("A - B"));
    }
}
