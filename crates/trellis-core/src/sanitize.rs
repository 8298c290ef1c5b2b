//! Allow-lists for HTML that arrives through translations.
//!
//! Translated ICU content is untrusted. Elements and attributes outside
//! these lists are dropped, and URL-valued attributes are neutralized
//! when their scheme is not safe.

const VALID_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "address", "area", "article", "aside", "audio", "b", "bdi", "bdo",
    "big", "blockquote", "br", "caption", "center", "cite", "code", "col", "colgroup", "dd", "del",
    "details", "dfn", "dialog", "dir", "div", "dl", "dt", "em", "figcaption", "figure", "font",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "i", "img", "ins",
    "kbd", "label", "li", "main", "map", "mark", "menu", "nav", "ol", "p", "picture", "pre", "q",
    "rp", "rt", "ruby", "s", "samp", "section", "small", "source", "span", "strike", "strong",
    "sub", "summary", "sup", "table", "tbody", "td", "tfoot", "th", "thead", "time", "tr", "track",
    "tt", "u", "ul", "var", "video", "wbr",
];

const URI_ATTRS: &[&str] = &[
    "background", "cite", "href", "itemtype", "longdesc", "poster", "src", "xlink:href",
];

const HTML_ATTRS: &[&str] = &[
    "abbr", "accesskey", "align", "alt", "autoplay", "axis", "bgcolor", "border", "cellpadding",
    "cellspacing", "class", "clear", "color", "cols", "colspan", "compact", "controls", "coords",
    "datetime", "default", "dir", "download", "face", "headers", "height", "hidden", "hreflang",
    "hspace", "id", "ismap", "itemprop", "itemscope", "kind", "label", "lang", "language", "loop",
    "media", "muted", "nohref", "nowrap", "open", "preload", "rel", "rev", "role", "rows",
    "rowspan", "rules", "scope", "scrolling", "shape", "size", "sizes", "span", "srclang",
    "srcset", "start", "summary", "tabindex", "target", "title", "translate", "type", "usemap",
    "valign", "value", "vspace", "width",
];

/// Sanitizer attached to an attribute write in an update tape.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sanitizer {
    Url,
}

impl Sanitizer {
    pub fn name(self) -> &'static str {
        match self {
            Self::Url => "url",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "url" => Some(Self::Url),
            _ => None,
        }
    }

    pub fn apply(self, value: &str) -> String {
        match self {
            Self::Url => sanitize_url(value),
        }
    }
}

pub fn is_valid_element(tag: &str) -> bool {
    VALID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn is_uri_attribute(name: &str) -> bool {
    URI_ATTRS.contains(&name.to_ascii_lowercase().as_str())
}

/// Attributes allowed on translated elements.
pub fn is_valid_attribute(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("aria-") || HTML_ATTRS.contains(&name.as_str()) || URI_ATTRS.contains(&name.as_str())
}

/// Whether a URL may be written as-is.
///
/// Relative URLs are safe. Absolute URLs are safe unless their scheme is
/// script-bearing.
pub fn is_safe_url(url: &str) -> bool {
    let url = url.trim();
    let scheme_end = url.find(':');
    let path_start = url.find(['/', '?', '#']);
    let Some(colon) = scheme_end else {
        return true;
    };
    if path_start.is_some_and(|p| p < colon) {
        return true;
    }
    let scheme = &url[..colon];
    let well_formed = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'));
    well_formed && !matches!(scheme.to_ascii_lowercase().as_str(), "javascript" | "vbscript")
}

pub fn sanitize_url(url: &str) -> String {
    if is_safe_url(url) {
        url.to_string()
    } else {
        tracing::warn!(url, "unsafe URL value neutralized");
        format!("unsafe:{url}")
    }
}
