//! Safe rendering of turn content.
//!
//! Bot replies mix markdown with raw inline HTML. Markdown goes through
//! pulldown-cmark; raw HTML is kept (not escaped to text) but bounded by a
//! tag and attribute allowlist. On top of that every rendering applies the
//! same display policy:
//!
//! - links open in a new browsing context without referrer or opener,
//! - images never exceed a maximum width,
//! - horizontal rules get extra vertical spacing.

use std::fmt::Write as _;
use std::sync::OnceLock;

use pulldown_cmark::{html, Event, LinkType, Options, Parser, Tag, TagEnd};
use regex::Regex;

use crate::state::{Role, Turn};

/// Tags raw HTML may use. Anything else is shown as literal text.
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "del", "div", "em", "h1", "h2", "h3", "h4", "h5",
    "h6", "hr", "i", "img", "li", "ol", "p", "pre", "s", "small", "span", "strong", "sub",
    "sup", "table", "tbody", "td", "th", "thead", "tr", "u", "ul",
];

/// Tags removed together with everything inside them.
const DROPPED_WITH_CONTENT: &[&str] = &[
    "iframe", "noscript", "object", "script", "style", "template", "textarea",
];

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

const BLOCK_TAGS: &[&str] = &[
    "blockquote", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ol", "p", "pre", "table",
    "tr", "ul",
];

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

/// Longest alt text shown in an image placeholder.
const IMAGE_ALT_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub image_max_width_px: u32,
    pub rule_margin_px: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            image_max_width_px: 200,
            rule_margin_px: 20,
        }
    }
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
            .expect("tag pattern is valid")
    })
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("attribute pattern is valid")
    })
}

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"&(?:#[xX]([0-9A-Fa-f]+)|#([0-9]+)|([A-Za-z]+));?").expect("entity pattern is valid")
    })
}

/// Stateful filter for raw HTML chunks.
///
/// pulldown-cmark hands inline HTML over one tag at a time, so the sanitizer
/// remembers whether it is inside a dropped element (`<script>` and friends)
/// across calls. Text that arrives as markdown while skipping must be dropped
/// by the caller; see [`HtmlSanitizer::is_skipping`].
///
/// Elements opened by [`HtmlSanitizer::clean`] are tracked so a closing tag
/// can only close something the fragment itself opened. Markdown containers
/// bracket their content with [`enter`](HtmlSanitizer::enter) and
/// [`leave`](HtmlSanitizer::leave); raw elements left open inside one are
/// closed when it ends.
///
/// The default sanitizer is enough for [`HtmlSanitizer::text`], which ignores
/// the render options.
#[derive(Debug, Clone, Default)]
pub struct HtmlSanitizer {
    options: RenderOptions,
    skip_depth: usize,
    open_links: Vec<String>,
    open_elements: Vec<String>,
    marks: Vec<usize>,
}

impl HtmlSanitizer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn is_skipping(&self) -> bool {
        self.skip_depth > 0
    }

    /// Open a markdown container; closing tags can't reach past this point.
    pub fn enter(&mut self) {
        self.marks.push(self.open_elements.len());
    }

    /// Close the container opened by the matching [`enter`](Self::enter),
    /// returning end tags for raw elements still open inside it.
    pub fn leave(&mut self) -> String {
        let mark = self.marks.pop().unwrap_or(0);
        self.close_to(mark)
    }

    /// End tags for every raw element still open.
    pub fn finish(&mut self) -> String {
        self.marks.clear();
        self.close_to(0)
    }

    /// Clean a raw HTML fragment, keeping allowlisted markup.
    pub fn clean(&mut self, fragment: &str) -> String {
        let mut out = String::with_capacity(fragment.len());
        let mut last = 0;

        for caps in tag_pattern().captures_iter(fragment) {
            let Some(whole) = caps.get(0) else { continue };
            self.push_escaped(&mut out, &fragment[last..whole.start()]);
            last = whole.end();

            // Comments have no tag name and are dropped
            let Some(name) = caps.get(2) else { continue };
            let name = name.as_str().to_ascii_lowercase();
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let attrs = caps.get(3).map_or("", |m| m.as_str());

            if self.track_dropped(&name, closing, attrs) || self.is_skipping() {
                continue;
            }

            if !ALLOWED_TAGS.contains(&name.as_str()) {
                out.push_str(&escape_angles(whole.as_str()));
                continue;
            }

            if VOID_TAGS.contains(&name.as_str()) {
                if !closing {
                    out.push_str(&self.open_tag(&name, attrs));
                }
            } else if closing {
                // Stray closers would break out of the surrounding markup
                out.push_str(&self.close_element(&name));
            } else {
                out.push_str(&self.open_tag(&name, attrs));
                self.open_elements.push(name);
            }
        }

        self.push_escaped(&mut out, &fragment[last..]);
        out
    }

    /// Reduce a raw HTML fragment to plain text for a terminal.
    ///
    /// Line breaks follow block structure, links keep their target after the
    /// label and images become a bounded placeholder.
    pub fn text(&mut self, fragment: &str) -> String {
        let mut out = String::new();
        let mut last = 0;

        for caps in tag_pattern().captures_iter(fragment) {
            let Some(whole) = caps.get(0) else { continue };
            if !self.is_skipping() {
                out.push_str(&decode_entities(&fragment[last..whole.start()]));
            }
            last = whole.end();

            let Some(name) = caps.get(2) else { continue };
            let name = name.as_str().to_ascii_lowercase();
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let attrs = caps.get(3).map_or("", |m| m.as_str());

            if self.track_dropped(&name, closing, attrs) || self.is_skipping() {
                continue;
            }

            match (name.as_str(), closing) {
                ("br", _) => out.push('\n'),
                ("hr", false) => out.push_str("\n\n---\n\n"),
                ("img", false) => {
                    let alt = attribute_value(attrs, "alt").unwrap_or_default();
                    out.push_str(&image_placeholder(&decode_entities(&alt)));
                }
                ("a", false) => {
                    let href = attribute_value(attrs, "href")
                        .filter(|href| url_allowed("a", href))
                        .unwrap_or_default();
                    self.open_links.push(decode_entities(&href));
                }
                ("a", true) => {
                    if let Some(href) = self.open_links.pop() {
                        if !href.is_empty() {
                            let _ = write!(out, " ({href})");
                        }
                    }
                }
                ("li", false) => out.push_str("• "),
                (tag, true) if BLOCK_TAGS.contains(&tag) => out.push('\n'),
                _ => {}
            }
        }

        if !self.is_skipping() {
            out.push_str(&decode_entities(&fragment[last..]));
        }
        out
    }

    /// Close `name` and anything opened after it, if it is open in the
    /// current container.
    fn close_element(&mut self, name: &str) -> String {
        let floor = self.marks.last().copied().unwrap_or(0);
        let found = self
            .open_elements
            .get(floor..)
            .and_then(|open| open.iter().rposition(|tag| tag == name));

        match found {
            Some(pos) => self.close_to(floor + pos),
            None => String::new(),
        }
    }

    fn close_to(&mut self, depth: usize) -> String {
        let mut out = String::new();
        while self.open_elements.len() > depth {
            if let Some(name) = self.open_elements.pop() {
                let _ = write!(out, "</{name}>");
            }
        }
        out
    }

    /// Returns `true` when the tag opened or closed a dropped element.
    fn track_dropped(&mut self, name: &str, closing: bool, attrs: &str) -> bool {
        if !DROPPED_WITH_CONTENT.contains(&name) {
            return false;
        }
        if closing {
            self.skip_depth = self.skip_depth.saturating_sub(1);
        } else if !attrs.trim_end().ends_with('/') {
            self.skip_depth += 1;
        }
        true
    }

    fn push_escaped(&self, out: &mut String, text: &str) {
        if !self.is_skipping() {
            out.push_str(&escape_angles(text));
        }
    }

    fn open_tag(&self, name: &str, attrs: &str) -> String {
        let mut tag = format!("<{name}");

        for caps in attribute_pattern().captures_iter(attrs) {
            let Some(attr) = caps.get(1) else { continue };
            let attr = attr.as_str().to_ascii_lowercase();
            if !attribute_allowed(name, &attr) {
                continue;
            }

            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str());

            match value {
                Some(value) => {
                    if matches!(attr.as_str(), "href" | "src") && !url_allowed(name, value) {
                        continue;
                    }
                    // Source values are already HTML-encoded; only re-quote them.
                    let _ = write!(tag, " {attr}=\"{}\"", escape_angles(value).replace('"', "&quot;"));
                }
                None => {
                    if !matches!(attr.as_str(), "href" | "src") {
                        let _ = write!(tag, " {attr}");
                    }
                }
            }
        }

        tag.push_str(&policy_attributes(name, &self.options));
        tag.push_str(if VOID_TAGS.contains(&name) { " />" } else { ">" });
        tag
    }
}

fn attribute_allowed(tag: &str, attr: &str) -> bool {
    if attr == "title" {
        return true;
    }
    let allowed: &[&str] = match tag {
        "a" => &["href"],
        "img" => &["src", "alt", "width", "height"],
        "td" | "th" => &["colspan", "rowspan", "align"],
        "ol" => &["start"],
        _ => &[],
    };
    allowed.contains(&attr)
}

/// Attributes forced onto a tag regardless of what the source said.
fn policy_attributes(tag: &str, options: &RenderOptions) -> String {
    match tag {
        "a" => " target=\"_blank\" rel=\"noopener noreferrer\"".to_string(),
        "img" => format!(" style=\"max-width: {}px\"", options.image_max_width_px),
        "hr" => format!(
            " style=\"margin-top: {m}px; margin-bottom: {m}px\"",
            m = options.rule_margin_px
        ),
        _ => String::new(),
    }
}

/// Relative URLs and a small set of schemes pass; `data:` only for images.
fn url_allowed(tag: &str, raw: &str) -> bool {
    let url: String = decode_entities(raw)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let Some(colon) = url.find(':') else {
        return true;
    };
    if url[..colon].contains(['/', '?', '#']) {
        return true;
    }

    let scheme = &url[..colon];
    if ALLOWED_SCHEMES.contains(&scheme) {
        return true;
    }
    tag == "img" && scheme == "data" && url[colon + 1..].starts_with("image/")
}

fn attribute_value(attrs: &str, wanted: &str) -> Option<String> {
    attribute_pattern().captures_iter(attrs).find_map(|caps| {
        let name = caps.get(1)?;
        if !name.as_str().eq_ignore_ascii_case(wanted) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().to_string())
    })
}

fn escape_angles(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode character references; unknown named entities are left alone.
pub fn decode_entities(text: &str) -> String {
    entity_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            let decoded = if let Some(hex) = caps.get(1) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = caps.get(2) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else {
                caps.get(3).and_then(|name| match name.as_str() {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    "colon" => Some(':'),
                    "Tab" => Some('\t'),
                    "NewLine" => Some('\n'),
                    _ => None,
                })
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

/// Terminal stand-in for an image, bounded in width.
pub fn image_placeholder(alt: &str) -> String {
    let alt = alt.trim();
    if alt.is_empty() {
        return "[image]".to_string();
    }
    if alt.chars().count() > IMAGE_ALT_MAX_CHARS {
        let truncated: String = alt.chars().take(IMAGE_ALT_MAX_CHARS - 1).collect();
        format!("[image: {truncated}…]")
    } else {
        format!("[image: {alt}]")
    }
}

pub fn markdown_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts
}

struct PendingImage {
    src: String,
    title: String,
    alt: String,
}

/// Render one turn's content (markdown plus inline HTML) to a safe fragment.
pub fn render_html(content: &str, options: &RenderOptions) -> String {
    let mut sanitizer = HtmlSanitizer::new(*options);
    let mut events: Vec<Event> = Vec::new();
    let mut html_block = String::new();
    let mut in_html_block = false;
    let mut image: Option<PendingImage> = None;

    for event in Parser::new_ext(content, markdown_options()) {
        // Image alt text arrives as child events; collect it into the tag.
        if let Some(pending) = image.as_mut() {
            match event {
                Event::End(TagEnd::Image) => {
                    if let Some(done) = image.take() {
                        events.push(Event::InlineHtml(image_tag(&done, options).into()));
                    }
                }
                Event::Text(text) | Event::Code(text) => pending.alt.push_str(&text),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::HtmlBlock) => in_html_block = true,
            Event::End(TagEnd::HtmlBlock) => {
                in_html_block = false;
                let cleaned = sanitizer.clean(&std::mem::take(&mut html_block));
                events.push(Event::Html(cleaned.into()));
            }
            Event::Html(raw) if in_html_block => html_block.push_str(&raw),
            Event::Html(raw) | Event::InlineHtml(raw) => {
                events.push(Event::InlineHtml(sanitizer.clean(&raw).into()));
            }
            Event::Text(_) | Event::Code(_) if sanitizer.is_skipping() => {}
            Event::Start(Tag::Image { dest_url, title, .. }) => {
                image = Some(PendingImage {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Event::End(TagEnd::Image) => {}
            Event::Start(Tag::Link { link_type, dest_url, title, .. }) => {
                let href = if link_type == LinkType::Email {
                    format!("mailto:{dest_url}")
                } else {
                    dest_url.to_string()
                };
                sanitizer.enter();
                events.push(Event::InlineHtml(anchor_tag(&href, &title, options).into()));
            }
            Event::End(TagEnd::Link) => {
                let closers = sanitizer.leave();
                events.push(Event::InlineHtml(format!("{closers}</a>").into()));
            }
            Event::Rule => {
                let rule = format!("<hr{} />\n", policy_attributes("hr", options));
                events.push(Event::Html(rule.into()));
            }
            Event::Start(tag) => {
                sanitizer.enter();
                events.push(Event::Start(tag));
            }
            Event::End(tag) => {
                let closers = sanitizer.leave();
                if !closers.is_empty() {
                    events.push(Event::InlineHtml(closers.into()));
                }
                events.push(Event::End(tag));
            }
            other => events.push(other),
        }
    }

    let closers = sanitizer.finish();
    if !closers.is_empty() {
        events.push(Event::Html(closers.into()));
    }

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

fn anchor_tag(href: &str, title: &str, options: &RenderOptions) -> String {
    let mut tag = String::from("<a");
    if url_allowed("a", href) {
        let _ = write!(tag, " href=\"{}\"", escape_attr(href));
    }
    if !title.is_empty() {
        let _ = write!(tag, " title=\"{}\"", escape_attr(title));
    }
    tag.push_str(&policy_attributes("a", options));
    tag.push('>');
    tag
}

fn image_tag(image: &PendingImage, options: &RenderOptions) -> String {
    let mut tag = String::from("<img");
    if url_allowed("img", &image.src) {
        let _ = write!(tag, " src=\"{}\"", escape_attr(&image.src));
    }
    let _ = write!(tag, " alt=\"{}\"", escape_attr(&image.alt));
    if !image.title.is_empty() {
        let _ = write!(tag, " title=\"{}\"", escape_attr(&image.title));
    }
    tag.push_str(&policy_attributes("img", options));
    tag.push_str(" />");
    tag
}

/// Standalone HTML document of the displayable turns.
pub fn render_transcript_html<'a, I>(turns: I, title: &str, options: &RenderOptions) -> String
where
    I: IntoIterator<Item = &'a Turn>,
{
    let mut doc = String::new();
    let _ = write!(
        doc,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n",
        escape_attr(title)
    );

    for turn in turns.into_iter().filter(|turn| turn.is_displayable()) {
        let class = match turn.role {
            Role::User => "turn user",
            Role::Bot => "turn bot",
        };
        let _ = write!(
            doc,
            "<div class=\"{class}\">\n{}</div>\n",
            render_html(&turn.content, options)
        );
    }

    doc.push_str("</body>\n</html>\n");
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(content: &str) -> String {
        render_html(content, &RenderOptions::default())
    }

    #[test]
    fn test_markdown_link_opens_in_new_context() {
        let html = render("See [the shop](https://shop.example/item?id=1&x=2)");
        assert!(html.contains(
            r#"<a href="https://shop.example/item?id=1&amp;x=2" target="_blank" rel="noopener noreferrer">the shop</a>"#
        ));
    }

    #[test]
    fn test_raw_anchor_target_and_rel_are_replaced() {
        let html = render(r#"Pay <a href="https://pay.example" target="_self" rel="opener">here</a>"#);
        assert!(html.contains(
            r#"<a href="https://pay.example" target="_blank" rel="noopener noreferrer">here</a>"#
        ));
        assert!(!html.contains("_self"));
    }

    #[test]
    fn test_markdown_image_is_bounded() {
        let html = render("![Red sneaker](https://cdn.example/shoe.png)");
        assert!(html.contains(
            r#"<img src="https://cdn.example/shoe.png" alt="Red sneaker" style="max-width: 200px" />"#
        ));
    }

    #[test]
    fn test_raw_image_style_is_replaced() {
        let html = render(r#"<img src="https://cdn.example/a.png" style="width: 4000px" onerror="x()">"#);
        assert!(html.contains(r#"style="max-width: 200px""#));
        assert!(!html.contains("4000px"));
        assert!(!html.contains("onerror"));
    }

    #[test]
    fn test_image_width_follows_options() {
        let options = RenderOptions {
            image_max_width_px: 120,
            ..RenderOptions::default()
        };
        let html = render_html("![a](b.png)", &options);
        assert!(html.contains("max-width: 120px"));
    }

    #[test]
    fn test_rules_get_vertical_spacing() {
        let markdown = render("one\n\n---\n\ntwo");
        assert!(markdown.contains(r#"<hr style="margin-top: 20px; margin-bottom: 20px" />"#));

        let raw = render("one <hr> two");
        assert!(raw.contains(r#"<hr style="margin-top: 20px; margin-bottom: 20px" />"#));
    }

    #[test]
    fn test_raw_html_is_rendered_not_escaped() {
        let html = render("<b>Total:</b> 12 USDC<br>Thanks");
        assert!(html.contains("<b>Total:</b> 12 USDC<br />Thanks"));
    }

    #[test]
    fn test_html_block_is_cleaned_as_a_whole() {
        let html = render("<div>\n<p onclick=\"steal()\">Order\nplaced</p>\n</div>\n");
        assert!(html.contains("<div>"));
        assert!(html.contains("<p>Order\nplaced</p>"));
        assert!(!html.contains("onclick"));
    }

    #[test]
    fn test_script_blocks_are_dropped_with_content() {
        let block = render("<script>\nalert(1)\n</script>\n\nafter");
        assert!(!block.contains("alert"));
        assert!(block.contains("after"));

        let inline = render("before <script>alert(1)</script> after");
        assert!(!inline.contains("alert"));
        assert!(inline.contains("before"));
        assert!(inline.contains("after"));
    }

    #[test]
    fn test_unknown_tags_become_text() {
        let html = render("<marquee>sale</marquee>");
        assert!(html.contains("&lt;marquee&gt;sale&lt;/marquee&gt;"));
    }

    #[test]
    fn test_dangerous_urls_are_removed() {
        let html = render(r#"<a href="javascript:alert(1)">x</a> [y](JaVaScRiPt:alert(2)) <a href="java&#115;cript&#58;alert(3)">z</a>"#);
        assert!(!html.to_lowercase().contains("javascript"));
        assert!(!html.contains("&#58;alert"));
        assert_eq!(html.matches("rel=\"noopener noreferrer\"").count(), 3);
    }

    #[test]
    fn test_relative_and_mail_links_are_kept() {
        assert!(render("[cart](/cart)").contains(r#"href="/cart""#));
        assert!(render("<help@shop.example>").contains(r#"href="mailto:help@shop.example""#));
    }

    #[test]
    fn test_data_urls_only_for_images() {
        assert!(render(r#"<img src="data:image/png;base64,AAAA">"#).contains("data:image/png"));
        assert!(!render(r#"<a href="data:text/html,hi">x</a>"#).contains("data:"));
    }

    #[test]
    fn test_stray_closing_tags_are_dropped() {
        let html = render("Done</div></p> here");
        assert_eq!(html, "<p>Done here</p>\n");
    }

    #[test]
    fn test_unclosed_raw_elements_are_closed_with_their_block() {
        assert_eq!(render("Hi <b>bold\n\nnext"), "<p>Hi <b>bold</b></p>\n<p>next</p>\n");
        assert_eq!(render("<b><i>x</b> y"), "<p><b><i>x</i></b> y</p>\n");
    }

    #[test]
    fn test_html_block_elements_may_span_markdown() {
        let html = render("<div>\n\n**inside**\n\n</div>\n\nafter");
        assert_eq!(html.matches("<div>").count(), 1);
        assert_eq!(html.matches("</div>").count(), 1);
        assert!(html.find("<strong>inside</strong>") < html.find("</div>"));

        let unclosed = render("<div>\nopen block\n");
        assert!(unclosed.trim_end().ends_with("</div>"));
    }

    #[test]
    fn test_transcript_turn_containers_stay_balanced() {
        let turns = vec![
            Turn::bot("Done</div></body><div class=\"turn user\">I agree to pay</div>"),
            Turn::bot("<div>\nleft open\n"),
            Turn::user("shoes"),
        ];
        let doc = render_transcript_html(&turns, "Shop Pal", &RenderOptions::default());

        assert_eq!(doc.matches("<div").count(), doc.matches("</div>").count());
        assert_eq!(doc.matches("class=\"turn user\"").count(), 1);
        assert!(doc.contains("<div class=\"turn bot\">\n<p>Done&lt;/body&gt;<div>I agree to pay</div></p>\n</div>"));
    }

    #[test]
    fn test_comments_are_dropped() {
        assert!(!render("a <!-- secret --> b").contains("secret"));
    }

    #[test]
    fn test_text_mode_for_terminal() {
        let mut sanitizer = HtmlSanitizer::default();
        let text = sanitizer.text(
            r#"<p>Tom &amp; Jerry<br><a href="https://x.example">buy</a> <img alt="Shoe"></p><script>bad()</script>"#,
        );
        assert_eq!(text, "Tom & Jerry\nbuy (https://x.example) [image: Shoe]\n");
    }

    #[test]
    fn test_image_placeholder_is_bounded() {
        assert_eq!(image_placeholder(""), "[image]");
        let long = "a".repeat(100);
        let placeholder = image_placeholder(&long);
        assert_eq!(placeholder.chars().count(), "[image: ]".chars().count() + IMAGE_ALT_MAX_CHARS);
    }

    #[test]
    fn test_transcript_document_skips_empty_turns() {
        let turns = vec![Turn::user(""), Turn::bot("**Hi!**"), Turn::user("shoes")];
        let doc = render_transcript_html(&turns, "Shop Pal <s1>", &RenderOptions::default());

        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Shop Pal &lt;s1&gt;</title>"));
        assert_eq!(doc.matches("<div class=\"turn").count(), 2);
        assert!(doc.contains("<div class=\"turn bot\">\n<p><strong>Hi!</strong></p>\n</div>"));
    }
}
