//! Bulletin rendering: one candidate, two HTML message variants.
//!
//! Group chats get a tag-prefixed body with the article link attached as a
//! URL button; direct chats get the same body with a plain inline link at
//! the end. Link previews are suppressed at send time for both.

use chrono::DateTime;

use crate::feed::NewsCandidate;

/// Tag prepended to the group variant so clients can mute or filter on it.
pub const GROUP_TAG: &str = "#BREAKING: ";

/// Label used for the URL button and the inline link alike.
pub const BUTTON_LABEL: &str = "Open article";

/// Rendered message pair for one breaking item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bulletin {
    pub group_text: String,
    pub direct_text: String,
    pub button_url: String,
}

/// Render a candidate into its two delivery variants.
///
/// `origin` is the canonical site origin, e.g. `https://news.example.org`,
/// used to absolutize relative article links.
pub fn render(item: &NewsCandidate, origin: &str) -> Bulletin {
    let mut body = String::new();
    body.push_str("<b>");
    body.push_str(&html_escape::encode_text(item.headline.trim()));
    body.push_str("</b>\n<i>");
    body.push_str(&html_escape::encode_text(&date_label(&item.date)));
    body.push_str("</i>\n");

    let text = strip_emphasis(&item.text);
    let text = text.trim();
    if !text.is_empty() {
        body.push_str(&html_escape::encode_text(text));
        body.push('\n');
    }

    let url = absolutize(&item.url, origin);
    let direct_text = format!(
        "{body}<a href=\"{}\">{BUTTON_LABEL}</a>",
        html_escape::encode_double_quoted_attribute(&url)
    );

    Bulletin {
        group_text: format!("{GROUP_TAG}{body}"),
        direct_text,
        button_url: url,
    }
}

/// Human-readable timestamp. Falls back to the raw feed value when it does
/// not parse as RFC 3339.
fn date_label(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => ts.format("%d.%m.%Y %H:%M:%S").to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

/// Drop the literal emphasis markup the feed embeds in body text. It would
/// otherwise survive escaping as visible tag soup.
fn strip_emphasis(text: &str) -> String {
    text.replace("<em>", "").replace("</em>", "")
}

/// Absolutize site-relative article links and upgrade plain-http ones.
fn absolutize(url: &str, origin: &str) -> String {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("http://") {
        return format!("https://{rest}");
    }
    if url.starts_with('/') {
        return format!("{}{}", origin.trim_end_matches('/'), url);
    }
    url.to_string()
}
