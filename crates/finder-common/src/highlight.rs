/// Query highlighting for rendered result text.
///
/// Text is always escaped before it is matched, so the output is safe to embed in HTML
/// whether or not a query is present. Matches are wrapped in
/// `<span class="highlight">…</span>` with the original casing preserved.
use regex::{Captures, Regex, RegexBuilder};
use tracing::warn;

pub const DEFAULT_MARKER_CLASS: &str = "highlight";

/// Characters prefixed with a backslash so a query token matches literally.
const REGEX_META: &[char] = &[
    '.', '*', '+', '?', '^', '$', '{', '}', '(', ')', '|', '[', ']', '\\',
];

/// Escape `&`, `<`, `>`, `"` and `'` for embedding in markup.
///
/// Ampersand goes first so the entities produced by the later substitutions are left alone.
pub fn sanitize(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Split a free-text query on whitespace and escape each token for literal regex use.
pub fn tokenize(query: &str) -> Vec<String> {
    // split_whitespace never yields empty or padded tokens
    query.split_whitespace().map(escape_token).collect()
}

pub fn escape_token(token: &str) -> String {
    let mut out = String::with_capacity(token.len() * 2);
    for ch in token.chars() {
        if REGEX_META.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// A compiled query, reusable across every field of every result card.
#[derive(Debug, Clone)]
pub struct Highlighter {
    pattern: Option<Regex>,
    open_tag: String,
}

impl Highlighter {
    pub fn new(query: Option<&str>) -> Self {
        let tokens = query.map(tokenize).unwrap_or_default();
        let pattern = if tokens.is_empty() {
            None
        } else {
            RegexBuilder::new(&tokens.join("|"))
                .case_insensitive(true)
                .build()
                .inspect_err(|e| warn!(error = %e, "failed to compile highlight pattern"))
                .ok()
        };
        Self {
            pattern,
            open_tag: marker_open_tag(DEFAULT_MARKER_CLASS),
        }
    }

    pub fn with_marker_class(mut self, class: &str) -> Self {
        self.open_tag = marker_open_tag(class);
        self
    }

    /// True when the query produced at least one token.
    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn highlight(&self, text: &str) -> String {
        let escaped = sanitize(text);
        let Some(pattern) = &self.pattern else {
            return escaped;
        };
        pattern
            .replace_all(&escaped, |caps: &Captures| {
                format!("{}{}</span>", self.open_tag, &caps[0])
            })
            .into_owned()
    }
}

/// Sanitize `text` and wrap every case-insensitive occurrence of any query token.
pub fn highlight(text: &str, query: Option<&str>) -> String {
    Highlighter::new(query).highlight(text)
}

fn marker_open_tag(class: &str) -> String {
    format!("<span class=\"{}\">", sanitize(class))
}
