/// Server-side HTML for the search, browse, similar and topic pages.
///
/// Every interpolated value goes through `sanitize` or the `Highlighter` (which sanitizes
/// first), so catalog text can never inject markup.
use finder_common::highlight::{sanitize, Highlighter};
use finder_common::model::{truncate_chars, Cluster, Document, LocationDetail};
use finder_common::paging::{
    full_list_limit, BrowseRequest, PageWindow, BROWSE_LIMIT_CHOICES, SEARCH_LIMIT_CHOICES,
};
use finder_common::topics::{filter_by_cluster, topic_counts, ClusterIndex, Selection};

const CSS: &str = r#"
:root { --accent: #0f766e; --muted: #6b7280; --border: #e5e7eb; --card-bg: #fff; }
body { font-family: system-ui, sans-serif; background: #f9fafb; color: #111827; margin: 0; }
main { max-width: 48rem; margin: 0 auto; padding: 1.5rem 1rem; }
header h1 { font-size: 1.8rem; font-weight: 600; margin: 0 0 .5rem; }
header p, .meta, .muted { color: var(--muted); font-size: .875rem; }
a { color: var(--accent); }
form.search { display: flex; gap: .5rem; margin-bottom: 1rem; }
form.search input[type=text] { flex: 1; min-width: 0; height: 2.5rem; padding: 0 .75rem; }
.result { position: relative; background: var(--card-bg); border: 1px solid var(--border); border-radius: .5rem; padding: 1rem; margin-bottom: .75rem; display: flex; gap: 1rem; }
.result-poster img { width: 80px; height: 120px; object-fit: cover; border-radius: 6px; }
.result-main { flex: 1; min-width: 0; }
.result-title { font-weight: 600; font-size: 1.1rem; }
.country-badge { background: #f3f4f6; padding: .1rem .5rem; border-radius: .25rem; font-size: .75rem; }
.score { font-size: .75rem; color: var(--muted); }
.highlight { background: #fde68a; border-radius: 2px; }
.chips { display: flex; flex-wrap: wrap; gap: .5rem; }
.chip { border: 1px solid var(--border); border-radius: 999px; padding: .15rem .6rem; font-size: .8rem; text-decoration: none; color: inherit; }
.chip.selected { background: var(--accent); color: #fff; border-color: var(--accent); }
.topics { margin-bottom: 1rem; padding: .75rem; border: 1px solid var(--border); border-radius: .5rem; background: var(--card-bg); }
.tag { display: inline-block; background: #e5e7eb; border-radius: 999px; padding: 0 .5rem; font-size: .75rem; margin-right: .25rem; }
.pager { display: flex; justify-content: space-between; align-items: center; margin-top: 1rem; }
.pager .disabled { color: var(--muted); }
.error { background: #fef2f2; color: #dc2626; padding: 1rem; border-radius: .375rem; text-align: center; }
"#;

pub fn layout(site_title: &str, page_title: &str, description: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{site} - {page}</title>
<meta name="description" content="{description}">
<style>{CSS}</style>
</head>
<body>
<main>
<header><h1>{site}</h1><p>Search filming locations and heritage sites by keyword.</p></header>
{body}
</main>
</body>
</html>
"#,
        site = sanitize(site_title),
        page = sanitize(page_title),
        description = sanitize(description),
    )
}

#[derive(Debug, Clone, Copy)]
pub struct CardOptions {
    pub preview_chars: usize,
    pub show_similar: bool,
}

/// One result card. `topics` are the cluster labels the document belongs to.
pub fn result_card(
    doc: &Document,
    highlighter: &Highlighter,
    topics: &[String],
    options: CardOptions,
) -> String {
    let mut html = String::new();
    let title_id = (!doc.id.is_empty()).then(|| format!("title-{}", sanitize(&doc.id)));

    match &title_id {
        Some(id) => html.push_str(&format!(
            r#"<article class="result" tabindex="0" aria-labelledby="{id}">"#
        )),
        None => html.push_str(r#"<article class="result" tabindex="0">"#),
    }

    if let Some(src) = doc.image.as_deref().and_then(safe_href) {
        html.push_str(&format!(
            r#"<div class="result-poster"><img src="{src}" alt="{alt} poster" loading="lazy"></div>"#,
            alt = sanitize(if doc.title.trim().is_empty() { "Movie" } else { &doc.title }),
        ));
    }

    html.push_str(r#"<div class="result-main"><div class="result-header">"#);
    let title_attr = title_id
        .as_ref()
        .map(|id| format!(r#" id="{id}""#))
        .unwrap_or_default();
    let title = highlighter.highlight(doc.display_title());
    match doc.url.as_deref().and_then(safe_href) {
        Some(href) => html.push_str(&format!(
            r#"<a href="{href}" target="_blank" rel="noopener noreferrer"><div class="result-title"{title_attr}>{title}</div></a>"#
        )),
        None => html.push_str(&format!(
            r#"<div class="result-title"{title_attr}>{title}</div>"#
        )),
    }
    if let Some(country) = doc.country.as_deref().filter(|c| !c.trim().is_empty()) {
        html.push_str(&format!(
            r#" <span class="country-badge">{}</span>"#,
            sanitize(country)
        ));
    }
    if let Some(score) = doc.score {
        html.push_str(&format!(r#" <span class="score">[{score:.3}]</span>"#));
    }
    html.push_str("</div>");

    match doc.detail() {
        LocationDetail::Curated {
            address,
            description,
        } => {
            if let Some(address) = address {
                html.push_str(&address_line(address));
            }
            html.push_str(&format!(
                r#"<p class="location-description"><strong>Description: </strong>{}</p>"#,
                highlighter.highlight(description)
            ));
        }
        LocationDetail::Addressed { address, body } => {
            html.push_str(&address_line(address));
            html.push_str(&body_block(body, highlighter, options.preview_chars));
        }
        LocationDetail::Body(body) => {
            html.push_str(&body_block(body, highlighter, options.preview_chars));
        }
    }

    if !topics.is_empty() {
        html.push_str(r#"<div class="topic-tags">"#);
        for label in topics {
            html.push_str(&format!(r#"<span class="tag">{}</span>"#, sanitize(label)));
        }
        html.push_str("</div>");
    }

    if !doc.id.is_empty() {
        html.push_str(&format!(
            r#"<div class="meta">id: {}</div>"#,
            sanitize(&doc.id)
        ));
    }

    if let Some(coords) = doc.coordinates() {
        html.push_str(&format!(
            r#"<a class="map-link" href="https://www.openstreetmap.org/?mlat={lat}&amp;mlon={lon}#map=15/{lat}/{lon}" target="_blank" rel="noopener noreferrer">Show on map</a> "#,
            lat = coords.latitude,
            lon = coords.longitude,
        ));
    }

    if options.show_similar && !doc.id.is_empty() {
        html.push_str(&format!(
            r#"<a class="find-similar" href="{}">🔍 Find Similar</a>"#,
            sanitize(&similar_href(&doc.id, Some(&doc.title)))
        ));
    }

    html.push_str("</div></article>\n");
    html
}

fn address_line(address: &str) -> String {
    format!(
        r#"<p class="location-address"><strong>Address: </strong>{}</p>"#,
        sanitize(address)
    )
}

/// Preview of the body text; the full text sits behind "Show more" when it was shortened.
fn body_block(body: &str, highlighter: &Highlighter, preview_chars: usize) -> String {
    let preview = truncate_chars(body, preview_chars);
    if preview == body {
        return format!(
            r#"<p class="description">{}</p>"#,
            highlighter.highlight(body)
        );
    }
    format!(
        r#"<p class="description">{}</p><details class="show-more"><summary>Show more</summary><p class="description">{}</p></details>"#,
        highlighter.highlight(&preview),
        highlighter.highlight(body)
    )
}

/// Only plain web links and site-relative paths are rendered as links.
fn safe_href(url: &str) -> Option<String> {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    let allowed = lower.starts_with("http://")
        || lower.starts_with("https://")
        || (url.starts_with('/') && !url.starts_with("//"));
    allowed.then(|| sanitize(url))
}

pub fn search_href(query: &str, limit: usize, topic: Option<&str>) -> String {
    let mut href = format!("/?q={}&k={limit}", urlencoding::encode(query));
    if let Some(topic) = topic {
        href.push_str(&format!("&topic={}", urlencoding::encode(topic)));
    }
    href
}

pub fn browse_href(request: &BrowseRequest) -> String {
    let mut href = format!("/browse?offset={}&limit={}", request.offset, request.limit);
    if request.shuffle {
        href.push_str("&shuffle=1");
    }
    if let Some(q) = &request.query {
        href.push_str(&format!("&q={}", urlencoding::encode(q)));
    }
    href
}

pub fn similar_href(id: &str, title: Option<&str>) -> String {
    let mut href = format!("/similar?id={}", urlencoding::encode(id));
    if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
        href.push_str(&format!("&title={}", urlencoding::encode(title)));
    }
    href
}

pub fn topic_href(label: &str, ids: &[String]) -> String {
    format!(
        "/topic?label={}&ids={}",
        urlencoding::encode(label),
        urlencoding::encode(&ids.join(","))
    )
}

fn limit_options(choices: &[usize], selected: usize) -> String {
    let mut options: Vec<usize> = choices.to_vec();
    if !options.contains(&selected) {
        options.push(selected);
        options.sort_unstable();
    }
    options
        .iter()
        .map(|n| {
            let sel = if *n == selected { " selected" } else { "" };
            format!(r#"<option value="{n}"{sel}>{n}</option>"#)
        })
        .collect()
}

pub struct SearchView<'a> {
    pub query: &'a str,
    pub limit: usize,
    pub results: &'a [Document],
    pub clusters: &'a [Cluster],
    pub selection: &'a Selection,
    pub preview_chars: usize,
}

pub fn search_page(site_title: &str, view: &SearchView<'_>) -> String {
    let query = view.query.trim();
    let mut body = String::new();

    body.push_str(r#"<p><a class="mode-switch" href="/browse?shuffle=1">I want to browse instead</a></p>"#);
    body.push_str(&format!(
        r#"<form class="search" method="get" action="/"><input id="q" type="text" name="q" value="{q}" placeholder="type here e.g. old castle" autofocus><label for="k" class="sr-only">Results</label><select id="k" name="k">{options}</select><button id="go" type="submit">Search</button></form>"#,
        q = sanitize(view.query),
        options = limit_options(&SEARCH_LIMIT_CHOICES, view.limit),
    ));

    body.push_str(r#"<div id="results">"#);
    if !query.is_empty() {
        let full_list = BrowseRequest {
            limit: full_list_limit(view.limit),
            query: Some(query.to_string()),
            ..BrowseRequest::default()
        };
        body.push_str(&format!(
            r#"<p class="full-list"><a href="{}">Open full list</a></p>"#,
            sanitize(&browse_href(&full_list))
        ));
    }

    let topics = topic_counts(view.clusters);
    if !topics.is_empty() {
        body.push_str(r#"<div class="topics"><p><strong>Topics found (click to filter):</strong></p><div class="chips">"#);
        for (cluster, (label, count)) in view.clusters.iter().zip(&topics) {
            let selected = view.selection.is_selected(label);
            let next = view.selection.toggled(label);
            let class = if selected { "chip selected" } else { "chip" };
            body.push_str(&format!(
                r#"<a class="{class}" href="{href}" aria-pressed="{selected}">{text} <span class="muted">({count})</span></a> <a class="muted" href="{docs}" title="Open topic">↗</a>"#,
                href = sanitize(&search_href(query, view.limit, next.label())),
                text = sanitize(label),
                docs = sanitize(&topic_href(label, &cluster.docs)),
            ));
        }
        body.push_str("</div></div>");
    }

    let index = ClusterIndex::build(view.clusters);
    let visible = filter_by_cluster(view.results, &index, view.selection);
    if visible.is_empty() {
        body.push_str("<div>No results</div>");
    }

    let highlighter = Highlighter::new(Some(query));
    let options = CardOptions {
        preview_chars: view.preview_chars,
        show_similar: true,
    };
    for doc in visible.iter() {
        body.push_str(&result_card(doc, &highlighter, index.labels_for(&doc.id), options));
    }
    body.push_str("</div>");

    layout(site_title, "Search", "Search filming locations and heritage sites", &body)
}

pub struct BrowseView<'a> {
    pub request: &'a BrowseRequest,
    pub total: usize,
    pub items: &'a [Document],
    pub preview_chars: usize,
}

pub fn browse_page(site_title: &str, view: &BrowseView<'_>) -> String {
    let request = view.request;
    let mut body = String::new();

    body.push_str(r#"<p><a href="/">&larr; Back</a></p>"#);

    let mut hidden = String::new();
    if request.shuffle {
        hidden.push_str(r#"<input type="hidden" name="shuffle" value="1">"#);
    }
    if let Some(q) = &request.query {
        hidden.push_str(&format!(
            r#"<input type="hidden" name="q" value="{}">"#,
            sanitize(q)
        ));
    }
    let shuffle_label = if request.shuffle { "Shuffle: ON" } else { "Shuffle: OFF" };
    body.push_str(&format!(
        r#"<div id="controls"><form method="get" action="/browse"><label for="limit">Per page:</label> <select id="limit" name="limit">{options}</select>{hidden} <button type="submit">Apply</button></form> <a class="shuffle" href="{shuffle_href}" aria-pressed="{pressed}">{shuffle_label}</a></div>"#,
        options = limit_options(&BROWSE_LIMIT_CHOICES, request.limit),
        shuffle_href = sanitize(&browse_href(&request.with_shuffle_toggled())),
        pressed = request.shuffle,
    ));

    body.push_str(r#"<div id="list">"#);
    if view.items.is_empty() {
        body.push_str("<div>No items</div>");
    }
    let highlighter = Highlighter::new(request.query.as_deref());
    let options = CardOptions {
        preview_chars: view.preview_chars,
        show_similar: true,
    };
    for doc in view.items {
        body.push_str(&result_card(doc, &highlighter, &[], options));
    }
    body.push_str("</div>");

    let window = PageWindow::new(request.offset, request.limit, view.total);
    let prev = match window.prev_offset() {
        Some(offset) => format!(
            r#"<a href="{}">Prev</a>"#,
            sanitize(&browse_href(&request.at_offset(offset)))
        ),
        None => r#"<span class="disabled">Prev</span>"#.to_string(),
    };
    let next = match window.next_offset() {
        Some(offset) => format!(
            r#"<a href="{}">Next</a>"#,
            sanitize(&browse_href(&request.at_offset(offset)))
        ),
        None => r#"<span class="disabled">Next</span>"#.to_string(),
    };
    body.push_str(&format!(
        r#"<div id="pager" class="pager"><div class="muted">Showing {first}-{last} of {total}</div><div>{prev} {next}</div></div>"#,
        first = window.first_shown(),
        last = window.last_shown(),
        total = view.total,
    ));

    layout(site_title, "Browse", "Browse filming locations and heritage sites", &body)
}

pub struct SimilarView<'a> {
    pub title: Option<&'a str>,
    /// The similar documents, or the message to show when loading them failed.
    pub outcome: Result<&'a [Document], &'a str>,
    pub preview_chars: usize,
}

pub fn similar_page(site_title: &str, view: &SimilarView<'_>) -> String {
    let mut body = String::new();
    body.push_str(r#"<p><a href="/">&larr; Back to search</a></p><h2>🔍 Similar Documents</h2>"#);
    if let Some(title) = view.title.filter(|t| !t.trim().is_empty()) {
        body.push_str(&format!(
            r#"<p class="muted">Similar to: {}</p>"#,
            sanitize(title)
        ));
    }

    match view.outcome {
        Err(message) => body.push_str(&format!(
            r#"<div class="error"><p><strong>⚠️ {}</strong></p><p>Please try again later or ensure the server is running.</p></div>"#,
            sanitize(message)
        )),
        Ok([]) => body.push_str(r#"<p class="muted">No similar documents found.</p>"#),
        Ok(docs) => {
            let plural = if docs.len() == 1 { "" } else { "s" };
            body.push_str(&format!(
                r#"<p class="muted">Found {} similar document{plural}</p>"#,
                docs.len()
            ));
            let highlighter = Highlighter::new(None);
            let options = CardOptions {
                preview_chars: view.preview_chars,
                show_similar: false,
            };
            for doc in docs {
                body.push_str(&result_card(doc, &highlighter, &[], options));
            }
        }
    }

    layout(site_title, "Similar", "Documents similar to a filming location", &body)
}

pub fn topic_page(site_title: &str, label: &str, docs: &[Document], preview_chars: usize) -> String {
    let heading = if label.trim().is_empty() { "Topic" } else { label };
    let mut body = format!(
        r#"<p><a href="/">&larr; Back to search</a></p><h2>{}</h2><p class="muted">{} documents</p>"#,
        sanitize(heading),
        docs.len()
    );
    if docs.is_empty() {
        body.push_str("<div>No documents</div>");
    }
    let highlighter = Highlighter::new(None);
    let options = CardOptions {
        preview_chars,
        show_similar: true,
    };
    for doc in docs {
        body.push_str(&result_card(doc, &highlighter, &[], options));
    }
    layout(site_title, heading, "Documents in a topic", &body)
}
