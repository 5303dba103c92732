//! Server-rendered public pages
//!
//! All row text is HTML-escaped; article bodies are rendered from markdown
//! with raw HTML passed through as text.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use folio_common::{
    config::SiteConfig,
    db::models::{is_http_url, Article, ContentStatus, Project},
    errors::Result,
};
use pulldown_cmark::{html, Event, Options, Parser};
use std::fmt::Write;

use crate::AppState;

const PUBLISHED: Option<ContentStatus> = Some(ContentStatus::Published);
const HOME_ARTICLES: u64 = 5;
const HOME_PROJECTS: usize = 3;

/// Escape text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Markdown to HTML; inline and block HTML is escaped, not rendered
pub fn render_markdown(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH)
        .map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        });

    let mut output = String::new();
    html::push_html(&mut output, parser);
    output
}

fn layout(site: &SiteConfig, title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
        <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
        <title>{title} | {site}</title>\n</head>\n<body>\n\
        <header><a href=\"/\">{site}</a> <nav><a href=\"/projects\">Projects</a> \
        <a href=\"/articles\">Articles</a></nav></header>\n\
        <main>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape_html(title),
        site = escape_html(&site.title),
        body = body,
    )
}

fn project_card(project: &Project) -> String {
    let mut card = format!(
        "<article class=\"project\"><h3>{}</h3><p>{}</p>",
        escape_html(&project.title),
        escape_html(&project.summary)
    );

    let tech = project.tech_list();
    if !tech.is_empty() {
        let items: Vec<String> = tech.iter().map(|t| format!("<li>{}</li>", escape_html(t))).collect();
        let _ = write!(card, "<ul class=\"tech\">{}</ul>", items.concat());
    }
    if let Some(url) = project.repo_url.as_deref().filter(|u| is_http_url(u)) {
        let _ = write!(card, "<a href=\"{}\">Source</a> ", escape_html(url));
    }
    if let Some(url) = project.live_url.as_deref().filter(|u| is_http_url(u)) {
        let _ = write!(card, "<a href=\"{}\">Live</a>", escape_html(url));
    }

    card.push_str("</article>");
    card
}

fn article_item(article: &Article) -> String {
    let date = article
        .published_at
        .map(|at| format!("<time>{}</time> ", at.format("%Y-%m-%d")))
        .unwrap_or_default();

    format!(
        "<li>{}<a href=\"/articles/{}\">{}</a><p>{}</p></li>",
        date,
        escape_html(&article.slug),
        escape_html(&article.title),
        escape_html(&article.excerpt)
    )
}

pub async fn home(State(state): State<AppState>) -> Result<Html<String>> {
    let owner_id = state.owner_id();
    let site = &state.config.site;

    let projects = state.repo.list_projects(owner_id, PUBLISHED).await?;
    let articles = state
        .repo
        .list_articles(owner_id, PUBLISHED, Some(1), Some(HOME_ARTICLES))
        .await?;

    let featured: Vec<&Project> = projects.iter().filter(|p| p.featured).take(HOME_PROJECTS).collect();
    let featured = if featured.is_empty() {
        projects.iter().take(HOME_PROJECTS).collect()
    } else {
        featured
    };

    let mut body = format!(
        "<section class=\"hero\"><h1>{}</h1><p>{}</p></section>\n",
        escape_html(&site.title),
        escape_html(&site.tagline)
    );

    if !featured.is_empty() {
        body.push_str("<section><h2>Projects</h2>");
        for project in featured {
            body.push_str(&project_card(project));
        }
        body.push_str("</section>\n");
    }

    if !articles.items.is_empty() {
        body.push_str("<section><h2>Writing</h2><ul>");
        for article in &articles.items {
            body.push_str(&article_item(article));
        }
        body.push_str("</ul></section>\n");
    }

    let _ = write!(
        body,
        "<section id=\"twin\"><h2>Ask {}</h2><p>Questions are answered by a digital twin \
        grounded in this site's content.</p></section>",
        escape_html(&site.persona_name)
    );

    Ok(Html(layout(site, "Home", &body)))
}

pub async fn projects(State(state): State<AppState>) -> Result<Html<String>> {
    let projects = state.repo.list_projects(state.owner_id(), PUBLISHED).await?;

    let mut body = String::from("<h1>Projects</h1>\n");
    if projects.is_empty() {
        body.push_str("<p>No projects yet.</p>");
    }
    for project in &projects {
        body.push_str(&project_card(project));
    }

    Ok(Html(layout(&state.config.site, "Projects", &body)))
}

pub async fn articles(State(state): State<AppState>) -> Result<Html<String>> {
    let page = state
        .repo
        .list_articles(state.owner_id(), PUBLISHED, Some(1), Some(100))
        .await?;

    let mut body = String::from("<h1>Articles</h1>\n<ul class=\"articles\">");
    for article in &page.items {
        body.push_str(&article_item(article));
    }
    body.push_str("</ul>");

    Ok(Html(layout(&state.config.site, "Articles", &body)))
}

pub async fn article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response> {
    let site = &state.config.site;

    let Some(article) = state.repo.find_published_article(state.owner_id(), &slug).await? else {
        let body = "<h1>Not found</h1><p>That article does not exist.</p>";
        return Ok((StatusCode::NOT_FOUND, Html(layout(site, "Not found", body))).into_response());
    };

    let tags = article.tag_list();
    let mut body = format!("<article><h1>{}</h1>", escape_html(&article.title));
    if let Some(at) = article.published_at {
        let _ = write!(body, "<p><time>{}</time></p>", at.format("%B %-d, %Y"));
    }
    if !tags.is_empty() {
        let items: Vec<String> = tags.iter().map(|t| format!("<li>{}</li>", escape_html(t))).collect();
        let _ = write!(body, "<ul class=\"tags\">{}</ul>", items.concat());
    }
    body.push_str(&render_markdown(&article.body));
    body.push_str("</article>");

    Ok(Html(layout(site, &article.title, &body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_project_card_skips_unsafe_links() {
        let now = chrono::Utc::now();
        let project = Project {
            id: uuid::Uuid::new_v4(),
            owner_id: uuid::Uuid::new_v4(),
            slug: "folio".into(),
            title: "Folio".into(),
            summary: "Portfolio site".into(),
            body: String::new(),
            tech_stack: serde_json::json!(["Rust"]),
            repo_url: Some("https://github.com/me/folio".into()),
            live_url: Some("javascript:alert(1)".into()),
            featured: false,
            sort_order: 0,
            status: "published".into(),
            created_at: now.into(),
            updated_at: now.into(),
        };

        let card = project_card(&project);
        assert!(card.contains(r#"<a href="https://github.com/me/folio">Source</a>"#));
        assert!(!card.contains("javascript:"));
        assert!(!card.contains("Live"));
    }

    #[test]
    fn test_markdown_escapes_raw_html() {
        let html = render_markdown("# Title\n\nSome *emphasis*.\n\n<script>alert(1)</script>\n");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
