//! Markdown post rendering.
//!
//! A markdown post's `index.md` becomes a complete `index.html` page during
//! publish. The body is converted with pulldown-cmark; the page shell is a
//! maud template that links the shared stylesheets and scripts listed in the
//! `[render]` section of `config.toml`.
//!
//! Raw HTML inside the markdown passes through unescaped. Post authors are
//! the site's administrators, and embedded `<video>`/`<iframe>` blocks are
//! common in posts.
//!
//! The renderer sits behind [`ContentRenderer`] so the publish pipeline can
//! be driven with a different converter (or a failing one, in tests).

use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html as md_html};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("markdown source is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("{0}")]
    Other(String),
}

/// Converts one markdown document into a complete HTML page.
pub trait ContentRenderer {
    fn render(&self, source: &[u8]) -> Result<Vec<u8>, RenderError>;
}

/// Page-shell settings for rendered markdown posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSettings {
    /// `lang` attribute of the `<html>` element.
    pub lang: String,
    /// Stylesheet URLs, linked in order.
    pub stylesheets: Vec<String>,
    /// Script URLs, loaded at the end of `<body>` in order.
    pub scripts: Vec<String>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            stylesheets: vec![
                "/public/shared/water.css".to_string(),
                "/public/markdown/style.css".to_string(),
            ],
            scripts: vec!["/public/markdown/main.js".to_string()],
        }
    }
}

/// pulldown-cmark body inside a maud page shell.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    settings: RenderSettings,
}

impl MarkdownRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    fn options() -> Options {
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES
    }

    /// Render markdown text to a full page.
    pub fn render_str(&self, markdown: &str) -> String {
        let title = first_heading(markdown);
        let mut body = String::new();
        md_html::push_html(&mut body, Parser::new_ext(markdown, Self::options()));
        self.page(title.as_deref(), PreEscaped(body)).into_string()
    }

    fn page(&self, title: Option<&str>, body: Markup) -> Markup {
        let s = &self.settings;
        html! {
            (DOCTYPE)
            html lang=(s.lang) {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    @if let Some(title) = title {
                        title { (title) }
                    }
                    @for href in &s.stylesheets {
                        link rel="stylesheet" href=(href);
                    }
                }
                body {
                    (body)
                    @for src in &s.scripts {
                        script src=(src) {}
                    }
                }
            }
        }
    }
}

impl ContentRenderer for MarkdownRenderer {
    fn render(&self, source: &[u8]) -> Result<Vec<u8>, RenderError> {
        let text = std::str::from_utf8(source)?;
        Ok(self.render_str(text).into_bytes())
    }
}

/// Plain text of the first level-1 heading, used as the page title.
fn first_heading(markdown: &str) -> Option<String> {
    let mut in_heading = false;
    let mut text = String::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_heading = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                let trimmed = text.trim();
                return (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
            Event::Text(t) | Event::Code(t) if in_heading => text.push_str(&t),
            _ => {}
        }
    }
    None
}
