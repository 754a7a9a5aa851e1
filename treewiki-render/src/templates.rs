//! Page templates and the Askama fragments substituted into them.

use askama::Template;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{([a-z]+(?:-[a-z]+)*)\}").unwrap())
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {}", .path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read template {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render fragment: {0}")]
    Fragment(#[from] askama::Error),
}

/// A slot in a page template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Title,
    Stylesheet,
    Content,
    Toc,
    FamilyLinks,
    CousinLinks,
    ElderLinks,
    NavFooter,
}

impl Placeholder {
    pub const ALL: [Placeholder; 8] = [
        Placeholder::Title,
        Placeholder::Stylesheet,
        Placeholder::Content,
        Placeholder::Toc,
        Placeholder::FamilyLinks,
        Placeholder::CousinLinks,
        Placeholder::ElderLinks,
        Placeholder::NavFooter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Title => "title",
            Placeholder::Stylesheet => "stylesheet",
            Placeholder::Content => "content",
            Placeholder::Toc => "toc",
            Placeholder::FamilyLinks => "family-links",
            Placeholder::CousinLinks => "cousin-links",
            Placeholder::ElderLinks => "elder-links",
            Placeholder::NavFooter => "nav-footer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// User-supplied page skeleton with `{placeholder}` slots
#[derive(Debug, Clone)]
pub struct PageTemplate {
    text: String,
    placeholders: Vec<Placeholder>,
}

impl PageTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut placeholders = Vec::new();
        for caps in placeholder_regex().captures_iter(&text) {
            if let Some(p) = Placeholder::from_name(&caps[1]) {
                if !placeholders.contains(&p) {
                    placeholders.push(p);
                }
            }
        }
        Self { text, placeholders }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TemplateError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                TemplateError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Ok(Self::new(text))
    }

    /// Placeholders that occur in the template, in first-use order
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.placeholders.contains(&placeholder)
    }

    /// Substitute every slot in one pass; unknown or unfilled slots stay
    /// as written
    pub fn fill(&self, values: &HashMap<Placeholder, String>) -> String {
        placeholder_regex()
            .replace_all(&self.text, |caps: &Captures| {
                Placeholder::from_name(&caps[1])
                    .and_then(|p| values.get(&p))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// A link in a rendered list. An empty `href` renders as plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkItem {
    pub href: String,
    pub label: String,
    pub current: bool,
}

#[derive(Debug, Clone)]
pub struct TocItem {
    pub depth: usize,
    pub title: String,
    pub id: String,
}

/// Table of contents fragment
#[derive(Template)]
#[template(path = "toc.html")]
pub struct TocTemplate {
    pub entries: Vec<TocItem>,
}

/// Flat list of links (elders, cousins)
#[derive(Template)]
#[template(path = "links.html")]
pub struct LinkListTemplate {
    pub class: String,
    pub links: Vec<LinkItem>,
}

/// Previous / up / next navigation
#[derive(Template)]
#[template(path = "nav_footer.html")]
pub struct NavFooterTemplate {
    pub previous: Option<LinkItem>,
    pub up: Option<LinkItem>,
    pub next: Option<LinkItem>,
}

/// An entry in the nested family menu
#[derive(Debug, Clone)]
pub struct MenuNode {
    pub link: LinkItem,
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    /// Render this entry and its children to HTML
    pub fn render_to_html(&self) -> String {
        let mut html = String::new();
        if self.link.current {
            html.push_str("<li class=\"current\">");
            html.push_str(&format!("<span>{}</span>", self.link.label));
        } else {
            html.push_str("<li>");
            html.push_str(&format!(
                "<a href=\"{}\">{}</a>",
                self.link.href, self.link.label
            ));
        }

        if !self.children.is_empty() {
            html.push_str("\n<ul>\n");
            for child in &self.children {
                html.push_str(&child.render_to_html());
            }
            html.push_str("</ul>\n");
        }

        html.push_str("</li>\n");
        html
    }
}

/// Render a whole menu as a `<ul class="family-links">`
pub fn render_menu(nodes: &[MenuNode]) -> String {
    let mut html = String::from("<ul class=\"family-links\">\n");
    for node in nodes {
        html.push_str(&node.render_to_html());
    }
    html.push_str("</ul>\n");
    html
}
