//! Publishing: render every page of a site into its output directory.

use crate::templates::{
    render_menu, LinkItem, LinkListTemplate, MenuNode, NavFooterTemplate, PageTemplate,
    Placeholder, TemplateError, TocItem, TocTemplate,
};
use askama::Template;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use treewiki_core::{Cousin, LinkResolver, PageId, RenderError, RenderedContent, Site};

/// An output file that could not be written
#[derive(Debug)]
pub struct WriteFailure {
    pub path: PathBuf,
    pub error: std::io::Error,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to serialise search index: {0}")]
    Index(#[from] serde_json::Error),

    #[error("Pages '{first}' and '{second}' both publish to {path}")]
    OutputCollision {
        path: String,
        first: String,
        second: String,
    },

    #[error("Failed to write {} file(s): {}", .0.len(), join_failures(.0))]
    Write(Vec<WriteFailure>),
}

fn join_failures(failures: &[WriteFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Write the serialised tree back to the site's source file
    pub write_source: bool,
    /// Write the search index next to the rendered pages
    pub write_index: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            write_source: false,
            write_index: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    pub pages_written: usize,
    pub index_path: Option<PathBuf>,
    pub source_written: bool,
}

pub struct Publisher<'a> {
    site: &'a Site,
    template: PageTemplate,
}

impl<'a> Publisher<'a> {
    pub fn new(site: &'a Site, template: PageTemplate) -> Self {
        Self { site, template }
    }

    /// Load the template named in the site's configuration
    pub fn from_site(site: &'a Site) -> Result<Self, TemplateError> {
        let template = PageTemplate::from_file(&site.config().template)?;
        Ok(Self::new(site, template))
    }

    /// Absolute output file for a page
    pub fn output_file(&self, id: PageId) -> PathBuf {
        self.site
            .config()
            .output
            .join(self.site.links().output_path(id))
    }

    /// Complete HTML document for one page
    pub fn render_page(&self, id: PageId) -> Result<String, PublishError> {
        let rendered = self.site.renderer().render(id)?;
        let mut values = HashMap::new();
        for &placeholder in self.template.placeholders() {
            let value = self.component(placeholder, id, &rendered)?;
            values.insert(placeholder, value);
        }
        Ok(self.template.fill(&values))
    }

    /// Render every page, then the index and optionally the source.
    ///
    /// Render and template errors stop the build. Write failures are
    /// collected and returned together once every page has been tried.
    pub fn publish(&self, options: &PublishOptions) -> Result<PublishReport, PublishError> {
        let mut report = PublishReport::default();
        let mut failures = Vec::new();
        self.check_output_paths()?;

        for id in self.site.tree().traverse() {
            let html = self.render_page(id)?;
            let path = self.output_file(id);
            match write_file(&path, &html) {
                Ok(()) => {
                    tracing::debug!("Wrote {:?}", path);
                    report.pages_written += 1;
                }
                Err(error) => failures.push(WriteFailure { path, error }),
            }
        }

        if options.write_index {
            let json = self.site.analysis().to_json()?;
            let path = self.site.config().search_index_path();
            match write_file(&path, &json) {
                Ok(()) => report.index_path = Some(path),
                Err(error) => failures.push(WriteFailure { path, error }),
            }
        }

        if options.write_source {
            match self.site.save_source() {
                Ok(()) => report.source_written = true,
                Err(error) => failures.push(WriteFailure {
                    path: self.site.config().source.clone(),
                    error,
                }),
            }
        }

        if !failures.is_empty() {
            return Err(PublishError::Write(failures));
        }

        tracing::info!(
            "Published {} pages for site '{}'",
            report.pages_written,
            self.site.name()
        );
        Ok(report)
    }

    fn check_output_paths(&self) -> Result<(), PublishError> {
        let tree = self.site.tree();
        let links = self.site.links();
        let mut seen: HashMap<String, PageId> = HashMap::new();
        for id in tree.traverse() {
            let path = links.output_path(id);
            if let Some(&first) = seen.get(&path) {
                return Err(PublishError::OutputCollision {
                    path,
                    first: tree.name(first).to_string(),
                    second: tree.name(id).to_string(),
                });
            }
            seen.insert(path, id);
        }
        Ok(())
    }

    fn component(
        &self,
        placeholder: Placeholder,
        id: PageId,
        rendered: &RenderedContent,
    ) -> Result<String, TemplateError> {
        let tree = self.site.tree();
        let links = self.site.links();

        let html = match placeholder {
            Placeholder::Title => tree.name(id).to_string(),
            Placeholder::Stylesheet => links.href(id, self.site.config().stylesheet.as_str()),
            Placeholder::Content => rendered.html.clone(),
            Placeholder::Toc => {
                let base = rendered.toc.iter().map(|e| e.level).min().unwrap_or(1);
                TocTemplate {
                    entries: rendered
                        .toc
                        .iter()
                        .map(|e| TocItem {
                            depth: e.level - base,
                            title: e.title.clone(),
                            id: e.id.clone(),
                        })
                        .collect(),
                }
                .render()?
            }
            Placeholder::FamilyLinks => {
                let family: HashSet<PageId> = tree.family(id).into_iter().collect();
                render_menu(&self.menu(tree.root(), id, &family, &links))
            }
            Placeholder::CousinLinks => LinkListTemplate {
                class: "cousin-links".to_string(),
                links: tree
                    .cousins(id)
                    .into_iter()
                    .map(|cousin| match cousin {
                        Cousin::Page(c) => link_to(&links, tree.name(c), id, c),
                        Cousin::Placeholder { name, .. } => LinkItem {
                            href: String::new(),
                            label: name,
                            current: false,
                        },
                    })
                    .collect(),
            }
            .render()?,
            Placeholder::ElderLinks => LinkListTemplate {
                class: "elder-links".to_string(),
                links: tree
                    .elders()
                    .iter()
                    .map(|&e| link_to(&links, tree.name(e), id, e))
                    .collect(),
            }
            .render()?,
            Placeholder::NavFooter => {
                let nav = |target: Option<PageId>| {
                    target.map(|t| link_to(&links, tree.name(t), id, t))
                };
                NavFooterTemplate {
                    previous: nav(tree.previous(id)),
                    up: nav(tree.parent(id)),
                    next: nav(tree.next_node(id)),
                }
                .render()?
            }
        };
        Ok(html)
    }

    fn menu(
        &self,
        node: PageId,
        current: PageId,
        family: &HashSet<PageId>,
        links: &LinkResolver<'_>,
    ) -> Vec<MenuNode> {
        let tree = self.site.tree();
        tree.children(node)
            .iter()
            .filter(|c| family.contains(*c))
            .map(|&c| MenuNode {
                link: link_to(links, tree.name(c), current, c),
                children: self.menu(c, current, family, links),
            })
            .collect()
    }
}

fn link_to(links: &LinkResolver<'_>, label: &str, from: PageId, to: PageId) -> LinkItem {
    LinkItem {
        href: links.href(from, to),
        label: label.to_string(),
        current: from == to,
    }
}

/// Write a file, creating parent directories as needed
fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}
