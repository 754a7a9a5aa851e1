//! Block-structured page content to HTML.
//!
//! A line beginning with a bracketed single-character code selects a block
//! category: digits are headings, letters are line styles (`[p]`, `[e]`,
//! ...) or block modes (`[t]` table, `[l]` list, `[n]` numbered list). A
//! block mode stays open until a closing marker such as `[/t]`, so modes
//! nest as a stack. Inline text passes through the markup codec and
//! `[[Page]]` / `[[Page|label]]` references become relative hyperlinks.

use crate::codec::{self, MarkupCodec};
use crate::links::LinkResolver;
use crate::slug::{strip_tags, url_form};
use crate::tree::{PageId, Tree};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;

static BLOCK_RE: OnceLock<Regex> = OnceLock::new();
static WIKILINK_RE: OnceLock<Regex> = OnceLock::new();

fn block_regex() -> &'static Regex {
    BLOCK_RE.get_or_init(|| Regex::new(r"^\[(/?)([0-9a-z])\](.*)$").unwrap())
}

fn wikilink_regex() -> &'static Regex {
    WIKILINK_RE.get_or_init(|| Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").unwrap())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Unknown block category '[{code}]' in page '{page}': {fragment:?}")]
    UnknownCategory {
        page: String,
        code: char,
        fragment: String,
    },
}

/// Current block mode of the line state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentsMode {
    Normal,
    Table,
    List,
    Numbered,
}

impl ContentsMode {
    fn from_code(code: char) -> Option<Self> {
        match code {
            't' => Some(Self::Table),
            'l' => Some(Self::List),
            'n' => Some(Self::Numbered),
            _ => None,
        }
    }

    fn open_tag(self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Table => "<table>",
            Self::List => "<ul>",
            Self::Numbered => "<ol>",
        }
    }

    fn close_tag(self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Table => "</table>",
            Self::List => "</ul>",
            Self::Numbered => "</ol>",
        }
    }

    fn is_list(self) -> bool {
        matches!(self, Self::List | Self::Numbered)
    }

    fn code(self) -> Option<char> {
        match self {
            Self::Normal => None,
            Self::Table => Some('t'),
            Self::List => Some('l'),
            Self::Numbered => Some('n'),
        }
    }
}

/// Single-line element styles
fn line_style(code: char) -> Option<(&'static str, &'static str)> {
    match code {
        'p' => Some(("<p>", "</p>")),
        'e' => Some(("<p class=\"example\">", "</p>")),
        'd' => Some(("<p class=\"definition\">", "</p>")),
        'c' => Some(("<p class=\"centre\">", "</p>")),
        'q' => Some(("<blockquote>", "</blockquote>")),
        _ => None,
    }
}

/// A heading collected while rendering, in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub level: usize,
    pub title: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedContent {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

pub struct ContentRenderer<'a> {
    tree: &'a Tree,
    codec: &'a MarkupCodec,
}

impl<'a> ContentRenderer<'a> {
    pub fn new(tree: &'a Tree, codec: &'a MarkupCodec) -> Self {
        Self { tree, codec }
    }

    /// Render a page's fragment, its own heading included
    pub fn render(&self, id: PageId) -> Result<RenderedContent, RenderError> {
        self.render_text(id, &self.tree.fragment(id))
    }

    /// Render arbitrary text as if it belonged to page `id`
    pub fn render_text(&self, id: PageId, text: &str) -> Result<RenderedContent, RenderError> {
        let mut state = RenderState::new(self, id);
        for line in codec::strip_datestamp(text).lines() {
            state.line(line)?;
        }
        Ok(state.finish())
    }

    /// Markup-side formatting tokens come through the codec rather than
    /// the block parser
    fn is_inline_token(&self, closing: bool, code: char) -> bool {
        let token = if closing {
            format!("[/{code}]")
        } else {
            format!("[{code}]")
        };
        self.codec.pairs().iter().any(|(markup, _)| *markup == token)
    }

    /// Codec replacements followed by link expansion
    fn inline(&self, from: PageId, text: &str) -> String {
        let markdown = self.codec.to_markdown(text);
        let links = LinkResolver::new(self.tree);
        wikilink_regex()
            .replace_all(&markdown, |caps: &Captures| {
                let target = caps[1].trim();
                let label = caps.get(2).map_or(target, |m| m.as_str());
                match self.tree.find(target) {
                    Some(dest) => links.hyperlink(from, dest, label),
                    None => {
                        tracing::warn!(
                            "Broken link to '{}' in page '{}'",
                            target,
                            self.tree.name(from)
                        );
                        format!("<span class=\"broken-link\">{label}</span>")
                    }
                }
            })
            .into_owned()
    }
}

struct RenderState<'r, 'a> {
    renderer: &'r ContentRenderer<'a>,
    page: PageId,
    mode: ContentsMode,
    /// The current block sits inside a list item of its parent list
    in_item: bool,
    stack: Vec<(ContentsMode, bool)>,
    html: Vec<String>,
    toc: Vec<TocEntry>,
    anchors: HashSet<String>,
}

impl<'r, 'a> RenderState<'r, 'a> {
    fn new(renderer: &'r ContentRenderer<'a>, page: PageId) -> Self {
        Self {
            renderer,
            page,
            mode: ContentsMode::Normal,
            in_item: false,
            stack: Vec::new(),
            html: Vec::new(),
            toc: Vec::new(),
            anchors: HashSet::new(),
        }
    }

    fn line(&mut self, line: &str) -> Result<(), RenderError> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let Some(caps) = block_regex().captures(line) else {
            self.text(line);
            return Ok(());
        };
        let closing = !caps[1].is_empty();
        let code = caps[2].chars().next().unwrap_or('p');
        let rest = caps.get(3).map_or("", |m| m.as_str());

        if self.renderer.is_inline_token(closing, code) {
            self.text(line);
            return Ok(());
        }

        if closing {
            self.close(code);
            if !rest.trim().is_empty() {
                self.text(rest);
            }
            return Ok(());
        }

        if code.is_ascii_digit() {
            self.heading(code, rest);
        } else if let Some(mode) = ContentsMode::from_code(code) {
            self.open(mode);
            if !rest.trim().is_empty() {
                self.text(rest);
            }
        } else if let Some((open, close)) = line_style(code) {
            let inner = self.renderer.inline(self.page, rest);
            self.emit(format!("{open}{inner}{close}"));
        } else {
            return Err(RenderError::UnknownCategory {
                page: self.renderer.tree.name(self.page).to_string(),
                code,
                fragment: line.to_string(),
            });
        }
        Ok(())
    }

    /// A plain line in the current mode
    fn text(&mut self, line: &str) {
        match self.mode {
            ContentsMode::Normal => {
                let inner = self.renderer.inline(self.page, line);
                self.html.push(format!("<p>{inner}</p>"));
            }
            ContentsMode::Table => {
                let cells: String = line
                    .split('|')
                    .map(|cell| format!("<td>{}</td>", self.renderer.inline(self.page, cell.trim())))
                    .collect();
                self.html.push(format!("<tr>{cells}</tr>"));
            }
            ContentsMode::List | ContentsMode::Numbered => {
                let inner = self.renderer.inline(self.page, line);
                self.html.push(format!("<li>{inner}</li>"));
            }
        }
    }

    /// A styled element, wrapped to fit the current mode
    fn emit(&mut self, element: String) {
        match self.mode {
            ContentsMode::Normal => self.html.push(element),
            ContentsMode::Table => self.html.push(format!("<tr><td>{element}</td></tr>")),
            ContentsMode::List | ContentsMode::Numbered => {
                self.html.push(format!("<li>{element}</li>"))
            }
        }
    }

    fn heading(&mut self, code: char, rest: &str) {
        let level = code.to_digit(10).unwrap_or(1).clamp(1, 6) as usize;
        let inner = self.renderer.inline(self.page, rest);
        let title = strip_tags(&inner);

        let base = url_form(&title);
        let mut id = base.clone();
        let mut n = 2;
        while !self.anchors.insert(id.clone()) {
            id = format!("{base}-{n}");
            n += 1;
        }

        self.html.push(format!("<h{level} id=\"{id}\">{inner}</h{level}>"));
        self.toc.push(TocEntry { level, title, id });
    }

    /// Push a block mode. Inside a list the block goes into the last item,
    /// or a fresh one when the list has no items yet.
    fn open(&mut self, mode: ContentsMode) {
        let in_item = self.mode.is_list();
        if in_item {
            match self.html.last_mut() {
                Some(last) if last.starts_with("<li>") && last.ends_with("</li>") => {
                    last.truncate(last.len() - "</li>".len());
                }
                _ => self.html.push("<li>".to_string()),
            }
        }
        self.html.push(mode.open_tag().to_string());
        self.stack.push((self.mode, self.in_item));
        self.mode = mode;
        self.in_item = in_item;
    }

    /// Close the current block and return to its parent mode
    fn pop(&mut self) {
        self.html.push(self.mode.close_tag().to_string());
        if self.in_item {
            self.html.push("</li>".to_string());
        }
        let (mode, in_item) = self.stack.pop().unwrap_or((ContentsMode::Normal, false));
        self.mode = mode;
        self.in_item = in_item;
    }

    fn close(&mut self, code: char) {
        if self.mode == ContentsMode::Normal {
            tracing::debug!(
                "Closing marker [/{}] with no open block in '{}'",
                code,
                self.renderer.tree.name(self.page)
            );
            return;
        }
        if self.mode.code() != Some(code) {
            tracing::warn!(
                "Closing marker [/{}] closes a [{}] block in '{}'",
                code,
                self.mode.code().unwrap_or('p'),
                self.renderer.tree.name(self.page)
            );
        }
        self.pop();
    }

    fn finish(mut self) -> RenderedContent {
        while self.mode != ContentsMode::Normal {
            self.pop();
        }
        RenderedContent {
            html: self.html.join("\n"),
            toc: self.toc,
        }
    }
}
