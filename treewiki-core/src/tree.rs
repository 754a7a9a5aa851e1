//! Page tree parsed from the flat source format.
//!
//! # Architecture
//!
//! Pages are stored in a flat arena with parent/children relationships
//! tracked by [`PageId`] handles. The arena owns every page; parent, child
//! and previous-page links are plain handles resolved through the tree.
//! Deleted pages stay in the arena but are detached from their parent, so
//! traversal from the root never reaches them.
//!
//! # Source format
//!
//! Each page starts with a `[<level>]<name>` heading line, where the level is
//! the page's generation plus one. The root is the first level-1 page. Levels
//! deeper than `leaf_level + 1` are not page breaks; they stay inside the
//! page content as in-page headings.

use crate::collation::{compare_names, CollationKey};
use crate::models::Diagnostic;
use crate::slug::url_form;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Suffix given to stand-in cousins that do not exist in the tree
pub const PLACEHOLDER_SUFFIX: &str = " (missing)";

/// Highest leaf level the single-digit heading markers can express
pub const MAX_LEAF_LEVEL: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Source contains no level-1 page heading")]
    NoRoot,

    #[error("Leaf level {0} is out of range (0..={max})", max = MAX_LEAF_LEVEL)]
    InvalidLeafLevel(usize),

    #[error("A page named '{name}' already exists under '{parent}'")]
    DuplicateName { parent: String, name: String },

    #[error("'{name}' and '{other}' under '{parent}' would publish to the same file")]
    SlugCollision {
        parent: String,
        name: String,
        other: String,
    },

    #[error("Cannot place '{name}' beneath itself")]
    Cycle { name: String },

    #[error("The root page cannot be moved or deleted")]
    RootImmovable,
}

/// Stable handle to a page in a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(usize);

/// Page data owned by the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Display name; may embed inline markup tags
    pub name: String,

    /// Raw markup following the page's heading line
    pub content: String,
}

#[derive(Debug, Clone)]
struct Node {
    page: Page,
    parent: Option<PageId>,
    children: Vec<PageId>,
    previous: Option<PageId>,
}

/// Root-to-page chain of names.
///
/// Two pages are the same page when their names and parent chains match,
/// so a `NodePath` compares equal across independently parsed trees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for NodePath {
    fn from(names: Vec<String>) -> Self {
        NodePath(names)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" / "))
    }
}

/// A page at the same child-index path under another elder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cousin {
    Page(PageId),
    /// The path ran out under `elder`; `parent` is the deepest page reached
    Placeholder {
        elder: PageId,
        parent: PageId,
        name: String,
    },
}

/// Result of parsing a source string
#[derive(Debug)]
pub struct Parsed {
    pub tree: Tree,
    pub diagnostics: Vec<Diagnostic>,
}

/// Names and slugs already claimed under one parent while parsing
#[derive(Debug, Default)]
struct SiblingNames {
    names: HashSet<String>,
    slugs: HashSet<String>,
}

impl SiblingNames {
    fn is_taken(&self, name: &str) -> bool {
        self.names.contains(name) || self.slugs.contains(&url_form(name))
    }

    fn claim(&mut self, name: &str) {
        self.names.insert(name.to_string());
        self.slugs.insert(url_form(name));
    }

    /// `name`, or the first `name (n)` whose name and slug are both free
    fn unique(&self, name: &str) -> String {
        if !self.is_taken(name) {
            return name.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{} ({})", name, n);
            if !self.is_taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Ordered n-ary page tree
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: PageId,
    leaf_level: usize,
}

static MARKER_REGEX: OnceLock<Regex> = OnceLock::new();

fn marker_regex() -> &'static Regex {
    MARKER_REGEX.get_or_init(|| Regex::new(r"(?m)^\[(\d)\]").unwrap())
}

impl Tree {
    /// Create a tree holding only a root page
    pub fn new(root_name: &str, leaf_level: usize) -> Result<Self, TreeError> {
        if leaf_level > MAX_LEAF_LEVEL {
            return Err(TreeError::InvalidLeafLevel(leaf_level));
        }
        Ok(Self {
            nodes: vec![Node {
                page: Page {
                    name: root_name.to_string(),
                    content: String::new(),
                },
                parent: None,
                children: Vec::new(),
                previous: None,
            }],
            root: PageId(0),
            leaf_level,
        })
    }

    /// Parse the flat source format in a single left-to-right pass.
    ///
    /// Malformed fragments are skipped and reported as diagnostics.
    pub fn parse(source: &str, leaf_level: usize) -> Result<Parsed, TreeError> {
        if leaf_level > MAX_LEAF_LEVEL {
            return Err(TreeError::InvalidLeafLevel(leaf_level));
        }

        let max_level = leaf_level + 1;
        let starts: Vec<(usize, usize)> = marker_regex()
            .captures_iter(source)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let level = caps.get(1)?.as_str().parse::<usize>().ok()?;
                (1..=max_level)
                    .contains(&level)
                    .then_some((whole.start(), level))
            })
            .collect();

        let mut diagnostics = Vec::new();
        let preamble_end = starts.first().map(|(s, _)| *s).unwrap_or(source.len());
        if !source[..preamble_end].trim().is_empty() {
            diagnostics.push(
                Diagnostic::warning("parse.preamble", "Text before the first page heading was ignored")
                    .at_line(1),
            );
        }

        let mut tree: Option<Tree> = None;
        let mut cursor = PageId(0);
        let mut last: Option<PageId> = None;
        let mut claimed: HashMap<PageId, SiblingNames> = HashMap::new();
        let mut line = 1;
        let mut counted = 0;

        for (i, &(start, level)) in starts.iter().enumerate() {
            let end = starts.get(i + 1).map(|(s, _)| *s).unwrap_or(source.len());
            let fragment = &source[start..end];
            line += source[counted..start].matches('\n').count();
            counted = start;

            let Some((name, content)) = split_fragment(fragment) else {
                tracing::warn!("Skipping malformed fragment at line {}", line);
                diagnostics.push(
                    Diagnostic::warning("parse.malformed", "Page heading has no name").at_line(line),
                );
                continue;
            };

            if tree.is_none() {
                if level == 1 {
                    let mut root = Tree::new(name, leaf_level)?;
                    root.nodes[0].page.content = content.to_string();
                    tree = Some(root);
                    cursor = PageId(0);
                    last = Some(cursor);
                } else {
                    diagnostics.push(
                        Diagnostic::warning("parse.orphan", "Page appears before the root page")
                            .with_page(name)
                            .at_line(line),
                    );
                }
                continue;
            }
            let Some(tree) = tree.as_mut() else {
                continue;
            };

            if level == 1 {
                tracing::warn!("Skipping second root page '{}'", name);
                diagnostics.push(
                    Diagnostic::warning("parse.extra-root", "Only one level-1 page is allowed")
                        .with_page(name)
                        .at_line(line),
                );
                continue;
            }

            // Ascend until the cursor sits exactly one level above the fragment
            while tree.generation(cursor) + 1 >= level {
                match tree.parent(cursor) {
                    Some(parent) => cursor = parent,
                    None => break,
                }
            }

            let siblings = claimed.entry(cursor).or_default();
            let unique = siblings.unique(name);
            if unique != name {
                let (code, message) = if siblings.names.contains(name) {
                    (
                        "parse.duplicate",
                        format!("Duplicate sibling name '{}' renamed to '{}'", name, unique),
                    )
                } else {
                    (
                        "parse.slug-collision",
                        format!(
                            "'{}' shares its URL with a sibling; renamed to '{}'",
                            name, unique
                        ),
                    )
                };
                tracing::warn!("Renamed page '{}' to '{}'", name, unique);
                diagnostics.push(
                    Diagnostic::warning(code, message)
                        .with_page(unique.clone())
                        .at_line(line),
                );
            }
            siblings.claim(&unique);

            let child = tree.push_node(unique, content.to_string());
            tree.nodes[child.0].parent = Some(cursor);
            tree.nodes[child.0].previous = last;
            tree.nodes[cursor.0].children.push(child);
            cursor = child;
            last = Some(child);
        }

        let tree = tree.ok_or(TreeError::NoRoot)?;
        tracing::debug!(
            "Parsed {} pages with {} diagnostics",
            tree.nodes.len(),
            diagnostics.len()
        );
        Ok(Parsed { tree, diagnostics })
    }

    fn push_node(&mut self, name: String, content: String) -> PageId {
        let id = PageId(self.nodes.len());
        self.nodes.push(Node {
            page: Page { name, content },
            parent: None,
            children: Vec::new(),
            previous: None,
        });
        id
    }

    /// Reject `name` under `parent` when a sibling other than `page` has the
    /// same name or the same slug
    fn check_sibling_name(
        &self,
        parent: PageId,
        page: PageId,
        name: &str,
    ) -> Result<(), TreeError> {
        let slug = url_form(name);
        for &sibling in self.children(parent) {
            if sibling == page {
                continue;
            }
            if self.name(sibling) == name {
                return Err(TreeError::DuplicateName {
                    parent: self.name(parent).to_string(),
                    name: name.to_string(),
                });
            }
            if url_form(self.name(sibling)) == slug {
                return Err(TreeError::SlugCollision {
                    parent: self.name(parent).to_string(),
                    name: name.to_string(),
                    other: self.name(sibling).to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn root(&self) -> PageId {
        self.root
    }

    pub fn leaf_level(&self) -> usize {
        self.leaf_level
    }

    /// Number of pages in the arena, including detached ones
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn page(&self, id: PageId) -> &Page {
        &self.nodes[id.0].page
    }

    pub fn name(&self, id: PageId) -> &str {
        &self.nodes[id.0].page.name
    }

    pub fn content(&self, id: PageId) -> &str {
        &self.nodes[id.0].page.content
    }

    pub fn parent(&self, id: PageId) -> Option<PageId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: PageId) -> &[PageId] {
        &self.nodes[id.0].children
    }

    /// Nearest page parsed before this one that is still attached
    pub fn previous(&self, id: PageId) -> Option<PageId> {
        let mut current = self.nodes[id.0].previous;
        while let Some(p) = current {
            if self.is_attached(p) {
                return Some(p);
            }
            current = self.nodes[p.0].previous;
        }
        None
    }

    /// Ancestors ordered root first, excluding the page itself
    pub fn ancestors(&self, id: PageId) -> Vec<PageId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            chain.push(p);
            current = self.parent(p);
        }
        chain.reverse();
        chain
    }

    /// Ancestors followed by the page itself
    pub fn lineage(&self, id: PageId) -> Vec<PageId> {
        let mut chain = self.ancestors(id);
        chain.push(id);
        chain
    }

    /// Depth below the root (root = 0)
    pub fn generation(&self, id: PageId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(p) = current {
            depth += 1;
            current = self.parent(p);
        }
        depth
    }

    pub fn is_leaf(&self, id: PageId) -> bool {
        self.generation(id) == self.leaf_level
    }

    /// True when the page is reachable from the root
    pub fn is_attached(&self, id: PageId) -> bool {
        id == self.root || self.ancestors(id).first() == Some(&self.root)
    }

    pub fn index_in_parent(&self, id: PageId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Sibling at a relative offset (`-1` previous, `1` next)
    pub fn sister(&self, id: PageId, offset: isize) -> Option<PageId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)? as isize + offset;
        if index < 0 {
            return None;
        }
        self.children(parent).get(index as usize).copied()
    }

    pub fn next_sibling(&self, id: PageId) -> Option<PageId> {
        self.sister(id, 1)
    }

    /// Pre-order successor; `None` at the end of the tree
    pub fn next_node(&self, id: PageId) -> Option<PageId> {
        if let Some(&first) = self.children(id).first() {
            return Some(first);
        }
        let mut current = id;
        loop {
            if let Some(sibling) = self.next_sibling(current) {
                return Some(sibling);
            }
            current = self.parent(current)?;
        }
    }

    /// Pre-order iterator over every attached page
    pub fn traverse(&self) -> Traverse<'_> {
        self.traverse_from(self.root)
    }

    /// Pre-order iterator starting at `start`
    pub fn traverse_from(&self, start: PageId) -> Traverse<'_> {
        Traverse {
            tree: self,
            next: Some(start),
        }
    }

    /// All pages below `id`, in pre-order
    pub fn descendants(&self, id: PageId) -> Vec<PageId> {
        let mut out = Vec::new();
        let mut stack: Vec<PageId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// First-generation pages
    pub fn elders(&self) -> &[PageId] {
        self.children(self.root)
    }

    /// The first-generation ancestor-or-self of `id`
    pub fn elder(&self, id: PageId) -> Option<PageId> {
        self.lineage(id).get(1).copied()
    }

    /// Pages at the same child-index path under every other elder.
    ///
    /// Where the path does not exist under an elder a placeholder is
    /// returned in its slot.
    pub fn cousins(&self, id: PageId) -> Vec<Cousin> {
        let lineage = self.lineage(id);
        let Some(&own_elder) = lineage.get(1) else {
            return Vec::new();
        };
        let path: Vec<usize> = lineage[2..]
            .iter()
            .filter_map(|&n| self.index_in_parent(n))
            .collect();

        let mut cousins = Vec::new();
        for &elder in self.elders() {
            if elder == own_elder {
                continue;
            }
            let mut current = elder;
            let mut found = true;
            for &index in &path {
                match self.children(current).get(index) {
                    Some(&child) => current = child,
                    None => {
                        found = false;
                        break;
                    }
                }
            }

            if found {
                cousins.push(Cousin::Page(current));
            } else {
                tracing::warn!(
                    "No cousin of '{}' under '{}'; using a placeholder",
                    self.name(id),
                    self.name(elder)
                );
                cousins.push(Cousin::Placeholder {
                    elder,
                    parent: current,
                    name: format!("{}{}", self.name(id), PLACEHOLDER_SUFFIX),
                });
            }
        }
        cousins
    }

    /// Children of every ancestor plus all descendants, in pre-order.
    ///
    /// This is the set of pages shown in a page's contextual menu.
    pub fn family(&self, id: PageId) -> Vec<PageId> {
        let line: HashSet<PageId> = self.lineage(id).into_iter().collect();
        let mut out = Vec::new();
        self.collect_family(self.root, id, &line, id == self.root, &mut out);
        out
    }

    fn collect_family(
        &self,
        node: PageId,
        target: PageId,
        line: &HashSet<PageId>,
        inside: bool,
        out: &mut Vec<PageId>,
    ) {
        for &child in self.children(node) {
            out.push(child);
            if child == target {
                self.collect_family(child, target, line, true, out);
            } else if inside || line.contains(&child) {
                self.collect_family(child, target, line, inside, out);
            }
        }
    }

    /// Page at pre-order offset from the root
    pub fn nth(&self, offset: usize) -> Option<PageId> {
        self.traverse().nth(offset)
    }

    /// First page in pre-order with this exact name
    pub fn find(&self, name: &str) -> Option<PageId> {
        self.traverse().find(|&id| self.name(id) == name)
    }

    pub fn path(&self, id: PageId) -> NodePath {
        NodePath(
            self.lineage(id)
                .into_iter()
                .map(|n| self.name(n).to_string())
                .collect(),
        )
    }

    /// Resolve a [`NodePath`] back to a page in this tree
    pub fn find_path(&self, path: &NodePath) -> Option<PageId> {
        let (first, rest) = path.names().split_first()?;
        if self.name(self.root) != first {
            return None;
        }
        rest.iter().try_fold(self.root, |current, name| {
            self.children(current)
                .iter()
                .copied()
                .find(|&c| self.name(c) == name)
        })
    }

    /// Collation order of two pages by name
    pub fn compare(&self, a: PageId, b: PageId) -> std::cmp::Ordering {
        compare_names(self.name(a), self.name(b))
    }

    /// The page's source text: its heading line followed by its content
    pub fn fragment(&self, id: PageId) -> String {
        format!(
            "[{}]{}\n{}",
            self.generation(id) + 1,
            self.name(id),
            self.content(id)
        )
    }

    /// Create a detached page; attach it with [`insert`](Self::insert)
    pub fn add_page(&mut self, name: &str, content: &str) -> PageId {
        self.push_node(name.to_string(), content.to_string())
    }

    /// Place `page` among `parent`'s children.
    ///
    /// With an explicit `index` the page goes there (clamped to the end);
    /// without one it goes to its collation position. A page that is already
    /// attached elsewhere is moved.
    pub fn insert(
        &mut self,
        parent: PageId,
        page: PageId,
        index: Option<usize>,
    ) -> Result<(), TreeError> {
        if page == self.root {
            return Err(TreeError::RootImmovable);
        }
        if page == parent || self.ancestors(parent).contains(&page) {
            return Err(TreeError::Cycle {
                name: self.name(page).to_string(),
            });
        }
        self.check_sibling_name(parent, page, self.name(page))?;

        self.detach(page);

        let siblings = &self.nodes[parent.0].children;
        let position = match index {
            Some(i) => i.min(siblings.len()),
            None => {
                let key = CollationKey::new(self.name(page));
                siblings
                    .iter()
                    .position(|&s| key < CollationKey::new(self.name(s)))
                    .unwrap_or(siblings.len())
            }
        };

        self.nodes[parent.0].children.insert(position, page);
        self.nodes[page.0].parent = Some(parent);
        Ok(())
    }

    /// Detach `page` and its subtree from the tree
    pub fn delete(&mut self, page: PageId) -> Result<(), TreeError> {
        if page == self.root {
            return Err(TreeError::RootImmovable);
        }
        self.detach(page);
        Ok(())
    }

    fn detach(&mut self, page: PageId) {
        if let Some(parent) = self.nodes[page.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != page);
        }
    }

    pub fn set_content(&mut self, id: PageId, content: impl Into<String>) {
        self.nodes[id.0].page.content = content.into();
    }

    /// Rename a page, keeping sibling names unique
    pub fn rename(&mut self, id: PageId, name: &str) -> Result<(), TreeError> {
        if let Some(parent) = self.parent(id) {
            self.check_sibling_name(parent, id, name)?;
        }
        self.nodes[id.0].page.name = name.to_string();
        Ok(())
    }
}

/// Serialises the tree back to the flat source format
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ends_with_newline = true;
        for id in self.traverse() {
            if !ends_with_newline {
                f.write_str("\n")?;
            }
            let fragment = self.fragment(id);
            ends_with_newline = fragment.ends_with('\n');
            f.write_str(&fragment)?;
        }
        Ok(())
    }
}

/// Pre-order page iterator produced by [`Tree::traverse`]
pub struct Traverse<'a> {
    tree: &'a Tree,
    next: Option<PageId>,
}

impl Iterator for Traverse<'_> {
    type Item = PageId;

    fn next(&mut self) -> Option<PageId> {
        let current = self.next?;
        self.next = self.tree.next_node(current);
        Some(current)
    }
}

/// Split a fragment into its heading name and content body
fn split_fragment(fragment: &str) -> Option<(&str, &str)> {
    let (head, body) = fragment.split_once('\n').unwrap_or((fragment, ""));
    let name = head.get(3..)?.trim();
    if name.is_empty() {
        None
    } else {
        Some((name, body))
    }
}
