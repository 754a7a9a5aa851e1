//! Relative hyperlinks between rendered pages.
//!
//! Internal pages render to `<slug>/index.html` inside their parent's
//! folder and leaf pages render to `<slug>.html`. Every href is relative
//! to the linking page's own output file, so a published site can be
//! served from any prefix.

use crate::slug::url_form;
use crate::tree::{PageId, Tree};

/// Destination of a link: another page, or a path relative to the site root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget<'a> {
    Page(PageId),
    Path(&'a str),
}

impl From<PageId> for LinkTarget<'_> {
    fn from(id: PageId) -> Self {
        LinkTarget::Page(id)
    }
}

impl<'a> From<&'a str> for LinkTarget<'a> {
    fn from(path: &'a str) -> Self {
        LinkTarget::Path(path)
    }
}

pub struct LinkResolver<'a> {
    tree: &'a Tree,
}

impl<'a> LinkResolver<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        Self { tree }
    }

    pub fn slug(&self, id: PageId) -> String {
        url_form(self.tree.name(id))
    }

    /// Output file for a page, relative to the output directory
    pub fn output_path(&self, id: PageId) -> String {
        if id == self.tree.root() {
            return "index.html".to_string();
        }
        let slugs: Vec<String> = self.tree.lineage(id)[1..]
            .iter()
            .map(|&n| self.slug(n))
            .collect();
        let path = slugs.join("/");
        if self.tree.is_leaf(id) {
            format!("{path}.html")
        } else {
            format!("{path}/index.html")
        }
    }

    /// Folder levels between the page's output file and the site root
    pub fn depth(&self, id: PageId) -> usize {
        (self.tree.generation(id) + self.adjustment(id)).saturating_sub(1)
    }

    /// Relative href from `from` to `to`; empty when linking to itself
    pub fn href<'t>(&self, from: PageId, to: impl Into<LinkTarget<'t>>) -> String {
        let to = match to.into() {
            LinkTarget::Path(path) => return format!("{}{}", up(self.depth(from)), path),
            LinkTarget::Page(to) => to,
        };
        if to == from {
            return String::new();
        }
        if to == self.tree.root() {
            return format!("{}index.html", up(self.depth(from)));
        }

        let reach = self.tree.generation(from) + self.adjustment(from);
        let origin = self.tree.lineage(from);
        let destination = self.tree.lineage(to);
        let common = origin
            .iter()
            .zip(&destination)
            .take_while(|(a, b)| a == b)
            .count();

        if common == destination.len() {
            // Ancestor: climb to its parent folder and enter it
            let levels = reach.saturating_sub(self.tree.generation(to));
            return format!("{}{}/index.html", up(levels), self.slug(to));
        }

        let down: Vec<String> = destination[common..]
            .iter()
            .map(|&n| self.slug(n))
            .collect();
        let file = if self.tree.is_leaf(to) {
            ".html"
        } else {
            "/index.html"
        };
        format!(
            "{}{}{}",
            up(reach.saturating_sub(common)),
            down.join("/"),
            file
        )
    }

    /// An anchor whose text is `template` with `{name}` replaced by the
    /// destination's display name. A link to the current page is bare text.
    pub fn hyperlink<'t>(
        &self,
        from: PageId,
        to: impl Into<LinkTarget<'t>>,
        template: &str,
    ) -> String {
        let to = to.into();
        let name = match to {
            LinkTarget::Page(id) => self.tree.name(id),
            LinkTarget::Path(path) => path,
        };
        let text = template.replace("{name}", name);
        let href = self.href(from, to);
        if href.is_empty() {
            return text;
        }
        format!("<a href=\"{href}\">{text}</a>")
    }

    fn adjustment(&self, id: PageId) -> usize {
        if self.tree.is_leaf(id) {
            0
        } else {
            1
        }
    }
}

fn up(levels: usize) -> String {
    "../".repeat(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "[1]Dictionary\n[2]Words\n[3]ka\n[3]pata\n[2]Affixes\n[3]-ka\n";

    fn tree() -> Tree {
        Tree::parse(SOURCE, 2).unwrap().tree
    }

    #[test]
    fn test_output_paths() {
        let tree = tree();
        let links = LinkResolver::new(&tree);
        let paths: Vec<String> = tree.traverse().map(|id| links.output_path(id)).collect();
        assert_eq!(
            paths,
            vec![
                "index.html",
                "words/index.html",
                "words/ka.html",
                "words/pata.html",
                "affixes/index.html",
                "affixes/-ka.html",
            ]
        );
    }

    #[test]
    fn test_hrefs() {
        let tree = tree();
        let links = LinkResolver::new(&tree);
        let id = |name| tree.find(name).unwrap();
        let root = tree.root();

        assert_eq!(links.href(id("pata"), root), "../index.html");
        assert_eq!(links.href(id("Words"), root), "../index.html");
        assert_eq!(links.href(root, id("pata")), "words/pata.html");
        assert_eq!(links.href(id("pata"), id("Words")), "../words/index.html");
        assert_eq!(links.href(id("Words"), id("pata")), "pata.html");
        assert_eq!(links.href(id("pata"), id("ka")), "ka.html");
        assert_eq!(links.href(id("pata"), id("-ka")), "../affixes/-ka.html");
        assert_eq!(links.href(id("Words"), id("Affixes")), "../affixes/index.html");
        assert_eq!(links.href(id("pata"), id("pata")), "");
    }

    #[test]
    fn test_ancestor_links_climb_expected_levels() {
        let tree = tree();
        let links = LinkResolver::new(&tree);
        for id in tree.traverse() {
            let reach = tree.generation(id) + usize::from(!tree.is_leaf(id));
            for ancestor in tree.ancestors(id) {
                let href = links.href(id, ancestor);
                let expected = if ancestor == tree.root() {
                    reach - 1
                } else {
                    reach - tree.generation(ancestor)
                };
                assert_eq!(href.matches("../").count(), expected, "{href}");
            }
        }
    }

    #[test]
    fn test_path_targets() {
        let tree = tree();
        let links = LinkResolver::new(&tree);
        assert_eq!(links.href(tree.root(), "style.css"), "style.css");
        assert_eq!(links.href(tree.find("Words").unwrap(), "style.css"), "../style.css");
        assert_eq!(links.href(tree.find("ka").unwrap(), "style.css"), "../style.css");
    }

    #[test]
    fn test_hyperlink() {
        let tree = tree();
        let links = LinkResolver::new(&tree);
        let pata = tree.find("pata").unwrap();
        assert_eq!(
            links.hyperlink(pata, tree.root(), "Back to {name}"),
            "<a href=\"../index.html\">Back to Dictionary</a>"
        );
        assert_eq!(links.hyperlink(pata, pata, "{name}"), "pata");
    }
}
