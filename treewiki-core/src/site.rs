//! A loaded site: page tree, codec and resolved configuration.
//!
//! This is the surface the editing layer talks to: load a site, read or
//! replace a page's content, serialise the tree and produce the index.

use crate::codec::{CodecError, MarkupCodec};
use crate::config::SiteConfig;
use crate::contents::ContentRenderer;
use crate::links::LinkResolver;
use crate::models::Diagnostic;
use crate::search::{Analysis, SearchIndexer};
use crate::tree::{PageId, Tree, TreeError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Failed to read source file {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Failed to parse {}: {source}", .path.display())]
    Tree {
        path: PathBuf,
        #[source]
        source: TreeError,
    },
}

pub struct Site {
    config: SiteConfig,
    tree: Tree,
    codec: MarkupCodec,
    diagnostics: Vec<Diagnostic>,
}

impl Site {
    /// Read the source file and replacement table named by `config`
    pub fn load(config: &SiteConfig) -> Result<Self, SiteError> {
        let source = std::fs::read_to_string(&config.source).map_err(|source| SiteError::Source {
            path: config.source.clone(),
            source,
        })?;
        let codec = match &config.replacements {
            Some(path) => MarkupCodec::from_file(path)?,
            None => MarkupCodec::default(),
        };

        let site = Self::from_source(config.clone(), &source, codec)?;
        tracing::info!(
            "Loaded site '{}' with {} pages",
            site.name(),
            site.tree.traverse().count()
        );
        Ok(site)
    }

    /// Build a site from source text already in memory
    pub fn from_source(
        config: SiteConfig,
        source: &str,
        codec: MarkupCodec,
    ) -> Result<Self, SiteError> {
        let parsed = Tree::parse(source, config.leaf_level).map_err(|source| SiteError::Tree {
            path: config.source.clone(),
            source,
        })?;

        for diag in &parsed.diagnostics {
            tracing::warn!("{}: {}", config.name, diag.message);
        }

        Ok(Self {
            config,
            tree: parsed.tree,
            codec,
            diagnostics: parsed.diagnostics,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn codec(&self) -> &MarkupCodec {
        &self.codec
    }

    /// Parse warnings collected while loading
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// A page's content in the authoring notation
    pub fn markdown(&self, id: PageId) -> String {
        self.codec.to_markdown(self.tree.content(id))
    }

    /// Replace a page's content from the authoring notation
    pub fn set_markdown(&mut self, id: PageId, text: &str) {
        let markup = self.codec.to_markup(text);
        self.tree.set_content(id, markup);
    }

    /// The whole tree in the flat source format
    pub fn serialize(&self) -> String {
        self.tree.to_string()
    }

    /// Write the serialised tree back to the source file
    pub fn save_source(&self) -> std::io::Result<()> {
        std::fs::write(&self.config.source, self.serialize())?;
        tracing::info!("Saved source to {:?}", self.config.source);
        Ok(())
    }

    pub fn links(&self) -> LinkResolver<'_> {
        LinkResolver::new(&self.tree)
    }

    pub fn renderer(&self) -> ContentRenderer<'_> {
        ContentRenderer::new(&self.tree, &self.codec)
    }

    pub fn indexer(&self) -> SearchIndexer<'_> {
        SearchIndexer::new(&self.tree, &self.codec, &self.config.dropped_spans)
    }

    /// Build the site-wide word index
    pub fn analysis(&self) -> Analysis {
        self.indexer().analyze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn site_config(dir: &std::path::Path) -> SiteConfig {
        SiteConfig {
            name: "grammar".to_string(),
            source: dir.join("grammar.txt"),
            template: dir.join("template.html"),
            replacements: Some(dir.join("replacements.txt")),
            output: dir.join("out"),
            leaf_level: 1,
            stylesheet: "style.css".to_string(),
            dropped_spans: vec!["ipa".to_string()],
            search_index: "search-index.json".to_string(),
            assets: None,
        }
    }

    #[test]
    fn test_load_and_edit_round_trip() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("grammar.txt"), "[1]Grammar\n[2]Nouns\n[b]case[/b]\n").unwrap();
        fs::write(
            dir.path().join("replacements.txt"),
            "[b] <strong>\n[/b] </strong>\n",
        )
        .unwrap();

        let mut site = Site::load(&site_config(dir.path())).unwrap();
        let nouns = site.tree().find("Nouns").unwrap();
        assert_eq!(site.markdown(nouns), "<strong>case</strong>\n");

        site.set_markdown(nouns, "<strong>number</strong>\n");
        let stored = site.tree().content(nouns).to_string();
        assert!(stored.starts_with("[b]number[/b]\n&date="));
        assert_eq!(site.markdown(nouns), "<strong>number</strong>\n");

        site.save_source().unwrap();
        let saved = fs::read_to_string(dir.path().join("grammar.txt")).unwrap();
        assert!(saved.starts_with("[1]Grammar\n[2]Nouns\n[b]number[/b]\n&date="));
    }

    #[test]
    fn test_missing_replacement_table_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("grammar.txt"), "[1]Grammar\n").unwrap();

        let err = Site::load(&site_config(dir.path())).err().unwrap();
        assert!(matches!(err, SiteError::Codec(CodecError::Missing { .. })));
        assert!(err.to_string().contains("replacements.txt"));
    }

    #[test]
    fn test_parse_warnings_kept() {
        let mut config = site_config(std::path::Path::new("/tmp"));
        config.replacements = None;
        let site = Site::from_source(config, "[1]Root\n[2]A\n[2]A\n", MarkupCodec::default()).unwrap();
        assert_eq!(site.diagnostics().len(), 1);
        assert_eq!(site.diagnostics()[0].code, "parse.duplicate");
    }
}
