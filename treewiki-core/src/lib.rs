//! # treewiki-core
//!
//! Core library for the treewiki publishing engine.
//!
//! This crate provides the fundamental building blocks for parsing the flat
//! source format into a page tree, converting between markup and markdown,
//! resolving relative links between pages, rendering page content and
//! building the word index.

pub mod codec;
pub mod collation;
pub mod config;
pub mod contents;
pub mod links;
pub mod models;
pub mod search;
pub mod site;
pub mod slug;
pub mod tree;

pub use codec::{CodecError, Formatting, MarkupCodec};
pub use collation::CollationKey;
pub use config::{Config, ConfigError, ServerConfig, SiteConfig};
pub use contents::{ContentRenderer, ContentsMode, RenderError, RenderedContent, TocEntry};
pub use links::{LinkResolver, LinkTarget};
pub use models::{Diagnostic, DiagnosticSeverity};
pub use search::{Analysis, PageAnalysis, SearchHit, SearchIndexer};
pub use site::{Site, SiteError};
pub use slug::url_form;
pub use tree::{Cousin, NodePath, Page, PageId, Parsed, Traverse, Tree, TreeError};
