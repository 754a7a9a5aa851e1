//! # treewiki-render
//!
//! Template rendering and publishing for treewiki.
//!
//! This crate fills user page templates with rendered content and
//! navigation fragments (built with Askama) and writes whole sites to disk.

pub mod publish;
pub mod templates;

pub use publish::{PublishError, PublishOptions, PublishReport, Publisher, WriteFailure};
pub use templates::{
    LinkItem, LinkListTemplate, MenuNode, NavFooterTemplate, PageTemplate, Placeholder,
    TemplateError, TocTemplate,
};
