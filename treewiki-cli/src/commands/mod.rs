//! CLI command implementations.

pub mod build;
pub mod dev;
pub mod init;
pub mod search;
pub mod source;
pub mod tree;
pub mod verify;

pub use build::build_sites;
pub use dev::dev_server;
pub use init::init_project;
pub use search::search_sites;
pub use source::print_source;
pub use tree::print_tree;
pub use verify::verify_sites;
