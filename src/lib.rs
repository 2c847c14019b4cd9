pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod overrides;
pub mod resolver;
pub mod session;
pub mod ui;
pub mod version;

pub use error::{GitVersioningError, Result};
pub use session::BuildSession;
pub use version::{resolve_version, ResolvedVersion};
