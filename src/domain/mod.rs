//! Domain logic - pure version resolution rules independent of git access

pub mod configuration;
pub mod format;
pub mod matcher;
pub mod situation;
pub mod template;

pub use configuration::{BranchOverride, VersioningConfiguration};
pub use format::VersionFormatDescription;
pub use matcher::{select_format, FormatMatch, RefKind};
pub use situation::{Describe, GitSituation};
