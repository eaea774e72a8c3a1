//! crates.io index access for the topcrates mirror builder.
//!
//! Reads the newline-delimited JSON index format, maps package names onto
//! the sharded directory layout, and resolves version requirements against
//! published, non-yanked versions.

pub mod error;
pub mod layout;
pub mod package;
pub mod record;
pub mod source;

pub use error::{IndexError, Result};
pub use layout::{archive_file_name, index_path, validate_name};
pub use package::{parse_requirement, Package};
pub use record::{DepKind, IndexDependency, IndexRecord};
pub use source::{FsIndex, IndexSource, MemoryIndex};

/// Re-exported so dependents name the same version types.
pub use semver::{Version, VersionReq};
