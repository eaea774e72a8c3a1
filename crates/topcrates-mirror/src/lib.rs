//! Top-crates selection and local registry mirroring.
//!
//! A run is a short, one-directional pipeline:
//!
//! - **selection**: configured names, download rankings and category quotas,
//!   minus exclusion patterns
//! - **closure**: the current version of every selected package plus every
//!   version its dependency edges resolve to, transitively
//! - **mirror**: index lines and `.crate` archives written into a Cargo
//!   local registry, append-only
//!
//! Index and configuration are passed in as values, so every stage runs
//! against a synthetic [`topcrates_index::MemoryIndex`] as easily as against
//! a crates.io-index checkout.

pub mod cache;
pub mod closure;
pub mod config;
pub mod error;
pub mod integrity;
pub mod mirror;
pub mod pipeline;
pub mod report;
pub mod selection;
pub mod stats;

pub use cache::ArchiveCache;
pub use closure::{build_closure, Closure, ClosureOptions, Omission, OmissionReason, OptionalDeps, PackageId};
pub use config::{Config, CONFIG_FILE};
pub use error::{MirrorError, Result};
pub use integrity::Checksum;
pub use mirror::{cargo_source_config, verify_mirror, MirrorReport, MirrorWriter, VerifyReport};
pub use pipeline::{plan, Filters, Plan};
pub use report::ClosureSummary;
pub use selection::{select, Exclusions, Selection, SelectionRequest, SelectionWarning};
pub use stats::DownloadStats;
