//! Deployment targets and platform filters.
//!
//! Dependency edges in the index may be restricted to a platform with a
//! `cfg(...)` expression or a literal target triple. This crate describes
//! the targets a mirror is meant for and decides which edges apply to them.

pub mod cfg;
pub mod error;
pub mod filter;
pub mod platform;

pub use cfg::CfgExpr;
pub use error::{Result, TargetError};
pub use filter::{PlatformFilter, TargetSet};
pub use platform::{CfgValues, DeploymentTarget};
