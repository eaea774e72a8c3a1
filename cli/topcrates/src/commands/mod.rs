//! CLI command implementations.

pub mod init;
pub mod prepare;
pub mod report;
pub mod update;
pub mod verify;
