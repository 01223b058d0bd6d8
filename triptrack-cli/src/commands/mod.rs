//! CLI command implementations.

pub mod geocode;
pub mod init;
pub mod route;
pub mod track;
