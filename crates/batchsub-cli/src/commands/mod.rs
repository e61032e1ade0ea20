//! CLI command implementations.

pub mod common;
pub mod detect;
pub mod local;
pub mod run;
pub mod translate;
pub mod version;
