//! Command modules - one file per CLI command

pub mod add;
pub mod remove;
