//! Core modules - pure, stateless logic

pub mod recipe;
pub mod spec;
