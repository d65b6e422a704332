//! Operations - the install pipeline and package removal

pub mod error;
pub mod install;
pub mod remove;

pub use error::InstallError;
pub use install::{InstallOutcome, InstalledPackage, install_all};
