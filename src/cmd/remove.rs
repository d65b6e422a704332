//! Remove command

use anyhow::{Result, bail};
use crossterm::style::Stylize;

use grab::Paths;
use grab::ops::remove::remove_package;

/// Remove one or more packages, each given as `name` or `name@version`.
pub fn remove(packages: &[String]) -> Result<()> {
    let paths = Paths::resolve()?;

    let mut failures = 0;
    for raw in packages {
        match remove_package(&paths, raw) {
            Ok(pruned) => {
                println!(
                    "{}",
                    format!("Removed {raw} ({pruned} bin entries pruned)").green()
                );
            }
            Err(err) => {
                eprintln!("{}", format!("{raw}: {err:#}").red());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} packages could not be removed", packages.len());
    }
    Ok(())
}
