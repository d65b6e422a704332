//! Add command

use std::sync::Arc;

use anyhow::{Result, bail};
use crossterm::style::Stylize;

use grab::core::recipe::FileRecipeSource;
use grab::ops::install::install_all;
use grab::{DEFAULT_RECIPE_URL, Paths, RECIPE_REFRESH_INTERVAL};

/// Install one or more packages, each given as `name` or `name@version`.
pub async fn add(packages: &[String], refresh: bool) -> Result<()> {
    let paths = Paths::resolve()?;
    paths.ensure()?;

    let recipe_url = std::env::var("GRAB_RECIPE_URL")
        .unwrap_or_else(|_| DEFAULT_RECIPE_URL.to_string());
    let source = FileRecipeSource::new(paths.recipe_dir.clone(), recipe_url);

    if refresh || source.should_refresh(RECIPE_REFRESH_INTERVAL) {
        println!("{}", "Refreshing package recipes...".blue());
        let client = reqwest::Client::new();
        if let Err(err) = source.refresh(&client).await {
            // Stale recipes are still usable, so keep going
            eprintln!("{}", format!("recipe refresh failed: {err:#}").red());
        }
    }

    let outcome = install_all(Arc::new(source), &paths, packages).await?;

    for pkg in &outcome.installed {
        print!("{}", pkg.install_notes());
    }

    if !outcome.all_installed() {
        bail!(
            "{} of {} packages installed successfully",
            outcome.installed.len(),
            outcome.requested
        );
    }
    println!(
        "{}",
        format!("All {} packages are installed!", outcome.requested).green()
    );
    Ok(())
}
