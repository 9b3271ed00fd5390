//! Project initialization
//!
//! `isy init` creates the state folder, asks a handful of questions to fill
//! in the configuration and drops a starter manifest next to it. Questions
//! are read from any [`BufRead`] so the wizard can be driven from tests.

use crate::config::Config;
use crate::error::{IsyError, Result};
use crate::paths::IsyPaths;
use crate::prompt::Prompter;
use std::fs;
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Content of a freshly created manifest
pub const MANIFEST_TEMPLATE: &str = "# Add your file patterns here\n";

/// What [`initialize`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitOutcome {
    /// An existing state folder was wiped first
    pub wiped: bool,
    /// The manifest did not exist and was created
    pub manifest_created: bool,
}

/// Ask for every configuration field
pub fn prompt_config<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<Config> {
    Ok(Config {
        project_name: prompter.ask("Project name:")?,
        author: prompter.ask("Author or company:")?,
        language_and_framework: prompter.ask("Language and/or framework:")?,
        description: prompter.ask("Describe the project (goals, features, ...):")?,
        api_key: prompter.ask("OpenAI API key:")?,
        response_language: prompter.ask("Language isy should answer in (en, it, ...):")?,
    })
}

/// Write the state folder, configuration and manifest
///
/// An existing `.isycontext` is left alone.
///
/// # Errors
///
/// - [`IsyError::AlreadyInitialized`] if the state folder exists and `force` is false
pub fn initialize(paths: &IsyPaths, config: &Config, force: bool) -> Result<InitOutcome> {
    let state_dir = paths.state_dir();
    let wiped = state_dir.exists();
    if wiped {
        if !force {
            return Err(IsyError::AlreadyInitialized(state_dir));
        }
        debug!("Removing existing state folder {:?}", state_dir);
        fs::remove_dir_all(&state_dir)?;
    }

    fs::create_dir_all(&state_dir)?;
    config.save(&paths.config())?;

    let manifest = paths.manifest();
    let manifest_created = !manifest.exists();
    if manifest_created {
        fs::write(&manifest, MANIFEST_TEMPLATE)?;
    }

    info!("Initialized project {:?} at {:?}", config.project_name, paths.root());
    Ok(InitOutcome {
        wiped,
        manifest_created,
    })
}

/// Interactive initialization
///
/// Returns `None` when the user declines to wipe an existing project.
pub fn run_wizard<R: BufRead, W: Write>(
    paths: &IsyPaths,
    prompter: &mut Prompter<R, W>,
    force: bool,
) -> Result<Option<(Config, InitOutcome)>> {
    if paths.state_dir().exists()
        && !force
        && !prompter.confirm("Project already initialized. Wipe it and start over?")?
    {
        return Ok(None);
    }

    let config = prompt_config(prompter)?;
    let outcome = initialize(paths, &config, true)?;
    Ok(Some((config, outcome)))
}
