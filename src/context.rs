//! Where the invocation happens: home, working directory and workflow files.

use crate::utils;
use color_eyre::eyre::{eyre, ContextCompat, Report, Result, WrapErr};
use color_eyre::Help;
use std::path::{Path, PathBuf};

/// Environment variable overriding the workflow directory.
pub const WORKFLOW_DIR_ENV: &str = "HAYSTACK_WORKFLOW_DIR";

/// Name of the per-user configuration directory, relative to home.
pub const USER_CONFIG_DIR: &str = ".haystack";

/// Name of the configuration file inside [`USER_CONFIG_DIR`].
pub const USER_CONFIG_FILE: &str = "config.yaml";

/// The filesystem locations that an invocation depends on.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    /// User home directory.
    pub home: PathBuf,
    /// Current working directory.
    pub cwd: PathBuf,
    /// Directory with the Snakefiles and workflow rules.
    pub workflow_dir: PathBuf,
}

impl Context {
    /// Build the context of the running process.
    pub fn from_env() -> Result<Self, Report> {
        let home = dirs::home_dir()
            .wrap_err("Failed to locate the home directory.")
            .suggestion("Please set the HOME environment variable.")?;
        let cwd = std::env::current_dir().wrap_err("Failed to read the current directory.")?;
        let workflow_dir = match std::env::var_os(WORKFLOW_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => Path::new(env!("CARGO_MANIFEST_DIR")).join("workflow"),
        };
        Ok(Context { home, cwd, workflow_dir })
    }

    /// Path of the persisted user preferences.
    pub fn user_config_path(&self) -> PathBuf {
        self.home.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE)
    }

    /// Resolve a user-supplied path, see [`utils::resolve_path`].
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        utils::resolve_path(path, &self.home, &self.cwd)
    }

    /// Path of a Snakefile in the workflow directory, which must exist.
    pub fn snakefile(&self, name: &str) -> Result<PathBuf, Report> {
        let path = self.workflow_dir.join(name);
        if !path.exists() {
            return Err(eyre!("Cannot find Snakefile at {path:?}"))
                .suggestion(format!("Set {WORKFLOW_DIR_ENV} to the directory of the haystack workflow."));
        }
        Ok(path)
    }
}
