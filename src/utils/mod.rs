//! Path handling shared by the subcommands.

pub mod table;
pub mod verbosity;

use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use rustix::fs::{access, Access};
use std::fmt::Debug;
use std::path::{Component, Path, PathBuf};

/// Resolve a user-supplied path to an absolute path.
///
/// - `~` and `~/...` are relative to `home`.
/// - `.`, `./...` and other relative paths are relative to `cwd`.
/// - Absolute paths are kept.
///
/// Trailing slashes and `.` components are dropped.
///
/// ## Examples
///
/// ```rust
/// use haystack::utils::resolve_path;
/// use std::path::Path;
///
/// let (home, cwd) = (Path::new("/home/user"), Path::new("/data"));
/// assert_eq!(resolve_path("./", home, cwd), Path::new("/data"));
/// assert_eq!(resolve_path("db/", home, cwd), Path::new("/data/db"));
/// assert_eq!(resolve_path("~/db", home, cwd), Path::new("/home/user/db"));
/// assert_eq!(resolve_path("/scratch/db", home, cwd), Path::new("/scratch/db"));
/// ```
pub fn resolve_path<P>(path: P, home: &Path, cwd: &Path) -> PathBuf
where
    P: AsRef<Path>,
{
    let path = path.as_ref();

    let resolved = if let Ok(rest) = path.strip_prefix("~") {
        home.join(rest)
    } else if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    resolved.components().filter(|c| !matches!(c, Component::CurDir)).collect()
}

/// Returns true if the current user may write to `path`.
pub fn is_writable<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    access(path.as_ref(), Access::WRITE_OK).is_ok()
}

/// Check that a directory can be used for output.
///
/// An existing directory must be writable. A directory that does not exist
/// yet is accepted if its closest existing ancestor is a writable directory,
/// at most `levels` levels up.
pub fn check_output_dir<P>(path: P, description: &str, levels: usize) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    let path = path.as_ref();

    let writable = if path.exists() {
        is_writable(path)
    } else {
        path.ancestors()
            .skip(1)
            .take(levels)
            .find(|parent| parent.exists())
            .is_some_and(|parent| parent.is_dir() && is_writable(parent))
    };

    if !writable {
        return Err(eyre!("The directory path you have provided is not writable: {path:?}")
            .suggestion(format!("Please choose another path for your {description} directory.")));
    }

    Ok(())
}

/// Check that an input file exists.
pub fn check_input_file<P>(path: P, flag: &str) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    if !path.as_ref().exists() {
        return Err(eyre!("The file path you provided to {flag} does not exist: {path:?}")
            .suggestion("Please provide a valid path."));
    }
    Ok(())
}

/// Create the parent directory of a file path, if it doesn't exist.
pub fn create_parent_dir<P>(path: P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directory: {parent:?}"))?;
        }
    }
    Ok(())
}
