use crate::config::Config;
use crate::context::Context;
use tempfile::TempDir;

pub const SNAKEFILES: [&str; 3] = ["Snakefile_db", "Snakefile_sample", "Snakefile"];

/// A configured home directory with a workflow directory inside it.
///
/// The working directory is the home directory.
pub fn configured() -> (TempDir, Context) {
    let (tmp, context) = unconfigured();
    Config::from_yaml("email: someone@example.org\nbatchsize: 10\n")
        .unwrap()
        .write(context.user_config_path())
        .unwrap();
    (tmp, context)
}

/// Like [`configured`], but `haystack config` was never run.
pub fn unconfigured() -> (TempDir, Context) {
    let tmp = tempfile::tempdir().unwrap();
    let context = Context {
        home: tmp.path().to_path_buf(),
        cwd: tmp.path().to_path_buf(),
        workflow_dir: tmp.path().join("workflow"),
    };
    std::fs::create_dir_all(&context.workflow_dir).unwrap();
    for snakefile in SNAKEFILES {
        std::fs::write(context.workflow_dir.join(snakefile), "").unwrap();
    }
    (tmp, context)
}

/// Write an empty file at `path` relative to the home directory.
pub fn touch(context: &Context, path: &str) -> std::path::PathBuf {
    let path = context.home.join(path);
    crate::utils::create_parent_dir(&path).unwrap();
    std::fs::write(&path, "").unwrap();
    path
}
