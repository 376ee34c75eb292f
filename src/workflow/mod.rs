//! Hand a resolved run over to the workflow engine.
//!
//! Each pipeline subcommand (`database`, `sample`, `analyse`) ends by building
//! a [`Run`]: the Snakefile, the resolved configuration and the target files.
//! The run is then executed by a [`WorkflowEngine`], which is [`Snakemake`]
//! outside of tests.

use crate::config::{display_value, Config};
use crate::utils::table::Table;
use clap::Args;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use haystack_entrez::MAX_ENTREZ_REQUESTS;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable overriding the engine executable.
pub const SNAKEMAKE_ENV: &str = "HAYSTACK_SNAKEMAKE";

/// Times a failed job is restarted, outside of debug mode.
pub const RESTART_TIMES: u32 = 3;

// ----------------------------------------------------------------------------
// Run Arguments
// ----------------------------------------------------------------------------

/// Options shared by every subcommand that runs the workflow.
#[derive(Args, Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RunArgs {
    /// Number of cores for haystack to use.
    #[clap(short = 'c', long, default_value_t = RunArgs::default().cores)]
    pub cores: usize,

    /// Max memory resources (MB) allowed for indexing the input of the filtering alignment.
    ///
    /// Default: max available memory.
    #[clap(short = 'M', long, default_value_t = RunArgs::default().mem)]
    pub mem: u64,

    /// Unlock the working directory after the workflow was abruptly killed.
    #[clap(short = 'u', long)]
    pub unlock: bool,

    /// Debug the haystack workflow.
    #[clap(short = 'd', long)]
    pub debug: bool,

    /// Additional Snakemake flags, ex. --snakemake="--forceall --quiet".
    #[clap(long, allow_hyphen_values = true)]
    pub snakemake: Option<String>,

    /// Show what the workflow would do without running it.
    #[clap(long)]
    pub dry_run: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        RunArgs {
            cores: num_cpus::get(),
            mem: total_memory_mb(),
            unlock: false,
            debug: false,
            snakemake: None,
            dry_run: false,
        }
    }
}

/// Total system memory in MB.
pub fn total_memory_mb() -> u64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    system.total_memory() / 1024 / 1024
}

// ----------------------------------------------------------------------------
// Run
// ----------------------------------------------------------------------------

/// A fully resolved workflow invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    /// Snakefile of the subcommand.
    pub snakefile: PathBuf,
    /// Resolved configuration handed to the workflow.
    pub config: Config,
    /// Files the workflow should produce.
    pub targets: Vec<PathBuf>,
    /// Options given on the command line that differ from the defaults.
    pub user_options: Config,
    /// Engine options.
    pub args: RunArgs,
}

impl Run {
    /// Use conda for the workflow software, unless the config says otherwise.
    pub fn use_conda(&self) -> bool {
        self.config.get_bool("use_conda").unwrap_or(true)
    }

    /// Human readable summary of the run.
    ///
    /// All config parameters are listed in debug mode, otherwise just the user options.
    pub fn summary(&self) -> String {
        let parameters = if self.args.debug { &self.config } else { &self.user_options };

        let mut table = Table::new();
        table.headers = vec!["Parameter".to_string(), "Value".to_string()];
        parameters.iter().for_each(|(key, value)| table.add_row(vec![key.clone(), display_value(value)]));

        let targets = self.targets.iter().map(|t| t.display().to_string()).collect::<Vec<_>>().join("\n");

        format!(
            "RUN DETAILS\n\nSnakefile: {}\n\nConfig Parameters:\n\n{}\nTarget Output Files:\n\n{targets}\n",
            self.snakefile.display(),
            table.to_markdown(),
        )
    }
}

// ----------------------------------------------------------------------------
// Engines
// ----------------------------------------------------------------------------

/// Something that can execute a [`Run`].
pub trait WorkflowEngine {
    /// Execute the run, returning true if the workflow succeeded.
    fn execute(&self, run: &Run) -> Result<bool, Report>;
}

/// The Snakemake command-line program.
#[derive(Clone, Debug, PartialEq)]
pub struct Snakemake {
    pub executable: OsString,
}

impl Default for Snakemake {
    fn default() -> Self {
        Snakemake { executable: OsString::from("snakemake") }
    }
}

impl Snakemake {
    /// Snakemake from the `PATH`, or from [`SNAKEMAKE_ENV`] if set.
    pub fn from_env() -> Self {
        match std::env::var_os(SNAKEMAKE_ENV) {
            Some(executable) => Snakemake { executable },
            None => Snakemake::default(),
        }
    }

    /// Command-line arguments for `run`, reading the config from `configfile`.
    pub fn args(&self, run: &Run, configfile: &Path) -> Vec<OsString> {
        let (keep_going, restart_times) = match run.args.debug {
            true => (false, 0),
            false => (true, RESTART_TIMES),
        };

        let mut args: Vec<OsString> = vec![
            "--snakefile".into(),
            run.snakefile.clone().into(),
            "--configfile".into(),
            configfile.into(),
            "--cores".into(),
            run.args.cores.to_string().into(),
            "--restart-times".into(),
            restart_times.to_string().into(),
            "--resources".into(),
            format!("entrez_api={MAX_ENTREZ_REQUESTS}").into(),
        ];

        let switches = [
            (keep_going, "--keep-going"),
            (run.args.debug, "--printshellcmds"),
            (run.args.debug, "--show-failed-logs"),
            (run.args.dry_run, "--dry-run"),
            (run.args.unlock, "--unlock"),
            (run.use_conda(), "--use-conda"),
        ];
        args.extend(switches.into_iter().filter(|(on, _)| *on).map(|(_, flag)| flag.into()));

        if let Some(extra) = &run.args.snakemake {
            args.extend(extra.split_whitespace().map(OsString::from));
        }
        args.extend(run.targets.iter().map(|t| t.clone().into_os_string()));

        args
    }
}

impl WorkflowEngine for Snakemake {
    fn execute(&self, run: &Run) -> Result<bool, Report> {
        let mut configfile = tempfile::Builder::new()
            .prefix("haystack_config_")
            .suffix(".yaml")
            .tempfile()
            .wrap_err("Failed to create the workflow config file.")?;
        serde_yaml::to_writer(&mut configfile, &run.config)?;
        configfile.flush()?;

        let args = self.args(run, configfile.path());
        debug!("{:?} {args:?}", self.executable);

        let status = Command::new(&self.executable)
            .args(&args)
            .status()
            .wrap_err_with(|| eyre!("Failed to start the workflow engine: {:?}", self.executable))
            .suggestion(format!("Please check that snakemake is installed, or set {SNAKEMAKE_ENV}."))?;

        Ok(status.success())
    }
}

/// Log the run summary and execute it with `engine`.
pub fn launch<E: WorkflowEngine>(engine: &E, run: &Run) -> Result<(), Report> {
    info!("\n{}", run.summary());

    if !engine.execute(run)? {
        return Err(eyre!("The workflow did not complete successfully: {:?}", run.snakefile))
            .suggestion("Please rerun with --debug for the shell commands and logs of the failed jobs.");
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Recording Engine
// ----------------------------------------------------------------------------

/// An engine that records runs instead of executing them.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Recorder {
    pub runs: std::cell::RefCell<Vec<Run>>,
    pub fail: bool,
}

#[cfg(test)]
impl WorkflowEngine for Recorder {
    fn execute(&self, run: &Run) -> Result<bool, Report> {
        self.runs.borrow_mut().push(run.clone());
        Ok(!self.fail)
    }
}

#[cfg(test)]
mod tests {
    use super::{launch, Recorder, Run, RunArgs, Snakemake};
    use crate::config::Config;
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    fn run(args: RunArgs) -> Run {
        Run {
            snakefile: PathBuf::from("/workflow/Snakefile_db"),
            config: Config::from_yaml("use_conda: true\nrank: species\nseed: 1\n").unwrap(),
            targets: vec![PathBuf::from("/db/idx_database.done"), PathBuf::from("/db/bowtie/bowtie_index.done")],
            user_options: Config::from_yaml("seed: 1\n").unwrap(),
            args,
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn default_arguments() {
        let run = run(RunArgs { cores: 4, ..Default::default() });
        let args = strings(Snakemake::default().args(&run, Path::new("/tmp/config.yaml")));
        let expected = [
            "--snakefile",
            "/workflow/Snakefile_db",
            "--configfile",
            "/tmp/config.yaml",
            "--cores",
            "4",
            "--restart-times",
            "3",
            "--resources",
            "entrez_api=3",
            "--keep-going",
            "--use-conda",
            "/db/idx_database.done",
            "/db/bowtie/bowtie_index.done",
        ];
        assert_eq!(args, expected);
    }

    #[test]
    fn debug_arguments() {
        let mut run = run(RunArgs {
            cores: 2,
            debug: true,
            dry_run: true,
            unlock: true,
            snakemake: Some("--forceall  --quiet".to_string()),
            ..Default::default()
        });
        run.config.insert("use_conda", false).unwrap();
        let args = strings(Snakemake::default().args(&run, Path::new("/tmp/config.yaml")));

        assert_eq!(args[7], "0");
        assert!(!args.contains(&"--keep-going".to_string()));
        assert!(!args.contains(&"--use-conda".to_string()));
        let tail = &args[10..];
        let expected = [
            "--printshellcmds",
            "--show-failed-logs",
            "--dry-run",
            "--unlock",
            "--forceall",
            "--quiet",
            "/db/idx_database.done",
            "/db/bowtie/bowtie_index.done",
        ];
        assert_eq!(tail, expected);
    }

    #[test]
    fn summary_parameters() {
        let summary = run(RunArgs::default()).summary();
        assert!(summary.contains("/workflow/Snakefile_db"));
        assert!(summary.contains("| seed "));
        assert!(!summary.contains("| rank "));
        assert!(summary.contains("/db/bowtie/bowtie_index.done"));

        let summary = run(RunArgs { debug: true, ..Default::default() }).summary();
        assert!(summary.contains("| rank "));
        assert!(summary.contains("| use_conda "));

        // one table row per parameter, even for lists
        let mut run = run(RunArgs::default());
        run.user_options.insert("genera", vec!["Yersinia", "Salmonella"]).unwrap();
        let summary = run.summary();
        let row = summary.lines().find(|line| line.contains("| genera ")).unwrap();
        assert!(row.contains("[Yersinia, Salmonella]"));
        assert!(!summary.lines().any(|line| line.starts_with("- ")));
    }

    #[test]
    fn launch_reports_failure() {
        let run = run(RunArgs::default());

        let engine = Recorder::default();
        launch(&engine, &run).unwrap();
        assert_eq!(engine.runs.borrow().as_slice(), &[run.clone()]);

        let engine = Recorder { fail: true, ..Default::default() };
        assert!(launch(&engine, &run).is_err());
    }

    #[test]
    fn engine_process() {
        // `true` and `false` stand in for a succeeding and failing workflow
        let run = run(RunArgs::default());
        let engine = Snakemake { executable: OsString::from("true") };
        assert!(super::WorkflowEngine::execute(&engine, &run).unwrap());
        let engine = Snakemake { executable: OsString::from("false") };
        assert!(!super::WorkflowEngine::execute(&engine, &run).unwrap());
        let engine = Snakemake { executable: OsString::from("/nonexistent/snakemake") };
        assert!(super::WorkflowEngine::execute(&engine, &run).is_err());
    }
}
