use assert_cmd::Command;
use predicates::str::contains;
use std::path::Path;
use tempfile::TempDir;

/// A home directory with the workflow files, and a stand-in workflow engine.
struct Env {
    home: TempDir,
}

impl Env {
    fn new() -> Self {
        let home = tempfile::tempdir().unwrap();
        let workflow = home.path().join("workflow");
        std::fs::create_dir_all(&workflow).unwrap();
        for snakefile in ["Snakefile_db", "Snakefile_sample", "Snakefile"] {
            std::fs::write(workflow.join(snakefile), "").unwrap();
        }
        Env { home }
    }

    fn configured() -> Self {
        let env = Env::new();
        env.cmd().arg("config").write_stdin("someone@example.org\n\n\n\n\n\n\n").assert().success();
        env
    }

    fn path(&self) -> &Path {
        self.home.path()
    }

    /// haystack with a workflow engine that always succeeds.
    fn cmd(&self) -> Command {
        self.cmd_with_engine("true")
    }

    fn cmd_with_engine(&self, engine: &str) -> Command {
        let mut cmd = Command::cargo_bin("haystack").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("HAYSTACK_WORKFLOW_DIR", self.path().join("workflow"))
            .env("HAYSTACK_SNAKEMAKE", engine)
            .env_remove("NCBI_API_KEY");
        cmd
    }
}

#[test]
fn help() {
    let env = Env::new();
    env.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("database"))
        .stdout(contains("analyse"));
}

#[test]
fn config_requires_prompt_first() {
    let env = Env::new();
    env.cmd()
        .args(["config", "--email", "someone@example.org"])
        .assert()
        .failure()
        .stderr(contains("not configured"));
    assert!(!env.path().join(".haystack/config.yaml").exists());
}

#[test]
fn config_prompt_then_flags() {
    let env = Env::configured();
    let config = std::fs::read_to_string(env.path().join(".haystack/config.yaml")).unwrap();
    assert!(config.contains("email: someone@example.org"));
    assert!(!config.contains("batchsize"));

    env.cmd().args(["config", "--batchsize", "20"]).assert().success();
    let config = std::fs::read_to_string(env.path().join(".haystack/config.yaml")).unwrap();
    assert!(config.contains("batchsize: 20"));

    env.cmd().args(["config", "--email", "not-an-email"]).assert().failure();
}

#[test]
fn config_invalid_email() {
    let env = Env::new();
    env.cmd().arg("config").write_stdin("a\nb\nc\n").assert().failure();
}

#[test]
fn database_requires_config() {
    let env = Env::new();
    env.cmd()
        .args(["database", "--output", "db", "--refseq-rep"])
        .assert()
        .failure()
        .stderr(contains("haystack config"));
}

#[test]
fn database_build() {
    let env = Env::configured();
    env.cmd()
        .args(["database", "--output", "db", "--query", "Yersinia[Organism]", "--cores", "2"])
        .assert()
        .success()
        .stderr(contains("idx_database.done"));
    assert!(env.path().join("db/database_build_config.yaml").exists());
}

#[test]
fn database_engine_failure() {
    let env = Env::configured();
    env.cmd_with_engine("false")
        .args(["database", "--output", "db", "--refseq-rep"])
        .assert()
        .failure()
        .stderr(contains("--debug"));
}

#[test]
fn sample_then_analyse() {
    let env = Env::configured();
    std::fs::write(env.path().join("reads.fastq.gz"), "").unwrap();

    env.cmd().args(["database", "--output", "db", "--refseq-rep"]).assert().success();
    env.cmd()
        .args(["sample", "--sample-prefix", "ancient1", "--output", "sample", "--fastq", "reads.fastq.gz"])
        .assert()
        .success()
        .stderr(contains("ancient1_adRm.fastq.gz"));
    env.cmd()
        .args(["analyse", "--mode", "abundances", "-D", "db", "-S", "sample", "-o", "results"])
        .assert()
        .success()
        .stderr(contains("ancient1_posterior_abundance.tsv"));
    assert!(env.path().join("results/ancient1_config.yaml").exists());
}

#[test]
fn analyse_threshold_choices() {
    let env = Env::configured();
    env.cmd()
        .args(["analyse", "-m", "align", "-D", "db", "-S", "sample", "-o", "results", "-T", "0.6"])
        .assert()
        .failure()
        .stderr(contains("0.75"));
}
