//! `haystack` identifies the species present in a metagenomic sample, with
//! special care for the damage patterns of ancient DNA.
//!
//! The heavy lifting happens in a [Snakemake](https://snakemake.readthedocs.io/)
//! workflow. This crate is the front end of the workflow:
//!
//! 1. `haystack config` stores the user preferences (NCBI email, genome cache, ...).
//! 1. `haystack database` builds a database of reference genomes.
//! 1. `haystack sample` prepares the reads of a sample.
//! 1. `haystack analyse` assigns the reads of a sample to the database taxa.
//!
//! Each pipeline step resolves a layered [configuration](config), persists a
//! snapshot of it next to its outputs, and hands the resolved run over to the
//! [workflow engine](workflow::WorkflowEngine).

pub mod analyse;
pub mod cli;
pub mod config;
pub mod context;
pub mod database;
pub mod fetch;
pub mod sample;
pub mod utils;
pub mod workflow;

#[cfg(test)]
pub(crate) mod tests;

#[doc(inline)]
pub use crate::cli::Cli;
#[doc(inline)]
pub use crate::config::Config;
#[doc(inline)]
pub use crate::context::Context;
#[doc(inline)]
pub use utils::verbosity::Verbosity;
