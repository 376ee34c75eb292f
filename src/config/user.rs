//! User preferences: validation and the interactive prompt.

use crate::context::Context;
use crate::utils;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::str::FromStr;
use std::sync::OnceLock;

/// Something, an `@`, something, a `.`, something.
pub const EMAIL_PATTERN: &str = r"^[^@]+@[^@]+\.[^@]+";

/// Number of chances to type a valid email address.
pub const EMAIL_ATTEMPTS: usize = 3;

/// The user preferences that `haystack config` manages.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct UserConfig {
    /// Contact email for the NCBI Entrez API.
    pub email: String,
    /// Where downloaded genomes are stored.
    pub genome_cache_folder: String,
    /// Number of records per Entrez request.
    pub batchsize: u64,
    /// Base mismatch probability.
    pub mismatch_probability: f64,
    /// Threads for the bowtie2 alignments.
    pub bowtie2_threads: u64,
    /// Factor to rescale/chunk the input of the filtering index.
    pub bowtie2_scaling: f64,
    /// Use conda to manage the workflow software.
    pub use_conda: bool,
}

/// Returns true if `email` looks like an email address.
///
/// ```rust
/// use haystack::config::user::is_valid_email;
///
/// assert!(is_valid_email("someone@example.org").unwrap());
/// assert!(!is_valid_email("someone.example.org").unwrap());
/// assert!(!is_valid_email("someone@example").unwrap());
/// ```
pub fn is_valid_email(email: &str) -> Result<bool, Report> {
    static EMAIL_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let regex = EMAIL_REGEX
        .get_or_init(|| Regex::new(EMAIL_PATTERN))
        .as_ref()
        .map_err(|e| eyre!("Invalid email pattern {EMAIL_PATTERN:?}: {e}"))?;
    Ok(regex.is_match(email))
}

fn positive<T>(value: T, description: &str) -> Result<(), Report>
where
    T: PartialOrd + Default,
{
    if value <= T::default() {
        return Err(eyre!("Please provide a positive value for the {description}."));
    }
    Ok(())
}

impl UserConfig {
    /// Check that the preferences are usable.
    pub fn check(&self, context: &Context) -> Result<(), Report> {
        if !is_valid_email(&self.email)? {
            return Err(eyre!("The email address you provided is not valid: {:?}", self.email))
                .suggestion("An email address is required in order to access NCBI's Entrez API.");
        }

        let genome_cache = context.resolve(&self.genome_cache_folder);
        utils::check_output_dir(&genome_cache, "genome cache", 1)?;

        positive(self.batchsize, "batchsize")?;
        positive(self.mismatch_probability, "mismatch probability")?;
        positive(self.bowtie2_threads, "bowtie2 threads")?;
        positive(self.bowtie2_scaling, "bowtie2 scaling factor")?;

        Ok(())
    }

    /// Ask for every preference on `output`, reading the answers from `input`.
    ///
    /// The email is asked up to [`EMAIL_ATTEMPTS`] times. For the other values an
    /// empty answer keeps the value of `defaults`.
    pub fn prompt<R, W>(defaults: &UserConfig, input: &mut R, output: &mut W) -> Result<UserConfig, Report>
    where
        R: BufRead,
        W: Write,
    {
        let mut email = None;
        for _ in 0..EMAIL_ATTEMPTS {
            let answer = ask(
                input,
                output,
                "Please enter a valid email address. It is required, in order to access NCBI's Entrez API. \
                 The address is stored locally on your computer only: ",
            )?;
            if is_valid_email(&answer)? {
                email = Some(answer);
                break;
            }
            writeln!(output, "The email address you provided is not valid. Please try again.")?;
        }
        let email = email
            .ok_or_else(|| eyre!("No valid email address was provided."))
            .suggestion("Please run `haystack config` again to input a valid email address.")?;

        let genome_cache_folder = ask_or(
            input,
            output,
            "Enter your preferred path for the genome cache folder.",
            defaults.genome_cache_folder.clone(),
        )?;
        let trimmed = genome_cache_folder.trim_end_matches('/');
        let genome_cache_folder = match trimmed.is_empty() {
            true => genome_cache_folder.clone(),
            false => trimmed.to_string(),
        };

        let config = UserConfig {
            email,
            genome_cache_folder,
            batchsize: ask_or(
                input,
                output,
                "Enter your preferred batchsize for fetching accession data from the NCBI.",
                defaults.batchsize,
            )?,
            mismatch_probability: ask_or(
                input,
                output,
                "Enter your preferred mismatch probability.",
                defaults.mismatch_probability,
            )?,
            bowtie2_threads: ask_or(
                input,
                output,
                "Enter your preferred number of threads that bowtie2 can use.",
                defaults.bowtie2_threads,
            )?,
            bowtie2_scaling: ask_or(
                input,
                output,
                "Enter your preferred scaling factor for the size of the bowtie2 index chunks.",
                defaults.bowtie2_scaling,
            )?,
            use_conda: ask_or(
                input,
                output,
                "Enter your preference about using conda as a package manager (true/false).",
                defaults.use_conda,
            )?,
        };

        Ok(config)
    }
}

/// Print `question` and read one trimmed line.
fn ask<R, W>(input: &mut R, output: &mut W, question: &str) -> Result<String, Report>
where
    R: BufRead,
    W: Write,
{
    write!(output, "{question}")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer).wrap_err("Failed to read the answer.")?;
    Ok(answer.trim().to_string())
}

/// Print `question` and parse the answer, keeping `default` on an empty answer.
fn ask_or<R, W, T>(input: &mut R, output: &mut W, question: &str, default: T) -> Result<T, Report>
where
    R: BufRead,
    W: Write,
    T: FromStr + std::fmt::Display,
{
    let question = format!("{question} Press enter if you'd like to use the default value ({default}): ");
    let answer = ask(input, output, &question)?;
    if answer.is_empty() {
        return Ok(default);
    }
    // booleans are accepted as True/False too
    answer
        .parse()
        .or_else(|_| answer.to_lowercase().parse())
        .map_err(|_| eyre!("Invalid value: {answer:?}"))
        .suggestion(format!("Please run `haystack config` again. The default value is {default}."))
}
