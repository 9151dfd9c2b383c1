#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Command-line interface.

use std::path::PathBuf;

use bpaf::*;

/// Parsed command line.
#[derive(Debug, Clone)]
pub struct Options {
    /// Increase log verbosity (repeatable).
    pub verbose:      usize,
    /// Configuration file.
    pub config:       Option<PathBuf>,
    /// Student whose project is graded; names the log file.
    pub student_id:   Option<String>,
    /// Delete the isolated environment after grading.
    pub clean_venv:   bool,
    /// Project to grade.
    pub project_root: String,
}

/// The bpaf parser for [`Options`].
pub fn options() -> OptionParser<Options> {
    let verbose = short('v')
        .long("verbose")
        .help("Increase log verbosity; repeat for more")
        .req_flag(())
        .many()
        .map(|flags| flags.len());

    let config = short('c')
        .long("config")
        .help("Path to the JSON configuration file")
        .argument::<PathBuf>("PATH")
        .optional();

    let student_id = long("student-id")
        .help("Student identifier; logs go to <ID>.log")
        .argument::<String>("ID")
        .optional();

    let clean_venv = long("clean-venv")
        .help("Remove the isolated environment once grading finishes")
        .switch();

    let project_root = positional::<String>("PROJECT_ROOT").help("Python project to grade");

    construct!(Options {
        verbose,
        config,
        student_id,
        clean_venv,
        project_root,
    })
    .to_options()
    .version(env!("CARGO_PKG_VERSION"))
    .descr("Grades a Python project against a configurable set of checks")
}
