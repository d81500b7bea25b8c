//! checklib - compliance checks for scientific data files.
//!
//! A check is a configured, reusable validation rule. It is built once from
//! keyword parameters and then invoked on any number of targets, returning
//! an `(achieved, out_of)` score with a severity level and failure messages.
//!
//! # Architecture
//!
//! - `check`: the contract every check follows (configuration, scoring, results)
//! - `checks`: the check library, grouped by what each check inspects
//! - `dataset`: read-only dataset access and the JSON header-dump adapter
//! - `vocab`: controlled vocabularies, term lookup and file-name matching
//! - `registry`: check lookup by class name
//! - `profile`: YAML/JSON rule profile schema
//! - `runner`: runs a profile over many targets in parallel
//! - `score` / `report`: summaries and output formatting (text, JSON)
//!
//! # Adding a New Check
//!
//! Declare a `CheckSpec` and a build function in one of the `checks`
//! modules, then add the `CheckClass` to `FILE_CHECKS` or `DATASET_CHECKS`.

pub mod check;
pub mod checks;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod profile;
pub mod registry;
pub mod report;
pub mod runner;
pub mod score;
pub mod vocab;

pub use check::{Check, CheckClass, CheckEnv, CheckOptions, CheckResult, Level, Parameters, Target};
pub use dataset::{Dataset, DatasetOpener, JsonDatasetOpener, MemoryDataset};
pub use error::{CheckError, Result};
pub use profile::Profile;
pub use registry::get_check_class;
pub use runner::{RunReport, Runner};
pub use score::Summary;
pub use vocab::{Vocabulary, VocabularyRef, VocabularyStore};
