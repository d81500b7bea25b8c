//! Command-line interface for checklib.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::check::{CheckClass, Family};
use crate::dataset::JsonDatasetOpener;
use crate::profile::{self, Profile};
use crate::registry;
use crate::report;
use crate::runner::{self, Runner};
use crate::score;
use crate::vocab::VocabularyStore;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Compliance checks for scientific data files.
///
/// Runs a profile of attribute, variable, vocabulary and file-name checks
/// over data files and reports a score for each.
#[derive(Parser)]
#[command(name = "checklib")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a rule profile over data files
    #[command(visible_alias = "check")]
    Run(RunArgs),
    /// List every registered check
    List(ListArgs),
}

/// Arguments for the run command.
#[derive(Parser)]
pub struct RunArgs {
    /// Files or directories to check
    #[arg(required = true)]
    pub targets: Vec<PathBuf>,

    /// Path to the rule profile (YAML or JSON)
    #[arg(short, long)]
    pub profile: PathBuf,

    /// Root of the vocabulary archive (<root>/<authority>/<scope>/<collection>/<term>)
    #[arg(long)]
    pub vocabs: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the list command.
#[derive(Parser)]
pub struct ListArgs {
    /// Only list one family: file or dataset
    #[arg(long)]
    pub family: Option<String>,
}

/// Run the run command.
pub fn run_checks(args: &RunArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let profile = match Profile::parse_file(&args.profile) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error parsing profile: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if let Err(e) = profile::validate(&profile) {
        eprintln!("Error: invalid profile: {:#}", e);
        return Ok(EXIT_ERROR);
    }

    let targets = runner::collect_targets(&args.targets)?;
    if targets.is_empty() {
        eprintln!("Warning: no files to check");
        return Ok(EXIT_SUCCESS);
    }

    let store = match &args.vocabs {
        Some(root) => VocabularyStore::from_dir(root.clone()),
        None => VocabularyStore::new(),
    };
    let runner = Runner::new()
        .vocabularies(Arc::new(store))
        .opener(Arc::new(JsonDatasetOpener));
    let report = runner.run(&targets, &profile)?;
    let summary = score::calculate(&report);

    let profile_path = args.profile.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&profile_path, &report, &summary)?,
        _ => report::write_pretty(&profile_path, &report, &summary),
    }

    if summary.passed {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the list command.
pub fn list_checks(args: &ListArgs) -> anyhow::Result<i32> {
    let family = match args.family.as_deref() {
        None => None,
        Some("file") => Some(Family::File),
        Some("dataset") => Some(Family::Dataset),
        Some(other) => {
            eprintln!(
                "Error: unknown family {:?}, must be 'file' or 'dataset'",
                other
            );
            return Ok(EXIT_ERROR);
        }
    };

    println!("Available checks:");
    println!();

    let classes: Vec<&CheckClass> = match family {
        Some(f) => registry::family_classes(f).to_vec(),
        None => registry::check_classes().collect(),
    };
    for class in classes {
        println!(
            "  {:<36} {:<8} {}",
            class.name(),
            class.spec.family.as_str(),
            class.spec.description
        );
    }

    println!();
    println!("Usage:");
    println!("  checklib run <targets>... --profile <profile.yml>");

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "checklib", "-v", "run", "a.nc", "dir", "--profile", "p.yml", "--format", "json",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.targets, vec![PathBuf::from("a.nc"), PathBuf::from("dir")]);
                assert_eq!(args.profile, PathBuf::from("p.yml"));
                assert_eq!(args.format, "json");
                assert!(args.vocabs.is_none());
            }
            Commands::List(_) => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_requires_targets_and_profile() {
        assert!(Cli::try_parse_from(["checklib", "run", "--profile", "p.yml"]).is_err());
        assert!(Cli::try_parse_from(["checklib", "run", "a.nc"]).is_err());
    }

    #[test]
    fn test_invalid_format_is_error_exit() {
        let args = RunArgs {
            targets: vec![PathBuf::from("a.nc")],
            profile: PathBuf::from("p.yml"),
            vocabs: None,
            format: "sarif".to_string(),
        };
        assert_eq!(run_checks(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_list_unknown_family() {
        let args = ListArgs {
            family: Some("netcdf".to_string()),
        };
        assert_eq!(list_checks(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_list_one_family() {
        let args = ListArgs {
            family: Some("dataset".to_string()),
        };
        assert_eq!(list_checks(&args).unwrap(), EXIT_SUCCESS);
        assert_eq!(registry::family_classes(Family::File).len(), 3);
    }
}
