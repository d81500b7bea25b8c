//! Runs a profile's checks over many targets.

use anyhow::Context;
use globset::GlobSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::check::{Check, CheckEnv, CheckResult, Family, Target};
use crate::dataset::{Dataset, DatasetOpener};
use crate::profile::Profile;
use crate::vocab::{file_name_of, VocabularyStore};

/// Header dumps that sit next to the file they describe.
const SIDECAR_EXTENSION: &str = "json";

/// The outcome of one configured check on one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub check_name: String,
    #[serde(flatten)]
    pub result: CheckResult,
}

/// Every outcome for one target, in profile order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetReport {
    pub path: PathBuf,
    /// Whether the target could be opened as a dataset.
    pub opened: bool,
    pub outcomes: Vec<RuleOutcome>,
}

impl TargetReport {
    pub fn results(&self) -> impl Iterator<Item = &CheckResult> {
        self.outcomes.iter().map(|o| &o.result)
    }
}

/// Results of a whole run, in target order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub profile: String,
    pub targets: Vec<TargetReport>,
}

struct PreparedRule {
    check: Check,
    applies_to: Option<GlobSet>,
}

impl PreparedRule {
    fn applies(&self, file_name: &str) -> bool {
        self.applies_to
            .as_ref()
            .map_or(true, |set| set.is_match(file_name))
    }
}

/// Executes a profile against a set of targets.
pub struct Runner {
    env: CheckEnv,
}

impl Runner {
    pub fn new() -> Self {
        Self {
            env: CheckEnv::default(),
        }
    }

    /// Set the vocabulary store shared by every check.
    pub fn vocabularies(mut self, store: Arc<VocabularyStore>) -> Self {
        self.env.vocabularies = store;
        self
    }

    /// Set how dataset-family targets are opened.
    pub fn opener(mut self, opener: Arc<dyn DatasetOpener>) -> Self {
        self.env.opener = opener;
        self
    }

    pub fn env(&self) -> &CheckEnv {
        &self.env
    }

    fn prepare(&self, profile: &Profile) -> anyhow::Result<Vec<PreparedRule>> {
        profile
            .checks
            .iter()
            .enumerate()
            .map(|(i, rule)| -> anyhow::Result<PreparedRule> {
                let check = rule
                    .instantiate(&self.env)
                    .with_context(|| format!("checks[{}]", i))?;
                debug!(check = check.name(), short_name = check.short_name(), "configured");
                Ok(PreparedRule {
                    check,
                    applies_to: rule.matcher()?,
                })
            })
            .collect()
    }

    /// Configure every rule once, then run them over `targets` in parallel.
    pub fn run(&self, targets: &[PathBuf], profile: &Profile) -> anyhow::Result<RunReport> {
        let rules = self.prepare(profile)?;
        info!(
            profile = profile.display_name(),
            checks = rules.len(),
            targets = targets.len(),
            "running profile"
        );

        let reports = targets
            .par_iter()
            .map(|path| self.run_target(&rules, path))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(RunReport {
            profile: profile.display_name().to_string(),
            targets: reports,
        })
    }

    fn run_target(&self, rules: &[PreparedRule], path: &Path) -> anyhow::Result<TargetReport> {
        let file_name = file_name_of(path);
        let applicable: Vec<&PreparedRule> =
            rules.iter().filter(|r| r.applies(&file_name)).collect();

        let needs_dataset = applicable
            .iter()
            .any(|r| r.check.family() == Family::Dataset);
        let dataset = if needs_dataset {
            self.open(path)
        } else {
            None
        };

        let mut outcomes = Vec::with_capacity(applicable.len());
        for rule in applicable {
            let target = match (rule.check.family(), dataset.as_deref()) {
                (Family::Dataset, Some(ds)) => Target::Dataset(ds),
                _ => Target::Path(path),
            };
            let result = rule.check.run(target).with_context(|| {
                format!("{} failed on {}", rule.check.name(), path.display())
            })?;
            outcomes.push(RuleOutcome {
                check_name: rule.check.name().to_string(),
                result,
            });
        }

        debug!(path = %path.display(), outcomes = outcomes.len(), "target done");
        Ok(TargetReport {
            path: path.to_path_buf(),
            opened: dataset.is_some(),
            outcomes,
        })
    }

    fn open(&self, path: &Path) -> Option<Box<dyn Dataset>> {
        match self.env.opener.open(path) {
            Ok(ds) => Some(ds),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open dataset");
                None
            }
        }
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand directories into the files beneath them.
///
/// A `X.json` header dump is skipped when `X` exists beside it, since it
/// describes `X` rather than being a target of its own.
pub fn collect_targets(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut targets = Vec::new();

    for root in paths {
        if !root.is_dir() {
            targets.push(root.clone());
            continue;
        }

        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
            if entry.file_type().is_file() && !is_sidecar(entry.path()) {
                targets.push(entry.into_path());
            }
        }
    }

    Ok(targets)
}

fn is_sidecar(path: &Path) -> bool {
    let is_json = path
        .extension()
        .map_or(false, |ext| ext == SIDECAR_EXTENSION);
    is_json && path.with_extension("").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{Level, Parameters};
    use crate::dataset::{DType, MemoryDataset, MemoryVariable};
    use crate::error::{CheckError, Result};
    use crate::profile::RuleDefinition;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Opens only the paths it was given.
    struct FixedOpener(HashMap<PathBuf, MemoryDataset>);

    impl DatasetOpener for FixedOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn Dataset>> {
            self.0
                .get(path)
                .cloned()
                .map(|ds| Box::new(ds) as Box<dyn Dataset>)
                .ok_or_else(|| CheckError::File(format!("cannot open {}", path.display())))
        }
    }

    fn profile() -> Profile {
        let mut size = RuleDefinition::new("FileSizeCheck");
        size.level = Some("low".into());
        Profile {
            name: "test".into(),
            checks: vec![
                RuleDefinition::new("GlobalAttrExistsCheck")
                    .with_parameters(Parameters::new().with("attribute", "source")),
                RuleDefinition::new("VariableExistsCheck")
                    .with_parameters(Parameters::new().with("var_id", "tas")),
                size,
            ],
            ..Default::default()
        }
    }

    fn dataset(path: &Path) -> MemoryDataset {
        MemoryDataset::new(path)
            .with_attribute("source", "model")
            .with_dimension("time", 2)
            .with_variable("tas", MemoryVariable::new(DType::Float32).with_dimensions(&["time"]))
    }

    #[test]
    fn test_run_orders_results_by_target_and_rule() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.nc");
        let bad = temp.path().join("bad.nc");
        std::fs::write(&good, b"x").unwrap();
        std::fs::write(&bad, b"x").unwrap();

        let mut datasets = HashMap::new();
        datasets.insert(good.clone(), dataset(&good));
        let runner = Runner::new().opener(Arc::new(FixedOpener(datasets)));

        let report = runner.run(&[good.clone(), bad.clone()], &profile()).unwrap();
        assert_eq!(report.profile, "test");
        assert_eq!(report.targets.len(), 2);

        let first = &report.targets[0];
        assert_eq!(first.path, good);
        assert!(first.opened);
        let values: Vec<_> = first.results().map(|r| r.value()).collect();
        assert_eq!(values, vec![(1, 1), (1, 1), (1, 1)]);
        assert_eq!(first.outcomes[2].result.level, Level::Low);

        // Unopenable datasets score zero on dataset checks only.
        let second = &report.targets[1];
        assert!(!second.opened);
        let values: Vec<_> = second.results().map(|r| r.value()).collect();
        assert_eq!(values, vec![(0, 1), (0, 1), (1, 1)]);
        assert!(second.outcomes[0].result.messages.is_empty());
    }

    #[test]
    fn test_applies_to_filters_rules() {
        let temp = TempDir::new().unwrap();
        let nc = temp.path().join("a.nc");
        let txt = temp.path().join("a.txt");
        std::fs::write(&nc, b"x").unwrap();
        std::fs::write(&txt, b"x").unwrap();

        let mut rule = RuleDefinition::new("FileSizeCheck");
        rule.applies_to = vec!["*.nc".into()];
        let profile = Profile {
            checks: vec![rule, RuleDefinition::new("FileNameStructureCheck")],
            ..Default::default()
        };

        let report = Runner::new().run(&[nc, txt], &profile).unwrap();
        assert_eq!(report.targets[0].outcomes.len(), 2);
        assert_eq!(report.targets[1].outcomes.len(), 1);
        assert_eq!(
            report.targets[1].outcomes[0].check_name,
            "FileNameStructureCheck"
        );
    }

    #[test]
    fn test_bad_profile_fails_before_running() {
        let profile = Profile {
            checks: vec![RuleDefinition::new("VariableExistsCheck")],
            ..Default::default()
        };
        let err = Runner::new().run(&[], &profile).unwrap_err();
        assert!(format!("{:#}", err).contains("'var_id'"));
    }

    #[test]
    fn test_collect_targets_skips_sidecars() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        std::fs::write(dir.join("tas.nc"), b"x").unwrap();
        std::fs::write(dir.join("tas.nc.json"), b"{}").unwrap();
        std::fs::write(dir.join("dump.json"), b"{}").unwrap();
        std::fs::write(dir.join(".hidden"), b"x").unwrap();

        let targets = collect_targets(&[dir.to_path_buf()]).unwrap();
        let names: Vec<_> = targets.iter().map(|p| file_name_of(p)).collect();
        assert_eq!(names, vec!["dump.json", "tas.nc"]);

        let explicit = collect_targets(&[dir.join("missing.nc")]).unwrap();
        assert_eq!(explicit, vec![dir.join("missing.nc")]);
    }
}
