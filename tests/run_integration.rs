//! Integration tests for the full run pipeline.
//!
//! These tests load the test profile, run it over the dataset fixtures with
//! the archive-backed vocabulary store, and check per-target scores.

use std::path::PathBuf;
use std::sync::Arc;

use checklib::profile::{self, Profile};
use checklib::report;
use checklib::runner::{collect_targets, RunReport, Runner, TargetReport};
use checklib::score;
use checklib::{JsonDatasetOpener, VocabularyStore};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn load_profile() -> Profile {
    let path = testdata_path().join("profiles").join("ukcp18-land.yml");
    let profile = Profile::parse_file(&path).expect("should parse profile");
    profile::validate(&profile).expect("profile should be valid");
    profile
}

fn runner() -> Runner {
    Runner::new()
        .vocabularies(Arc::new(VocabularyStore::from_dir(
            testdata_path().join("vocabs"),
        )))
        .opener(Arc::new(JsonDatasetOpener))
}

fn run(targets: &[PathBuf]) -> RunReport {
    runner()
        .run(targets, &load_profile())
        .expect("run should succeed")
}

fn scores(target: &TargetReport) -> Vec<(&str, (u32, u32))> {
    target
        .outcomes
        .iter()
        .map(|o| (o.check_name.as_str(), o.result.value()))
        .collect()
}

#[test]
fn test_profile_loads() {
    let profile = load_profile();
    assert_eq!(profile.name, "UKCP18 land");
    assert_eq!(profile.checks.len(), 12);
}

#[test]
fn test_compliant_file_scores_full_marks() {
    let report = run(&[testdata_path().join("data").join("tas_uk_day.nc")]);
    let target = &report.targets[0];
    assert!(target.opened);

    assert_eq!(
        scores(target),
        vec![
            ("FileSizeCheck", (1, 1)),
            ("FileNameStructureCheck", (1, 1)),
            ("NCFileIsReadableCheck", (1, 1)),
            ("GlobalAttrRegexCheck", (2, 2)),
            ("GlobalAttrVocabCheck", (2, 2)),
            ("OneMainVariablePerFileCheck", (1, 1)),
            ("VariableRangeCheck", (2, 2)),
            ("ValidGlobalAttrsMatchFileNameCheck", (7, 7)),
            ("NCVariableMetadataCheck", (7, 7)),
            ("NCMainVariableMetadataCheck", (8, 8)),
            ("NCDimensionCheck", (9, 9)),
            ("NCDimensionCheck", (5, 5)),
        ]
    );
    for outcome in &target.outcomes {
        assert!(
            outcome.result.messages.is_empty(),
            "{}: {:?}",
            outcome.check_name,
            outcome.result.messages
        );
    }

    let summary = score::calculate(&report);
    assert!(summary.passed);
    assert_eq!((summary.totals.achieved, summary.totals.out_of), (46, 46));
}

#[test]
fn test_non_compliant_file() {
    let report = run(&[testdata_path().join("data").join("pr_uk_week.nc")]);
    let target = &report.targets[0];
    assert!(target.opened);

    // applies_to drops the tas-only rules.
    assert_eq!(
        scores(target),
        vec![
            ("FileSizeCheck", (1, 1)),
            ("FileNameStructureCheck", (1, 1)),
            ("NCFileIsReadableCheck", (0, 1)),
            ("GlobalAttrRegexCheck", (1, 2)),
            ("GlobalAttrVocabCheck", (1, 2)),
            ("OneMainVariablePerFileCheck", (0, 1)),
            ("ValidGlobalAttrsMatchFileNameCheck", (5, 7)),
            ("NCMainVariableMetadataCheck", (0, 2)),
            ("NCDimensionCheck", (6, 8)),
        ]
    );

    let file_name = &target.outcomes[6].result.messages;
    assert_eq!(
        file_name,
        &vec![
            "File name fragment week is not a valid term in collection 'frequency'.".to_string(),
            "Required 'frequency' global attribute value 'week' is invalid.".to_string(),
        ]
    );

    let dimension = &target.outcomes[8].result.messages;
    assert_eq!(
        dimension,
        &vec![
            "Required variable attribute 'standard_name' is not present for variable: 'time'."
                .to_string()
        ]
    );

    let summary = score::calculate(&report);
    assert!(!summary.passed);
}

#[test]
fn test_unreadable_file_scores_zero_on_dataset_checks() {
    let report = run(&[testdata_path().join("data").join("broken_file.nc")]);
    let target = &report.targets[0];
    assert!(!target.opened);

    for outcome in &target.outcomes {
        let (achieved, out_of) = outcome.result.value();
        match outcome.check_name.as_str() {
            "FileSizeCheck" | "FileNameStructureCheck" => assert_eq!(achieved, out_of),
            name => assert_eq!(achieved, 0, "{}", name),
        }
    }
}

#[test]
fn test_directory_run() {
    let targets = collect_targets(&[testdata_path().join("data")]).unwrap();
    let names: Vec<_> = targets
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["broken_file.nc", "pr_uk_week.nc", "tas_uk_day.nc"]);

    let report = run(&targets);
    assert_eq!(report.targets.len(), 3);
    assert_eq!(report.profile, "UKCP18 land");

    let summary = score::calculate(&report);
    assert!(!summary.passed);
    assert_eq!(summary.targets, 3);
    assert_eq!(summary.failed_targets, 2);

    let json = report::to_json_report("ukcp18-land.yml", &report, &summary);
    assert!(!json.passed);
    assert_eq!(json.targets.len(), 3);
    assert!(json.targets[2].passed);
    assert!(!json.targets[1].passed);
}

#[test]
fn test_unknown_vocabulary_fails_at_configuration() {
    let mut profile = load_profile();
    for rule in &mut profile.checks {
        if rule.check_name == "NCVariableMetadataCheck" {
            rule.vocabulary_ref = Some("ukcp:ukcp09".to_string());
        }
    }

    let err = runner()
        .run(&[testdata_path().join("data").join("tas_uk_day.nc")], &profile)
        .unwrap_err();
    assert!(format!("{:#}", err).contains("ukcp:ukcp09"));
}
