//! Aggregate scoring over a run.
//!
//! A run passes when every HIGH check on every target scored full marks.
//! MEDIUM and LOW results are tallied but never fail a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::check::{CheckResult, Level};
use crate::runner::{RunReport, TargetReport};

/// Points and check counts for one bucket of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub achieved: u32,
    pub out_of: u32,
    pub checks: usize,
    /// Checks that scored below full marks.
    pub failed: usize,
}

impl Totals {
    fn add(&mut self, result: &CheckResult) {
        self.achieved += result.achieved;
        self.out_of += result.out_of;
        self.checks += 1;
        if !result.is_full() {
            self.failed += 1;
        }
    }

    /// Achieved points as a percentage of available points. 100 when
    /// nothing was available.
    pub fn percentage(&self) -> f64 {
        if self.out_of == 0 {
            return 100.0;
        }
        f64::from(self.achieved) * 100.0 / f64::from(self.out_of)
    }
}

/// The calculated summary of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub totals: Totals,
    pub by_level: BTreeMap<Level, Totals>,
    /// Percentage with every check's points scaled by its level weight.
    pub weighted_percentage: f64,
    pub targets: usize,
    /// Targets with at least one check below full marks.
    pub failed_targets: usize,
    pub passed: bool,
}

impl Summary {
    pub fn percentage(&self) -> f64 {
        self.totals.percentage()
    }

    pub fn level(&self, level: Level) -> Totals {
        self.by_level.get(&level).copied().unwrap_or_default()
    }
}

/// Whether every HIGH result of one target scored full marks.
pub fn target_passed(target: &TargetReport) -> bool {
    target
        .results()
        .filter(|r| r.level == Level::High)
        .all(CheckResult::is_full)
}

/// Summarise a run.
pub fn calculate(report: &RunReport) -> Summary {
    let mut totals = Totals::default();
    let mut by_level: BTreeMap<Level, Totals> = BTreeMap::new();
    let mut weighted = (0u64, 0u64);
    let mut failed_targets = 0;

    for target in &report.targets {
        let mut target_failed = false;
        for result in target.results() {
            totals.add(result);
            by_level.entry(result.level).or_default().add(result);

            let weight = u64::from(result.level.weight());
            weighted.0 += weight * u64::from(result.achieved);
            weighted.1 += weight * u64::from(result.out_of);
            target_failed |= !result.is_full();
        }
        if target_failed {
            failed_targets += 1;
        }
    }

    let weighted_percentage = if weighted.1 == 0 {
        100.0
    } else {
        weighted.0 as f64 * 100.0 / weighted.1 as f64
    };

    Summary {
        passed: report.targets.iter().all(target_passed),
        totals,
        by_level,
        weighted_percentage,
        targets: report.targets.len(),
        failed_targets,
    }
}
