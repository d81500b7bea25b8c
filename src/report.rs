//! Output formatting for run results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::check::{CheckResult, Level};
use crate::runner::{RunReport, TargetReport};
use crate::score::{self, Summary};

// =============================================================================
// JSON Format
// =============================================================================

/// JSON report structure.
#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub profile: String,
    pub profile_path: String,
    pub passed: bool,
    pub percentage: f64,
    pub weighted_percentage: f64,
    pub achieved: u32,
    pub out_of: u32,
    pub breakdown: Vec<BreakdownEntry>,
    pub targets: Vec<JsonTarget>,
}

/// Totals for one severity level.
#[derive(Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub level: Level,
    pub achieved: u32,
    pub out_of: u32,
    pub checks: usize,
    pub failed: usize,
}

#[derive(Serialize, Deserialize)]
pub struct JsonTarget {
    pub path: String,
    pub opened: bool,
    pub passed: bool,
    pub results: Vec<JsonResult>,
}

#[derive(Serialize, Deserialize)]
pub struct JsonResult {
    pub check: String,
    pub short_name: String,
    pub level: Level,
    pub achieved: u32,
    pub out_of: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

/// Build the JSON report structure.
pub fn to_json_report(profile_path: &str, report: &RunReport, summary: &Summary) -> JsonReport {
    let breakdown = summary
        .by_level
        .iter()
        .rev()
        .map(|(level, totals)| BreakdownEntry {
            level: *level,
            achieved: totals.achieved,
            out_of: totals.out_of,
            checks: totals.checks,
            failed: totals.failed,
        })
        .collect();

    let targets = report
        .targets
        .iter()
        .map(|target| JsonTarget {
            path: target.path.to_string_lossy().to_string(),
            opened: target.opened,
            passed: score::target_passed(target),
            results: target
                .outcomes
                .iter()
                .map(|o| JsonResult {
                    check: o.check_name.clone(),
                    short_name: o.result.short_name.clone(),
                    level: o.result.level,
                    achieved: o.result.achieved,
                    out_of: o.result.out_of,
                    messages: o.result.messages.clone(),
                })
                .collect(),
        })
        .collect();

    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        profile: report.profile.clone(),
        profile_path: profile_path.to_string(),
        passed: summary.passed,
        percentage: summary.percentage(),
        weighted_percentage: summary.weighted_percentage,
        achieved: summary.totals.achieved,
        out_of: summary.totals.out_of,
        breakdown,
        targets,
    }
}

/// Write results in JSON format.
pub fn write_json(profile_path: &str, report: &RunReport, summary: &Summary) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&to_json_report(profile_path, report, summary))?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(profile_path: &str, report: &RunReport, summary: &Summary) {
    // Header
    println!();
    print!("  ");
    print!("{}", "checklib".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Profile:  ".dimmed());
    println!("{} ({})", report.profile, profile_path);
    print!("  {}", "Targets:  ".dimmed());
    println!("{}", summary.targets);
    println!();

    for target in &report.targets {
        write_target(target);
        println!();
    }

    if !summary.by_level.is_empty() {
        write_breakdown(summary);
        println!();
    }

    write_final_status(summary);
    println!();
}

fn write_target(target: &TargetReport) {
    if score::target_passed(target) {
        print!("  {} ", "✓".green());
    } else {
        print!("  {} ", "✗".red());
    }
    print!("{}", target.path.display().to_string().blue());
    if !target.opened {
        print!("  {}", "(not opened as dataset)".dimmed());
    }
    println!();

    for outcome in &target.outcomes {
        write_result(&outcome.result);
    }
}

fn write_result(result: &CheckResult) {
    write_level_tag(result.level);
    print!(" ");
    let points = format!("{}/{}", result.achieved, result.out_of);
    if result.is_full() {
        print!("{:>7}", points.green());
    } else if result.achieved == 0 {
        print!("{:>7}", points.red());
    } else {
        print!("{:>7}", points.yellow());
    }
    println!("  {}", result.short_name);

    for message in &result.messages {
        println!("                     {}", message.dimmed());
    }
}

fn write_level_tag(level: Level) {
    match level {
        Level::High => print!("    {}", "HIGH  ".red()),
        Level::Medium => print!("    {}", "MEDIUM".yellow()),
        Level::Low => print!("    {}", "LOW   ".blue()),
    }
}

fn write_colored_percentage(p: f64) {
    let text = format!("{:.1}%", p);
    match p {
        p if p >= 100.0 => print!("{}", text.green().bold()),
        p if p >= 75.0 => print!("{}", text.green()),
        p if p >= 50.0 => print!("{}", text.yellow()),
        _ => print!("{}", text.red()),
    }
}

fn write_breakdown(summary: &Summary) {
    println!("  {}", "Breakdown:".bold());

    for (level, totals) in summary.by_level.iter().rev() {
        let plural = if totals.failed != 1 { "s" } else { "" };
        println!(
            "    {:<8} {:>4}/{:<4} pts ({} failed check{})",
            level.as_str(),
            totals.achieved,
            totals.out_of,
            totals.failed,
            plural
        );
    }
}

fn write_final_status(summary: &Summary) {
    print!("  Score: ");
    write_colored_percentage(summary.percentage());
    print!("  {}", format!("weighted {:.1}%", summary.weighted_percentage).dimmed());
    print!("  ");

    if summary.passed {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}
