//! Rule profile schema.
//!
//! A profile is the declarative list of checks to run, with the parameters,
//! severity and vocabulary each one is configured with. Profiles are written
//! in YAML (or JSON, which YAML accepts):
//!
//! ```yaml
//! name: "UKCP18 land-prob"
//! version: "1.0"
//! checks:
//!   - check_name: GlobalAttrRegexCheck
//!     parameters: { attribute: Conventions, regex: "CF-\\d+\\.\\d+" }
//!     level: HIGH
//!   - check_name: GlobalAttrVocabCheck
//!     parameters: { attribute: frequency }
//!     vocabulary_ref: "ukcp:ukcp18"
//!     applies_to: ["*.nc"]
//! ```

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::check::{Check, CheckEnv, CheckOptions, Level, Parameters};
use crate::registry;
use crate::vocab::VocabularyRef;

/// Top-level profile definition.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub checks: Vec<RuleDefinition>,
}

impl Profile {
    /// Parse a profile from a YAML or JSON file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        Self::parse_str(&content).with_context(|| format!("invalid profile {}", path.display()))
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        let profile: Profile = serde_yaml::from_str(content)?;
        Ok(profile)
    }

    /// Display name, falling back to a placeholder for anonymous profiles.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "(unnamed profile)"
        } else {
            &self.name
        }
    }
}

/// One configured check.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleDefinition {
    pub check_name: String,
    #[serde(default)]
    pub parameters: Parameters,
    /// `HIGH`, `MEDIUM` or `LOW`, any case. Defaults to the class level.
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub vocabulary_ref: Option<String>,
    /// Replacement failure messages, one per score below full marks.
    #[serde(default)]
    pub messages: Option<Vec<String>>,
    /// Glob patterns on the target's file name. Empty means every target.
    #[serde(default)]
    pub applies_to: Vec<String>,
}

impl RuleDefinition {
    pub fn new(check_name: &str) -> Self {
        Self {
            check_name: check_name.to_string(),
            parameters: Parameters::new(),
            level: None,
            vocabulary_ref: None,
            messages: None,
            applies_to: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_vocabulary(mut self, reference: &str) -> Self {
        self.vocabulary_ref = Some(reference.to_string());
        self
    }

    pub fn level(&self) -> anyhow::Result<Option<Level>> {
        self.level
            .as_deref()
            .map(|s| s.parse::<Level>().map_err(anyhow::Error::msg))
            .transpose()
    }

    pub fn options(&self) -> anyhow::Result<CheckOptions> {
        Ok(CheckOptions {
            messages: self.messages.clone(),
            level: self.level()?,
            vocabulary_ref: self.vocabulary_ref.clone(),
        })
    }

    /// Compile `applies_to`. `None` matches every target.
    pub fn matcher(&self) -> anyhow::Result<Option<GlobSet>> {
        if self.applies_to.is_empty() {
            return Ok(None);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.applies_to {
            let glob =
                Glob::new(pattern).with_context(|| format!("invalid glob {:?}", pattern))?;
            builder.add(glob);
        }
        Ok(Some(builder.build()?))
    }

    /// Resolve the class and configure an instance.
    pub fn instantiate(&self, env: &CheckEnv) -> anyhow::Result<Check> {
        let class = registry::get_check_class(&self.check_name)?;
        let check = class
            .instantiate(&self.parameters, self.options()?, env)
            .with_context(|| format!("failed to configure {}", self.check_name))?;
        Ok(check)
    }
}

/// Validate a profile without configuring any check.
///
/// Every `check_name` must be registered, every `level` known, every
/// `applies_to` glob compilable and every `vocabulary_ref` well-formed.
pub fn validate(profile: &Profile) -> anyhow::Result<()> {
    for (i, rule) in profile.checks.iter().enumerate() {
        let ctx = || format!("checks[{}] ({})", i, rule.check_name);

        registry::get_check_class(&rule.check_name).with_context(ctx)?;
        rule.level().with_context(ctx)?;
        rule.matcher().with_context(ctx)?;
        if let Some(reference) = &rule.vocabulary_ref {
            reference.parse::<VocabularyRef>().with_context(ctx)?;
        }
    }
    Ok(())
}
