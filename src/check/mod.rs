//! The check contract: how a rule is configured, described, invoked and scored.
//!
//! Every check class is a static [`CheckSpec`] (templates, defaults, required
//! arguments) paired with a [`Build`] function. Building a class against a set
//! of parameters produces a [`Check`]: the shared configuration in
//! [`CheckBase`] plus the class-specific [`Rule`] that scores targets.
//!
//! ```text
//! parameters ──▶ merge defaults ──▶ resolve messages ──▶ setup hook ──▶ Check
//!                                                                      │
//!                          target ──▶ precondition ──▶ score ──▶ CheckResult
//! ```

mod params;
pub mod template;
mod types;

pub use params::{display_value, Literal, Parameters};
pub use types::{CheckResult, Family, Level, Score};

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::dataset::{Dataset, DatasetOpener, JsonDatasetOpener};
use crate::error::{CheckError, Result};
use crate::vocab::{Vocabulary, VocabularyRef, VocabularyStore};

/// Static definition of a check class.
#[derive(Debug)]
pub struct CheckSpec {
    /// Class name used by rule definitions and the registry.
    pub name: &'static str,
    pub family: Family,
    /// Short name template, e.g. `"Global attribute: {attribute}"`.
    pub short_name: &'static str,
    /// Description template.
    pub description: &'static str,
    /// Failure messages; index = score at failure.
    pub message_templates: &'static [&'static str],
    pub defaults: &'static [(&'static str, Literal)],
    pub required_args: &'static [&'static str],
    pub level: Level,
}

/// The object a check is invoked on.
#[derive(Clone, Copy)]
pub enum Target<'a> {
    Path(&'a Path),
    Dataset(&'a dyn Dataset),
}

impl<'a> Target<'a> {
    /// The dataset handle, or a file error if this target is a bare path.
    pub fn dataset(&self) -> Result<&'a dyn Dataset> {
        match self {
            Target::Dataset(ds) => Ok(*ds),
            Target::Path(p) => Err(CheckError::File(format!(
                "object for testing is not a dataset: {}",
                p.display()
            ))),
        }
    }

    /// The path of the target; datasets report their file path.
    pub fn path(&self) -> &'a Path {
        match self {
            Target::Path(p) => p,
            Target::Dataset(ds) => ds.file_path(),
        }
    }
}

impl fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Target::Dataset(ds) => f.debug_tuple("Dataset").field(&ds.file_path()).finish(),
        }
    }
}

/// External collaborators available to checks at construction and invocation.
#[derive(Clone)]
pub struct CheckEnv {
    pub vocabularies: Arc<VocabularyStore>,
    pub opener: Arc<dyn DatasetOpener>,
}

impl CheckEnv {
    pub fn new(vocabularies: Arc<VocabularyStore>) -> Self {
        Self {
            vocabularies,
            opener: Arc::new(JsonDatasetOpener),
        }
    }
}

impl Default for CheckEnv {
    fn default() -> Self {
        Self::new(Arc::new(VocabularyStore::new()))
    }
}

/// Optional construction arguments besides the parameters.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Verbatim messages; bypasses template resolution.
    pub messages: Option<Vec<String>>,
    /// Overrides the class's declared level.
    pub level: Option<Level>,
    /// `authority:scope[:extra]`
    pub vocabulary_ref: Option<String>,
}

impl CheckOptions {
    pub fn vocabulary(reference: &str) -> Self {
        Self {
            vocabulary_ref: Some(reference.to_string()),
            ..Default::default()
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }
}

/// Configured state shared by every check: parameters, resolved messages,
/// total score, level and vocabulary reference.
pub struct CheckBase {
    spec: &'static CheckSpec,
    params: Parameters,
    messages: Vec<String>,
    out_of: u32,
    level: Level,
    vocabulary_ref: Option<VocabularyRef>,
    short_name: String,
    env: CheckEnv,
}

impl CheckBase {
    pub fn spec(&self) -> &'static CheckSpec {
        self.spec
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Setup hooks may normalise parameters before the check is used.
    pub fn params_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// The message for a failure at `score`, if one is defined.
    pub fn message(&self, score: u32) -> Option<&str> {
        self.messages.get(score as usize).map(String::as_str)
    }

    pub fn out_of(&self) -> u32 {
        self.out_of
    }

    /// Setup hooks may replace the message-count default.
    pub fn set_out_of(&mut self, out_of: u32) {
        self.out_of = out_of;
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn vocabulary_ref(&self) -> Option<&VocabularyRef> {
        self.vocabulary_ref.as_ref()
    }

    pub fn env(&self) -> &CheckEnv {
        &self.env
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Load the vocabulary named by `vocabulary_ref`.
    pub fn vocabulary(&self) -> Result<Arc<dyn Vocabulary>> {
        let reference = self.vocabulary_ref.as_ref().ok_or_else(|| {
            CheckError::Parameter(format!("{} requires a vocabulary_ref", self.spec.name))
        })?;
        self.env.vocabularies.load(reference)
    }

    /// Score with the standard single-message convention: below `out_of`,
    /// the message at index `achieved` explains the failure.
    pub fn graded(&self, achieved: u32) -> Score {
        let mut messages = Vec::new();
        if achieved < self.out_of {
            if let Some(msg) = self.message(achieved) {
                messages.push(msg.to_string());
            }
        }
        Score::new(achieved, self.out_of, messages)
    }

    /// Pass/fail scoring: full marks or zero.
    pub fn pass_fail(&self, success: bool) -> Score {
        self.graded(if success { self.out_of } else { 0 })
    }

    fn result(&self, score: Score) -> CheckResult {
        debug_assert!(
            score.achieved <= score.out_of,
            "{} scored {} out of {}",
            self.spec.name,
            score.achieved,
            score.out_of
        );
        CheckResult {
            level: self.level,
            achieved: score.achieved.min(score.out_of),
            out_of: score.out_of,
            short_name: self.short_name.clone(),
            messages: score.messages,
        }
    }
}

/// Class-specific behaviour of a check.
pub trait Rule: Send + Sync {
    /// Type/shape precondition on the target. Defaults to the family's
    /// requirement: an existing file for file checks, a dataset handle for
    /// dataset checks.
    fn accept(&self, base: &CheckBase, target: Target<'_>) -> Result<()> {
        require_family(base.spec().family, target)
    }

    /// Score an accepted target.
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score>;
}

/// Setup hook: validates and normalises the configured base, then returns the
/// rule that will score targets.
pub type Build = fn(&mut CheckBase) -> Result<Box<dyn Rule>>;

/// A registered check class.
#[derive(Clone, Copy)]
pub struct CheckClass {
    pub spec: &'static CheckSpec,
    pub build: Build,
}

impl CheckClass {
    pub const fn new(spec: &'static CheckSpec, build: Build) -> Self {
        Self { spec, build }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Configure an instance of this class.
    pub fn instantiate(
        &self,
        parameters: &Parameters,
        options: CheckOptions,
        env: &CheckEnv,
    ) -> Result<Check> {
        Check::new(*self, parameters, options, env)
    }
}

impl fmt::Debug for CheckClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckClass")
            .field("name", &self.spec.name)
            .field("family", &self.spec.family)
            .finish()
    }
}

/// A configured check, ready to be invoked on any number of targets.
pub struct Check {
    base: CheckBase,
    rule: Box<dyn Rule>,
}

impl Check {
    fn new(
        class: CheckClass,
        parameters: &Parameters,
        options: CheckOptions,
        env: &CheckEnv,
    ) -> Result<Self> {
        let spec = class.spec;
        let params = Parameters::merged(spec.defaults, parameters);

        let missing = params.missing(spec.required_args);
        if !missing.is_empty() {
            return Err(CheckError::missing_args(spec.name, &missing));
        }

        let messages = match options.messages {
            Some(messages) if !messages.is_empty() => messages,
            _ => spec
                .message_templates
                .iter()
                .map(|tmpl| template::render(tmpl, &params))
                .collect::<Result<Vec<_>>>()?,
        };

        let vocabulary_ref = options
            .vocabulary_ref
            .as_deref()
            .map(str::parse::<VocabularyRef>)
            .transpose()?;

        let mut base = CheckBase {
            spec,
            params,
            out_of: messages.len() as u32,
            messages,
            level: options.level.unwrap_or(spec.level),
            vocabulary_ref,
            short_name: String::new(),
            env: env.clone(),
        };

        let rule = (class.build)(&mut base)?;
        base.short_name = template::render(spec.short_name, &base.params)?;

        Ok(Self { base, rule })
    }

    pub fn name(&self) -> &'static str {
        self.base.spec.name
    }

    pub fn family(&self) -> Family {
        self.base.spec.family
    }

    pub fn base(&self) -> &CheckBase {
        &self.base
    }

    /// Total score declared at construction. Checks whose total depends on
    /// the target report the per-invocation total in their results instead.
    pub fn out_of(&self) -> u32 {
        self.base.out_of
    }

    pub fn level(&self) -> Level {
        self.base.level
    }

    pub fn short_name(&self) -> &str {
        &self.base.short_name
    }

    /// Description with parameters substituted.
    pub fn description(&self) -> Result<String> {
        template::render(self.base.spec.description, &self.base.params)
    }

    pub fn message_templates(&self) -> &'static [&'static str] {
        self.base.spec.message_templates
    }

    pub fn messages(&self) -> &[String] {
        &self.base.messages
    }

    pub fn parameters(&self) -> &Parameters {
        &self.base.params
    }

    /// Invoke the check on a target.
    ///
    /// A target that fails the precondition yields a zero score with no
    /// messages; every other error propagates.
    pub fn run(&self, target: Target<'_>) -> Result<CheckResult> {
        let outcome = self
            .rule
            .accept(&self.base, target)
            .and_then(|()| self.rule.score(&self.base, target));

        match outcome {
            Ok(score) => Ok(self.base.result(score)),
            Err(CheckError::File(reason)) => {
                debug!(check = self.name(), %reason, "target rejected, scoring zero");
                Ok(self
                    .base
                    .result(Score::new(0, self.base.out_of, Vec::new())))
            }
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name())
            .field("parameters", &self.base.params)
            .field("out_of", &self.base.out_of)
            .field("level", &self.base.level)
            .finish()
    }
}

/// The default precondition for each family.
pub fn require_family(family: Family, target: Target<'_>) -> Result<()> {
    match (family, target) {
        (Family::File, Target::Path(path)) => {
            if path.is_file() {
                Ok(())
            } else {
                Err(CheckError::File(format!("file not found: {}", path.display())))
            }
        }
        (Family::File, Target::Dataset(ds)) => {
            let path = ds.file_path();
            if path.is_file() {
                Ok(())
            } else {
                Err(CheckError::File(format!("file not found: {}", path.display())))
            }
        }
        (Family::Dataset, target) => target.dataset().map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryDataset;

    static EXAMPLE_SPEC: CheckSpec = CheckSpec {
        name: "ExampleCheck",
        family: Family::Dataset,
        short_name: "Example: {attribute}",
        description: "The attribute '{attribute}' must be set to {expected}.",
        message_templates: &[
            "Attribute '{attribute}' is missing.",
            "Attribute '{attribute}' is not {expected}.",
        ],
        defaults: &[("expected", Literal::Str("yes"))],
        required_args: &["attribute"],
        level: Level::Medium,
    };

    struct ExampleRule {
        attribute: String,
        expected: String,
    }

    impl Rule for ExampleRule {
        fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
            let ds = target.dataset()?;
            let achieved = match ds.global_attribute(&self.attribute) {
                None => 0,
                Some(v) if v.to_string() != self.expected => 1,
                Some(_) => 2,
            };
            Ok(base.graded(achieved))
        }
    }

    fn build_example(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
        Ok(Box::new(ExampleRule {
            attribute: base.params().require_text("attribute")?,
            expected: base.params().require_text("expected")?,
        }))
    }

    static EXAMPLE: CheckClass = CheckClass::new(&EXAMPLE_SPEC, build_example);

    fn build(params: Parameters) -> Result<Check> {
        EXAMPLE.instantiate(&params, CheckOptions::default(), &CheckEnv::default())
    }

    #[test]
    fn test_construction_resolves_templates() {
        let check = build(Parameters::new().with("attribute", "source")).unwrap();
        assert_eq!(check.short_name(), "Example: source");
        assert_eq!(
            check.description().unwrap(),
            "The attribute 'source' must be set to yes."
        );
        assert_eq!(check.messages()[1], "Attribute 'source' is not yes.");
        assert_eq!(check.out_of(), 2);
        assert_eq!(check.level(), Level::Medium);
    }

    #[test]
    fn test_missing_required_parameter() {
        let err = build(Parameters::new().with("unrelated", 1)).unwrap_err();
        assert!(matches!(err, CheckError::Parameter(_)));
    }

    #[test]
    fn test_explicit_messages_bypass_templates() {
        let options = CheckOptions {
            messages: Some(vec!["custom zero".into(), "custom one".into()]),
            ..Default::default()
        };
        let check = EXAMPLE
            .instantiate(
                &Parameters::new().with("attribute", "source"),
                options,
                &CheckEnv::default(),
            )
            .unwrap();
        assert_eq!(check.messages(), &["custom zero", "custom one"]);
    }

    #[test]
    fn test_graded_scores_and_silent_success() {
        let check = build(Parameters::new().with("attribute", "source")).unwrap();

        let ds = MemoryDataset::new("a.nc").with_attribute("source", "yes");
        let result = check.run(Target::Dataset(&ds)).unwrap();
        assert_eq!(result.value(), (2, 2));
        assert!(result.messages.is_empty());

        let ds = MemoryDataset::new("a.nc").with_attribute("source", "no");
        let result = check.run(Target::Dataset(&ds)).unwrap();
        assert_eq!(result.value(), (1, 2));
        assert_eq!(result.messages, vec!["Attribute 'source' is not yes."]);

        let ds = MemoryDataset::new("a.nc");
        let result = check.run(Target::Dataset(&ds)).unwrap();
        assert_eq!(result.value(), (0, 2));
        assert_eq!(result.level, Level::Medium);
    }

    #[test]
    fn test_wrong_target_scores_zero_without_messages() {
        let check = build(Parameters::new().with("attribute", "source")).unwrap();
        let result = check.run(Target::Path(Path::new("missing.nc"))).unwrap();
        assert_eq!(result.value(), (0, 2));
        assert!(result.messages.is_empty());
        assert_eq!(result.short_name, "Example: source");
    }

    #[test]
    fn test_level_override() {
        let check = EXAMPLE
            .instantiate(
                &Parameters::new().with("attribute", "source"),
                CheckOptions::default().level(Level::Low),
                &CheckEnv::default(),
            )
            .unwrap();
        assert_eq!(check.level(), Level::Low);
    }

    #[test]
    fn test_vocabulary_requires_reference() {
        let check = build(Parameters::new().with("attribute", "source")).unwrap();
        assert!(matches!(
            check.base().vocabulary(),
            Err(CheckError::Parameter(_))
        ));
    }
}
