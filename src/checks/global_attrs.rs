//! Global attribute checks.

use regex::Regex;

use super::require_vocabulary_ref;
use crate::check::{CheckBase, CheckClass, CheckSpec, Family, Level, Literal, Rule, Score, Target};
use crate::error::{CheckError, Result};
use crate::vocab::lookup_id;

static GLOBAL_ATTR_EXISTS_SPEC: CheckSpec = CheckSpec {
    name: "GlobalAttrExistsCheck",
    family: Family::Dataset,
    short_name: "Required global attribute: {attribute}",
    description: "The global attribute '{attribute}' must exist.",
    message_templates: &["Required '{attribute}' global attribute is not present."],
    defaults: &[],
    required_args: &["attribute"],
    level: Level::High,
};

pub static GLOBAL_ATTR_EXISTS_CHECK: CheckClass =
    CheckClass::new(&GLOBAL_ATTR_EXISTS_SPEC, build_exists);

struct GlobalAttrExists {
    attribute: String,
}

fn build_exists(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    Ok(Box::new(GlobalAttrExists {
        attribute: base.params().require_text("attribute")?,
    }))
}

impl Rule for GlobalAttrExists {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        Ok(base.pass_fail(ds.has_global_attribute(&self.attribute)))
    }
}

static GLOBAL_ATTR_REGEX_SPEC: CheckSpec = CheckSpec {
    name: "GlobalAttrRegexCheck",
    family: Family::Dataset,
    short_name: "Global attribute: {attribute}",
    description: "The global attribute '{attribute}' must exist and have a valid format matching regular expression: ('{regex}').",
    message_templates: &[
        "Required '{attribute}' global attribute is not present.",
        "Required '{attribute}' global attribute value is invalid.",
    ],
    defaults: &[],
    required_args: &["attribute", "regex"],
    level: Level::High,
};

/// 0 absent, 1 present but not matching `regex` in full, 2 matching.
pub static GLOBAL_ATTR_REGEX_CHECK: CheckClass =
    CheckClass::new(&GLOBAL_ATTR_REGEX_SPEC, build_regex);

struct GlobalAttrRegex {
    attribute: String,
    regex: Regex,
}

fn build_regex(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    let attribute = base.params().require_text("attribute")?;
    // Rule files often double-escape backslashes.
    let pattern = base.params().require_text("regex")?.replace("\\\\", "\\");
    base.params_mut().insert("regex", pattern.clone());

    let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
        CheckError::Parameter(format!("invalid regex for '{}': {}", attribute, e))
    })?;
    Ok(Box::new(GlobalAttrRegex { attribute, regex }))
}

impl Rule for GlobalAttrRegex {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        let achieved = match ds.global_attribute(&self.attribute) {
            None => 0,
            Some(value) if !self.regex.is_match(&value.to_string()) => 1,
            Some(_) => 2,
        };
        Ok(base.graded(achieved))
    }
}

static GLOBAL_ATTR_VOCAB_SPEC: CheckSpec = CheckSpec {
    name: "GlobalAttrVocabCheck",
    family: Family::Dataset,
    short_name: "Global attribute: {attribute}",
    description: "The global attribute '{attribute}' must exist and have a valid value from the relevant vocabulary.",
    message_templates: &[
        "Required '{attribute}' global attribute is not present.",
        "Required '{attribute}' global attribute value is invalid.",
    ],
    defaults: &[("vocab_lookup", Literal::Str("canonical_name"))],
    required_args: &["attribute"],
    level: Level::High,
};

/// 0 absent, 1 not a term of the attribute's collection, 2 valid.
///
/// The collection is the third segment of `vocabulary_ref` when given,
/// otherwise the attribute name with `_` replaced by `-`.
pub static GLOBAL_ATTR_VOCAB_CHECK: CheckClass =
    CheckClass::new(&GLOBAL_ATTR_VOCAB_SPEC, build_vocab);

struct GlobalAttrVocab {
    attribute: String,
    collection: String,
    property: String,
}

fn build_vocab(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    let attribute = base.params().require_text("attribute")?;
    let collection = require_vocabulary_ref(base)?
        .extra
        .clone()
        .unwrap_or_else(|| lookup_id(&attribute));

    Ok(Box::new(GlobalAttrVocab {
        attribute,
        collection,
        property: base.params().require_text("vocab_lookup")?,
    }))
}

impl Rule for GlobalAttrVocab {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        let vocab = base.vocabulary()?;
        let achieved =
            vocab.check_attribute_in(ds, &self.attribute, &self.collection, &self.property)?;
        Ok(base.graded(achieved))
    }
}
