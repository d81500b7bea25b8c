//! Variable and dimension metadata validated against vocabulary terms.
//!
//! The expected attribute set of a variable or dimension is the `data`
//! mapping of its vocabulary term. Each expected attribute is worth two
//! points: one for being present and one for holding the expected value.
//! Values written `<...>` are placeholders and only need to be present.

use serde_json::Value;

use super::{namespace, require_vocabulary_ref};
use crate::check::{
    display_value, CheckBase, CheckClass, CheckSpec, Family, Level, Rule, Score, Target,
};
use crate::dataset::{Dataset, MainVariable};
use crate::error::{CheckError, Result};
use crate::vocab::Term;

/// Term keys of a dimension that are not variable attributes.
const LENGTH_KEY: &str = "length";

type ExpectedAttributes = Vec<(String, Value)>;

fn expected_attributes(term: &Term) -> ExpectedAttributes {
    term.data()
        .map(|data| data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

fn is_placeholder(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.starts_with('<') && s.ends_with('>'))
}

/// A dimension length written as a whole number or a numeric string.
fn expected_length(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Score the expected attributes of `var_id`, two points each.
fn score_attributes(
    ds: &dyn Dataset,
    var_id: &str,
    expected: &[(String, Value)],
    messages: &mut Vec<String>,
) -> u32 {
    let mut points = 0;
    for (attr, value) in expected {
        let Some(actual) = ds.variable_attribute(var_id, attr) else {
            messages.push(format!(
                "Required variable attribute '{}' is not present for variable: '{}'.",
                attr, var_id
            ));
            continue;
        };
        points += 1;

        if is_placeholder(value) || actual.matches(value) {
            points += 1;
        } else {
            messages.push(format!(
                "Required variable attribute '{}' has incorrect value ('{}' not '{}') for variable: '{}'.",
                attr,
                actual,
                display_value(value),
                var_id
            ));
        }
    }
    points
}

fn resolve_expected(base: &CheckBase, namespace: &str, name: &str) -> Result<Term> {
    let vocab = base.vocabulary()?;
    let term = vocab.resolve_term(&format!("{}:{}", namespace, name))?;
    Ok(term.clone())
}

static NC_VARIABLE_METADATA_SPEC: CheckSpec = CheckSpec {
    name: "NCVariableMetadataCheck",
    family: Family::Dataset,
    short_name: "Variable metadata: {var_id}",
    description: "The variable '{var_id}' must have the attributes defined by vocabulary term '{pyessv_namespace}:{var_id}'.",
    message_templates: &["Variable '{var_id}' not found in the file so cannot perform other checks."],
    defaults: &[],
    required_args: &["var_id", "pyessv_namespace"],
    level: Level::High,
};

/// 1 point for the variable, then 2 per expected attribute.
pub static NC_VARIABLE_METADATA_CHECK: CheckClass =
    CheckClass::new(&NC_VARIABLE_METADATA_SPEC, build_variable_metadata);

struct VariableMetadata {
    var_id: String,
    expected: ExpectedAttributes,
}

fn build_variable_metadata(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    require_vocabulary_ref(base)?;
    let var_id = base.params().require_text("var_id")?;
    let namespace = namespace(base)?;

    let term = resolve_expected(base, &namespace, &var_id)?;
    let expected = expected_attributes(&term);
    base.set_out_of(1 + 2 * expected.len() as u32);

    Ok(Box::new(VariableMetadata { var_id, expected }))
}

impl Rule for VariableMetadata {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        if !ds.has_variable(&self.var_id) {
            return Ok(base.graded(0));
        }

        let mut messages = Vec::new();
        let achieved = 1 + score_attributes(ds, &self.var_id, &self.expected, &mut messages);
        Ok(Score::new(achieved, base.out_of(), messages))
    }
}

static NC_MAIN_VARIABLE_METADATA_SPEC: CheckSpec = CheckSpec {
    name: "NCMainVariableMetadataCheck",
    family: Family::Dataset,
    short_name: "Main variable metadata",
    description: "The main variable must be a term of vocabulary collection '{pyessv_namespace}' and have the attributes that term defines.",
    message_templates: &[
        "No unique main variable found in the file so cannot perform other checks.",
        "Main variable is not a term of vocabulary collection '{pyessv_namespace}'.",
    ],
    defaults: &[],
    required_args: &["pyessv_namespace"],
    level: Level::High,
};

/// 1 for a unique main variable, 1 for it being a term, then 2 per expected
/// attribute of that term. The total depends on which variable is main, so
/// every invocation reports its own.
pub static NC_MAIN_VARIABLE_METADATA_CHECK: CheckClass =
    CheckClass::new(&NC_MAIN_VARIABLE_METADATA_SPEC, build_main_variable_metadata);

struct MainVariableMetadata {
    namespace: String,
}

fn build_main_variable_metadata(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    require_vocabulary_ref(base)?;
    Ok(Box::new(MainVariableMetadata {
        namespace: namespace(base)?,
    }))
}

impl Rule for MainVariableMetadata {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        let MainVariable::Unique(main) = ds.main_variable() else {
            return Ok(base.graded(0));
        };

        let vocab = base.vocabulary()?;
        vocab.terms(&self.namespace)?;
        let Some(term) = vocab.find_term(&self.namespace, &main) else {
            return Ok(base.graded(1));
        };

        let expected = expected_attributes(term);
        let out_of = base.out_of() + 2 * expected.len() as u32;
        let mut messages = Vec::new();
        let achieved = 2 + score_attributes(ds, &main, &expected, &mut messages);
        Ok(Score::new(achieved, out_of, messages))
    }
}

static NC_DIMENSION_SPEC: CheckSpec = CheckSpec {
    name: "NCDimensionCheck",
    family: Family::Dataset,
    short_name: "Dimension: {dim_id}",
    description: "The dimension '{dim_id}' and its coordinate variable must match vocabulary term '{pyessv_namespace}:{dim_id}'.",
    message_templates: &["Dimension '{dim_id}' not found in the file so cannot perform other checks."],
    defaults: &[],
    required_args: &["dim_id", "pyessv_namespace"],
    level: Level::High,
};

/// 1 dimension exists, 1 length (when the term fixes one), 1 coordinate
/// variable exists, 2 per other expected attribute, and 1 more when the
/// coordinate variable declares bounds. The bounds point depends on the
/// target and is added per invocation.
pub static NC_DIMENSION_CHECK: CheckClass = CheckClass::new(&NC_DIMENSION_SPEC, build_dimension);

struct Dimension {
    dim_id: String,
    length: Option<usize>,
    expected: ExpectedAttributes,
}

fn build_dimension(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    require_vocabulary_ref(base)?;
    let dim_id = base.params().require_text("dim_id")?;
    let namespace = namespace(base)?;

    let term = resolve_expected(base, &namespace, &dim_id)?;
    let mut expected = expected_attributes(&term);
    let length = match expected.iter().position(|(k, _)| k == LENGTH_KEY) {
        Some(index) => {
            let (_, value) = expected.remove(index);
            let length = expected_length(&value).ok_or_else(|| {
                CheckError::Lookup(format!(
                    "length of '{}:{}' is not a whole number: {}",
                    namespace,
                    dim_id,
                    display_value(&value)
                ))
            })?;
            Some(length)
        }
        None => None,
    };

    let out_of = 1 + u32::from(length.is_some()) + 1 + 2 * expected.len() as u32;
    base.set_out_of(out_of);

    Ok(Box::new(Dimension {
        dim_id,
        length,
        expected,
    }))
}

impl Rule for Dimension {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        let Some(size) = ds.dimension_size(&self.dim_id) else {
            return Ok(base.graded(0));
        };

        let mut out_of = base.out_of();
        let mut achieved = 1;
        let mut messages = Vec::new();

        if let Some(length) = self.length {
            if size == length {
                achieved += 1;
            } else {
                messages.push(format!(
                    "Dimension '{}' has length {}, expected {}.",
                    self.dim_id, size, length
                ));
            }
        }

        if !ds.has_variable(&self.dim_id) {
            messages.push(format!(
                "Coordinate variable '{}' not found in the file.",
                self.dim_id
            ));
            return Ok(Score::new(achieved, out_of, messages));
        }
        achieved += 1;
        achieved += score_attributes(ds, &self.dim_id, &self.expected, &mut messages);

        if let Some(bounds) = ds.variable_attribute(&self.dim_id, "bounds") {
            out_of += 1;
            let bounds = bounds.to_string();
            if ds.has_variable(&bounds) {
                achieved += 1;
            } else {
                messages.push(format!(
                    "Bounds variable '{}' of coordinate variable '{}' not found in the file.",
                    bounds, self.dim_id
                ));
            }
        }

        Ok(Score::new(achieved, out_of, messages))
    }
}
