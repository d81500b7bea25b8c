//! Variable checks: main-variable identification, existence, type and range.

use crate::check::{CheckBase, CheckClass, CheckSpec, Family, Level, Rule, Score, Target};
use crate::dataset::{DType, MainVariable};
use crate::error::{CheckError, Result};

fn parse_dtype(base: &CheckBase) -> Result<DType> {
    let text = base.params().require_text("dtype")?;
    text.parse::<DType>()
        .map_err(|e| CheckError::Parameter(format!("{}: {}", base.spec().name, e)))
}

static ONE_MAIN_VARIABLE_SPEC: CheckSpec = CheckSpec {
    name: "OneMainVariablePerFileCheck",
    family: Family::Dataset,
    short_name: "One main variable only",
    description: "Only 1 main variable must be written to each file (except ancillary and coordinate variables that are required to understand the main variable).",
    message_templates: &[
        "More than 1 main variable found in the file. Only 1 main variable should be there.",
    ],
    defaults: &[],
    required_args: &[],
    level: Level::High,
};

pub static ONE_MAIN_VARIABLE_PER_FILE_CHECK: CheckClass =
    CheckClass::new(&ONE_MAIN_VARIABLE_SPEC, build_one_main_variable);

struct OneMainVariable;

fn build_one_main_variable(_base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    Ok(Box::new(OneMainVariable))
}

impl Rule for OneMainVariable {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        Ok(base.pass_fail(ds.main_variable().is_unique()))
    }
}

static MAIN_VARIABLE_TYPE_SPEC: CheckSpec = CheckSpec {
    name: "MainVariableTypeCheck",
    family: Family::Dataset,
    short_name: "Main variable type",
    description: "The main variable must be type: {dtype}.",
    message_templates: &["Main variable was not the required type: {dtype}"],
    defaults: &[],
    required_args: &["dtype"],
    level: Level::High,
};

pub static MAIN_VARIABLE_TYPE_CHECK: CheckClass =
    CheckClass::new(&MAIN_VARIABLE_TYPE_SPEC, build_main_variable_type);

struct MainVariableType {
    dtype: DType,
}

fn build_main_variable_type(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    Ok(Box::new(MainVariableType {
        dtype: parse_dtype(base)?,
    }))
}

impl Rule for MainVariableType {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        match ds.main_variable() {
            MainVariable::Unique(name) => {
                Ok(base.pass_fail(ds.variable_dtype(&name) == Some(self.dtype)))
            }
            MainVariable::Ambiguous(names) => Ok(Score::new(
                0,
                base.out_of(),
                vec![format!(
                    "No unique main variable found in the file ({} share the largest size), so its type cannot be checked.",
                    names.join(", ")
                )],
            )),
            MainVariable::Empty => Ok(Score::new(
                0,
                base.out_of(),
                vec!["No variables found in the file, so the main variable type cannot be checked.".to_string()],
            )),
        }
    }
}

static VARIABLE_EXISTS_SPEC: CheckSpec = CheckSpec {
    name: "VariableExistsCheck",
    family: Family::Dataset,
    short_name: "Variable exists: {var_id}",
    description: "The variable '{var_id}' must exist in the file.",
    message_templates: &["Required variable '{var_id}' is not present."],
    defaults: &[],
    required_args: &["var_id"],
    level: Level::High,
};

pub static VARIABLE_EXISTS_CHECK: CheckClass =
    CheckClass::new(&VARIABLE_EXISTS_SPEC, build_variable_exists);

struct VariableExists {
    var_id: String,
}

fn build_variable_exists(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    Ok(Box::new(VariableExists {
        var_id: base.params().require_text("var_id")?,
    }))
}

impl Rule for VariableExists {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        Ok(base.pass_fail(ds.has_variable(&self.var_id)))
    }
}

static VARIABLE_TYPE_SPEC: CheckSpec = CheckSpec {
    name: "VariableTypeCheck",
    family: Family::Dataset,
    short_name: "Variable type: {var_id}",
    description: "The variable '{var_id}' must exist and be of type: {dtype}.",
    message_templates: &[
        "Variable '{var_id}' not found in the file so cannot perform other checks.",
        "Variable '{var_id}' was not the required type: {dtype}",
    ],
    defaults: &[],
    required_args: &["var_id", "dtype"],
    level: Level::High,
};

pub static VARIABLE_TYPE_CHECK: CheckClass =
    CheckClass::new(&VARIABLE_TYPE_SPEC, build_variable_type);

struct VariableType {
    var_id: String,
    dtype: DType,
}

fn build_variable_type(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    Ok(Box::new(VariableType {
        var_id: base.params().require_text("var_id")?,
        dtype: parse_dtype(base)?,
    }))
}

impl Rule for VariableType {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        let achieved = match ds.variable_dtype(&self.var_id) {
            None => 0,
            Some(dtype) if dtype != self.dtype => 1,
            Some(_) => 2,
        };
        Ok(base.graded(achieved))
    }
}

static VARIABLE_RANGE_SPEC: CheckSpec = CheckSpec {
    name: "VariableRangeCheck",
    family: Family::Dataset,
    short_name: "Variable range: {var_id}",
    description: "The variable '{var_id}' must have values in the range {minimum} to {maximum}.",
    message_templates: &[
        "Variable '{var_id}' not found in the file so cannot perform other checks.",
        "Variable '{var_id}' has values outside the range {minimum} to {maximum}.",
    ],
    defaults: &[],
    required_args: &["var_id", "minimum", "maximum"],
    level: Level::High,
};

/// 0 absent, 1 some finite value outside `[minimum, maximum]`, 2 all inside.
pub static VARIABLE_RANGE_CHECK: CheckClass =
    CheckClass::new(&VARIABLE_RANGE_SPEC, build_variable_range);

struct VariableRange {
    var_id: String,
    minimum: f64,
    maximum: f64,
}

fn build_variable_range(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    let minimum = base.params().require_f64("minimum")?;
    let maximum = base.params().require_f64("maximum")?;
    if minimum > maximum {
        return Err(CheckError::Parameter(format!(
            "VariableRangeCheck minimum {} is greater than maximum {}",
            minimum, maximum
        )));
    }
    Ok(Box::new(VariableRange {
        var_id: base.params().require_text("var_id")?,
        minimum,
        maximum,
    }))
}

impl Rule for VariableRange {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        if !ds.has_variable(&self.var_id) {
            return Ok(base.graded(0));
        }

        let range = ds.variable_array(&self.var_id).and_then(|data| data.min_max());
        match range {
            Some((lo, hi)) => Ok(base.graded(if lo < self.minimum || hi > self.maximum {
                1
            } else {
                2
            })),
            None => Ok(Score::new(
                1,
                base.out_of(),
                vec![format!(
                    "Variable '{}' has no numeric values to compare with the range.",
                    self.var_id
                )],
            )),
        }
    }
}
