//! Coordinate variable checks: bounds and agreement with vocabulary collections.

use std::collections::HashSet;

use super::{default_namespace, namespace, require_vocabulary_ref};
use crate::check::{CheckBase, CheckClass, CheckSpec, Family, Level, Rule, Score, Target};
use crate::error::Result;

static NC_COORD_VAR_HAS_BOUNDS_SPEC: CheckSpec = CheckSpec {
    name: "NCCoordVarHasBoundsCheck",
    family: Family::Dataset,
    short_name: "Coord Var has bounds: {var_id}",
    description: "The coordinate variable '{var_id}' must exist in the file with a valid bounds variable.",
    message_templates: &[
        "Variable '{var_id}' not found in the file so cannot perform other checks.",
        "A valid 'bounds' variable does not exist for variable '{var_id}'.",
    ],
    defaults: &[],
    required_args: &["var_id"],
    level: Level::High,
};

/// 1 for the variable, 1 for a `bounds` attribute naming an existing variable.
pub static NC_COORD_VAR_HAS_BOUNDS_CHECK: CheckClass =
    CheckClass::new(&NC_COORD_VAR_HAS_BOUNDS_SPEC, build_has_bounds);

struct CoordVarHasBounds {
    var_id: String,
}

fn build_has_bounds(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    Ok(Box::new(CoordVarHasBounds {
        var_id: base.params().require_text("var_id")?,
    }))
}

impl Rule for CoordVarHasBounds {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        if !ds.has_variable(&self.var_id) {
            return Ok(base.graded(0));
        }
        let has_bounds = ds
            .variable_attribute(&self.var_id, "bounds")
            .and_then(|b| b.as_text().map(|name| ds.has_variable(name)))
            .unwrap_or(false);
        Ok(base.graded(if has_bounds { 2 } else { 1 }))
    }
}

static NC_ARRAY_MATCHES_VOCAB_TERMS_SPEC: CheckSpec = CheckSpec {
    name: "NCArrayMatchesVocabTermsCheck",
    family: Family::Dataset,
    short_name: "Array matches vocabulary: {var_id}",
    description: "The array of variable '{var_id}' must match, in order, the terms of vocabulary collection '{pyessv_namespace}'.",
    message_templates: &[
        "Array of variable '{var_id}' does not match the terms of vocabulary collection '{pyessv_namespace}'.",
    ],
    defaults: &[],
    required_args: &["var_id", "pyessv_namespace"],
    level: Level::High,
};

/// Pass/fail: the variable's data must equal the ordered term list. A missing
/// variable or one without data fails.
pub static NC_ARRAY_MATCHES_VOCAB_TERMS_CHECK: CheckClass =
    CheckClass::new(&NC_ARRAY_MATCHES_VOCAB_TERMS_SPEC, build_array_matches);

struct ArrayMatchesVocabTerms {
    var_id: String,
    namespace: String,
}

fn build_array_matches(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    require_vocabulary_ref(base)?;
    Ok(Box::new(ArrayMatchesVocabTerms {
        var_id: base.params().require_text("var_id")?,
        namespace: namespace(base)?,
    }))
}

impl Rule for ArrayMatchesVocabTerms {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        let vocab = base.vocabulary()?;
        let matched = match ds.variable_array(&self.var_id) {
            Some(array) => vocab.array_matches_collection(&array, &self.namespace)?,
            None => false,
        };
        Ok(base.pass_fail(matched))
    }
}

static NC_COORD_VAR_HAS_VALUES_IN_VOCAB_SPEC: CheckSpec = CheckSpec {
    name: "NCCoordVarHasValuesInVocabCheck",
    family: Family::Dataset,
    short_name: "Coord Var values in vocabulary: {var_id}",
    description: "Every value of coordinate variable '{var_id}' must be a term of vocabulary collection '{pyessv_namespace}'.",
    message_templates: &[
        "Variable '{var_id}' not found in the file so cannot perform other checks.",
        "Variable '{var_id}' has values that are not terms in the vocabulary.",
    ],
    defaults: &[],
    required_args: &["var_id"],
    level: Level::High,
};

/// 0 absent, 1 some value is not a term, 2 every value is a term.
pub static NC_COORD_VAR_HAS_VALUES_IN_VOCAB_CHECK: CheckClass =
    CheckClass::new(&NC_COORD_VAR_HAS_VALUES_IN_VOCAB_SPEC, build_values_in_vocab);

struct CoordVarHasValuesInVocab {
    var_id: String,
    namespace: String,
}

fn build_values_in_vocab(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    require_vocabulary_ref(base)?;
    let (var_id, namespace) = default_namespace(base)?;
    Ok(Box::new(CoordVarHasValuesInVocab { var_id, namespace }))
}

impl Rule for CoordVarHasValuesInVocab {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        if !ds.has_variable(&self.var_id) {
            return Ok(base.graded(0));
        }

        let vocab = base.vocabulary()?;
        let terms = vocab.terms(&self.namespace)?;
        let allowed: HashSet<String> = terms
            .iter()
            .flat_map(|t| [t.name.clone(), t.label(), t.canonical_name()])
            .collect();

        let all_known = match ds.variable_array(&self.var_id) {
            Some(array) => array
                .to_text()
                .iter()
                .all(|value| allowed.contains(value.trim())),
            None => false,
        };
        Ok(base.graded(if all_known { 2 } else { 1 }))
    }
}

static NC_COORD_VAR_HAS_LENGTH_IN_VOCAB_SPEC: CheckSpec = CheckSpec {
    name: "NCCoordVarHasLengthInVocabCheck",
    family: Family::Dataset,
    short_name: "Coord Var length in vocabulary: {var_id}",
    description: "The length of coordinate variable '{var_id}' must equal the number of terms in vocabulary collection '{pyessv_namespace}'.",
    message_templates: &[
        "Variable '{var_id}' not found in the file so cannot perform other checks.",
        "Variable '{var_id}' does not have the number of values expected by the vocabulary.",
    ],
    defaults: &[],
    required_args: &["var_id"],
    level: Level::High,
};

/// 0 absent, 1 length differs from the term count, 2 equal.
pub static NC_COORD_VAR_HAS_LENGTH_IN_VOCAB_CHECK: CheckClass =
    CheckClass::new(&NC_COORD_VAR_HAS_LENGTH_IN_VOCAB_SPEC, build_length_in_vocab);

struct CoordVarHasLengthInVocab {
    var_id: String,
    namespace: String,
}

fn build_length_in_vocab(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    require_vocabulary_ref(base)?;
    let (var_id, namespace) = default_namespace(base)?;
    Ok(Box::new(CoordVarHasLengthInVocab { var_id, namespace }))
}

impl Rule for CoordVarHasLengthInVocab {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        let Some(size) = ds.variable_size(&self.var_id) else {
            return Ok(base.graded(0));
        };
        let vocab = base.vocabulary()?;
        let expected = vocab.terms(&self.namespace)?.len();
        Ok(base.graded(if size == expected { 2 } else { 1 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{Check, CheckEnv, CheckOptions, Parameters};
    use crate::dataset::{DType, MemoryDataset, MemoryVariable};
    use crate::error::CheckError;
    use crate::vocab::{ScopeVocabulary, Term, VocabularyStore};
    use std::sync::Arc;

    fn env() -> CheckEnv {
        let vocab = ScopeVocabulary::new("ukcp", "ukcp18")
            .with_term("region", Term::new("east-midlands").with_property("label", "East Midlands"))
            .with_term("region", Term::new("london").with_property("label", "London"))
            .with_term("region", Term::new("wales").with_property("label", "Wales"))
            .with_term("river-basin", Term::new("anglian"))
            .with_term("river-basin", Term::new("humber"))
            .with_term("river-basin", Term::new("thames"));
        CheckEnv::new(Arc::new(VocabularyStore::new().with(vocab)))
    }

    fn build(class: &CheckClass, params: Parameters) -> Result<Check> {
        class.instantiate(&params, CheckOptions::vocabulary("ukcp:ukcp18"), &env())
    }

    fn regions(values: Vec<&str>) -> MemoryDataset {
        MemoryDataset::new("r.nc")
            .with_dimension("region", values.len())
            .with_variable(
                "region",
                MemoryVariable::new(DType::Str)
                    .with_dimensions(&["region"])
                    .with_data(values),
            )
    }

    #[test]
    fn test_has_bounds() {
        let check = build(
            &NC_COORD_VAR_HAS_BOUNDS_CHECK,
            Parameters::new().with("var_id", "time"),
        )
        .unwrap();

        let ds = MemoryDataset::new("t.nc")
            .with_dimension("time", 3)
            .with_dimension("bnds", 2)
            .with_variable(
                "time",
                MemoryVariable::new(DType::Float64)
                    .with_dimensions(&["time"])
                    .with_attribute("bounds", "time_bnds"),
            )
            .with_variable(
                "time_bnds",
                MemoryVariable::new(DType::Float64).with_dimensions(&["time", "bnds"]),
            );
        assert_eq!(check.run(Target::Dataset(&ds)).unwrap().value(), (2, 2));

        let ds = ds.clone().with_variable(
            "time",
            MemoryVariable::new(DType::Float64)
                .with_dimensions(&["time"])
                .with_attribute("bounds", "missing_bnds"),
        );
        let result = check.run(Target::Dataset(&ds)).unwrap();
        assert_eq!(result.value(), (1, 2));
        assert_eq!(
            result.messages,
            vec!["A valid 'bounds' variable does not exist for variable 'time'."]
        );

        let result = check.run(Target::Dataset(&MemoryDataset::new("e.nc"))).unwrap();
        assert_eq!(result.value(), (0, 2));
        assert_eq!(
            result.messages,
            vec!["Variable 'time' not found in the file so cannot perform other checks."]
        );
    }

    #[test]
    fn test_array_matches_vocab_terms() {
        let check = build(
            &NC_ARRAY_MATCHES_VOCAB_TERMS_CHECK,
            Parameters::new()
                .with("var_id", "region")
                .with("pyessv_namespace", "region"),
        )
        .unwrap();

        assert_eq!(check.out_of(), 1);

        let ds = regions(vec!["east-midlands", "London", "wales"]);
        let result = check.run(Target::Dataset(&ds)).unwrap();
        assert_eq!(result.value(), (1, 1));
        assert!(result.messages.is_empty());

        let ds = regions(vec!["london", "east-midlands", "wales"]);
        let result = check.run(Target::Dataset(&ds)).unwrap();
        assert_eq!(result.value(), (0, 1));
        assert_eq!(
            result.messages,
            vec!["Array of variable 'region' does not match the terms of vocabulary collection 'region'."]
        );

        assert_eq!(
            check.run(Target::Dataset(&MemoryDataset::new("e.nc"))).unwrap().value(),
            (0, 1)
        );

        // A variable without data cannot match.
        let no_data = MemoryDataset::new("n.nc")
            .with_dimension("region", 3)
            .with_variable(
                "region",
                MemoryVariable::new(DType::Str).with_dimensions(&["region"]),
            );
        assert_eq!(check.run(Target::Dataset(&no_data)).unwrap().value(), (0, 1));
    }

    #[test]
    fn test_underscored_namespace_maps_to_collection() {
        let check = build(
            &NC_ARRAY_MATCHES_VOCAB_TERMS_CHECK,
            Parameters::new()
                .with("var_id", "geo_region")
                .with("pyessv_namespace", "river_basin"),
        )
        .unwrap();

        let basins = |values: Vec<&str>| {
            MemoryDataset::new("river_basin.nc")
                .with_dimension("region", values.len())
                .with_variable(
                    "geo_region",
                    MemoryVariable::new(DType::Str)
                        .with_dimensions(&["region"])
                        .with_data(values),
                )
        };
        let good = basins(vec!["anglian", "humber", "thames"]);
        assert_eq!(check.run(Target::Dataset(&good)).unwrap().value(), (1, 1));
        let bad = basins(vec!["thames", "humber", "anglian"]);
        assert_eq!(check.run(Target::Dataset(&bad)).unwrap().value(), (0, 1));

        let lengths = build(
            &NC_COORD_VAR_HAS_LENGTH_IN_VOCAB_CHECK,
            Parameters::new()
                .with("var_id", "geo_region")
                .with("pyessv_namespace", "river_basin"),
        )
        .unwrap();
        assert_eq!(lengths.run(Target::Dataset(&good)).unwrap().value(), (2, 2));
    }

    #[test]
    fn test_array_matches_requires_vocabulary_ref() {
        let err = NC_ARRAY_MATCHES_VOCAB_TERMS_CHECK
            .instantiate(
                &Parameters::new()
                    .with("var_id", "region")
                    .with("pyessv_namespace", "region"),
                CheckOptions::default(),
                &env(),
            )
            .unwrap_err();
        assert!(matches!(err, CheckError::Parameter(_)));
    }

    #[test]
    fn test_values_in_vocab_defaults_namespace_to_var_id() {
        let check = build(
            &NC_COORD_VAR_HAS_VALUES_IN_VOCAB_CHECK,
            Parameters::new().with("var_id", "region"),
        )
        .unwrap();
        assert_eq!(check.parameters().text("pyessv_namespace").as_deref(), Some("region"));
        assert!(check.description().unwrap().contains("collection 'region'"));

        let ds = regions(vec!["wales", "london"]);
        assert_eq!(check.run(Target::Dataset(&ds)).unwrap().value(), (2, 2));

        let ds = regions(vec!["wales", "cornwall"]);
        let result = check.run(Target::Dataset(&ds)).unwrap();
        assert_eq!(result.value(), (1, 2));
        assert_eq!(
            result.messages,
            vec!["Variable 'region' has values that are not terms in the vocabulary."]
        );
    }

    #[test]
    fn test_length_in_vocab() {
        let check = build(
            &NC_COORD_VAR_HAS_LENGTH_IN_VOCAB_CHECK,
            Parameters::new().with("var_id", "region"),
        )
        .unwrap();

        let ds = regions(vec!["wales", "london", "wales"]);
        assert_eq!(check.run(Target::Dataset(&ds)).unwrap().value(), (2, 2));

        let ds = regions(vec!["wales"]);
        assert_eq!(check.run(Target::Dataset(&ds)).unwrap().value(), (1, 2));
    }

    #[test]
    fn test_unknown_namespace_propagates_lookup_error() {
        let check = build(
            &NC_COORD_VAR_HAS_LENGTH_IN_VOCAB_CHECK,
            Parameters::new()
                .with("var_id", "region")
                .with("pyessv_namespace", "county"),
        )
        .unwrap();
        let ds = regions(vec!["wales"]);
        assert!(matches!(
            check.run(Target::Dataset(&ds)),
            Err(CheckError::Lookup(_))
        ));
    }
}
