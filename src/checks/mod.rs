//! The check library, grouped by what each check inspects.

pub mod coords;
pub mod file;
pub mod file_name;
pub mod global_attrs;
pub mod metadata;
pub mod variables;

use crate::check::{CheckBase, CheckClass};
use crate::error::{CheckError, Result};
use crate::vocab::{lookup_id, VocabularyRef};

/// Checks invoked on a file path.
pub static FILE_CHECKS: &[&CheckClass] = &[
    &file::FILE_SIZE_CHECK,
    &file::FILE_NAME_STRUCTURE_CHECK,
    &file::NC_FILE_IS_READABLE_CHECK,
];

/// Checks invoked on an open dataset.
pub static DATASET_CHECKS: &[&CheckClass] = &[
    &global_attrs::GLOBAL_ATTR_EXISTS_CHECK,
    &global_attrs::GLOBAL_ATTR_REGEX_CHECK,
    &global_attrs::GLOBAL_ATTR_VOCAB_CHECK,
    &variables::ONE_MAIN_VARIABLE_PER_FILE_CHECK,
    &variables::MAIN_VARIABLE_TYPE_CHECK,
    &variables::VARIABLE_EXISTS_CHECK,
    &variables::VARIABLE_TYPE_CHECK,
    &variables::VARIABLE_RANGE_CHECK,
    &coords::NC_ARRAY_MATCHES_VOCAB_TERMS_CHECK,
    &coords::NC_COORD_VAR_HAS_BOUNDS_CHECK,
    &coords::NC_COORD_VAR_HAS_VALUES_IN_VOCAB_CHECK,
    &coords::NC_COORD_VAR_HAS_LENGTH_IN_VOCAB_CHECK,
    &file_name::VALID_GLOBAL_ATTRS_MATCH_FILE_NAME_CHECK,
    &metadata::NC_VARIABLE_METADATA_CHECK,
    &metadata::NC_MAIN_VARIABLE_METADATA_CHECK,
    &metadata::NC_DIMENSION_CHECK,
];

/// Vocabulary-backed checks refuse to build without a `vocabulary_ref`.
pub(crate) fn require_vocabulary_ref(base: &CheckBase) -> Result<&VocabularyRef> {
    base.vocabulary_ref().ok_or_else(|| {
        CheckError::Parameter(format!("{} requires a vocabulary_ref", base.spec().name))
    })
}

/// The collection named by `pyessv_namespace` (`river_basin` is `river-basin`).
pub(crate) fn namespace(base: &CheckBase) -> Result<String> {
    Ok(lookup_id(&base.params().require_text("pyessv_namespace")?))
}

/// Read `var_id`, defaulting `pyessv_namespace` to it when not given.
pub(crate) fn default_namespace(base: &mut CheckBase) -> Result<(String, String)> {
    let var_id = base.params().require_text("var_id")?;
    if !base.params().contains("pyessv_namespace") {
        base.params_mut().insert("pyessv_namespace", var_id.clone());
    }
    Ok((var_id, namespace(base)?))
}
