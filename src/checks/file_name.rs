//! Cross-validation of file-name components against global attributes.
//!
//! A name such as `MOHC_atmos_day.nc` is split on the delimiter and matched
//! positionally against `order` (`institution_id~realm~frequency`). Each
//! component scores separately:
//!
//! | component          | file-name point | attribute points |
//! |--------------------|-----------------|------------------|
//! | vocabulary key     | 1               | 2                |
//! | `regex:<pattern>`  | 1               | -                |
//! | ignored key        | 1               | -                |
//!
//! `file_name_points = false` drops the per-component file-name point and
//! `extension_point = true` adds one point for the extension. The total is
//! fixed when the check is built.

use super::require_vocabulary_ref;
use crate::check::{CheckBase, CheckClass, CheckSpec, Family, Level, Literal, Rule, Score, Target};
use crate::error::{CheckError, Result};
use crate::vocab::{file_name_of, Component, CANONICAL_NAME};

/// Separator of the `order` and `ignore` lists.
const ORDER_SEPARATOR: char = '~';

static VALID_GLOBAL_ATTRS_MATCH_FILE_NAME_SPEC: CheckSpec = CheckSpec {
    name: "ValidGlobalAttrsMatchFileNameCheck",
    family: Family::Dataset,
    short_name: "Global attributes match file name/vocab",
    description: "All components in the file name must either be set as global attributes in the file and be valid terms in the relevant controlled vocabulary, or match the given regular expression(s).",
    message_templates: &[
        "File name does not match global attributes.",
        "Each global attribute is checked separately.",
    ],
    defaults: &[
        ("file_name_points", Literal::Bool(true)),
        ("extension_point", Literal::Bool(false)),
    ],
    required_args: &["delimiter", "extension", "order"],
    level: Level::High,
};

pub static VALID_GLOBAL_ATTRS_MATCH_FILE_NAME_CHECK: CheckClass = CheckClass::new(
    &VALID_GLOBAL_ATTRS_MATCH_FILE_NAME_SPEC,
    build_valid_global_attrs_match_file_name,
);

struct ValidGlobalAttrsMatchFileName {
    delimiter: String,
    extension: String,
    components: Vec<Component>,
    file_name_points: bool,
    extension_point: bool,
}

fn build_valid_global_attrs_match_file_name(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    require_vocabulary_ref(base)?;
    let params = base.params();

    let delimiter = params.require_text("delimiter")?;
    let extension = params.require_text("extension")?;
    let order = params.list("order", ORDER_SEPARATOR);
    if order.is_empty() {
        return Err(CheckError::Parameter(
            "order must name at least one file name component".to_string(),
        ));
    }

    let ignore = params.list("ignore", ORDER_SEPARATOR);
    if let Some(unknown) = ignore.iter().find(|key| !order.contains(key)) {
        return Err(CheckError::Parameter(format!(
            "ignored key '{}' is not in order: {}",
            unknown,
            order.join(&ORDER_SEPARATOR.to_string())
        )));
    }

    let components = order
        .iter()
        .map(|key| {
            if ignore.contains(key) {
                Ok(Component::wildcard(key))
            } else {
                Component::parse(key)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let file_name_points = params.flag("file_name_points", true)?;
    let extension_point = params.flag("extension_point", false)?;

    let per_file_name = u32::from(file_name_points);
    let out_of: u32 = components
        .iter()
        .map(|c| match c {
            Component::Collection { .. } => per_file_name + 2,
            Component::Pattern { .. } | Component::Wildcard { .. } => per_file_name,
        })
        .sum::<u32>()
        + u32::from(extension_point);
    if out_of == 0 {
        return Err(CheckError::Parameter(
            "order and weighting leave nothing to score".to_string(),
        ));
    }
    base.set_out_of(out_of);

    Ok(Box::new(ValidGlobalAttrsMatchFileName {
        delimiter,
        extension,
        components,
        file_name_points,
        extension_point,
    }))
}

impl Rule for ValidGlobalAttrsMatchFileName {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let ds = target.dataset()?;
        let vocab = base.vocabulary()?;
        let file_name = file_name_of(ds.file_path());

        let matched =
            vocab.match_file_name(&file_name, &self.components, &self.delimiter, &self.extension)?;

        let mut achieved = 0;
        let mut messages = Vec::new();

        if self.file_name_points {
            achieved += matched.valid.iter().filter(|ok| **ok).count() as u32;
            messages.extend(matched.messages.iter().cloned());
        }

        if self.extension_point {
            if matched.extension_matches {
                achieved += 1;
            } else {
                messages.push(format!(
                    "File name '{}' does not end with extension '{}'.",
                    file_name, self.extension
                ));
            }
        }

        for (index, component) in self.components.iter().enumerate() {
            let Component::Collection { key, .. } = component else {
                continue;
            };
            let fragment = matched.fragment(index).unwrap_or_default();
            let (points, attr_messages) =
                vocab.check_attribute_value(ds, key, fragment, CANONICAL_NAME)?;
            achieved += points;
            messages.extend(attr_messages);
        }

        Ok(Score::new(achieved, base.out_of(), messages))
    }
}
