//! Checks invoked on a file path.

use std::fs;

use regex::Regex;
use tracing::debug;

use crate::check::{CheckBase, CheckClass, CheckSpec, Family, Level, Literal, Rule, Score, Target};
use crate::error::{CheckError, Result};
use crate::vocab::file_name_of;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Characters allowed inside one file-name component.
const ALLOWED_CHARACTERS: &str = r"[A-Za-z0-9\-\.]";

static FILE_SIZE_SPEC: CheckSpec = CheckSpec {
    name: "FileSizeCheck",
    family: Family::File,
    short_name: "File size {strictness} limit {threshold}Gbytes",
    description: "Data file {strictness} size limit: {threshold}Gbytes.",
    message_templates: &["Data file exceeds {strictness} limit of {threshold}Gbytes in size."],
    defaults: &[("threshold", Literal::Int(2)), ("strictness", Literal::Str("hard"))],
    required_args: &[],
    level: Level::High,
};

/// The file must be smaller than `threshold` GiB.
pub static FILE_SIZE_CHECK: CheckClass = CheckClass::new(&FILE_SIZE_SPEC, build_file_size);

struct FileSize {
    limit_bytes: f64,
}

fn build_file_size(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    let threshold = base.params().require_f64("threshold")?;
    if threshold <= 0.0 {
        return Err(CheckError::Parameter(format!(
            "threshold must be positive, got {}",
            threshold
        )));
    }
    Ok(Box::new(FileSize {
        limit_bytes: threshold * GIB,
    }))
}

impl Rule for FileSize {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let path = target.path();
        let metadata = fs::metadata(path).map_err(|source| CheckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(base.pass_fail((metadata.len() as f64) < self.limit_bytes))
    }
}

static FILE_NAME_STRUCTURE_SPEC: CheckSpec = CheckSpec {
    name: "FileNameStructureCheck",
    family: Family::File,
    short_name: "File name structure",
    description: "File name must consist of items separated by '{delimiter}', followed by '{extension}'.",
    message_templates: &[
        "File name does not follow required format of '{delimiter}' delimiters and '{extension}' extension.",
    ],
    defaults: &[("delimiter", Literal::Str("_")), ("extension", Literal::Str(".nc"))],
    required_args: &[],
    level: Level::High,
};

/// Two or more delimited components of allowed characters, then the extension.
pub static FILE_NAME_STRUCTURE_CHECK: CheckClass =
    CheckClass::new(&FILE_NAME_STRUCTURE_SPEC, build_file_name_structure);

struct FileNameStructure {
    pattern: Regex,
}

fn build_file_name_structure(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    let delimiter = regex::escape(&base.params().require_text("delimiter")?);
    let extension = regex::escape(&base.params().require_text("extension")?);
    let pattern = format!(
        "^{ac}+({delim}{ac}+)+{ext}$",
        ac = ALLOWED_CHARACTERS,
        delim = delimiter,
        ext = extension
    );
    let pattern = Regex::new(&pattern)
        .map_err(|e| CheckError::Parameter(format!("invalid file name pattern: {}", e)))?;
    Ok(Box::new(FileNameStructure { pattern }))
}

impl Rule for FileNameStructure {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let name = file_name_of(target.path());
        Ok(base.pass_fail(self.pattern.is_match(&name)))
    }
}

static NC_FILE_IS_READABLE_SPEC: CheckSpec = CheckSpec {
    name: "NCFileIsReadableCheck",
    family: Family::File,
    short_name: "File is netCDF",
    description: "Data file is recognised as a valid netCDF file, using sub-format: {file_format}.",
    message_templates: &["File is not in required netCDF format: {file_format}."],
    defaults: &[("file_format", Literal::Str("NETCDF4_CLASSIC"))],
    required_args: &[],
    level: Level::High,
};

/// The file opens as a dataset with the expected sub-format.
pub static NC_FILE_IS_READABLE_CHECK: CheckClass =
    CheckClass::new(&NC_FILE_IS_READABLE_SPEC, build_nc_file_is_readable);

struct NcFileIsReadable {
    file_format: String,
}

fn build_nc_file_is_readable(base: &mut CheckBase) -> Result<Box<dyn Rule>> {
    Ok(Box::new(NcFileIsReadable {
        file_format: base.params().require_text("file_format")?,
    }))
}

impl Rule for NcFileIsReadable {
    fn score(&self, base: &CheckBase, target: Target<'_>) -> Result<Score> {
        let readable = match base.env().opener.open(target.path()) {
            Ok(ds) => ds.sub_format() == self.file_format,
            Err(e) => {
                debug!(path = %target.path().display(), error = %e, "dataset failed to open");
                false
            }
        };
        Ok(base.pass_fail(readable))
    }
}
