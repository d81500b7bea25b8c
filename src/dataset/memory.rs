//! In-memory dataset and the JSON header-dump opener.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{AttrValue, DType, Dataset, DatasetOpener, VariableData};
use crate::error::{CheckError, Result};

fn default_format() -> String {
    "NETCDF4_CLASSIC".to_string()
}

/// A dataset held entirely in memory.
///
/// Deserializes from a header dump:
///
/// ```json
/// {
///   "path": "tas_day.nc",
///   "format": "NETCDF4_CLASSIC",
///   "dimensions": { "time": 3 },
///   "attributes": { "frequency": "day" },
///   "variables": {
///     "tas": { "dtype": "float32", "dimensions": ["time"], "data": [280.1, 281.0, 279.5] }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDataset {
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default = "default_format", rename = "format")]
    pub sub_format: String,
    #[serde(default)]
    pub dimensions: BTreeMap<String, usize>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
    #[serde(default)]
    pub variables: BTreeMap<String, MemoryVariable>,
}

/// A variable of a [`MemoryDataset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryVariable {
    pub dtype: DType,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
    #[serde(default)]
    pub data: Option<VariableData>,
}

impl MemoryVariable {
    pub fn new(dtype: DType) -> Self {
        Self {
            dtype,
            dimensions: Vec::new(),
            attributes: BTreeMap::new(),
            data: None,
        }
    }

    pub fn with_dimensions(mut self, dims: &[&str]) -> Self {
        self.dimensions = dims.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<VariableData>) -> Self {
        self.data = Some(data.into());
        self
    }
}

impl MemoryDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sub_format: default_format(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.sub_format = format.to_string();
        self
    }

    pub fn with_dimension(mut self, name: &str, size: usize) -> Self {
        self.dimensions.insert(name.to_string(), size);
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_variable(mut self, name: &str, variable: MemoryVariable) -> Self {
        self.variables.insert(name.to_string(), variable);
        self
    }

    pub fn without_attribute(mut self, name: &str) -> Self {
        self.attributes.remove(name);
        self
    }

    /// Parse a JSON header dump. A dump without a `path` reports the dump's
    /// own path minus any trailing `.json`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| CheckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut dataset: MemoryDataset =
            serde_json::from_str(&content).map_err(|source| CheckError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if dataset.path.as_os_str().is_empty() {
            dataset.path = strip_json_suffix(path);
        }
        Ok(dataset)
    }
}

fn strip_json_suffix(path: &Path) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_suffix(".json")) {
        Some(stripped) => PathBuf::from(stripped),
        None => path.to_path_buf(),
    }
}

impl Dataset for MemoryDataset {
    fn file_path(&self) -> &Path {
        &self.path
    }

    fn sub_format(&self) -> &str {
        &self.sub_format
    }

    fn global_attribute_names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    fn global_attribute(&self, name: &str) -> Option<AttrValue> {
        self.attributes.get(name).cloned()
    }

    fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    fn variable_attribute_names(&self, var_id: &str) -> Option<Vec<&str>> {
        self.variables
            .get(var_id)
            .map(|v| v.attributes.keys().map(String::as_str).collect())
    }

    fn variable_attribute(&self, var_id: &str, name: &str) -> Option<AttrValue> {
        self.variables.get(var_id)?.attributes.get(name).cloned()
    }

    fn variable_dtype(&self, var_id: &str) -> Option<DType> {
        self.variables.get(var_id).map(|v| v.dtype)
    }

    /// Product of the variable's dimension sizes, saturating at `usize::MAX`;
    /// dimensionless variables count their data, or one element for a scalar.
    fn variable_size(&self, var_id: &str) -> Option<usize> {
        let variable = self.variables.get(var_id)?;
        if variable.dimensions.is_empty() {
            return Some(variable.data.as_ref().map_or(1, VariableData::len));
        }
        Some(
            variable
                .dimensions
                .iter()
                .map(|d| self.dimensions.get(d).copied().unwrap_or(0))
                .fold(1usize, usize::saturating_mul),
        )
    }

    fn variable_array(&self, var_id: &str) -> Option<VariableData> {
        self.variables.get(var_id)?.data.clone()
    }

    fn dimension_names(&self) -> Vec<&str> {
        self.dimensions.keys().map(String::as_str).collect()
    }

    fn dimension_size(&self, dim_id: &str) -> Option<usize> {
        self.dimensions.get(dim_id).copied()
    }

    fn has_variable(&self, var_id: &str) -> bool {
        self.variables.contains_key(var_id)
    }
}

/// Opens datasets from JSON header dumps.
///
/// A path ending in `.json` is read directly; any other path is read from
/// its `<path>.json` sidecar and reports the original path as its file path.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDatasetOpener;

impl DatasetOpener for JsonDatasetOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Dataset>> {
        if path.extension().is_some_and(|ext| ext == "json") {
            return Ok(Box::new(MemoryDataset::from_json_file(path)?));
        }

        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(".json");
        let sidecar = PathBuf::from(sidecar);
        if !sidecar.is_file() {
            return Err(CheckError::File(format!(
                "not a readable dataset (no header dump): {}",
                path.display()
            )));
        }

        let mut dataset = MemoryDataset::from_json_file(&sidecar)?;
        dataset.path = path.to_path_buf();
        Ok(Box::new(dataset))
    }
}
