//! Read-only data-access interface over an opened scientific dataset.
//!
//! Checks never open files themselves. They consume a [`Dataset`] (global
//! attributes, variables, dimensions) that a [`DatasetOpener`] produced.
//! [`MemoryDataset`] is the in-memory implementation; its JSON form is the
//! header dump the binary reads from disk.

mod memory;

pub use memory::{JsonDatasetOpener, MemoryDataset, MemoryVariable};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Value of a global or variable attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Compare against an expected value taken from a vocabulary.
    ///
    /// Text and numbers compare across representations, so `"5"` matches `5`.
    pub fn matches(&self, expected: &serde_json::Value) -> bool {
        use serde_json::Value;

        match (self, expected) {
            (AttrValue::Text(s), Value::String(e)) => s == e,
            (AttrValue::Text(s), Value::Number(n)) => {
                matches!((s.trim().parse::<f64>(), n.as_f64()), (Ok(a), Some(b)) if a == b)
            }
            (AttrValue::Number(x), Value::Number(n)) => n.as_f64() == Some(*x),
            (AttrValue::Number(x), Value::String(e)) => {
                e.trim().parse::<f64>().map(|v| v == *x).unwrap_or(false)
            }
            (AttrValue::Numbers(xs), Value::Array(items)) => {
                xs.len() == items.len()
                    && xs
                        .iter()
                        .zip(items)
                        .all(|(x, item)| item.as_f64() == Some(*x))
            }
            (AttrValue::Numbers(_), Value::String(e)) => self.to_string() == *e,
            _ => false,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::Number(x) => write!(f, "{}", format_number(*x)),
            AttrValue::Numbers(xs) => {
                let parts: Vec<String> = xs.iter().map(|x| format_number(*x)).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(x: f64) -> Self {
        AttrValue::Number(x)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(xs: Vec<f64>) -> Self {
        AttrValue::Numbers(xs)
    }
}

/// Integral values print without a fractional part.
pub fn format_number(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

/// Storage type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Char,
    Str,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Int8 => "int8",
            DType::UInt8 => "uint8",
            DType::Int16 => "int16",
            DType::UInt16 => "uint16",
            DType::Int32 => "int32",
            DType::UInt32 => "uint32",
            DType::Int64 => "int64",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Char => "S1",
            DType::Str => "str",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DType {
    type Err = String;

    /// Accepts numpy-style names and type codes; byte-order prefixes are ignored.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches(['<', '>', '=', '|']);
        let dtype = match name {
            "int8" | "i1" | "b" | "byte" => DType::Int8,
            "uint8" | "u1" | "B" | "ubyte" => DType::UInt8,
            "int16" | "i2" | "h" | "short" => DType::Int16,
            "uint16" | "u2" | "H" | "ushort" => DType::UInt16,
            "int32" | "i4" | "i" | "intc" => DType::Int32,
            "uint32" | "u4" | "I" => DType::UInt32,
            "int64" | "i8" | "l" | "int" | "long" => DType::Int64,
            "uint64" | "u8" | "L" | "uint" => DType::UInt64,
            "float32" | "f4" | "f" | "single" => DType::Float32,
            "float64" | "f8" | "d" | "double" | "float" => DType::Float64,
            "S1" | "c" | "char" => DType::Char,
            "str" | "string" | "U" | "O" => DType::Str,
            _ => return Err(format!("unknown dtype: {}", s)),
        };
        Ok(dtype)
    }
}

impl TryFrom<String> for DType {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DType> for String {
    fn from(dtype: DType) -> Self {
        dtype.as_str().to_string()
    }
}

/// The element array of a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl VariableData {
    pub fn len(&self) -> usize {
        match self {
            VariableData::Numeric(v) => v.len(),
            VariableData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Minimum and maximum of the finite values, if there are any.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let VariableData::Numeric(values) = self else {
            return None;
        };
        values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Every element rendered as text, in order.
    pub fn to_text(&self) -> Vec<String> {
        match self {
            VariableData::Numeric(v) => v.iter().map(|x| format_number(*x)).collect(),
            VariableData::Text(v) => v.clone(),
        }
    }
}

impl From<Vec<f64>> for VariableData {
    fn from(v: Vec<f64>) -> Self {
        VariableData::Numeric(v)
    }
}

impl From<Vec<&str>> for VariableData {
    fn from(v: Vec<&str>) -> Self {
        VariableData::Text(v.into_iter().map(str::to_string).collect())
    }
}

/// Outcome of identifying the main variable of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainVariable {
    /// Exactly one variable has the largest element count.
    Unique(String),
    /// Two or more variables tie for the largest element count.
    Ambiguous(Vec<String>),
    /// The dataset has no variables.
    Empty,
}

impl MainVariable {
    pub fn name(&self) -> Option<&str> {
        match self {
            MainVariable::Unique(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_unique(&self) -> bool {
        matches!(self, MainVariable::Unique(_))
    }
}

/// Read-only view of an opened dataset.
///
/// Lookups of absent names return `None` rather than failing.
pub trait Dataset: Send + Sync {
    fn file_path(&self) -> &Path;

    /// Declared sub-format, e.g. `NETCDF4_CLASSIC`.
    fn sub_format(&self) -> &str;

    fn global_attribute_names(&self) -> Vec<&str>;

    fn global_attribute(&self, name: &str) -> Option<AttrValue>;

    fn variable_names(&self) -> Vec<&str>;

    fn variable_attribute_names(&self, var_id: &str) -> Option<Vec<&str>>;

    fn variable_attribute(&self, var_id: &str, name: &str) -> Option<AttrValue>;

    fn variable_dtype(&self, var_id: &str) -> Option<DType>;

    /// Number of elements in the variable.
    fn variable_size(&self, var_id: &str) -> Option<usize>;

    fn variable_array(&self, var_id: &str) -> Option<VariableData>;

    fn dimension_names(&self) -> Vec<&str>;

    fn dimension_size(&self, dim_id: &str) -> Option<usize>;

    fn has_global_attribute(&self, name: &str) -> bool {
        self.global_attribute(name).is_some()
    }

    fn has_variable(&self, var_id: &str) -> bool {
        self.variable_names().contains(&var_id)
    }

    fn has_dimension(&self, dim_id: &str) -> bool {
        self.dimension_size(dim_id).is_some()
    }

    /// The variable with strictly the largest element count.
    fn main_variable(&self) -> MainVariable {
        let sizes: Vec<(&str, usize)> = self
            .variable_names()
            .into_iter()
            .map(|name| (name, self.variable_size(name).unwrap_or(0)))
            .collect();

        let Some(max) = sizes.iter().map(|(_, size)| *size).max() else {
            return MainVariable::Empty;
        };

        let largest: Vec<String> = sizes
            .iter()
            .filter(|(_, size)| *size == max)
            .map(|(name, _)| name.to_string())
            .collect();

        match largest.as_slice() {
            [only] => MainVariable::Unique(only.clone()),
            _ => MainVariable::Ambiguous(largest),
        }
    }
}

/// Opens a path into a dataset handle.
pub trait DatasetOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn Dataset>>;
}
