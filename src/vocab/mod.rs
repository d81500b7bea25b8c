//! Controlled-vocabulary lookups.
//!
//! A [`Vocabulary`] is one `authority:scope` of collections of [`Term`]s.
//! Checks reach it through [`VocabularyStore`] using the `vocabulary_ref`
//! they were configured with; the provided trait methods implement the
//! attribute, file-name and array comparisons the checks score against.

mod store;

pub use store::{ScopeVocabulary, VocabularyStore};

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dataset::{Dataset, VariableData};
use crate::error::{CheckError, Result};

/// Prefix marking a file-name component matched by pattern rather than term.
pub const REGEX_PREFIX: &str = "regex:";

/// Term property compared against file-name fragments and attribute values.
pub const CANONICAL_NAME: &str = "canonical_name";

/// `authority:scope[:extra]` reference to a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VocabularyRef {
    pub authority: String,
    pub scope: String,
    /// Optional third segment; some checks read a collection name from it.
    pub extra: Option<String>,
}

impl VocabularyRef {
    pub fn new(authority: &str, scope: &str) -> Self {
        Self {
            authority: authority.to_string(),
            scope: scope.to_string(),
            extra: None,
        }
    }
}

impl FromStr for VocabularyRef {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(3, ':');
        let authority = parts.next().unwrap_or_default();
        let scope = parts.next().unwrap_or_default();
        if authority.is_empty() || scope.is_empty() {
            return Err(CheckError::Parameter(format!(
                "vocabulary_ref must be 'authority:scope[:extra]', got '{}'",
                s
            )));
        }
        Ok(Self {
            authority: authority.to_string(),
            scope: scope.to_string(),
            extra: parts.next().filter(|e| !e.is_empty()).map(str::to_string),
        })
    }
}

impl fmt::Display for VocabularyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.scope)?;
        if let Some(extra) = &self.extra {
            write!(f, ":{}", extra)?;
        }
        Ok(())
    }
}

/// Map an attribute name to its collection name (`_` becomes `-`).
pub fn lookup_id(attribute: &str) -> String {
    attribute.replace('_', "-")
}

/// An entry of a vocabulary collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub name: String,
    /// Everything else the term declares: `label`, `canonical_name`,
    /// `description`, `data`, ...
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Term {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// A top-level property. `name` is always present; `label` and
    /// `canonical_name` fall back to the name.
    pub fn property(&self, key: &str) -> Option<Value> {
        match (key, self.properties.get(key)) {
            ("name", _) => Some(Value::String(self.name.clone())),
            (_, Some(value)) => Some(value.clone()),
            ("label" | "canonical_name", None) => Some(Value::String(self.name.clone())),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        self.text_property("label")
    }

    pub fn canonical_name(&self) -> String {
        self.text_property(CANONICAL_NAME)
    }

    fn text_property(&self, key: &str) -> String {
        match self.properties.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => self.name.clone(),
        }
    }

    /// The `data` mapping, if the term declares one.
    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.properties.get("data").and_then(Value::as_object)
    }

    /// Whether `value` names this term by name, label, canonical name or synonym.
    pub fn matches(&self, value: &str) -> bool {
        if self.name == value || self.label() == value || self.canonical_name() == value {
            return true;
        }
        match self.properties.get("synonyms") {
            Some(Value::Array(items)) => items.iter().any(|s| s.as_str() == Some(value)),
            _ => false,
        }
    }

    /// Value of a dotted property path, e.g. `data.units`.
    ///
    /// An absent or empty top-level property yields `None`. A missing key
    /// below an existing top-level property is a lookup error.
    pub fn get_value(&self, path: &str) -> Result<Option<Value>> {
        let mut keys = path.split('.');
        let top = keys.next().unwrap_or_default();

        let Some(mut value) = self.property(top).filter(is_truthy) else {
            return Ok(None);
        };

        for key in keys {
            value = value.get(key).cloned().ok_or_else(|| {
                CheckError::Lookup(format!(
                    "Could not get value of term based on vocabulary lookup: '{}'.",
                    path
                ))
            })?;
        }
        Ok(Some(value))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// One positional component of a file-name template.
#[derive(Debug, Clone)]
pub enum Component {
    /// Fragment must be a term of this collection.
    Collection { key: String, collection: String },
    /// Fragment must match this pattern in full.
    Pattern { key: String, regex: Regex },
    /// Any non-empty fragment.
    Wildcard { key: String },
}

impl Component {
    /// Parse an `order` item: `regex:<pattern>` or an attribute key.
    pub fn parse(key: &str) -> Result<Self> {
        match key.strip_prefix(REGEX_PREFIX) {
            Some(pattern) => {
                let pattern = pattern.replace("\\\\", "\\");
                let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
                    CheckError::Parameter(format!("invalid regex in '{}': {}", key, e))
                })?;
                Ok(Component::Pattern {
                    key: key.to_string(),
                    regex,
                })
            }
            None => Ok(Component::Collection {
                key: key.to_string(),
                collection: lookup_id(key),
            }),
        }
    }

    /// The `order` item this component was parsed from.
    pub fn key(&self) -> &str {
        match self {
            Component::Collection { key, .. }
            | Component::Pattern { key, .. }
            | Component::Wildcard { key } => key,
        }
    }

    /// A component that accepts any non-empty fragment.
    pub fn wildcard(key: &str) -> Self {
        Component::Wildcard {
            key: key.to_string(),
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Component::Pattern { .. })
    }
}

/// Outcome of matching a file name against an ordered template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameMatch {
    /// The name with its extension removed, split on the delimiter.
    pub fragments: Vec<String>,
    /// Per template component, whether its positional fragment is valid.
    /// All false when the fragment count differs from the template.
    pub valid: Vec<bool>,
    /// Whether the name ends with the expected extension.
    pub extension_matches: bool,
    pub messages: Vec<String>,
}

impl FileNameMatch {
    pub fn counts_match(&self) -> bool {
        self.fragments.len() == self.valid.len()
    }

    pub fn matched(&self) -> bool {
        self.counts_match() && self.extension_matches && self.valid.iter().all(|v| *v)
    }

    pub fn fragment(&self, index: usize) -> Option<&str> {
        self.fragments.get(index).map(String::as_str)
    }
}

/// Split `file_name` into its delimited stem fragments.
///
/// The extension is stripped when the name ends with it; otherwise the name
/// is cut at its last `.`.
pub fn split_file_name(file_name: &str, delimiter: &str, extension: &str) -> Vec<String> {
    let stem = match file_name.strip_suffix(extension) {
        Some(stem) if !extension.is_empty() => stem,
        _ => match file_name.rfind('.') {
            Some(dot) if dot > 0 => &file_name[..dot],
            _ => file_name,
        },
    };
    if delimiter.is_empty() {
        return vec![stem.to_string()];
    }
    stem.split(delimiter).map(str::to_string).collect()
}

/// Lookup interface over one loaded `authority:scope`.
pub trait Vocabulary: Send + Sync {
    fn authority(&self) -> &str;

    fn scope(&self) -> &str;

    fn collection_names(&self) -> Vec<&str>;

    /// Terms of a collection, ordered by name.
    fn collection(&self, name: &str) -> Option<&[Term]>;

    /// Terms of a collection; an unknown collection is a lookup error.
    fn terms(&self, collection: &str) -> Result<&[Term]> {
        self.collection(collection).ok_or_else(|| {
            CheckError::Lookup(format!(
                "Could not find vocabulary collection: '{}:{}:{}'.",
                self.authority(),
                self.scope(),
                collection
            ))
        })
    }

    /// Resolve `authority:scope:collection:term` or the `collection:term` shorthand.
    fn resolve_term(&self, lookup: &str) -> Result<&Term> {
        let unresolved =
            || CheckError::Lookup(format!("Could not resolve vocabulary term: '{}'.", lookup));

        let parts: Vec<&str> = lookup.split(':').collect();
        let (collection, name) = match parts.as_slice() {
            [collection, name] => (*collection, *name),
            [authority, scope, collection, name]
                if *authority == self.authority() && *scope == self.scope() =>
            {
                (*collection, *name)
            }
            _ => return Err(unresolved()),
        };

        self.find_term(collection, name).ok_or_else(unresolved)
    }

    /// The term of `collection` whose name (case-insensitively) or label is `name`.
    fn find_term(&self, collection: &str, name: &str) -> Option<&Term> {
        let wanted = name.to_lowercase();
        self.collection(collection)?
            .iter()
            .find(|t| t.name.to_lowercase() == wanted || t.label() == name)
    }

    fn get_property(&self, term: &Term, path: &str) -> Result<Option<Value>> {
        term.get_value(path)
    }

    /// Every term's value for `property` in `collection`, skipping absent ones.
    fn allowed_values(&self, collection: &str, property: &str) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        for term in self.terms(collection)? {
            if let Some(value) = term.get_value(property)? {
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Score a global attribute against the collection it names: 0 absent,
    /// 1 present but not allowed, 2 present and allowed.
    fn check_attribute(&self, ds: &dyn Dataset, attribute: &str, property: &str) -> Result<u32> {
        self.check_attribute_in(ds, attribute, &lookup_id(attribute), property)
    }

    /// Like [`Vocabulary::check_attribute`] with an explicit collection.
    fn check_attribute_in(
        &self,
        ds: &dyn Dataset,
        attribute: &str,
        collection: &str,
        property: &str,
    ) -> Result<u32> {
        let Some(value) = ds.global_attribute(attribute) else {
            return Ok(0);
        };
        let allowed = self.allowed_values(collection, property)?;
        if allowed.iter().any(|a| value.matches(a)) {
            Ok(2)
        } else {
            Ok(1)
        }
    }

    /// Score a global attribute against an expected literal (typically a
    /// file-name fragment) and its collection. An unknown collection allows
    /// no values.
    fn check_attribute_value(
        &self,
        ds: &dyn Dataset,
        attribute: &str,
        expected: &str,
        property: &str,
    ) -> Result<(u32, Vec<String>)> {
        let Some(value) = ds.global_attribute(attribute) else {
            return Ok((
                0,
                vec![format!(
                    "Required '{}' global attribute is not present.",
                    attribute
                )],
            ));
        };

        if !value.matches(&Value::String(expected.to_string())) {
            return Ok((
                1,
                vec![format!(
                    "Required '{}' global attribute value '{}' not equal value from file name '{}'.",
                    attribute, value, expected
                )],
            ));
        }

        let allowed = match self.collection(&lookup_id(attribute)) {
            Some(_) => self.allowed_values(&lookup_id(attribute), property)?,
            None => Vec::new(),
        };
        if !allowed.iter().any(|a| value.matches(a)) {
            return Ok((
                1,
                vec![format!(
                    "Required '{}' global attribute value '{}' is invalid.",
                    attribute, value
                )],
            ));
        }

        Ok((2, Vec::new()))
    }

    /// Match a file name positionally against `components`.
    fn match_file_name(
        &self,
        file_name: &str,
        components: &[Component],
        delimiter: &str,
        extension: &str,
    ) -> Result<FileNameMatch> {
        let fragments = split_file_name(file_name, delimiter, extension);
        let extension_matches = file_name.ends_with(extension);
        let mut messages = Vec::new();

        if fragments.len() != components.len() {
            messages.push(format!(
                "File name '{}' has {} components separated by '{}', expected {}.",
                file_name,
                fragments.len(),
                delimiter,
                components.len()
            ));
            return Ok(FileNameMatch {
                fragments,
                valid: vec![false; components.len()],
                extension_matches,
                messages,
            });
        }

        let mut valid = Vec::with_capacity(components.len());
        for (component, fragment) in components.iter().zip(&fragments) {
            let ok = match component {
                Component::Pattern { key, regex } => {
                    let ok = regex.is_match(fragment);
                    if !ok {
                        messages.push(format!(
                            "File name fragment {} does not match regex {}.",
                            fragment,
                            &key[REGEX_PREFIX.len()..]
                        ));
                    }
                    ok
                }
                Component::Wildcard { .. } => {
                    let ok = !fragment.is_empty();
                    if !ok {
                        messages.push(format!(
                            "File name '{}' has an empty component.",
                            file_name
                        ));
                    }
                    ok
                }
                Component::Collection { collection, .. } => {
                    let allowed = match self.collection(collection) {
                        Some(_) => self.allowed_values(collection, CANONICAL_NAME)?,
                        None => Vec::new(),
                    };
                    let ok = allowed.iter().any(|a| a.as_str() == Some(fragment));
                    if !ok {
                        messages.push(format!(
                            "File name fragment {} is not a valid term in collection '{}'.",
                            fragment, collection
                        ));
                    }
                    ok
                }
            };
            valid.push(ok);
        }

        Ok(FileNameMatch {
            fragments,
            valid,
            extension_matches,
            messages,
        })
    }

    /// Whether `array`, element by element, names exactly the ordered terms of
    /// `collection`.
    fn array_matches_collection(&self, array: &VariableData, collection: &str) -> Result<bool> {
        let terms = self.terms(collection)?;
        let values = array.to_text();
        Ok(values.len() == terms.len()
            && values
                .iter()
                .zip(terms)
                .all(|(value, term)| term.matches(value.trim())))
    }
}

/// Base name of a dataset's file path.
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryDataset;
    use serde_json::json;

    fn vocab() -> ScopeVocabulary {
        ScopeVocabulary::new("ukcp", "ukcp18")
            .with_term("frequency", Term::new("day").with_property("label", "Daily"))
            .with_term("frequency", Term::new("mon"))
            .with_term("realm", Term::new("atmos"))
            .with_term(
                "variable",
                Term::new("tas").with_property(
                    "data",
                    json!({ "units": "K", "cell_methods": { "time": "mean" } }),
                ),
            )
    }

    #[test]
    fn test_vocabulary_ref_parse() {
        let r: VocabularyRef = "ukcp:ukcp18".parse().unwrap();
        assert_eq!(r, VocabularyRef::new("ukcp", "ukcp18"));

        let r: VocabularyRef = "ukcp:ukcp18:frequency".parse().unwrap();
        assert_eq!(r.extra.as_deref(), Some("frequency"));
        assert_eq!(r.to_string(), "ukcp:ukcp18:frequency");

        assert!(matches!(
            "ukcp".parse::<VocabularyRef>(),
            Err(CheckError::Parameter(_))
        ));
    }

    #[test]
    fn test_lookup_id() {
        assert_eq!(lookup_id("institution_id"), "institution-id");
        assert_eq!(lookup_id("realm"), "realm");
    }

    #[test]
    fn test_resolve_term_full_and_shorthand() {
        let v = vocab();
        assert_eq!(v.resolve_term("frequency:day").unwrap().name, "day");
        assert_eq!(
            v.resolve_term("ukcp:ukcp18:frequency:DAY").unwrap().name,
            "day"
        );
        let err = v.resolve_term("frequency:fortnightly").unwrap_err();
        assert!(matches!(err, CheckError::Lookup(_)));
        assert!(err.to_string().contains("frequency:fortnightly"));
        assert!(v.resolve_term("other:scope:frequency:day").is_err());
    }

    #[test]
    fn test_get_value_nested() {
        let v = vocab();
        let tas = v.resolve_term("variable:tas").unwrap();
        assert_eq!(v.get_property(tas, "data.units").unwrap(), Some(json!("K")));
        assert_eq!(
            v.get_property(tas, "data.cell_methods.time").unwrap(),
            Some(json!("mean"))
        );
        assert_eq!(v.get_property(tas, "description").unwrap(), None);
        assert!(matches!(
            v.get_property(tas, "data.standard_name"),
            Err(CheckError::Lookup(_))
        ));
        assert_eq!(v.get_property(tas, "label").unwrap(), Some(json!("tas")));
    }

    #[test]
    fn test_check_attribute_scores() {
        let v = vocab();
        let ds = MemoryDataset::new("x.nc").with_attribute("frequency", "Daily");
        assert_eq!(v.check_attribute(&ds, "frequency", "label").unwrap(), 2);
        assert_eq!(
            v.check_attribute(&ds, "frequency", CANONICAL_NAME).unwrap(),
            1
        );
        assert_eq!(v.check_attribute(&ds, "realm", "label").unwrap(), 0);

        let ds = MemoryDataset::new("x.nc").with_attribute("source", "x");
        assert!(matches!(
            v.check_attribute(&ds, "source", "label"),
            Err(CheckError::Lookup(_))
        ));
    }

    #[test]
    fn test_check_attribute_value_messages() {
        let v = vocab();
        let ds = MemoryDataset::new("x.nc").with_attribute("frequency", "day");

        assert_eq!(
            v.check_attribute_value(&ds, "frequency", "day", CANONICAL_NAME)
                .unwrap(),
            (2, vec![])
        );

        let (score, msgs) = v
            .check_attribute_value(&ds, "frequency", "mon", CANONICAL_NAME)
            .unwrap();
        assert_eq!(score, 1);
        assert_eq!(
            msgs,
            vec!["Required 'frequency' global attribute value 'day' not equal value from file name 'mon'."]
        );

        let (score, msgs) = v
            .check_attribute_value(&ds, "realm", "atmos", CANONICAL_NAME)
            .unwrap();
        assert_eq!(score, 0);
        assert_eq!(
            msgs,
            vec!["Required 'realm' global attribute is not present."]
        );
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(
            split_file_name("tas_atmos_day.nc", "_", ".nc"),
            vec!["tas", "atmos", "day"]
        );
        assert_eq!(
            split_file_name("tas_atmos_day.txt", "_", ".nc"),
            vec!["tas", "atmos", "day"]
        );
        assert_eq!(split_file_name("noext", "_", ".nc"), vec!["noext"]);
    }

    #[test]
    fn test_match_file_name() {
        let v = vocab();
        let components: Vec<Component> = ["realm", "frequency", "regex:\\d{4}"]
            .iter()
            .map(|k| Component::parse(k).unwrap())
            .collect();

        let m = v
            .match_file_name("atmos_day_1990.nc", &components, "_", ".nc")
            .unwrap();
        assert!(m.matched());
        assert!(m.messages.is_empty());

        let m = v
            .match_file_name("atmos_week_19x0.nc", &components, "_", ".nc")
            .unwrap();
        assert_eq!(m.valid, vec![true, false, false]);
        assert_eq!(m.messages.len(), 2);
        assert_eq!(
            m.messages[1],
            "File name fragment 19x0 does not match regex \\d{4}."
        );

        // Trailing characters after a matching prefix are rejected.
        let m = v
            .match_file_name("atmos_day_2018abc.nc", &components, "_", ".nc")
            .unwrap();
        assert_eq!(m.valid, vec![true, true, false]);

        let m = v
            .match_file_name("atmos_day.nc", &components, "_", ".nc")
            .unwrap();
        assert!(!m.counts_match());
        assert_eq!(m.valid, vec![false, false, false]);
    }

    #[test]
    fn test_component_parse_normalises_escapes() {
        let c = Component::parse("regex:\\\\d+").unwrap();
        assert!(c.is_pattern());
        let Component::Pattern { regex, .. } = c else {
            unreachable!()
        };
        assert!(regex.is_match("2018"));
        assert!(Component::parse("regex:(").is_err());
    }

    #[test]
    fn test_array_matches_collection_is_order_sensitive() {
        let v = vocab();
        let array = VariableData::from(vec!["day", "mon"]);
        assert!(v.array_matches_collection(&array, "frequency").unwrap());

        let reversed = VariableData::from(vec!["mon", "day"]);
        assert!(!v.array_matches_collection(&reversed, "frequency").unwrap());

        let short = VariableData::from(vec!["day"]);
        assert!(!v.array_matches_collection(&short, "frequency").unwrap());

        assert!(v.array_matches_collection(&array, "missing").is_err());
    }
}
