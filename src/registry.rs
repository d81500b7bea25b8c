//! Name-based lookup of check classes.
//!
//! Both families are searched, file checks first. Names are the class
//! identifiers used in rule profiles, e.g. `GlobalAttrRegexCheck`.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::check::{CheckClass, Family};
use crate::checks::{DATASET_CHECKS, FILE_CHECKS};
use crate::error::{CheckError, Result};

static REGISTRY: Lazy<HashMap<&'static str, &'static CheckClass>> = Lazy::new(|| {
    let mut registry = HashMap::new();
    for class in FILE_CHECKS.iter().chain(DATASET_CHECKS.iter()) {
        registry.entry(class.name()).or_insert(*class);
    }
    registry
});

/// Resolve a check class by name.
pub fn get_check_class(name: &str) -> Result<&'static CheckClass> {
    REGISTRY.get(name).copied().ok_or_else(|| {
        CheckError::Registry(format!("Cannot identify Check with identifier: {}", name))
    })
}

/// Every registered class, file family first, in registration order.
pub fn check_classes() -> impl Iterator<Item = &'static CheckClass> {
    FILE_CHECKS.iter().chain(DATASET_CHECKS.iter()).copied()
}

/// Registered classes of one family.
pub fn family_classes(family: Family) -> &'static [&'static CheckClass] {
    match family {
        Family::File => FILE_CHECKS,
        Family::Dataset => DATASET_CHECKS,
    }
}
