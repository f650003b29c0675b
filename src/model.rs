use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::traits::ReferenceError;

/// Page returned by the npm search endpoint. Only package names are read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub objects: Vec<SearchObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchObject {
    #[serde(default)]
    pub package: Option<PackageSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSummary {
    #[serde(default)]
    pub name: Option<String>,
}

impl SearchPage {
    /// Package names in feed order; entries without a name are skipped.
    pub fn names(self) -> Vec<String> {
        self.objects
            .into_iter()
            .filter_map(|obj| obj.package.and_then(|pkg| pkg.name))
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// A detected near-duplicate of a reference name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate: String,
    pub matched_reference: String,
    pub distance: usize,
}

/// Names of popular npm packages watched by default.
pub const POPULAR_NPM_PACKAGES: &[&str] = &[
    "react",
    "express",
    "lodash",
    "moment",
    "chalk",
    "axios",
    "async",
    "webpack",
    "next",
    "vue",
    "angular",
    "jquery",
    "bootstrap",
    "tailwind",
    "eslint",
    "prettier",
    "jest",
    "mocha",
    "chai",
    "jsonwebtoken",
    "dotenv",
    "cors",
    "body-parser",
    "mongoose",
    "sequelize",
    "vite",
    "prisma",
    "typescript",
    "zod",
    "next-auth",
    "react-router-dom",
    "redux",
];

/// Ordered, duplicate-free list of known-good package names.
///
/// Order matters: the matcher reports the first reference within the
/// threshold, so earlier entries win ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceList {
    names: Vec<String>,
}

impl ReferenceList {
    /// Builds a list, rejecting empty, duplicated or non-lowercase names.
    pub fn new(names: Vec<String>) -> Result<Self, ReferenceError> {
        if names.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            let valid = !name.is_empty()
                && name.bytes().all(|b| {
                    b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'_' | b'.')
                });
            if !valid {
                return Err(ReferenceError::InvalidName(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ReferenceError::Duplicate(name.clone()));
            }
        }

        Ok(Self { names })
    }

    /// Parses a comma-separated override such as `"react, express"`.
    pub fn from_csv(csv: &str) -> Result<Self, ReferenceError> {
        let names = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(names)
    }

    /// The built-in list of popular npm packages.
    pub fn popular_npm() -> Self {
        Self {
            names: POPULAR_NPM_PACKAGES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_page_names_preserve_order() {
        let json = r#"{
            "objects": [
                {"package": {"name": "expresss", "version": "1.0.0"}, "score": {}},
                {"package": {"description": "no name here"}},
                {"package": {"name": "chalk"}}
            ],
            "total": 3
        }"#;

        let page: SearchPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.names(), vec!["expresss", "chalk"]);
    }

    #[test]
    fn test_search_page_missing_objects() {
        let page: SearchPage = serde_json::from_str("{}").unwrap();
        assert!(page.names().is_empty());
    }

    #[test]
    fn test_popular_list_is_valid() {
        let builtin = ReferenceList::popular_npm();
        let names = builtin.as_slice().to_vec();
        assert_eq!(names.len(), 32);
        assert_eq!(ReferenceList::new(names).unwrap(), builtin);
    }

    #[test]
    fn test_reference_list_rejects_duplicates() {
        let err = ReferenceList::new(vec!["react".into(), "react".into()]).unwrap_err();
        assert!(matches!(err, ReferenceError::Duplicate(name) if name == "react"));
    }

    #[test]
    fn test_reference_list_rejects_uppercase() {
        let err = ReferenceList::new(vec!["React".into()]).unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidName(_)));
    }

    #[test]
    fn test_reference_list_from_csv() {
        let list = ReferenceList::from_csv(" react, express ,,body-parser").unwrap();
        assert_eq!(list.as_slice(), ["react", "express", "body-parser"]);
        assert!(matches!(
            ReferenceList::from_csv(" , "),
            Err(ReferenceError::Empty)
        ));
    }
}
