//! Source column to entity property mapping of an import profile.
//!
//! A source starting with `*` has no column in the file. It only carries a
//! default value for the property it names.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use models::import_profile::ImportEntityType;

use crate::errors::ServiceError;

pub const DEFAULT_PREFIX: char = '*';

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub property: String,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMap {
    columns: BTreeMap<String, ColumnMapping>,
}

impl ColumnMap {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, source: &str, property: &str, default: Option<&str>) {
        self.columns.insert(
            source.trim().to_string(),
            ColumnMapping { property: property.trim().to_string(), default: default.map(str::to_string) },
        );
    }

    pub fn get(&self, source: &str) -> Option<&ColumnMapping> { self.columns.get(source) }

    pub fn is_empty(&self) -> bool { self.columns.is_empty() }

    pub fn len(&self) -> usize { self.columns.len() }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnMapping)> { self.columns.iter() }

    /// Property a file column feeds. Default-only entries never match a column.
    pub fn property_for(&self, source: &str) -> Option<&str> {
        if source.starts_with(DEFAULT_PREFIX) {
            return None;
        }
        self.columns.get(source).map(|m| m.property.as_str())
    }

    /// Default value for a property, from any entry that maps to it.
    pub fn default_for(&self, property: &str) -> Option<&str> {
        self.columns.values().find(|m| m.property == property).and_then(|m| m.default.as_deref())
    }

    /// Checks properties against the entity type and normalizes their casing.
    pub fn validate(&mut self, entity: ImportEntityType) -> Result<(), ServiceError> {
        let known = entity.properties();
        let mut seen = HashSet::new();
        for (source, mapping) in self.columns.iter_mut() {
            if source.is_empty() || source.as_str() == "*" {
                return Err(ServiceError::validation("column mapping has an empty source"));
            }
            let canonical = known
                .iter()
                .find(|p| p.eq_ignore_ascii_case(&mapping.property))
                .ok_or_else(|| ServiceError::validation(format!("{} is not a property of {entity:?}", mapping.property)))?;
            if !seen.insert(*canonical) {
                return Err(ServiceError::validation(format!("more than one column maps to {canonical}")));
            }
            if source.starts_with(DEFAULT_PREFIX) && mapping.default.as_deref().map_or(true, |d| d.trim().is_empty()) {
                return Err(ServiceError::validation(format!("{source} needs a default value")));
            }
            mapping.property = canonical.to_string();
        }
        Ok(())
    }

    pub fn from_json(raw: Option<&str>) -> Result<Self, ServiceError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self::default()),
            Some(s) => serde_json::from_str(s).map_err(|e| ServiceError::validation(format!("invalid column mapping: {e}"))),
        }
    }

    pub fn to_json(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        serde_json::to_string(self).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_columns_and_defaults() {
        let mut map = ColumnMap::new();
        map.add("Product Name", "name", None);
        map.add("*Published", "Published", Some("true"));
        map.validate(ImportEntityType::Product).unwrap();

        assert_eq!(map.property_for("Product Name"), Some("Name"));
        assert_eq!(map.property_for("*Published"), None);
        assert_eq!(map.default_for("Published"), Some("true"));

        let json = map.to_json().unwrap();
        assert_eq!(ColumnMap::from_json(Some(&json)).unwrap(), map);
        assert!(ColumnMap::from_json(None).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_mappings() {
        let mut unknown = ColumnMap::new();
        unknown.add("Colour", "Color", None);
        assert!(unknown.validate(ImportEntityType::Product).is_err());

        let mut twice = ColumnMap::new();
        twice.add("Mail", "Email", None);
        twice.add("E-Mail", "email", None);
        assert!(twice.validate(ImportEntityType::Customer).is_err());

        let mut no_default = ColumnMap::new();
        no_default.add("*Active", "Active", None);
        assert!(no_default.validate(ImportEntityType::NewsletterSubscription).is_err());

        assert!(ColumnMap::from_json(Some("[1,2]")).is_err());
    }
}
