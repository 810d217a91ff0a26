// Copyright 2025 Oxide Computer Company

use indexmap::IndexMap;
use serde_json::Value;

use crate::config::DiffConfig;

/// A before/after pair for a leaf value.
///
/// Either side may be absent when the value only exists in one document.
/// Equality over `Value` is structural: object key order is irrelevant,
/// array order is significant.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueDiff {
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// Compare two optional leaf values, producing a pair only when they differ.
pub fn compare_values(old: Option<&Value>, new: Option<&Value>) -> Option<ValueDiff> {
    if old == new {
        None
    } else {
        Some(ValueDiff {
            old: old.cloned(),
            new: new.cloned(),
        })
    }
}

/// Compare two optional leaves of any JSON-convertible type.
pub(crate) fn leaf<T>(old: Option<&T>, new: Option<&T>) -> Option<ValueDiff>
where
    T: PartialEq + Clone + Into<Value>,
{
    if old == new {
        None
    } else {
        Some(ValueDiff {
            old: old.cloned().map(Into::into),
            new: new.cloned().map(Into::into),
        })
    }
}

/// Delta between two extension maps.
#[derive(Clone, Debug, Default)]
pub struct ExtensionsDiff {
    /// Keys present only in the new document, sorted.
    pub added: Vec<String>,
    /// Keys present only in the old document, sorted.
    pub deleted: Vec<String>,
    /// Keys present on both sides with differing values.
    pub modified: std::collections::BTreeMap<String, ValueDiff>,
}

impl ExtensionsDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            added,
            deleted,
            modified,
        } = self;
        added.is_empty() && deleted.is_empty() && modified.is_empty()
    }
}

/// Compare two extension maps, skipping keys excluded by configuration.
pub(crate) fn compare_extensions(
    old: &IndexMap<String, Value>,
    new: &IndexMap<String, Value>,
    config: &DiffConfig,
) -> Option<ExtensionsDiff> {
    let mut diff = ExtensionsDiff::default();

    for (key, old_value) in old {
        if config.exclude_extensions.contains(key) {
            continue;
        }
        match new.get(key) {
            None => diff.deleted.push(key.clone()),
            Some(new_value) => {
                if let Some(changed) = compare_values(Some(old_value), Some(new_value)) {
                    diff.modified.insert(key.clone(), changed);
                }
            }
        }
    }
    for key in new.keys() {
        if config.exclude_extensions.contains(key) {
            continue;
        }
        if !old.contains_key(key) {
            diff.added.push(key.clone());
        }
    }

    diff.added.sort();
    diff.deleted.sort();

    if diff.is_empty() { None } else { Some(diff) }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn equal_values_produce_no_diff() {
        let a = json!({"b": 1, "a": [1, 2]});
        let b = json!({"a": [1, 2], "b": 1});
        assert_eq!(compare_values(Some(&a), Some(&b)), None);
    }

    #[test]
    fn absent_side_is_reported() {
        let a = json!("x");
        let diff = compare_values(Some(&a), None).unwrap();
        assert_eq!(diff.old, Some(json!("x")));
        assert_eq!(diff.new, None);
    }

    #[test]
    fn excluded_extension_is_silent() {
        let old = IndexMap::from([("x-audit".to_string(), json!(1))]);
        let new = IndexMap::new();
        let config = DiffConfig {
            exclude_extensions: ["x-audit".to_string()].into(),
            ..Default::default()
        };
        assert!(compare_extensions(&old, &new, &config).is_none());
        assert!(compare_extensions(&old, &new, &DiffConfig::default()).is_some());
    }
}
