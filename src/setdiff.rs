// Copyright 2025 Oxide Computer Company

use std::collections::BTreeSet;

/// Delta between two unordered string collections.
///
/// Used for type tags, required-property lists, and webhook names. The
/// `added` and `deleted` lists are disjoint and sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringsDiff {
    pub added: Vec<String>,
    pub deleted: Vec<String>,
}

impl StringsDiff {
    pub fn is_empty(&self) -> bool {
        let Self { added, deleted } = self;
        added.is_empty() && deleted.is_empty()
    }
}

/// Compare two string collections as sets.
///
/// Returns `None` when the sets are equal. Duplicates within one side are
/// collapsed.
pub fn compare_string_sets<'a, I, J>(old: I, new: J) -> Option<StringsDiff>
where
    I: IntoIterator<Item = &'a String>,
    J: IntoIterator<Item = &'a String>,
{
    let old: BTreeSet<&String> = old.into_iter().collect();
    let new: BTreeSet<&String> = new.into_iter().collect();

    let diff = StringsDiff {
        added: new.difference(&old).map(|s| s.to_string()).collect(),
        deleted: old.difference(&new).map(|s| s.to_string()).collect(),
    };

    if diff.is_empty() { None } else { Some(diff) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn equal_sets_produce_no_diff() {
        let a = strings(&["b", "a"]);
        let b = strings(&["a", "b", "a"]);
        assert_eq!(compare_string_sets(&a, &b), None);
    }

    #[test]
    fn added_and_deleted_are_disjoint_and_sorted() {
        let a = strings(&["zebra", "common", "alpha"]);
        let b = strings(&["common", "mid", "beta"]);
        let diff = compare_string_sets(&a, &b).unwrap();
        assert_eq!(diff.added, strings(&["beta", "mid"]));
        assert_eq!(diff.deleted, strings(&["alpha", "zebra"]));
        for name in &diff.added {
            assert!(!diff.deleted.contains(name));
        }
    }
}
