// Copyright 2025 Oxide Computer Company

use std::{collections::BTreeMap, sync::LazyLock};

use anyhow::Context as _;
use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::{
    config::DiffConfig,
    error::DiffError,
    model::{Document, Operation, PathItem},
    operations::OperationDiff,
    state::TraversalState,
};

/// Compute the delta between two documents.
///
/// The result is all-or-nothing: any comparison failure aborts the run and
/// no partial diff is returned.
pub fn diff(old: &Document, new: &Document, config: &DiffConfig) -> anyhow::Result<DocumentDiff> {
    let mut state = TraversalState::new(config, old, new);
    state
        .compare_documents(old, new)
        .context("error comparing documents")
}

/// The root delta. Its [`DocumentDiff::is_empty`] predicate is the
/// authoritative "no semantic change" signal.
#[derive(Clone, Debug, Default)]
pub struct DocumentDiff {
    pub paths: Option<PathsDiff>,
    pub webhooks: Option<PathsDiff>,
}

impl DocumentDiff {
    pub fn is_empty(&self) -> bool {
        let Self { paths, webhooks } = self;
        paths.is_none() && webhooks.is_none()
    }
}

/// Delta between two path maps (or two webhook maps).
#[derive(Clone, Debug, Default)]
pub struct PathsDiff {
    /// Entries present only in the new document, sorted.
    pub added: Vec<String>,
    /// Entries present only in the old document, sorted.
    pub deleted: Vec<String>,
    /// Surviving entries with changes, keyed by the new document's name.
    pub modified: BTreeMap<String, PathItemDiff>,
}

impl PathsDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            added,
            deleted,
            modified,
        } = self;
        added.is_empty() && deleted.is_empty() && modified.is_empty()
    }
}

/// Delta between two path items, keyed by HTTP method.
#[derive(Clone, Debug, Default)]
pub struct PathItemDiff {
    /// Methods present only in the new document, sorted.
    pub added: Vec<String>,
    /// Methods present only in the old document, sorted.
    pub deleted: Vec<String>,
    pub modified: BTreeMap<String, OperationDiff>,
}

impl PathItemDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            added,
            deleted,
            modified,
        } = self;
        added.is_empty() && deleted.is_empty() && modified.is_empty()
    }
}

impl<'a> TraversalState<'a> {
    fn compare_documents(
        &mut self,
        old: &Document,
        new: &Document,
    ) -> Result<DocumentDiff, DiffError> {
        debug!("comparing documents");
        Ok(DocumentDiff {
            paths: self.compare_paths(&old.paths, &new.paths)?,
            webhooks: self.compare_webhooks(&old.webhooks, &new.webhooks)?,
        })
    }

    /// Compare two path maps.
    ///
    /// Paths are matched by template with parameter names positionally
    /// normalized, so renaming a template variable does not read as a
    /// remove plus an add; the per-position names feed the path-parameter
    /// rename map.
    fn compare_paths(
        &mut self,
        old: &IndexMap<String, PathItem>,
        new: &IndexMap<String, PathItem>,
    ) -> Result<Option<PathsDiff>, DiffError> {
        let old_by_route: BTreeMap<String, (&String, &PathItem)> = old
            .iter()
            .map(|(path, item)| (route_key(path), (path, item)))
            .collect();
        let new_by_route: BTreeMap<String, (&String, &PathItem)> = new
            .iter()
            .map(|(path, item)| (route_key(path), (path, item)))
            .collect();

        let mut diff = PathsDiff::default();

        for (route, (old_path, old_item)) in &old_by_route {
            match new_by_route.get(route) {
                None => diff.deleted.push((*old_path).clone()),
                Some((new_path, new_item)) => {
                    let renames = path_renames(old_path, new_path);
                    if let Some(changed) =
                        self.compare_path_items(old_item, new_item, &renames)?
                    {
                        diff.modified.insert((*new_path).clone(), changed);
                    }
                }
            }
        }
        for (route, (new_path, _)) in &new_by_route {
            if !old_by_route.contains_key(route) {
                diff.added.push((*new_path).clone());
            }
        }
        diff.added.sort();
        diff.deleted.sort();

        Ok(if diff.is_empty() { None } else { Some(diff) })
    }

    /// Compare two webhook maps. Webhook names have no template structure,
    /// so entries match by exact name.
    fn compare_webhooks(
        &mut self,
        old: &IndexMap<String, PathItem>,
        new: &IndexMap<String, PathItem>,
    ) -> Result<Option<PathsDiff>, DiffError> {
        let mut diff = PathsDiff::default();
        let no_renames = BTreeMap::new();

        for (name, old_item) in old {
            match new.get(name) {
                None => diff.deleted.push(name.clone()),
                Some(new_item) => {
                    if let Some(changed) =
                        self.compare_path_items(old_item, new_item, &no_renames)?
                    {
                        diff.modified.insert(name.clone(), changed);
                    }
                }
            }
        }
        for name in new.keys() {
            if !old.contains_key(name) {
                diff.added.push(name.clone());
            }
        }
        diff.added.sort();
        diff.deleted.sort();

        Ok(if diff.is_empty() { None } else { Some(diff) })
    }

    fn compare_path_items(
        &mut self,
        old: &PathItem,
        new: &PathItem,
        path_renames: &BTreeMap<String, String>,
    ) -> Result<Option<PathItemDiff>, DiffError> {
        let old_ops: BTreeMap<&'static str, &Operation> = old.iter().collect();
        let new_ops: BTreeMap<&'static str, &Operation> = new.iter().collect();

        let mut diff = PathItemDiff::default();

        for (method, old_op) in &old_ops {
            match new_ops.get(method) {
                None => diff.deleted.push(method.to_string()),
                Some(new_op) => {
                    if let Some(changed) =
                        self.compare_operations(old_op, new_op, path_renames)?
                    {
                        diff.modified.insert(method.to_string(), changed);
                    }
                }
            }
        }
        for method in new_ops.keys() {
            if !old_ops.contains_key(method) {
                diff.added.push(method.to_string());
            }
        }
        diff.added.sort();
        diff.deleted.sort();

        Ok(if diff.is_empty() { None } else { Some(diff) })
    }
}

static TEMPLATE_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^}]*)\}").unwrap());

/// A path template with parameter names erased: the names of path
/// parameters don't distinguish paths.
fn route_key(path: &str) -> String {
    TEMPLATE_VAR.replace_all(path, "{}").into_owned()
}

/// Positional alignment of template variable names: old name to new name.
fn path_renames(old_path: &str, new_path: &str) -> BTreeMap<String, String> {
    let old_vars = TEMPLATE_VAR
        .captures_iter(old_path)
        .map(|captures| captures[1].to_string());
    let new_vars = TEMPLATE_VAR
        .captures_iter(new_path)
        .map(|captures| captures[1].to_string());
    old_vars.zip(new_vars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_key_erases_parameter_names() {
        assert_eq!(route_key("/users/{id}/posts/{post}"), "/users/{}/posts/{}");
        assert_eq!(route_key("/users"), "/users");
    }

    #[test]
    fn path_renames_align_by_position() {
        let renames = path_renames("/users/{id}/posts/{post}", "/users/{userId}/posts/{post}");
        assert_eq!(renames.get("id"), Some(&"userId".to_string()));
        assert_eq!(renames.get("post"), Some(&"post".to_string()));
    }
}
