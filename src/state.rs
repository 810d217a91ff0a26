// Copyright 2025 Oxide Computer Company

//! Per-run traversal state: reference resolution, cycle detection, and
//! memoization.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::{
    config::DiffConfig,
    error::DiffError,
    model::{Document, SchemaNode},
    schema::SchemaDiff,
};

/// Whether a schema is being compared in a request position or a response
/// position.
///
/// The same schema pair can be compared once in each context within one run;
/// cached results are never shared across contexts because exclusion rules
/// may differ by context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraversalContext {
    Request,
    Response,
}

/// Mutable context for one comparison run.
///
/// Holds the two schema registries, the per-side visited-reference sets used
/// for cycle detection, and the memoization cache. Created fresh per
/// top-level invocation and discarded afterwards; never shared across
/// concurrent runs.
pub struct TraversalState<'a> {
    pub(crate) config: &'a DiffConfig,
    pub(crate) old_schemas: &'a IndexMap<String, SchemaNode>,
    pub(crate) new_schemas: &'a IndexMap<String, SchemaNode>,
    context: TraversalContext,
    old_visited: BTreeSet<String>,
    new_visited: BTreeSet<String>,
    /// Cached results keyed by (context, old node identity, new node
    /// identity). A cached `None` records "computed, no diff", which is
    /// distinct from a missing entry.
    cache: BTreeMap<(TraversalContext, usize, usize), Option<SchemaDiff>>,
}

impl<'a> TraversalState<'a> {
    pub fn new(config: &'a DiffConfig, old: &'a Document, new: &'a Document) -> Self {
        Self {
            config,
            old_schemas: &old.components.schemas,
            new_schemas: &new.components.schemas,
            context: TraversalContext::Request,
            old_visited: BTreeSet::new(),
            new_visited: BTreeSet::new(),
            cache: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> TraversalContext {
        self.context
    }

    /// Set the traversal context. Called by the driver before each
    /// request-side or response-side section.
    pub fn set_context(&mut self, context: TraversalContext) {
        self.context = context;
    }

    /// Resolve a reference against the old document's registry.
    pub(crate) fn resolve_old(&self, reference: &str) -> Result<&'a SchemaNode, DiffError> {
        resolve(self.old_schemas, reference)
    }

    /// Resolve a reference against the new document's registry.
    pub(crate) fn resolve_new(&self, reference: &str) -> Result<&'a SchemaNode, DiffError> {
        resolve(self.new_schemas, reference)
    }

    pub(crate) fn old_visited(&self, name: &str) -> bool {
        self.old_visited.contains(name)
    }

    pub(crate) fn new_visited(&self, name: &str) -> bool {
        self.new_visited.contains(name)
    }

    /// Run `body` with the given reference names registered as visited.
    ///
    /// Registration is scoped: the names are removed again on every exit
    /// path, including error returns, so a failed branch can never leak
    /// "visited" state into a sibling branch. A name that was already
    /// registered by an ancestor stays registered.
    pub(crate) fn with_visited<T>(
        &mut self,
        old_name: Option<&str>,
        new_name: Option<&str>,
        body: impl FnOnce(&mut Self) -> Result<T, DiffError>,
    ) -> Result<T, DiffError> {
        let old_inserted =
            old_name.is_some_and(|name| self.old_visited.insert(name.to_string()));
        let new_inserted =
            new_name.is_some_and(|name| self.new_visited.insert(name.to_string()));

        let result = body(self);

        if old_inserted {
            if let Some(name) = old_name {
                self.old_visited.remove(name);
            }
        }
        if new_inserted {
            if let Some(name) = new_name {
                self.new_visited.remove(name);
            }
        }

        result
    }

    /// Look up a cached comparison result.
    ///
    /// The cache is consulted only at reference-free boundaries (no visited
    /// registrations active on either side), so that a hit is independent of
    /// any in-progress cycle unrolling and always equals the result of
    /// recomputing from scratch.
    pub(crate) fn cache_lookup(
        &self,
        old: &SchemaNode,
        new: &SchemaNode,
    ) -> Option<Option<SchemaDiff>> {
        if !self.at_cacheable_boundary() {
            return None;
        }
        self.cache
            .get(&(self.context, identity(old), identity(new)))
            .cloned()
    }

    /// Store a computed result, including "no diff", under the node pair.
    pub(crate) fn cache_store(
        &mut self,
        old: &SchemaNode,
        new: &SchemaNode,
        result: Option<&SchemaDiff>,
    ) {
        if !self.at_cacheable_boundary() {
            return;
        }
        self.cache
            .insert((self.context, identity(old), identity(new)), result.cloned());
    }

    fn at_cacheable_boundary(&self) -> bool {
        self.old_visited.is_empty() && self.new_visited.is_empty()
    }
}

/// A node's identity for memoization: its address within the borrowed
/// document, stable for the duration of the run.
fn identity(node: &SchemaNode) -> usize {
    node as *const SchemaNode as usize
}

fn resolve<'a>(
    schemas: &'a IndexMap<String, SchemaNode>,
    reference: &str,
) -> Result<&'a SchemaNode, DiffError> {
    let name = reference.rsplit('/').next().unwrap_or(reference);
    schemas.get(name).ok_or_else(|| DiffError::UnresolvedReference {
        reference: reference.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visited_scope_is_released_on_error() {
        let config = DiffConfig::default();
        let old = Document::default();
        let new = Document::default();
        let mut state = TraversalState::new(&config, &old, &new);

        let result: Result<(), DiffError> =
            state.with_visited(Some("A"), Some("B"), |state| {
                assert!(state.old_visited("A"));
                assert!(state.new_visited("B"));
                Err(DiffError::UnresolvedReference {
                    reference: "#/components/schemas/A".to_string(),
                })
            });

        assert!(result.is_err());
        assert!(!state.old_visited("A"));
        assert!(!state.new_visited("B"));
    }

    #[test]
    fn visited_scope_keeps_ancestor_registrations() {
        let config = DiffConfig::default();
        let old = Document::default();
        let new = Document::default();
        let mut state = TraversalState::new(&config, &old, &new);

        state
            .with_visited(Some("A"), None, |state| {
                // Re-registering the same name inside the scope must not
                // unregister it when the inner scope exits.
                state.with_visited(Some("A"), None, |state| {
                    assert!(state.old_visited("A"));
                    Ok(())
                })?;
                assert!(state.old_visited("A"));
                Ok(())
            })
            .unwrap();
        assert!(!state.old_visited("A"));
    }
}
