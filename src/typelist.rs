// Copyright 2025 Oxide Computer Company

//! Detection of the "list of types" pattern: a composition keyword used
//! purely to express that a value may be any of several primitive types.
//!
//! A qualifying schema is reduced to a set of type names so that, for
//! example, widening `{type: string}` to `oneOf[{type: string}, {type:
//! integer}]` reads as "integer was added" rather than as a structural
//! rewrite.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::model::{SchemaNode, SchemaRef};

/// How a type pattern was expressed in the source schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypePatternOrigin {
    Single,
    OneOf,
    AnyOf,
}

/// The set of primitive type names a schema admits, when the schema is
/// nothing more than a type union. Discarded after the comparison step that
/// produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypePattern {
    pub types: BTreeSet<String>,
    pub origin: TypePatternOrigin,
}

/// Delta between two type patterns, as set operations over type names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOfTypesDiff {
    pub added: Vec<String>,
    pub deleted: Vec<String>,
}

impl ListOfTypesDiff {
    pub fn is_empty(&self) -> bool {
        let Self { added, deleted } = self;
        added.is_empty() && deleted.is_empty()
    }
}

/// Extract a type pattern from a schema node, if it qualifies.
///
/// A node qualifies when it carries exactly one literal type tag, or when
/// its `oneOf` (checked first) or `anyOf` list is non-empty and every branch
/// is a simple single-type schema. A branch that is an unresolvable
/// reference or a complex schema disqualifies the whole list; there is no
/// partial pattern.
pub fn detect(node: &SchemaNode, schemas: &IndexMap<String, SchemaNode>) -> Option<TypePattern> {
    if let Some(types) = &node.types {
        if let [tag] = types.as_slice() {
            return Some(TypePattern {
                types: BTreeSet::from([tag.clone()]),
                origin: TypePatternOrigin::Single,
            });
        }
    }

    if !node.one_of.is_empty() {
        return union_of_simple_branches(&node.one_of, schemas).map(|types| TypePattern {
            types,
            origin: TypePatternOrigin::OneOf,
        });
    }

    if !node.any_of.is_empty() {
        return union_of_simple_branches(&node.any_of, schemas).map(|types| TypePattern {
            types,
            origin: TypePatternOrigin::AnyOf,
        });
    }

    None
}

/// Compare two optional patterns.
///
/// A side without a detected pattern yields absence, not an empty set: a
/// schema that is not a type union has nothing to say here, and its changes
/// are reported structurally instead. Patterns with equal type sets are
/// equivalent regardless of origin.
pub fn diff_patterns(
    old: Option<&TypePattern>,
    new: Option<&TypePattern>,
) -> Option<ListOfTypesDiff> {
    let (old, new) = match (old, new) {
        (Some(old), Some(new)) => (old, new),
        _ => return None,
    };

    if old.types == new.types {
        return None;
    }

    let diff = ListOfTypesDiff {
        added: new.types.difference(&old.types).cloned().collect(),
        deleted: old.types.difference(&new.types).cloned().collect(),
    };

    // The equality check above already filters identical sets; re-checked so
    // an empty pair can never escape as a non-empty result.
    if diff.is_empty() { None } else { Some(diff) }
}

/// The union of branch type tags, or `None` if any branch is not a simple
/// single-type schema.
fn union_of_simple_branches(
    branches: &[SchemaRef],
    schemas: &IndexMap<String, SchemaNode>,
) -> Option<BTreeSet<String>> {
    let mut types = BTreeSet::new();
    for branch in branches {
        let node = match branch {
            SchemaRef::Inline(node) => node.as_ref(),
            SchemaRef::Ref { .. } => branch.ref_name().and_then(|name| schemas.get(name))?,
        };
        types.insert(simple_type_tag(node)?.to_string());
    }
    Some(types)
}

/// The single type tag of a simple schema: one literal type, no properties,
/// and no composition of its own.
fn simple_type_tag(node: &SchemaNode) -> Option<&str> {
    let [tag] = node.types.as_deref()? else {
        return None;
    };
    let simple = node.properties.is_empty()
        && node.one_of.is_empty()
        && node.any_of.is_empty()
        && node.all_of.is_empty();
    simple.then_some(tag.as_str())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn node(value: serde_json::Value) -> SchemaNode {
        serde_json::from_value(value).unwrap()
    }

    fn no_schemas() -> IndexMap<String, SchemaNode> {
        IndexMap::new()
    }

    #[test]
    fn single_type_yields_a_pattern() {
        let pattern = detect(&node(json!({"type": "string"})), &no_schemas()).unwrap();
        assert_eq!(pattern.origin, TypePatternOrigin::Single);
        assert_eq!(pattern.types, BTreeSet::from(["string".to_string()]));
    }

    #[test]
    fn one_of_simple_branches_yield_a_union() {
        let schema = node(json!({
            "oneOf": [{"type": "string"}, {"type": "integer"}]
        }));
        let pattern = detect(&schema, &no_schemas()).unwrap();
        assert_eq!(pattern.origin, TypePatternOrigin::OneOf);
        assert_eq!(
            pattern.types,
            BTreeSet::from(["integer".to_string(), "string".to_string()])
        );
    }

    #[test]
    fn one_of_takes_precedence_over_any_of() {
        let schema = node(json!({
            "oneOf": [{"type": "string"}],
            "anyOf": [{"type": "boolean"}]
        }));
        let pattern = detect(&schema, &no_schemas()).unwrap();
        assert_eq!(pattern.origin, TypePatternOrigin::OneOf);
        assert_eq!(pattern.types, BTreeSet::from(["string".to_string()]));
    }

    #[test]
    fn complex_branch_disqualifies_the_list() {
        let with_properties = node(json!({
            "oneOf": [
                {"type": "string"},
                {"type": "object", "properties": {"a": {"type": "integer"}}}
            ]
        }));
        assert_eq!(detect(&with_properties, &no_schemas()), None);

        let with_nested_union = node(json!({
            "anyOf": [{"type": "string"}, {"oneOf": [{"type": "integer"}]}]
        }));
        assert_eq!(detect(&with_nested_union, &no_schemas()), None);
    }

    #[test]
    fn dangling_reference_branch_disqualifies_the_list() {
        let schema = node(json!({
            "oneOf": [{"type": "string"}, {"$ref": "#/components/schemas/Gone"}]
        }));
        assert_eq!(detect(&schema, &no_schemas()), None);
    }

    #[test]
    fn resolved_reference_branch_participates() {
        let schema = node(json!({
            "oneOf": [{"type": "string"}, {"$ref": "#/components/schemas/Count"}]
        }));
        let mut schemas = IndexMap::new();
        schemas.insert("Count".to_string(), node(json!({"type": "integer"})));
        let pattern = detect(&schema, &schemas).unwrap();
        assert_eq!(
            pattern.types,
            BTreeSet::from(["integer".to_string(), "string".to_string()])
        );
    }

    #[test]
    fn empty_composition_is_not_a_pattern() {
        let schema = node(json!({"oneOf": []}));
        assert_eq!(detect(&schema, &no_schemas()), None);

        // With no pattern on one side there is no type-union diff at all,
        // not an empty one.
        let other = detect(&node(json!({"type": "string"})), &no_schemas());
        assert_eq!(diff_patterns(None, other.as_ref()), None);
    }

    #[test]
    fn widening_reports_only_the_added_type() {
        let old = detect(&node(json!({"type": "string"})), &no_schemas());
        let new = detect(
            &node(json!({"oneOf": [{"type": "string"}, {"type": "integer"}]})),
            &no_schemas(),
        );
        let diff = diff_patterns(old.as_ref(), new.as_ref()).unwrap();
        assert_eq!(diff.added, vec!["integer".to_string()]);
        assert!(diff.deleted.is_empty());
    }

    #[test]
    fn equal_sets_with_different_origins_are_equivalent() {
        let old = detect(&node(json!({"type": "string"})), &no_schemas());
        let new = detect(&node(json!({"anyOf": [{"type": "string"}]})), &no_schemas());
        assert_eq!(diff_patterns(old.as_ref(), new.as_ref()), None);
    }
}
