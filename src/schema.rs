// Copyright 2025 Oxide Computer Company

//! The recursive schema comparator.
//!
//! Every attribute of a schema node is compared independently and
//! unconditionally, except where the exclusion configuration suppresses a
//! field. Nested schemas recurse through [`TraversalState::compare_schemas`],
//! which also owns cycle detection and memoization.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::{
    error::DiffError,
    model::{AdditionalProperties, SchemaNode, SchemaRef},
    setdiff::{StringsDiff, compare_string_sets},
    state::TraversalState,
    typelist::{self, ListOfTypesDiff},
    value::{ExtensionsDiff, ValueDiff, compare_extensions, compare_values, leaf},
};

/// Delta between two schema nodes: one optional sub-result per attribute.
///
/// "No change" is an explicit predicate over this record, never an equality
/// check against a default value.
#[derive(Clone, Debug, Default)]
pub struct SchemaDiff {
    /// The schema only exists in the new document.
    pub added: bool,
    /// The schema only exists in the old document.
    pub deleted: bool,
    /// The two sides' reference cycles diverge: one side returns to a
    /// visited reference while the other keeps unrolling.
    pub circular_ref: bool,

    pub schema_id: Option<ValueDiff>,
    pub anchor: Option<ValueDiff>,
    pub comment: Option<ValueDiff>,
    pub title: Option<ValueDiff>,
    pub description: Option<ValueDiff>,
    pub deprecated: Option<ValueDiff>,
    pub read_only: Option<ValueDiff>,
    pub write_only: Option<ValueDiff>,
    pub nullable: Option<ValueDiff>,
    pub discriminator: Option<ValueDiff>,
    pub xml: Option<ValueDiff>,
    pub external_docs: Option<ValueDiff>,

    /// Literal change to the `type` tags.
    pub types: Option<StringsDiff>,
    /// Change to the detected type-union pattern. Kept alongside `types`;
    /// the two answer different questions.
    pub list_of_types: Option<ListOfTypesDiff>,
    pub format: Option<ValueDiff>,
    pub enum_values: Option<ValueDiff>,
    pub const_value: Option<ValueDiff>,
    pub default_value: Option<ValueDiff>,
    pub example: Option<ValueDiff>,
    pub examples: Option<ValueDiff>,

    pub multiple_of: Option<ValueDiff>,
    pub maximum: Option<ValueDiff>,
    pub exclusive_maximum: Option<ValueDiff>,
    pub minimum: Option<ValueDiff>,
    pub exclusive_minimum: Option<ValueDiff>,

    pub max_length: Option<ValueDiff>,
    pub min_length: Option<ValueDiff>,
    pub pattern: Option<ValueDiff>,
    pub content_media_type: Option<ValueDiff>,
    pub content_encoding: Option<ValueDiff>,
    pub content_schema: Option<Box<SchemaDiff>>,

    pub items: Option<Box<SchemaDiff>>,
    pub prefix_items: Option<SubschemasDiff>,
    pub contains: Option<Box<SchemaDiff>>,
    pub max_items: Option<ValueDiff>,
    pub min_items: Option<ValueDiff>,
    pub unique_items: Option<ValueDiff>,
    pub max_contains: Option<ValueDiff>,
    pub min_contains: Option<ValueDiff>,
    pub unevaluated_items: Option<Box<SchemaDiff>>,

    pub properties: Option<SchemasMapDiff>,
    pub pattern_properties: Option<SchemasMapDiff>,
    /// Change to the blanket `additionalProperties` allow/deny flag.
    pub additional_properties_allowed: Option<ValueDiff>,
    /// Change to the `additionalProperties` schema form.
    pub additional_properties: Option<Box<SchemaDiff>>,
    pub property_names: Option<Box<SchemaDiff>>,
    pub required: Option<StringsDiff>,
    pub dependent_required: Option<ValueDiff>,
    pub dependent_schemas: Option<SchemasMapDiff>,
    pub max_properties: Option<ValueDiff>,
    pub min_properties: Option<ValueDiff>,
    pub unevaluated_properties: Option<Box<SchemaDiff>>,

    pub one_of: Option<SubschemasDiff>,
    pub any_of: Option<SubschemasDiff>,
    pub all_of: Option<SubschemasDiff>,
    pub not: Option<Box<SchemaDiff>>,

    pub if_schema: Option<Box<SchemaDiff>>,
    pub then_schema: Option<Box<SchemaDiff>>,
    pub else_schema: Option<Box<SchemaDiff>>,
    pub defs: Option<SchemasMapDiff>,

    pub extensions: Option<ExtensionsDiff>,
}

impl SchemaDiff {
    fn circular() -> Self {
        Self {
            circular_ref: true,
            ..Default::default()
        }
    }

    fn added() -> Self {
        Self {
            added: true,
            ..Default::default()
        }
    }

    fn deleted() -> Self {
        Self {
            deleted: true,
            ..Default::default()
        }
    }

    /// The authoritative "no change" predicate.
    ///
    /// Every field is examined by name so that adding an attribute without
    /// extending this predicate fails to compile.
    pub fn is_empty(&self) -> bool {
        let Self {
            added,
            deleted,
            circular_ref,
            schema_id,
            anchor,
            comment,
            title,
            description,
            deprecated,
            read_only,
            write_only,
            nullable,
            discriminator,
            xml,
            external_docs,
            types,
            list_of_types,
            format,
            enum_values,
            const_value,
            default_value,
            example,
            examples,
            multiple_of,
            maximum,
            exclusive_maximum,
            minimum,
            exclusive_minimum,
            max_length,
            min_length,
            pattern,
            content_media_type,
            content_encoding,
            content_schema,
            items,
            prefix_items,
            contains,
            max_items,
            min_items,
            unique_items,
            max_contains,
            min_contains,
            unevaluated_items,
            properties,
            pattern_properties,
            additional_properties_allowed,
            additional_properties,
            property_names,
            required,
            dependent_required,
            dependent_schemas,
            max_properties,
            min_properties,
            unevaluated_properties,
            one_of,
            any_of,
            all_of,
            not,
            if_schema,
            then_schema,
            else_schema,
            defs,
            extensions,
        } = self;

        !added
            && !deleted
            && !circular_ref
            && schema_id.is_none()
            && anchor.is_none()
            && comment.is_none()
            && title.is_none()
            && description.is_none()
            && deprecated.is_none()
            && read_only.is_none()
            && write_only.is_none()
            && nullable.is_none()
            && discriminator.is_none()
            && xml.is_none()
            && external_docs.is_none()
            && types.is_none()
            && list_of_types.is_none()
            && format.is_none()
            && enum_values.is_none()
            && const_value.is_none()
            && default_value.is_none()
            && example.is_none()
            && examples.is_none()
            && multiple_of.is_none()
            && maximum.is_none()
            && exclusive_maximum.is_none()
            && minimum.is_none()
            && exclusive_minimum.is_none()
            && max_length.is_none()
            && min_length.is_none()
            && pattern.is_none()
            && content_media_type.is_none()
            && content_encoding.is_none()
            && content_schema.is_none()
            && items.is_none()
            && prefix_items.is_none()
            && contains.is_none()
            && max_items.is_none()
            && min_items.is_none()
            && unique_items.is_none()
            && max_contains.is_none()
            && min_contains.is_none()
            && unevaluated_items.is_none()
            && properties.is_none()
            && pattern_properties.is_none()
            && additional_properties_allowed.is_none()
            && additional_properties.is_none()
            && property_names.is_none()
            && required.is_none()
            && dependent_required.is_none()
            && dependent_schemas.is_none()
            && max_properties.is_none()
            && min_properties.is_none()
            && unevaluated_properties.is_none()
            && one_of.is_none()
            && any_of.is_none()
            && all_of.is_none()
            && not.is_none()
            && if_schema.is_none()
            && then_schema.is_none()
            && else_schema.is_none()
            && defs.is_none()
            && extensions.is_none()
    }
}

/// Positional delta between two ordered sequences of subschemas.
#[derive(Clone, Debug, Default)]
pub struct SubschemasDiff {
    /// Indices on the new side beyond the common length.
    pub added: Vec<usize>,
    /// Indices on the old side beyond the common length.
    pub deleted: Vec<usize>,
    /// Positions present on both sides whose subschemas differ.
    pub modified: BTreeMap<usize, SchemaDiff>,
}

impl SubschemasDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            added,
            deleted,
            modified,
        } = self;
        added.is_empty() && deleted.is_empty() && modified.is_empty()
    }
}

/// Delta between two named schema maps (`properties`, `$defs`, ...).
#[derive(Clone, Debug, Default)]
pub struct SchemasMapDiff {
    /// Names present only in the new document, sorted.
    pub added: Vec<String>,
    /// Names present only in the old document, sorted.
    pub deleted: Vec<String>,
    pub modified: BTreeMap<String, SchemaDiff>,
}

impl SchemasMapDiff {
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
    /// Compare two schema positions.
    ///
    /// Both absent yields no result; one side absent yields a result whose
    /// `added` or `deleted` flag is set; both present recurse into a full
    /// structural comparison.
    pub fn compare_schemas(
        &mut self,
        old: Option<&SchemaRef>,
        new: Option<&SchemaRef>,
    ) -> Result<Option<SchemaDiff>, DiffError> {
        match (old, new) {
            (None, None) => Ok(None),
            (Some(_), None) => Ok(Some(SchemaDiff::deleted())),
            (None, Some(_)) => Ok(Some(SchemaDiff::added())),
            (Some(old), Some(new)) => self.compare_schema_pair(old, new),
        }
    }

    /// Compare two present schema positions, classifying reference cycles
    /// before descending.
    fn compare_schema_pair(
        &mut self,
        old: &SchemaRef,
        new: &SchemaRef,
    ) -> Result<Option<SchemaDiff>, DiffError> {
        match (old, new) {
            (
                SchemaRef::Ref {
                    reference: old_reference,
                },
                SchemaRef::Ref {
                    reference: new_reference,
                },
            ) => {
                let old_name = registry_key(old_reference);
                let new_name = registry_key(new_reference);
                match (self.old_visited(old_name), self.new_visited(new_name)) {
                    // The traversal has returned to a point it started from
                    // on both sides simultaneously: equivalent cycle shapes.
                    (true, true) => Ok(None),
                    // One side cycles back while the other keeps unrolling.
                    (true, false) | (false, true) => Ok(Some(SchemaDiff::circular())),
                    (false, false) => {
                        let old_node = self.resolve_old(old_reference)?;
                        let new_node = self.resolve_new(new_reference)?;
                        // The cache is checked before the names are
                        // registered, so a pair of named components reached
                        // from many operations is compared once per context.
                        if let Some(cached) = self.cache_lookup(old_node, new_node) {
                            return Ok(cached);
                        }
                        let result =
                            self.with_visited(Some(old_name), Some(new_name), |state| {
                                state.compare_nodes(old_node, new_node)
                            })?;
                        self.cache_store(old_node, new_node, result.as_ref());
                        Ok(result)
                    }
                }
            }
            (SchemaRef::Ref { reference }, SchemaRef::Inline(new_node)) => {
                let name = registry_key(reference);
                if self.old_visited(name) {
                    return Ok(Some(SchemaDiff::circular()));
                }
                let old_node = self.resolve_old(reference)?;
                self.with_visited(Some(name), None, |state| {
                    state.compare_nodes(old_node, new_node)
                })
            }
            (SchemaRef::Inline(old_node), SchemaRef::Ref { reference }) => {
                let name = registry_key(reference);
                if self.new_visited(name) {
                    return Ok(Some(SchemaDiff::circular()));
                }
                let new_node = self.resolve_new(reference)?;
                self.with_visited(None, Some(name), |state| {
                    state.compare_nodes(old_node, new_node)
                })
            }
            (SchemaRef::Inline(old_node), SchemaRef::Inline(new_node)) => {
                self.compare_nodes(old_node, new_node)
            }
        }
    }

    fn compare_nodes(
        &mut self,
        old: &SchemaNode,
        new: &SchemaNode,
    ) -> Result<Option<SchemaDiff>, DiffError> {
        if let Some(cached) = self.cache_lookup(old, new) {
            return Ok(cached);
        }

        trace!(context = ?self.context(), "comparing schema nodes");

        let diff = self.compute_node_diff(old, new)?;
        let result = if diff.is_empty() { None } else { Some(diff) };
        self.cache_store(old, new, result.as_ref());
        Ok(result)
    }

    /// The attribute-by-attribute comparison.
    ///
    /// Both sides are fully destructured so a newly added model attribute
    /// cannot be silently skipped here.
    fn compute_node_diff(
        &mut self,
        old: &SchemaNode,
        new: &SchemaNode,
    ) -> Result<SchemaDiff, DiffError> {
        let old_type_pattern = typelist::detect(old, self.old_schemas);
        let new_type_pattern = typelist::detect(new, self.new_schemas);

        let SchemaNode {
            schema_id: old_schema_id,
            anchor: old_anchor,
            comment: old_comment,
            title: old_title,
            description: old_description,
            deprecated: old_deprecated,
            read_only: old_read_only,
            write_only: old_write_only,
            nullable: old_nullable,
            discriminator: old_discriminator,
            xml: old_xml,
            external_docs: old_external_docs,
            types: old_types,
            format: old_format,
            enum_values: old_enum_values,
            const_value: old_const_value,
            default_value: old_default_value,
            example: old_example,
            examples: old_examples,
            multiple_of: old_multiple_of,
            maximum: old_maximum,
            exclusive_maximum: old_exclusive_maximum,
            minimum: old_minimum,
            exclusive_minimum: old_exclusive_minimum,
            max_length: old_max_length,
            min_length: old_min_length,
            pattern: old_pattern,
            content_media_type: old_content_media_type,
            content_encoding: old_content_encoding,
            content_schema: old_content_schema,
            items: old_items,
            prefix_items: old_prefix_items,
            contains: old_contains,
            max_items: old_max_items,
            min_items: old_min_items,
            unique_items: old_unique_items,
            max_contains: old_max_contains,
            min_contains: old_min_contains,
            unevaluated_items: old_unevaluated_items,
            properties: old_properties,
            pattern_properties: old_pattern_properties,
            additional_properties: old_additional_properties,
            property_names: old_property_names,
            required: old_required,
            dependent_required: old_dependent_required,
            dependent_schemas: old_dependent_schemas,
            max_properties: old_max_properties,
            min_properties: old_min_properties,
            unevaluated_properties: old_unevaluated_properties,
            one_of: old_one_of,
            any_of: old_any_of,
            all_of: old_all_of,
            not: old_not,
            if_schema: old_if_schema,
            then_schema: old_then_schema,
            else_schema: old_else_schema,
            defs: old_defs,
            extensions: old_extensions,
        } = old;
        let SchemaNode {
            schema_id: new_schema_id,
            anchor: new_anchor,
            comment: new_comment,
            title: new_title,
            description: new_description,
            deprecated: new_deprecated,
            read_only: new_read_only,
            write_only: new_write_only,
            nullable: new_nullable,
            discriminator: new_discriminator,
            xml: new_xml,
            external_docs: new_external_docs,
            types: new_types,
            format: new_format,
            enum_values: new_enum_values,
            const_value: new_const_value,
            default_value: new_default_value,
            example: new_example,
            examples: new_examples,
            multiple_of: new_multiple_of,
            maximum: new_maximum,
            exclusive_maximum: new_exclusive_maximum,
            minimum: new_minimum,
            exclusive_minimum: new_exclusive_minimum,
            max_length: new_max_length,
            min_length: new_min_length,
            pattern: new_pattern,
            content_media_type: new_content_media_type,
            content_encoding: new_content_encoding,
            content_schema: new_content_schema,
            items: new_items,
            prefix_items: new_prefix_items,
            contains: new_contains,
            max_items: new_max_items,
            min_items: new_min_items,
            unique_items: new_unique_items,
            max_contains: new_max_contains,
            min_contains: new_min_contains,
            unevaluated_items: new_unevaluated_items,
            properties: new_properties,
            pattern_properties: new_pattern_properties,
            additional_properties: new_additional_properties,
            property_names: new_property_names,
            required: new_required,
            dependent_required: new_dependent_required,
            dependent_schemas: new_dependent_schemas,
            max_properties: new_max_properties,
            min_properties: new_min_properties,
            unevaluated_properties: new_unevaluated_properties,
            one_of: new_one_of,
            any_of: new_any_of,
            all_of: new_all_of,
            not: new_not,
            if_schema: new_if_schema,
            then_schema: new_then_schema,
            else_schema: new_else_schema,
            defs: new_defs,
            extensions: new_extensions,
        } = new;

        let config = self.config;
        let unless = |suppressed: bool, diff: Option<ValueDiff>| {
            if suppressed { None } else { diff }
        };

        let mut diff = SchemaDiff {
            schema_id: leaf(old_schema_id.as_ref(), new_schema_id.as_ref()),
            anchor: leaf(old_anchor.as_ref(), new_anchor.as_ref()),
            comment: leaf(old_comment.as_ref(), new_comment.as_ref()),
            title: unless(
                config.exclude_title,
                leaf(old_title.as_ref(), new_title.as_ref()),
            ),
            description: unless(
                config.exclude_description,
                leaf(old_description.as_ref(), new_description.as_ref()),
            ),
            deprecated: leaf(old_deprecated.as_ref(), new_deprecated.as_ref()),
            read_only: leaf(old_read_only.as_ref(), new_read_only.as_ref()),
            write_only: leaf(old_write_only.as_ref(), new_write_only.as_ref()),
            nullable: leaf(old_nullable.as_ref(), new_nullable.as_ref()),
            discriminator: compare_values(old_discriminator.as_ref(), new_discriminator.as_ref()),
            xml: compare_values(old_xml.as_ref(), new_xml.as_ref()),
            external_docs: compare_values(old_external_docs.as_ref(), new_external_docs.as_ref()),
            types: compare_string_sets(
                old_types.as_deref().unwrap_or_default(),
                new_types.as_deref().unwrap_or_default(),
            ),
            list_of_types: typelist::diff_patterns(
                old_type_pattern.as_ref(),
                new_type_pattern.as_ref(),
            ),
            format: leaf(old_format.as_ref(), new_format.as_ref()),
            enum_values: compare_values(
                values_array(old_enum_values).as_ref(),
                values_array(new_enum_values).as_ref(),
            ),
            const_value: compare_values(old_const_value.as_ref(), new_const_value.as_ref()),
            default_value: compare_values(old_default_value.as_ref(), new_default_value.as_ref()),
            example: unless(
                config.exclude_examples,
                compare_values(old_example.as_ref(), new_example.as_ref()),
            ),
            examples: unless(
                config.exclude_examples,
                compare_values(
                    values_array(old_examples).as_ref(),
                    values_array(new_examples).as_ref(),
                ),
            ),
            multiple_of: leaf(old_multiple_of.as_ref(), new_multiple_of.as_ref()),
            maximum: leaf(old_maximum.as_ref(), new_maximum.as_ref()),
            exclusive_maximum: compare_values(
                old_exclusive_maximum.as_ref(),
                new_exclusive_maximum.as_ref(),
            ),
            minimum: leaf(old_minimum.as_ref(), new_minimum.as_ref()),
            exclusive_minimum: compare_values(
                old_exclusive_minimum.as_ref(),
                new_exclusive_minimum.as_ref(),
            ),
            max_length: leaf(old_max_length.as_ref(), new_max_length.as_ref()),
            min_length: leaf(old_min_length.as_ref(), new_min_length.as_ref()),
            pattern: leaf(old_pattern.as_ref(), new_pattern.as_ref()),
            content_media_type: leaf(
                old_content_media_type.as_ref(),
                new_content_media_type.as_ref(),
            ),
            content_encoding: leaf(old_content_encoding.as_ref(), new_content_encoding.as_ref()),
            max_items: leaf(old_max_items.as_ref(), new_max_items.as_ref()),
            min_items: leaf(old_min_items.as_ref(), new_min_items.as_ref()),
            unique_items: leaf(old_unique_items.as_ref(), new_unique_items.as_ref()),
            max_contains: leaf(old_max_contains.as_ref(), new_max_contains.as_ref()),
            min_contains: leaf(old_min_contains.as_ref(), new_min_contains.as_ref()),
            additional_properties_allowed: leaf(
                allowed_flag(old_additional_properties).as_ref(),
                allowed_flag(new_additional_properties).as_ref(),
            ),
            required: compare_string_sets(old_required, new_required),
            dependent_required: compare_values(
                dependency_map(old_dependent_required).as_ref(),
                dependency_map(new_dependent_required).as_ref(),
            ),
            max_properties: leaf(old_max_properties.as_ref(), new_max_properties.as_ref()),
            min_properties: leaf(old_min_properties.as_ref(), new_min_properties.as_ref()),
            extensions: compare_extensions(old_extensions, new_extensions, config),
            ..Default::default()
        };

        // Nested schemas, all through the same comparator.
        diff.content_schema = self.compare_boxed(old_content_schema, new_content_schema)?;
        diff.items = self.compare_boxed(old_items, new_items)?;
        diff.prefix_items = self.compare_subschemas(old_prefix_items, new_prefix_items)?;
        diff.contains = self.compare_boxed(old_contains, new_contains)?;
        diff.unevaluated_items =
            self.compare_boxed(old_unevaluated_items, new_unevaluated_items)?;
        diff.properties = self.compare_schema_map(old_properties, new_properties)?;
        diff.pattern_properties =
            self.compare_schema_map(old_pattern_properties, new_pattern_properties)?;
        diff.additional_properties = self
            .compare_schemas(
                schema_form(old_additional_properties),
                schema_form(new_additional_properties),
            )?
            .map(Box::new);
        diff.property_names = self.compare_boxed(old_property_names, new_property_names)?;
        diff.dependent_schemas =
            self.compare_schema_map(old_dependent_schemas, new_dependent_schemas)?;
        diff.unevaluated_properties =
            self.compare_boxed(old_unevaluated_properties, new_unevaluated_properties)?;
        diff.one_of = self.compare_subschemas(old_one_of, new_one_of)?;
        diff.any_of = self.compare_subschemas(old_any_of, new_any_of)?;
        diff.all_of = self.compare_subschemas(old_all_of, new_all_of)?;
        diff.not = self.compare_boxed(old_not, new_not)?;
        diff.if_schema = self.compare_boxed(old_if_schema, new_if_schema)?;
        diff.then_schema = self.compare_boxed(old_then_schema, new_then_schema)?;
        diff.else_schema = self.compare_boxed(old_else_schema, new_else_schema)?;
        diff.defs = self.compare_schema_map(old_defs, new_defs)?;

        Ok(diff)
    }

    fn compare_boxed(
        &mut self,
        old: &Option<Box<SchemaRef>>,
        new: &Option<Box<SchemaRef>>,
    ) -> Result<Option<Box<SchemaDiff>>, DiffError> {
        Ok(self
            .compare_schemas(old.as_deref(), new.as_deref())?
            .map(Box::new))
    }

    /// Positional comparison of ordered subschema sequences.
    fn compare_subschemas(
        &mut self,
        old: &[SchemaRef],
        new: &[SchemaRef],
    ) -> Result<Option<SubschemasDiff>, DiffError> {
        let mut diff = SubschemasDiff::default();

        let common = old.len().min(new.len());
        for index in 0..common {
            if let Some(changed) = self.compare_schema_pair(&old[index], &new[index])? {
                diff.modified.insert(index, changed);
            }
        }
        diff.deleted = (common..old.len()).collect();
        diff.added = (common..new.len()).collect();

        Ok(if diff.is_empty() { None } else { Some(diff) })
    }

    /// Keyed comparison of named schema maps.
    fn compare_schema_map(
        &mut self,
        old: &IndexMap<String, SchemaRef>,
        new: &IndexMap<String, SchemaRef>,
    ) -> Result<Option<SchemasMapDiff>, DiffError> {
        let mut diff = SchemasMapDiff::default();

        for (name, old_schema) in old {
            match new.get(name) {
                None => diff.deleted.push(name.clone()),
                Some(new_schema) => {
                    if let Some(changed) = self.compare_schema_pair(old_schema, new_schema)? {
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
}

/// The registry key of a reference: the final pointer segment.
pub(crate) fn registry_key(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

fn values_array(values: &Option<Vec<Value>>) -> Option<Value> {
    values.as_ref().map(|values| Value::Array(values.clone()))
}

/// Represent a dependency map as a value with deterministic key order.
fn dependency_map(map: &IndexMap<String, Vec<String>>) -> Option<Value> {
    if map.is_empty() {
        return None;
    }
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    let mut object = serde_json::Map::new();
    for key in keys {
        object.insert(
            key.clone(),
            Value::Array(map[key].iter().cloned().map(Value::String).collect()),
        );
    }
    Some(Value::Object(object))
}

fn allowed_flag(value: &Option<AdditionalProperties>) -> Option<bool> {
    match value {
        Some(AdditionalProperties::Allowed(allowed)) => Some(*allowed),
        _ => None,
    }
}

fn schema_form(value: &Option<AdditionalProperties>) -> Option<&SchemaRef> {
    match value {
        Some(AdditionalProperties::Schema(schema)) => Some(schema.as_ref()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        config::DiffConfig,
        error::DiffError,
        model::{Document, SchemaRef},
        state::TraversalState,
    };

    fn document(value: serde_json::Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    fn schema_ref(value: serde_json::Value) -> SchemaRef {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn reflexive_comparison_of_a_cyclic_schema_is_empty() {
        let doc = document(json!({
            "components": {"schemas": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "string"},
                        "next": {"$ref": "#/components/schemas/Node"}
                    }
                }
            }}
        }));
        let config = DiffConfig::default();
        let mut state = TraversalState::new(&config, &doc, &doc);
        let root = schema_ref(json!({"$ref": "#/components/schemas/Node"}));

        let diff = state.compare_schemas(Some(&root), Some(&root)).unwrap();
        assert!(diff.is_none());
    }

    #[test]
    fn equivalent_mutual_cycles_are_empty() {
        let doc = document(json!({
            "components": {"schemas": {
                "A": {"type": "object", "properties": {"b": {"$ref": "#/components/schemas/B"}}},
                "B": {"type": "object", "properties": {"a": {"$ref": "#/components/schemas/A"}}}
            }}
        }));
        let config = DiffConfig::default();
        let mut state = TraversalState::new(&config, &doc, &doc);
        let root = schema_ref(json!({"$ref": "#/components/schemas/A"}));

        let diff = state.compare_schemas(Some(&root), Some(&root)).unwrap();
        assert!(diff.is_none());
    }

    #[test]
    fn diverging_cycle_shapes_set_the_circular_flag() {
        // The old cycle returns directly to Node; the new one keeps
        // unrolling through an intermediate schema.
        let old = document(json!({
            "components": {"schemas": {
                "Node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/components/schemas/Node"}}
                }
            }}
        }));
        let new = document(json!({
            "components": {"schemas": {
                "Node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/components/schemas/Hop"}}
                },
                "Hop": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/components/schemas/Node"}}
                }
            }}
        }));
        let config = DiffConfig::default();
        let mut state = TraversalState::new(&config, &old, &new);
        let root = schema_ref(json!({"$ref": "#/components/schemas/Node"}));

        let diff = state
            .compare_schemas(Some(&root), Some(&root))
            .unwrap()
            .unwrap();
        let properties = diff.properties.unwrap();
        assert!(properties.modified.get("next").unwrap().circular_ref);
    }

    #[test]
    fn one_sided_schemas_set_the_added_and_deleted_flags() {
        let doc = Document::default();
        let config = DiffConfig::default();
        let mut state = TraversalState::new(&config, &doc, &doc);
        let schema = schema_ref(json!({"type": "string"}));

        assert!(state.compare_schemas(None, None).unwrap().is_none());

        let deleted = state.compare_schemas(Some(&schema), None).unwrap().unwrap();
        assert!(deleted.deleted && !deleted.added);

        let added = state.compare_schemas(None, Some(&schema)).unwrap().unwrap();
        assert!(added.added && !added.deleted);
    }

    #[test]
    fn dangling_reference_aborts_the_run() {
        let doc = Document::default();
        let config = DiffConfig::default();
        let mut state = TraversalState::new(&config, &doc, &doc);
        let root = schema_ref(json!({"$ref": "#/components/schemas/Missing"}));

        let error = state.compare_schemas(Some(&root), Some(&root)).unwrap_err();
        assert!(matches!(error, DiffError::UnresolvedReference { .. }));
    }

    #[test]
    fn type_union_and_literal_tags_are_reported_side_by_side() {
        let doc = Document::default();
        let config = DiffConfig::default();
        let mut state = TraversalState::new(&config, &doc, &doc);

        let old = schema_ref(json!({"type": "string"}));
        let new = schema_ref(json!({"oneOf": [{"type": "string"}, {"type": "integer"}]}));

        let diff = state
            .compare_schemas(Some(&old), Some(&new))
            .unwrap()
            .unwrap();

        // The literal tag went away while the union pattern widened.
        assert_eq!(diff.types.unwrap().deleted, vec!["string".to_string()]);
        let list_of_types = diff.list_of_types.unwrap();
        assert_eq!(list_of_types.added, vec!["integer".to_string()]);
        assert!(list_of_types.deleted.is_empty());
        assert_eq!(diff.one_of.unwrap().added, vec![0, 1]);
    }

    #[test]
    fn cached_results_match_fresh_recomputation() {
        let doc = document(json!({
            "components": {"schemas": {
                "User": {"type": "object", "properties": {"name": {"type": "string"}}}
            }}
        }));
        let changed = document(json!({
            "components": {"schemas": {
                "User": {"type": "object", "properties": {"name": {"type": "integer"}}}
            }}
        }));
        let config = DiffConfig::default();
        let root = schema_ref(json!({"$ref": "#/components/schemas/User"}));

        let mut state = TraversalState::new(&config, &doc, &changed);
        let first = state.compare_schemas(Some(&root), Some(&root)).unwrap();
        let second = state.compare_schemas(Some(&root), Some(&root)).unwrap();

        let mut fresh = TraversalState::new(&config, &doc, &changed);
        let recomputed = fresh.compare_schemas(Some(&root), Some(&root)).unwrap();

        assert_eq!(format!("{:?}", first), format!("{:?}", second));
        assert_eq!(format!("{:?}", first), format!("{:?}", recomputed));
    }

    #[test]
    fn excluded_fields_are_silent() {
        let doc = Document::default();
        let old = schema_ref(json!({"type": "string", "title": "Old name"}));
        let new = schema_ref(json!({"type": "string", "title": "New name"}));

        let config = DiffConfig::default();
        let mut state = TraversalState::new(&config, &doc, &doc);
        let diff = state
            .compare_schemas(Some(&old), Some(&new))
            .unwrap()
            .unwrap();
        assert!(diff.title.is_some());

        let config = DiffConfig {
            exclude_title: true,
            ..Default::default()
        };
        let mut state = TraversalState::new(&config, &doc, &doc);
        assert!(state.compare_schemas(Some(&old), Some(&new)).unwrap().is_none());
    }

    #[test]
    fn nested_keywords_recurse() {
        let doc = Document::default();
        let old = schema_ref(json!({
            "type": "array",
            "items": {"type": "string"},
            "contains": {"type": "string"}
        }));
        let new = schema_ref(json!({
            "type": "array",
            "items": {"type": "integer"},
            "contains": {"type": "string"}
        }));

        let config = DiffConfig::default();
        let mut state = TraversalState::new(&config, &doc, &doc);
        let diff = state
            .compare_schemas(Some(&old), Some(&new))
            .unwrap()
            .unwrap();

        let items = diff.items.unwrap();
        assert_eq!(items.types.as_ref().unwrap().added, vec!["integer".to_string()]);
        assert_eq!(items.types.as_ref().unwrap().deleted, vec!["string".to_string()]);
        assert!(diff.contains.is_none());
    }
}
