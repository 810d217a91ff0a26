// Copyright 2025 Oxide Computer Company

//! Parameter reconciliation.
//!
//! Two parameter lists are matched in three ordered passes, each parameter
//! consumed at most once:
//!
//! 1. Exploded-object equivalence, run in both directions: a single
//!    object-schema parameter serialized with `style=form, explode=true` is
//!    semantically one discrete parameter per property, so its properties
//!    are matched against same-location discrete parameters on the other
//!    side.
//! 2. Direct matching of the remainder: by exact name, except path
//!    parameters, which match through the caller-supplied positional
//!    rename map.
//! 3. Anything still unconsumed on the new side is added.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::{
    error::DiffError,
    model::{Parameter, ParameterLocation, SchemaNode, SchemaRef},
    schema::{SchemaDiff, registry_key},
    state::TraversalState,
    value::{ExtensionsDiff, ValueDiff, compare_extensions, compare_values, leaf},
};

/// Field-level delta between two matched parameters.
#[derive(Clone, Debug, Default)]
pub struct ParameterDiff {
    pub required: Option<ValueDiff>,
    /// Compared by effective style, so a declared `form` matches a
    /// defaulted one.
    pub style: Option<ValueDiff>,
    pub explode: Option<ValueDiff>,
    pub description: Option<ValueDiff>,
    pub deprecated: Option<ValueDiff>,
    pub examples: Option<ValueDiff>,
    pub extensions: Option<ExtensionsDiff>,
    pub schema: Option<SchemaDiff>,
}

impl ParameterDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            required,
            style,
            explode,
            description,
            deprecated,
            examples,
            extensions,
            schema,
        } = self;
        required.is_none()
            && style.is_none()
            && explode.is_none()
            && description.is_none()
            && deprecated.is_none()
            && examples.is_none()
            && extensions.is_none()
            && schema.is_none()
    }
}

/// Per-location parameter delta.
///
/// Within one location a parameter name appears in at most one of `added`,
/// `deleted`, and `modified`; the name lists are sorted.
#[derive(Clone, Debug, Default)]
pub struct ParametersDiff {
    pub added: BTreeMap<ParameterLocation, Vec<String>>,
    pub deleted: BTreeMap<ParameterLocation, Vec<String>>,
    pub modified: BTreeMap<ParameterLocation, BTreeMap<String, ParameterDiff>>,
}

impl ParametersDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            added,
            deleted,
            modified,
        } = self;
        added.is_empty() && deleted.is_empty() && modified.is_empty()
    }

    fn push_added(&mut self, location: ParameterLocation, name: &str) {
        self.added.entry(location).or_default().push(name.to_string());
    }

    fn push_deleted(&mut self, location: ParameterLocation, name: &str) {
        self.deleted.entry(location).or_default().push(name.to_string());
    }

    fn push_modified(&mut self, location: ParameterLocation, name: &str, diff: ParameterDiff) {
        self.modified
            .entry(location)
            .or_default()
            .insert(name.to_string(), diff);
    }
}

impl<'a> TraversalState<'a> {
    /// Reconcile two parameter lists.
    ///
    /// `path_renames` maps old path-parameter names to their new names when
    /// the template variable position is preserved; parameters in other
    /// locations match by exact name.
    pub fn compare_parameters(
        &mut self,
        old_params: &[Parameter],
        new_params: &[Parameter],
        path_renames: &BTreeMap<String, String>,
    ) -> Result<Option<ParametersDiff>, DiffError> {
        let mut old_used = vec![false; old_params.len()];
        let mut new_used = vec![false; new_params.len()];
        let mut diff = ParametersDiff::default();

        // Pass 1: exploded-object equivalence, in both directions.
        for (new_index, exploded) in new_params.iter().enumerate() {
            let Some(schema) = exploded_object_schema(exploded, self.new_schemas) else {
                continue;
            };
            let mut matched = false;
            for (old_index, simple) in old_params.iter().enumerate() {
                if old_used[old_index]
                    || simple.location != exploded.location
                    || !schema.properties.contains_key(&simple.name)
                {
                    continue;
                }
                let virtual_param = virtual_parameter(exploded, schema, &simple.name)?;
                let fields = self.compare_parameter_fields(simple, &virtual_param)?;
                if !fields.is_empty() {
                    diff.push_modified(simple.location, &simple.name, fields);
                }
                old_used[old_index] = true;
                matched = true;
            }
            if matched {
                new_used[new_index] = true;
            }
        }
        for (old_index, exploded) in old_params.iter().enumerate() {
            if old_used[old_index] {
                continue;
            }
            let Some(schema) = exploded_object_schema(exploded, self.old_schemas) else {
                continue;
            };
            let mut matched = false;
            for (new_index, simple) in new_params.iter().enumerate() {
                if new_used[new_index]
                    || simple.location != exploded.location
                    || !schema.properties.contains_key(&simple.name)
                {
                    continue;
                }
                let virtual_param = virtual_parameter(exploded, schema, &simple.name)?;
                let fields = self.compare_parameter_fields(&virtual_param, simple)?;
                if !fields.is_empty() {
                    diff.push_modified(simple.location, &simple.name, fields);
                }
                new_used[new_index] = true;
                matched = true;
            }
            if matched {
                old_used[old_index] = true;
            }
        }

        // Pass 2: direct matches over the remainder. An exact match with an
        // empty field diff is dropped silently.
        for (old_index, old_param) in old_params.iter().enumerate() {
            if old_used[old_index] {
                continue;
            }
            old_used[old_index] = true;

            let target_name = match old_param.location {
                ParameterLocation::Path => path_renames
                    .get(&old_param.name)
                    .map(String::as_str)
                    .unwrap_or(old_param.name.as_str()),
                _ => old_param.name.as_str(),
            };
            let matched = new_params.iter().enumerate().find(|(new_index, new_param)| {
                !new_used[*new_index]
                    && new_param.location == old_param.location
                    && new_param.name == target_name
            });
            match matched {
                Some((new_index, new_param)) => {
                    new_used[new_index] = true;
                    let fields = self.compare_parameter_fields(old_param, new_param)?;
                    if !fields.is_empty() {
                        diff.push_modified(new_param.location, &new_param.name, fields);
                    }
                }
                None => diff.push_deleted(old_param.location, &old_param.name),
            }
        }

        // Pass 3: the residue on the new side is added.
        for (new_index, new_param) in new_params.iter().enumerate() {
            if !new_used[new_index] {
                diff.push_added(new_param.location, &new_param.name);
            }
        }

        for names in diff.added.values_mut().chain(diff.deleted.values_mut()) {
            names.sort();
        }

        Ok(if diff.is_empty() { None } else { Some(diff) })
    }

    fn compare_parameter_fields(
        &mut self,
        old: &Parameter,
        new: &Parameter,
    ) -> Result<ParameterDiff, DiffError> {
        let old_style = old.effective_style();
        let new_style = new.effective_style();
        let old_explode = old.effective_explode();
        let new_explode = new.effective_explode();
        let config = self.config;

        let mut diff = ParameterDiff {
            required: leaf(Some(&old.required), Some(&new.required)),
            style: (old_style != new_style).then(|| ValueDiff {
                old: Some(old_style.into()),
                new: Some(new_style.into()),
            }),
            explode: leaf(Some(&old_explode), Some(&new_explode)),
            description: if config.exclude_description {
                None
            } else {
                leaf(old.description.as_ref(), new.description.as_ref())
            },
            deprecated: leaf(Some(&old.deprecated), Some(&new.deprecated)),
            examples: if config.exclude_examples {
                None
            } else {
                compare_values(old.examples.as_ref(), new.examples.as_ref())
            },
            extensions: compare_extensions(&old.extensions, &new.extensions, config),
            ..Default::default()
        };
        diff.schema = self.compare_schemas(old.schema.as_ref(), new.schema.as_ref())?;

        Ok(diff)
    }
}

/// The resolved object schema of an exploded-candidate parameter.
///
/// A candidate serializes as `style=form, explode=true` (declared or
/// defaulted) and carries an object-typed schema with at least one named
/// property. Anything else, including an unresolvable reference, is not a
/// candidate.
fn exploded_object_schema<'p>(
    param: &'p Parameter,
    schemas: &'p IndexMap<String, SchemaNode>,
) -> Option<&'p SchemaNode> {
    if param.effective_style() != "form" || !param.effective_explode() {
        return None;
    }
    let node = match param.schema.as_ref()? {
        SchemaRef::Inline(node) => node.as_ref(),
        SchemaRef::Ref { reference } => schemas.get(registry_key(reference))?,
    };
    let object_typed = match node.types.as_deref() {
        Some([tag]) => tag == "object",
        Some(_) => false,
        None => true,
    };
    (object_typed && !node.properties.is_empty()).then_some(node)
}

/// Synthesize a standalone parameter for one property of an exploded
/// parameter.
///
/// The property contributes only its schema; everything else is inherited
/// from the exploded parameter.
fn virtual_parameter(
    exploded: &Parameter,
    schema: &SchemaNode,
    property: &str,
) -> Result<Parameter, DiffError> {
    let property_schema =
        schema
            .properties
            .get(property)
            .ok_or_else(|| DiffError::InvalidExplodedProperty {
                parameter: exploded.name.clone(),
                property: property.to_string(),
            })?;

    Ok(Parameter {
        name: property.to_string(),
        location: exploded.location,
        required: exploded.required,
        style: exploded.style.clone(),
        explode: exploded.explode,
        deprecated: exploded.deprecated,
        description: exploded.description.clone(),
        examples: exploded.examples.clone(),
        schema: Some(property_schema.clone()),
        extensions: exploded.extensions.clone(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{config::DiffConfig, model::Document};

    use super::*;

    fn params(value: serde_json::Value) -> Vec<Parameter> {
        serde_json::from_value(value).unwrap()
    }

    fn empty_doc() -> Document {
        Document::default()
    }

    #[test]
    fn exploded_equivalence_matches_discrete_parameters() {
        let old = params(json!([
            {"name": "pageNumber", "in": "query", "schema": {"type": "integer"}},
            {"name": "pageSize", "in": "query", "schema": {"type": "integer"}}
        ]));
        let new = params(json!([
            {
                "name": "paging",
                "in": "query",
                "style": "form",
                "explode": true,
                "schema": {
                    "type": "object",
                    "properties": {
                        "pageNumber": {"type": "integer"},
                        "pageSize": {"type": "integer"}
                    }
                }
            }
        ]));

        let config = DiffConfig::default();
        let (old_doc, new_doc) = (empty_doc(), empty_doc());
        let mut state = TraversalState::new(&config, &old_doc, &new_doc);
        let diff = state
            .compare_parameters(&old, &new, &BTreeMap::new())
            .unwrap();
        assert!(diff.is_none());
    }

    #[test]
    fn exploded_property_differences_surface_as_modified() {
        let old = params(json!([
            {"name": "pageNumber", "in": "query", "schema": {"type": "integer"}},
            {"name": "pageSize", "in": "query", "schema": {"type": "integer"}}
        ]));
        let new = params(json!([
            {
                "name": "paging",
                "in": "query",
                "required": true,
                "style": "form",
                "explode": true,
                "schema": {
                    "type": "object",
                    "properties": {
                        "pageNumber": {"type": "string"},
                        "pageSize": {"type": "integer"}
                    }
                }
            }
        ]));

        let config = DiffConfig::default();
        let (old_doc, new_doc) = (empty_doc(), empty_doc());
        let mut state = TraversalState::new(&config, &old_doc, &new_doc);
        let diff = state
            .compare_parameters(&old, &new, &BTreeMap::new())
            .unwrap()
            .unwrap();

        assert!(diff.added.is_empty());
        assert!(diff.deleted.is_empty());
        let query = diff.modified.get(&ParameterLocation::Query).unwrap();
        // Both properties inherit the exploded parameter's required flag.
        assert!(query.get("pageNumber").unwrap().required.is_some());
        assert!(query.get("pageNumber").unwrap().schema.is_some());
        assert!(query.get("pageSize").unwrap().required.is_some());
        assert!(query.get("pageSize").unwrap().schema.is_none());
    }

    #[test]
    fn exploded_match_never_crosses_locations() {
        let old = params(json!([
            {"name": "userId", "in": "cookie", "schema": {"type": "string"}}
        ]));
        let new = params(json!([
            {
                "name": "filter",
                "in": "query",
                "style": "form",
                "explode": true,
                "schema": {
                    "type": "object",
                    "properties": {"userId": {"type": "string"}}
                }
            }
        ]));

        let config = DiffConfig::default();
        let (old_doc, new_doc) = (empty_doc(), empty_doc());
        let mut state = TraversalState::new(&config, &old_doc, &new_doc);
        let diff = state
            .compare_parameters(&old, &new, &BTreeMap::new())
            .unwrap()
            .unwrap();

        assert_eq!(
            diff.deleted.get(&ParameterLocation::Cookie),
            Some(&vec!["userId".to_string()])
        );
        assert_eq!(
            diff.added.get(&ParameterLocation::Query),
            Some(&vec!["filter".to_string()])
        );
        assert!(diff.modified.is_empty());
    }

    #[test]
    fn path_parameters_match_through_the_rename_map() {
        let old = params(json!([
            {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}
        ]));
        let new = params(json!([
            {"name": "userId", "in": "path", "required": true, "schema": {"type": "string"}}
        ]));

        let config = DiffConfig::default();
        let (old_doc, new_doc) = (empty_doc(), empty_doc());
        let mut state = TraversalState::new(&config, &old_doc, &new_doc);

        // Without the rename map the parameter reads as deleted and added.
        let diff = state
            .compare_parameters(&old, &new, &BTreeMap::new())
            .unwrap()
            .unwrap();
        assert!(diff.deleted.contains_key(&ParameterLocation::Path));
        assert!(diff.added.contains_key(&ParameterLocation::Path));

        // With it, the pair matches cleanly.
        let renames = BTreeMap::from([("id".to_string(), "userId".to_string())]);
        let diff = state.compare_parameters(&old, &new, &renames).unwrap();
        assert!(diff.is_none());
    }

    #[test]
    fn exploded_parameter_without_a_partner_is_added_whole() {
        let old = params(json!([]));
        let new = params(json!([
            {
                "name": "paging",
                "in": "query",
                "style": "form",
                "explode": true,
                "schema": {
                    "type": "object",
                    "properties": {"pageNumber": {"type": "integer"}}
                }
            }
        ]));

        let config = DiffConfig::default();
        let (old_doc, new_doc) = (empty_doc(), empty_doc());
        let mut state = TraversalState::new(&config, &old_doc, &new_doc);
        let diff = state
            .compare_parameters(&old, &new, &BTreeMap::new())
            .unwrap()
            .unwrap();
        assert_eq!(
            diff.added.get(&ParameterLocation::Query),
            Some(&vec!["paging".to_string()])
        );
    }
}
