// Copyright 2025 Oxide Computer Company

//! Document model consumed by the comparison engine.
//!
//! Inputs are assumed to be parsed and resolved ahead of time: every named
//! reference resolves through the owning document's schema registry, and the
//! only indirection the engine tolerates at comparison time is a cycle back
//! into that registry.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// An API contract document, reduced to the parts the engine compares.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Document {
    pub paths: IndexMap<String, PathItem>,
    pub webhooks: IndexMap<String, PathItem>,
    pub components: Components,
}

/// Reusable components; the schema registry that named references resolve
/// against.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Components {
    pub schemas: IndexMap<String, SchemaNode>,
}

/// Operations grouped under one path template (or webhook name).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PathItem {
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
    pub patch: Option<Operation>,
    pub trace: Option<Operation>,
}

impl PathItem {
    /// Iterate present operations in a fixed method order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Operation)> {
        [
            ("get", &self.get),
            ("put", &self.put),
            ("post", &self.post),
            ("delete", &self.delete),
            ("options", &self.options),
            ("head", &self.head),
            ("patch", &self.patch),
            ("trace", &self.trace),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// Where a parameter is carried in the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

/// One parameter of an operation. Immutable for the duration of a
/// comparison.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub explode: Option<bool>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub examples: Option<Value>,
    #[serde(default)]
    pub schema: Option<SchemaRef>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Parameter {
    /// The serialization style in effect: the declared style, or the
    /// location's default (`form` for query and cookie, `simple` for path
    /// and header).
    pub fn effective_style(&self) -> &str {
        match &self.style {
            Some(style) => style.as_str(),
            None => match self.location {
                ParameterLocation::Query | ParameterLocation::Cookie => "form",
                ParameterLocation::Path | ParameterLocation::Header => "simple",
            },
        }
    }

    /// The explode flag in effect: the declared flag, or `true` exactly when
    /// the effective style is `form`.
    pub fn effective_explode(&self) -> bool {
        match self.explode {
            Some(explode) => explode,
            None => self.effective_style() == "form",
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: IndexMap<String, Content>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, Content>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// The value of one media-type entry in a content map.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub schema: Option<SchemaRef>,
    #[serde(default)]
    pub example: Option<Value>,
    #[serde(default)]
    pub examples: Option<Value>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// A schema position: either a named indirection into the registry or an
/// owned inline node.
///
/// References carry the raw pointer text (like
/// `#/components/schemas/User`); the registry is keyed by the final
/// segment.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum SchemaRef {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Inline(Box<SchemaNode>),
}

impl SchemaRef {
    /// The registry key for a named reference: the last pointer segment.
    pub fn ref_name(&self) -> Option<&str> {
        match self {
            Self::Ref { reference } => {
                Some(reference.rsplit('/').next().unwrap_or(reference.as_str()))
            }
            Self::Inline(_) => None,
        }
    }
}

/// One node of a schema tree.
///
/// Attributes are independent of each other; absence always means "not
/// constrained", never a default value.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    // Identity and annotations.
    #[serde(default, rename = "$id")]
    pub schema_id: Option<String>,
    #[serde(default, rename = "$anchor")]
    pub anchor: Option<String>,
    #[serde(default, rename = "$comment")]
    pub comment: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: Option<bool>,
    #[serde(default)]
    pub read_only: Option<bool>,
    #[serde(default)]
    pub write_only: Option<bool>,
    #[serde(default)]
    pub nullable: Option<bool>,
    #[serde(default)]
    pub discriminator: Option<Value>,
    #[serde(default)]
    pub xml: Option<Value>,
    #[serde(default)]
    pub external_docs: Option<Value>,

    // Type and value constraints.
    #[serde(default, rename = "type", deserialize_with = "type_tags")]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, rename = "const")]
    pub const_value: Option<Value>,
    #[serde(default, rename = "default")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub example: Option<Value>,
    #[serde(default)]
    pub examples: Option<Vec<Value>>,

    // Numbers. `exclusiveMaximum`/`exclusiveMinimum` are booleans in older
    // documents and numbers in 2020-12, so they stay opaque.
    #[serde(default)]
    pub multiple_of: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub exclusive_maximum: Option<Value>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub exclusive_minimum: Option<Value>,

    // Strings.
    #[serde(default)]
    pub max_length: Option<u64>,
    #[serde(default)]
    pub min_length: Option<u64>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub content_media_type: Option<String>,
    #[serde(default)]
    pub content_encoding: Option<String>,
    #[serde(default)]
    pub content_schema: Option<Box<SchemaRef>>,

    // Arrays.
    #[serde(default)]
    pub items: Option<Box<SchemaRef>>,
    #[serde(default)]
    pub prefix_items: Vec<SchemaRef>,
    #[serde(default)]
    pub contains: Option<Box<SchemaRef>>,
    #[serde(default)]
    pub max_items: Option<u64>,
    #[serde(default)]
    pub min_items: Option<u64>,
    #[serde(default)]
    pub unique_items: Option<bool>,
    #[serde(default)]
    pub max_contains: Option<u64>,
    #[serde(default)]
    pub min_contains: Option<u64>,
    #[serde(default)]
    pub unevaluated_items: Option<Box<SchemaRef>>,

    // Objects.
    #[serde(default)]
    pub properties: IndexMap<String, SchemaRef>,
    #[serde(default)]
    pub pattern_properties: IndexMap<String, SchemaRef>,
    #[serde(default)]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default)]
    pub property_names: Option<Box<SchemaRef>>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub dependent_required: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub dependent_schemas: IndexMap<String, SchemaRef>,
    #[serde(default)]
    pub max_properties: Option<u64>,
    #[serde(default)]
    pub min_properties: Option<u64>,
    #[serde(default)]
    pub unevaluated_properties: Option<Box<SchemaRef>>,

    // Composition.
    #[serde(default)]
    pub one_of: Vec<SchemaRef>,
    #[serde(default)]
    pub any_of: Vec<SchemaRef>,
    #[serde(default)]
    pub all_of: Vec<SchemaRef>,
    #[serde(default)]
    pub not: Option<Box<SchemaRef>>,

    // Conditionals and local definitions.
    #[serde(default, rename = "if")]
    pub if_schema: Option<Box<SchemaRef>>,
    #[serde(default, rename = "then")]
    pub then_schema: Option<Box<SchemaRef>>,
    #[serde(default, rename = "else")]
    pub else_schema: Option<Box<SchemaRef>>,
    #[serde(default, rename = "$defs")]
    pub defs: IndexMap<String, SchemaRef>,

    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// The `additionalProperties` keyword: a blanket allow/deny or a schema
/// constraining extra properties.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaRef>),
}

/// Accept `type` as either a single tag or a list of tags.
fn type_tags<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => None,
        Some(OneOrMany::One(tag)) => Some(vec![tag]),
        Some(OneOrMany::Many(tags)) => Some(tags),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn type_accepts_one_or_many() {
        let one: SchemaNode = serde_json::from_value(json!({"type": "string"})).unwrap();
        assert_eq!(one.types, Some(vec!["string".to_string()]));

        let many: SchemaNode =
            serde_json::from_value(json!({"type": ["string", "null"]})).unwrap();
        assert_eq!(
            many.types,
            Some(vec!["string".to_string(), "null".to_string()])
        );
    }

    #[test]
    fn schema_ref_name_takes_last_segment() {
        let schema: SchemaRef =
            serde_json::from_value(json!({"$ref": "#/components/schemas/User"})).unwrap();
        assert_eq!(schema.ref_name(), Some("User"));

        let inline: SchemaRef = serde_json::from_value(json!({"type": "integer"})).unwrap();
        assert_eq!(inline.ref_name(), None);
    }

    #[test]
    fn effective_style_defaults_by_location() {
        let param: Parameter =
            serde_json::from_value(json!({"name": "page", "in": "query"})).unwrap();
        assert_eq!(param.effective_style(), "form");
        assert!(param.effective_explode());

        let param: Parameter =
            serde_json::from_value(json!({"name": "id", "in": "path", "required": true}))
                .unwrap();
        assert_eq!(param.effective_style(), "simple");
        assert!(!param.effective_explode());
    }
}
