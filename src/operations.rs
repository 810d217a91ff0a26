// Copyright 2025 Oxide Computer Company

//! Operation-level comparison: leaf fields, parameters, request bodies,
//! responses, and media-type content maps.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::{
    error::DiffError,
    mediatype::{MediaTypeName, is_contained},
    model::{Content, Operation, RequestBody, Response},
    parameters::ParametersDiff,
    schema::SchemaDiff,
    state::{TraversalContext, TraversalState},
    value::{ExtensionsDiff, ValueDiff, compare_extensions, compare_values, leaf},
};

/// Delta between two operations sharing a path template and method.
#[derive(Clone, Debug, Default)]
pub struct OperationDiff {
    pub operation_id: Option<ValueDiff>,
    pub summary: Option<ValueDiff>,
    pub description: Option<ValueDiff>,
    pub deprecated: Option<ValueDiff>,
    pub extensions: Option<ExtensionsDiff>,
    pub parameters: Option<ParametersDiff>,
    pub request_body: Option<RequestBodyDiff>,
    pub responses: Option<ResponsesDiff>,
}

impl OperationDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            operation_id,
            summary,
            description,
            deprecated,
            extensions,
            parameters,
            request_body,
            responses,
        } = self;
        operation_id.is_none()
            && summary.is_none()
            && description.is_none()
            && deprecated.is_none()
            && extensions.is_none()
            && parameters.is_none()
            && request_body.is_none()
            && responses.is_none()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RequestBodyDiff {
    /// The body only exists in the new document.
    pub added: bool,
    /// The body only exists in the old document.
    pub deleted: bool,
    pub description: Option<ValueDiff>,
    pub required: Option<ValueDiff>,
    pub extensions: Option<ExtensionsDiff>,
    pub content: Option<ContentDiff>,
}

impl RequestBodyDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            added,
            deleted,
            description,
            required,
            extensions,
            content,
        } = self;
        !added
            && !deleted
            && description.is_none()
            && required.is_none()
            && extensions.is_none()
            && content.is_none()
    }
}

/// Delta between two response maps, keyed by status code.
#[derive(Clone, Debug, Default)]
pub struct ResponsesDiff {
    /// Status codes present only in the new document, sorted.
    pub added: Vec<String>,
    /// Status codes present only in the old document, sorted.
    pub deleted: Vec<String>,
    pub modified: BTreeMap<String, ResponseDiff>,
}

impl ResponsesDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            added,
            deleted,
            modified,
        } = self;
        added.is_empty() && deleted.is_empty() && modified.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResponseDiff {
    pub description: Option<ValueDiff>,
    pub extensions: Option<ExtensionsDiff>,
    pub content: Option<ContentDiff>,
}

impl ResponseDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            description,
            extensions,
            content,
        } = self;
        description.is_none() && extensions.is_none() && content.is_none()
    }
}

/// Delta between two media-type content maps.
///
/// Media types pair by exact name first; leftovers pair when one name is
/// contained in the other (in either direction), so a body moving from
/// `application/json` to `application/problem+json` compares rather than
/// reading as a remove plus an add.
#[derive(Clone, Debug, Default)]
pub struct ContentDiff {
    /// Media types present only in the new document, sorted.
    pub added: Vec<String>,
    /// Media types present only in the old document, sorted.
    pub deleted: Vec<String>,
    pub modified: BTreeMap<String, MediaTypeDiff>,
}

impl ContentDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            added,
            deleted,
            modified,
        } = self;
        added.is_empty() && deleted.is_empty() && modified.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MediaTypeDiff {
    pub schema: Option<SchemaDiff>,
    pub example: Option<ValueDiff>,
    pub examples: Option<ValueDiff>,
    pub extensions: Option<ExtensionsDiff>,
}

impl MediaTypeDiff {
    pub fn is_empty(&self) -> bool {
        let Self {
            schema,
            example,
            examples,
            extensions,
        } = self;
        schema.is_none() && example.is_none() && examples.is_none() && extensions.is_none()
    }
}

impl<'a> TraversalState<'a> {
    /// Compare two operations. Parameters and the request body compare in
    /// the request context, responses in the response context.
    pub fn compare_operations(
        &mut self,
        old: &Operation,
        new: &Operation,
        path_renames: &BTreeMap<String, String>,
    ) -> Result<Option<OperationDiff>, DiffError> {
        let config = self.config;

        let mut diff = OperationDiff {
            operation_id: leaf(old.operation_id.as_ref(), new.operation_id.as_ref()),
            summary: leaf(old.summary.as_ref(), new.summary.as_ref()),
            description: if config.exclude_description {
                None
            } else {
                leaf(old.description.as_ref(), new.description.as_ref())
            },
            deprecated: leaf(Some(&old.deprecated), Some(&new.deprecated)),
            extensions: compare_extensions(&old.extensions, &new.extensions, config),
            ..Default::default()
        };

        self.set_context(TraversalContext::Request);
        diff.parameters =
            self.compare_parameters(&old.parameters, &new.parameters, path_renames)?;
        diff.request_body =
            self.compare_request_body(old.request_body.as_ref(), new.request_body.as_ref())?;

        self.set_context(TraversalContext::Response);
        diff.responses = self.compare_responses(&old.responses, &new.responses)?;

        Ok(if diff.is_empty() { None } else { Some(diff) })
    }

    fn compare_request_body(
        &mut self,
        old: Option<&RequestBody>,
        new: Option<&RequestBody>,
    ) -> Result<Option<RequestBodyDiff>, DiffError> {
        let config = self.config;
        match (old, new) {
            (None, None) => Ok(None),
            (Some(_), None) => Ok(Some(RequestBodyDiff {
                deleted: true,
                ..Default::default()
            })),
            (None, Some(_)) => Ok(Some(RequestBodyDiff {
                added: true,
                ..Default::default()
            })),
            (Some(old), Some(new)) => {
                let mut diff = RequestBodyDiff {
                    description: if config.exclude_description {
                        None
                    } else {
                        leaf(old.description.as_ref(), new.description.as_ref())
                    },
                    required: leaf(Some(&old.required), Some(&new.required)),
                    extensions: compare_extensions(&old.extensions, &new.extensions, config),
                    ..Default::default()
                };
                diff.content = self.compare_content(&old.content, &new.content)?;
                Ok(if diff.is_empty() { None } else { Some(diff) })
            }
        }
    }

    fn compare_responses(
        &mut self,
        old: &IndexMap<String, Response>,
        new: &IndexMap<String, Response>,
    ) -> Result<Option<ResponsesDiff>, DiffError> {
        let mut diff = ResponsesDiff::default();

        for (status, old_response) in old {
            match new.get(status) {
                None => diff.deleted.push(status.clone()),
                Some(new_response) => {
                    if let Some(changed) = self.compare_response(old_response, new_response)? {
                        diff.modified.insert(status.clone(), changed);
                    }
                }
            }
        }
        for status in new.keys() {
            if !old.contains_key(status) {
                diff.added.push(status.clone());
            }
        }
        diff.added.sort();
        diff.deleted.sort();

        Ok(if diff.is_empty() { None } else { Some(diff) })
    }

    fn compare_response(
        &mut self,
        old: &Response,
        new: &Response,
    ) -> Result<Option<ResponseDiff>, DiffError> {
        let config = self.config;
        let mut diff = ResponseDiff {
            description: if config.exclude_description {
                None
            } else {
                leaf(old.description.as_ref(), new.description.as_ref())
            },
            extensions: compare_extensions(&old.extensions, &new.extensions, config),
            ..Default::default()
        };
        diff.content = self.compare_content(&old.content, &new.content)?;
        Ok(if diff.is_empty() { None } else { Some(diff) })
    }

    /// Compare two content maps keyed by media type.
    ///
    /// Every key is parsed before any pairing happens, so a malformed media
    /// type anywhere aborts the comparison.
    pub(crate) fn compare_content(
        &mut self,
        old: &IndexMap<String, Content>,
        new: &IndexMap<String, Content>,
    ) -> Result<Option<ContentDiff>, DiffError> {
        let old_parsed = parse_content_keys(old)?;
        let new_parsed = parse_content_keys(new)?;
        let mut old_used = vec![false; old_parsed.len()];
        let mut new_used = vec![false; new_parsed.len()];
        let mut diff = ContentDiff::default();

        // Exact name matches.
        for (old_index, (old_key, _, old_content)) in old_parsed.iter().enumerate() {
            if let Some(new_index) = new_parsed
                .iter()
                .position(|(new_key, _, _)| new_key == old_key)
            {
                old_used[old_index] = true;
                new_used[new_index] = true;
                if let Some(changed) =
                    self.compare_media_types(old_content, new_parsed[new_index].2)?
                {
                    diff.modified.insert((*old_key).clone(), changed);
                }
            }
        }

        // Containment matches over the remainder, in sorted key order.
        for (old_index, (_, old_name, old_content)) in old_parsed.iter().enumerate() {
            if old_used[old_index] {
                continue;
            }
            let candidate = new_parsed.iter().enumerate().find(|(new_index, (_, new_name, _))| {
                !new_used[*new_index]
                    && (is_contained(old_name, new_name) || is_contained(new_name, old_name))
            });
            if let Some((new_index, (new_key, _, new_content))) = candidate {
                old_used[old_index] = true;
                new_used[new_index] = true;
                if let Some(changed) = self.compare_media_types(old_content, new_content)? {
                    diff.modified.insert((*new_key).clone(), changed);
                }
            }
        }

        for (old_index, (old_key, _, _)) in old_parsed.iter().enumerate() {
            if !old_used[old_index] {
                diff.deleted.push((*old_key).clone());
            }
        }
        for (new_index, (new_key, _, _)) in new_parsed.iter().enumerate() {
            if !new_used[new_index] {
                diff.added.push((*new_key).clone());
            }
        }
        diff.added.sort();
        diff.deleted.sort();

        Ok(if diff.is_empty() { None } else { Some(diff) })
    }

    fn compare_media_types(
        &mut self,
        old: &Content,
        new: &Content,
    ) -> Result<Option<MediaTypeDiff>, DiffError> {
        let config = self.config;
        let mut diff = MediaTypeDiff {
            example: if config.exclude_examples {
                None
            } else {
                compare_values(old.example.as_ref(), new.example.as_ref())
            },
            examples: if config.exclude_examples {
                None
            } else {
                compare_values(old.examples.as_ref(), new.examples.as_ref())
            },
            extensions: compare_extensions(&old.extensions, &new.extensions, config),
            ..Default::default()
        };
        diff.schema = self.compare_schemas(old.schema.as_ref(), new.schema.as_ref())?;
        Ok(if diff.is_empty() { None } else { Some(diff) })
    }
}

/// Parse every key of a content map, sorted by key for deterministic
/// pairing.
fn parse_content_keys(
    content: &IndexMap<String, Content>,
) -> Result<Vec<(&String, MediaTypeName, &Content)>, DiffError> {
    let mut entries = Vec::with_capacity(content.len());
    for (key, value) in content {
        entries.push((key, MediaTypeName::parse(key)?, value));
    }
    entries.sort_by(|(a, _, _), (b, _, _)| a.cmp(b));
    Ok(entries)
}
