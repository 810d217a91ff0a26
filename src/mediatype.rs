// Copyright 2025 Oxide Computer Company

//! Media-type name parsing and containment.
//!
//! A media type like `application/problem+json; charset=utf-8` is split into
//! a top-level type, a base subtype, an ordered chain of `+` suffixes, and a
//! parameter map. Containment is the relation where every message satisfying
//! the more specific (inner) media type also satisfies the more general
//! (outer) one.

use std::collections::BTreeMap;

use crate::error::DiffError;

/// A parsed media-type name.
///
/// The top-level type and base subtype are never empty; an empty suffix
/// segment (including a trailing bare `+`) is a parse error, never a
/// zero-length chain entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaTypeName {
    pub top: String,
    pub subtype: String,
    pub suffixes: Vec<String>,
    pub parameters: BTreeMap<String, String>,
}

impl MediaTypeName {
    /// Parse a media-type string.
    ///
    /// Type, subtype, and suffix comparisons are case-insensitive, so all
    /// segments are lowercased here.
    pub fn parse(text: &str) -> Result<MediaTypeName, DiffError> {
        let malformed = |detail: &str| DiffError::MalformedMediaType {
            text: text.to_string(),
            detail: detail.to_string(),
        };

        let mut pieces = text.split(';');
        let essence = pieces.next().unwrap_or_default().trim();

        let (top, full_subtype) = essence
            .split_once('/')
            .ok_or_else(|| malformed("missing '/' between type and subtype"))?;
        if top.is_empty() {
            return Err(malformed("empty type"));
        }
        if full_subtype.contains('/') {
            return Err(malformed("more than one '/'"));
        }

        let mut segments = full_subtype.split('+');
        let subtype = segments.next().unwrap_or_default();
        if subtype.is_empty() {
            return Err(malformed("empty subtype"));
        }
        let mut suffixes = Vec::new();
        for segment in segments {
            if segment.is_empty() {
                return Err(malformed("empty suffix segment"));
            }
            suffixes.push(segment.to_ascii_lowercase());
        }

        let mut parameters = BTreeMap::new();
        for piece in pieces {
            let (key, value) = piece
                .split_once('=')
                .ok_or_else(|| malformed("parameter without '='"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(malformed("parameter with empty name"));
            }
            parameters.insert(key.to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(MediaTypeName {
            top: top.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            suffixes,
            parameters,
        })
    }
}

/// Decide whether `inner` is contained in `outer`.
///
/// The rules, in order:
///
/// 1. Top-level types must match exactly.
/// 2. Refinement: an outer type with no suffix chain is satisfied by an
///    inner type whose last suffix equals the outer base subtype (a declared
///    `application/json` accepts `application/problem+json`).
/// 3. Otherwise base subtypes must match and the outer suffix chain must be
///    a prefix of the inner one: the inner type may append refining
///    suffixes, but may not drop or reorder the outer's.
pub fn is_contained(outer: &MediaTypeName, inner: &MediaTypeName) -> bool {
    if outer.top != inner.top {
        return false;
    }

    if outer.suffixes.is_empty() && inner.suffixes.last() == Some(&outer.subtype) {
        return true;
    }

    outer.subtype == inner.subtype
        && inner.suffixes.len() >= outer.suffixes.len()
        && inner.suffixes[..outer.suffixes.len()] == outer.suffixes[..]
}
