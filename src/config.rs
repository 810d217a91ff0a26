// Copyright 2025 Oxide Computer Company

use std::collections::BTreeSet;

/// Switches that suppress individual fields during comparison.
///
/// An excluded field always yields "no diff" regardless of its actual
/// content. The configuration is parsed elsewhere; the engine only reads it.
#[derive(Clone, Debug, Default)]
pub struct DiffConfig {
    pub exclude_title: bool,
    pub exclude_description: bool,
    pub exclude_examples: bool,
    /// Extension keys (like `x-internal`) to ignore wherever extensions are
    /// compared.
    pub exclude_extensions: BTreeSet<String>,
}
