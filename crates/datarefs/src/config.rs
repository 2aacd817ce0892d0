// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry configuration.
//!
//! - **Level 1 (Static)**: naming constants shared by every registry.
//! - **Level 2 (Dynamic)**: [`RegistryConfig`], defaults overridable from
//!   the environment, passed to [`RegistryBuilder`](crate::RegistryBuilder).
//!
//! # Environment
//!
//! | Variable                     | Meaning                                  |
//! |------------------------------|------------------------------------------|
//! | `DATAREFS_RESERVED_PREFIXES` | comma separated reserved prefixes        |
//! | `DATAREFS_STRICT_PREFIXES`   | `1`/`true` rejects reserved registrations |
//! | `DATAREFS_MAX_NAME_LEN`      | maximum name length in bytes             |

/// Hierarchy separator in dataref names (`"a/b/c"`).
pub const NAME_SEPARATOR: char = '/';

/// Top-level prefix conventionally kept for core-provided datarefs.
pub const DEFAULT_RESERVED_PREFIX: &str = "sim/";

/// Maximum dataref name length in bytes.
pub const DEFAULT_MAX_NAME_LEN: usize = 255;

const ENV_RESERVED_PREFIXES: &str = "DATAREFS_RESERVED_PREFIXES";
const ENV_STRICT_PREFIXES: &str = "DATAREFS_STRICT_PREFIXES";
const ENV_MAX_NAME_LEN: &str = "DATAREFS_MAX_NAME_LEN";

/// Runtime knobs of a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Prefixes third-party owners are expected to stay out of.
    pub reserved_prefixes: Vec<String>,
    /// Reject (instead of warn about) registrations under a reserved prefix.
    pub strict_prefixes: bool,
    /// Longest accepted name, in bytes.
    pub max_name_len: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reserved_prefixes: std::env::var(ENV_RESERVED_PREFIXES)
                .ok()
                .map(|raw| parse_prefix_list(&raw))
                .unwrap_or_else(|| vec![DEFAULT_RESERVED_PREFIX.to_string()]),
            strict_prefixes: std::env::var(ENV_STRICT_PREFIXES)
                .ok()
                .map(|raw| parse_flag(&raw))
                .unwrap_or(false),
            max_name_len: std::env::var(ENV_MAX_NAME_LEN)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .filter(|len| *len > 0)
                .unwrap_or(DEFAULT_MAX_NAME_LEN),
        }
    }
}

impl RegistryConfig {
    /// Defaults without consulting the environment.
    pub fn builtin() -> Self {
        Self {
            reserved_prefixes: vec![DEFAULT_RESERVED_PREFIX.to_string()],
            strict_prefixes: false,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }

    /// Replace the reserved prefix list.
    pub fn with_reserved_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Turn reserved prefix use into a hard error.
    pub fn with_strict_prefixes(mut self, strict: bool) -> Self {
        self.strict_prefixes = strict;
        self
    }

    /// Set the maximum name length.
    pub fn with_max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    /// Reserved prefix matching `name`, if any.
    pub fn reserved_prefix_of(&self, name: &str) -> Option<&str> {
        self.reserved_prefixes
            .iter()
            .map(String::as_str)
            .find(|prefix| !prefix.is_empty() && name.starts_with(prefix))
    }

    /// Structural name check: non-empty, bounded, no empty path segment.
    pub fn is_valid_name(&self, name: &str) -> bool {
        !name.is_empty()
            && name.len() <= self.max_name_len
            && name.split(NAME_SEPARATOR).all(|segment| !segment.is_empty())
    }
}

fn parse_prefix_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
