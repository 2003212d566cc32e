// src/core/registry.rs

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::models::BagSpec;

lazy_static! {
    // A prefix has to be matchable by the prefix half of a well-formed
    // entry token, so it can contain neither the separator nor whitespace.
    static ref PREFIX_RE: Regex = Regex::new(r"^[^:\s]+$").unwrap();
}

/// Errors raised while building or querying the bag registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The prefix is already taken by another bag.
    #[error("command bag with prefix '{prefix}' is already registered")]
    DuplicatePrefix {
        /// The conflicting prefix.
        prefix: String,
    },
    /// The prefix could never appear in a well-formed entry token.
    #[error("'{prefix}' is not a usable prefix; prefixes must be non-empty and free of ':' and whitespace")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
    },
    /// No bag is registered under the prefix.
    #[error("command bag with prefix '{prefix}' was not found; either the prefix is wrong or the bag was never registered")]
    UnknownPrefix {
        /// The prefix that missed.
        prefix: String,
    },
}

type RegistryResult<T> = Result<T, RegistryError>;

/// The prefix → command-bag lookup table.
///
/// Populated during single-threaded startup configuration and append-only
/// for the process lifetime; once shared (typically behind an `Arc`) it is
/// only ever read, so concurrent lookups need no synchronization.
#[derive(Debug, Default)]
pub struct BagRegistry {
    bags: HashMap<String, BagSpec>,
}

impl BagRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bag under `prefix`. Duplicate prefixes and prefixes that
    /// could never match an entry token are rejected; the existing
    /// registration is left untouched in both cases.
    pub fn register(&mut self, prefix: impl Into<String>, spec: BagSpec) -> RegistryResult<()> {
        let prefix = prefix.into();
        if !PREFIX_RE.is_match(&prefix) {
            return Err(RegistryError::InvalidPrefix { prefix });
        }
        if self.bags.contains_key(&prefix) {
            return Err(RegistryError::DuplicatePrefix { prefix });
        }
        log::debug!(
            "Registered command bag '{}' under prefix '{}'.",
            spec.type_name(),
            prefix
        );
        self.bags.insert(prefix, spec);
        Ok(())
    }

    /// Looks up the bag registered under `prefix`.
    pub fn lookup(&self, prefix: &str) -> RegistryResult<&BagSpec> {
        self.bags
            .get(prefix)
            .ok_or_else(|| RegistryError::UnknownPrefix {
                prefix: prefix.to_string(),
            })
    }

    /// Number of registered bags.
    pub fn len(&self) -> usize {
        self.bags.len()
    }

    /// True when nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.bags.is_empty()
    }
}
