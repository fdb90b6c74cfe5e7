//! Namespace of declared symbols.
//!
//! Every symbol referenced by an equation step must be declared here before
//! post-processing begins. The pipeline also allocates auxiliary symbols
//! through [`Namespace::fresh`]: memory-model clocks, frozen guard literals,
//! and assertion violation literals.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort of a declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sort {
    Bool,
    Int,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "bool"),
            Sort::Int => write!(f, "int"),
        }
    }
}

/// Per-symbol information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub sort: Sort,
    /// True for variables accessible from more than one thread.
    #[serde(default)]
    pub shared: bool,
}

/// Symbol table threaded through the whole pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Namespace {
    symbols: BTreeMap<String, SymbolEntry>,
    #[serde(default)]
    next_fresh: u64,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a symbol. Redeclaration overwrites the previous entry.
    pub fn declare(&mut self, name: impl Into<String>, sort: Sort) {
        self.symbols
            .insert(name.into(), SymbolEntry { sort, shared: false });
    }

    /// Declare a shared (cross-thread) symbol.
    pub fn declare_shared(&mut self, name: impl Into<String>, sort: Sort) {
        self.symbols
            .insert(name.into(), SymbolEntry { sort, shared: true });
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.symbols.get(name)
    }

    pub fn sort_of(&self, name: &str) -> Option<Sort> {
        self.symbols.get(name).map(|entry| entry.sort)
    }

    pub fn is_shared(&self, name: &str) -> bool {
        self.symbols.get(name).map(|e| e.shared).unwrap_or(false)
    }

    /// Allocate and declare a fresh symbol `prefix!N` not yet in the table.
    pub fn fresh(&mut self, prefix: &str, sort: Sort) -> String {
        loop {
            let candidate = format!("{prefix}!{}", self.next_fresh);
            self.next_fresh += 1;
            if !self.symbols.contains_key(&candidate) {
                self.declare(candidate.clone(), sort);
                return candidate;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SymbolEntry)> {
        self.symbols.iter()
    }
}
