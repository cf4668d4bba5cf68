//! Two-way dictionary between UF calls and flat symbolic-constant names.
//!
//! Backends that cannot parse `rowptr(i + 1)` see a plain symbol instead;
//! the map remembers the call behind each symbol so the result can be
//! rewritten back afterwards. Calls are identified by their printed form,
//! so two textually identical calls share one entry.

use crate::algebra::term::UfCall;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bidirectional UF-call / symbol map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UfcMap {
    by_call: BTreeMap<String, String>,
    by_symbol: BTreeMap<String, UfCall>,
}

impl UfcMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct calls registered.
    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    /// True when no call has been registered.
    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    /// Register a call and return its symbol. Inserting a call whose
    /// printed form is already present returns the existing symbol, so
    /// repeated inserts are idempotent.
    pub fn insert(&mut self, call: &UfCall) -> String {
        let key = call.to_string();
        if let Some(sym) = self.by_call.get(&key) {
            return sym.clone();
        }
        let sym = encode_symbol(&key);
        self.by_call.insert(key, sym.clone());
        self.by_symbol.insert(sym.clone(), call.clone());
        sym
    }

    /// The symbol for a call, if it has been registered.
    pub fn symbol_for(&self, call: &UfCall) -> Option<&str> {
        self.by_call.get(&call.to_string()).map(String::as_str)
    }

    /// The call behind a symbol, if any.
    pub fn call_for(&self, symbol: &str) -> Option<&UfCall> {
        self.by_symbol.get(symbol)
    }

    /// Iterate over (symbol, call) pairs in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UfCall)> {
        self.by_symbol.iter().map(|(s, c)| (s.as_str(), c))
    }
}

/// Flatten a printed call into an identifier a plain-symbol backend will
/// accept: parentheses become `_`, `+` becomes `P`, `-` becomes `M`, and
/// spaces and commas are dropped.
fn encode_symbol(printed: &str) -> String {
    let mut out = String::with_capacity(printed.len());
    for ch in printed.chars() {
        match ch {
            '(' | ')' | '[' | ']' => out.push('_'),
            '+' => out.push('P'),
            '-' => out.push('M'),
            ' ' | ',' => {}
            other => out.push(other),
        }
    }
    out
}
