//! Vocabulary - a set of rules keyed by (kind, name).

use std::collections::BTreeMap;

use super::rule::{Rule, SymbolKind};

/// The complete set of rules available to a parser for one parse.
///
/// Duplicate insertion by `(kind, name)` overwrites, so callers can shadow
/// a stock rule before publishing the vocabulary behind `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    rules: BTreeMap<SymbolKind, BTreeMap<String, Rule>>,
}

impl Vocabulary {
    /// An empty vocabulary; usually a starting point for `add`.
    pub fn new() -> Self {
        Vocabulary {
            rules: BTreeMap::new(),
        }
    }

    /// Inserts a rule, replacing any previous rule of the same kind and name.
    pub fn add(&mut self, rule: Rule) {
        self.rules
            .entry(rule.kind())
            .or_default()
            .insert(rule.name().to_string(), rule);
    }

    /// All rules of one kind, sorted by name in reverse lexicographic order
    /// so that prefix matching tries longer symbols first (`>=` before `>`,
    /// `**` before `*`).
    pub fn get(&self, kind: SymbolKind) -> Vec<(&str, &Rule)> {
        self.rules
            .get(&kind)
            .into_iter()
            .flat_map(|by_name| by_name.iter().rev())
            .map(|(name, rule)| (name.as_str(), rule))
            .collect()
    }

    /// Point lookup used at evaluation time; borrowed key, no allocation.
    /// A miss is not an error here; the evaluator turns it into
    /// `UndefinedSymbol`.
    pub fn lookup(&self, kind: SymbolKind, name: &str) -> Option<&Rule> {
        self.rules.get(&kind)?.get(name)
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.values().all(BTreeMap::is_empty)
    }
}
