#![deny(warnings)]

use crate::grammar::{GrammarIndex, ProductionId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::trace;

/// Handle to a `DerivationNode` living in a `DerivationCache`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// States that `production.variable` derives the node's text. For texts longer
/// than one symbol, the first `split` symbols are derived by the first symbol
/// of the production body and the rest by the second. Leaves use split 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Derivation {
    pub production: ProductionId,
    pub split: usize,
}

/// All the ways a substring can be derived.
///
/// `left` and `right` point to the two nodes that were combined while building
/// the chart to produce this one: the text without its last symbol, and the
/// text without its first symbol. They're chart bookkeeping, not a parse tree.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivationNode {
    text: String,
    derivations: Vec<Derivation>,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

impl DerivationNode {
    /// Node for a single symbol of the input
    pub fn leaf(text: &str, derivations: impl IntoIterator<Item = Derivation>) -> Self {
        DerivationNode {
            text: text.to_string(),
            derivations: dedup(derivations),
            left: None,
            right: None,
        }
    }

    /// Node built by combining two adjacent chart nodes
    pub fn combined(
        text: &str,
        derivations: impl IntoIterator<Item = Derivation>,
        left: NodeId,
        right: NodeId,
    ) -> Self {
        DerivationNode {
            text: text.to_string(),
            derivations: dedup(derivations),
            left: Some(left),
            right: Some(right),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn derivations(&self) -> &[Derivation] {
        &self.derivations
    }

    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    /// True if no variable can derive this text
    pub fn is_underivable(&self) -> bool {
        self.derivations.is_empty()
    }

    /// Distinct variables that derive this text
    pub fn variables<'g>(&self, grammar: &'g GrammarIndex) -> BTreeSet<&'g str> {
        self.derivations
            .iter()
            .map(|d| grammar.production(d.production).variable.as_str())
            .collect()
    }

    pub fn display<'a>(&'a self, grammar: &'a GrammarIndex) -> NodeDisplay<'a> {
        NodeDisplay {
            node: self,
            grammar,
        }
    }
}

fn dedup(derivations: impl IntoIterator<Item = Derivation>) -> Vec<Derivation> {
    derivations
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Renders derivations one per line as `S->A X (3)`.
pub struct NodeDisplay<'a> {
    node: &'a DerivationNode,
    grammar: &'a GrammarIndex,
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (idx, derivation) in self.node.derivations.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            let production = self.grammar.production(derivation.production);
            write!(f, "{} ({})", production, derivation.split)?;
        }
        Ok(())
    }
}

///////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Which ancestor link to follow when walking a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Arena of `DerivationNode`s indexed by the text they derive.
///
/// Nodes are immutable once published and are never evicted: the cache grows
/// for as long as its owner keeps it. Use `clear` to drop everything.
///
/// Derivations refer to productions by id, so a cache is tied to the grammar
/// whose fingerprint it was created for.
#[derive(Debug, Default)]
pub struct DerivationCache {
    nodes: Vec<DerivationNode>,
    by_text: HashMap<String, NodeId>,
    stats: CacheStats,
    grammar: Option<u64>,
}

impl DerivationCache {
    /// A cache not yet tied to any grammar
    pub fn new() -> Self {
        DerivationCache::default()
    }

    pub fn for_grammar(grammar: &GrammarIndex) -> Self {
        DerivationCache {
            grammar: Some(grammar.fingerprint()),
            ..DerivationCache::default()
        }
    }

    /// Fingerprint of the grammar this cache belongs to
    pub fn grammar(&self) -> Option<u64> {
        self.grammar
    }

    /// Check the cache can be used with `grammar`, tying it if still unbound.
    /// Unbound caches are only accepted while empty.
    pub fn bind(&mut self, grammar: &GrammarIndex) -> bool {
        let fingerprint = grammar.fingerprint();
        match self.grammar {
            Some(bound) => bound == fingerprint,
            None if self.is_empty() => {
                self.grammar = Some(fingerprint);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, text: &str) -> Option<NodeId> {
        self.by_text.get(text).copied()
    }

    pub fn lookup(&self, text: &str) -> Option<&DerivationNode> {
        self.get(text).map(|id| self.node(id))
    }

    pub fn node(&self, id: NodeId) -> &DerivationNode {
        &self.nodes[id.0]
    }

    /// Return the node for `text`, running `compute` only if `text` was never
    /// seen. `compute` gets read access to every node published so far.
    pub fn get_or_compute<F>(&mut self, text: &str, compute: F) -> NodeId
    where
        F: FnOnce(&DerivationCache) -> DerivationNode,
    {
        if let Some(id) = self.get(text) {
            self.stats.hits += 1;
            trace!(text, "derivation cache hit");
            return id;
        }
        let node = compute(self);
        assert_eq!(node.text, text, "BUG: computed node doesn't match its key");
        let id = NodeId(self.nodes.len());
        // Ancestors must already be published, this keeps the arena acyclic
        assert!(
            [node.left, node.right].iter().flatten().all(|a| a.0 < id.0),
            "BUG: node references unpublished ancestors"
        );
        self.stats.misses += 1;
        trace!(text, derivations = node.derivations.len(), "derivation cache miss");
        self.by_text.insert(node.text.clone(), id);
        self.nodes.push(node);
        id
    }

    /// Nodes reached from `start` following one kind of ancestor link,
    /// `start` first, down to a single symbol node.
    pub fn chain(&self, start: NodeId, side: Side) -> Vec<NodeId> {
        let mut chain = vec![start];
        let mut current = self.node(start);
        loop {
            let next = match side {
                Side::Left => current.left,
                Side::Right => current.right,
            };
            match next {
                Some(id) => {
                    chain.push(id);
                    current = self.node(id);
                }
                None => return chain,
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forget every node. Previously handed out `NodeId`s become invalid.
    /// The cache stays tied to its grammar.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.by_text.clear();
        self.stats = CacheStats::default();
    }
}

///////////////////////////////////////////////////////////////////////////////
