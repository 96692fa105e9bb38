#![deny(warnings)]

use crate::cache::{Derivation, DerivationCache, DerivationNode, NodeId, Side};
use crate::error::GrammarError;
use crate::grammar::{Body, GrammarIndex};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::{fmt, iter};
use tracing::debug;

pub const DEFAULT_START: &str = "S";

/// Rows built while solving a word. `rows[k]` holds, in input order, the nodes
/// for every substring of length `k + 1`. The last row has a single node
/// spanning the whole word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chart {
    rows: Vec<Vec<NodeId>>,
}

impl Chart {
    pub fn rows(&self) -> &[Vec<NodeId>] {
        &self.rows
    }

    /// Node covering the whole word. None only for the empty word.
    pub fn top(&self) -> Option<NodeId> {
        self.rows.last().and_then(|row| row.first()).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Decides membership of words in the language of a CNF grammar.
///
/// The chart for a word is built bottom-up one row at a time. Every node ever
/// built is kept in the solver's `DerivationCache` keyed by its text, so any
/// substring already seen (in this or previous words) is never recomputed.
pub struct CykSolver {
    grammar: GrammarIndex,
    start: String,
    cache: DerivationCache,
}

impl CykSolver {
    /// Solver accepting words derived from `S`
    pub fn new(grammar: GrammarIndex) -> Self {
        CykSolver {
            start: DEFAULT_START.to_string(),
            cache: DerivationCache::for_grammar(&grammar),
            grammar,
        }
    }

    pub fn with_start(grammar: GrammarIndex, start: &str) -> Result<Self, GrammarError> {
        if !grammar.has_variable(start) {
            return Err(GrammarError::MissingStart(start.to_string()));
        }
        Ok(CykSolver {
            start: start.to_string(),
            ..CykSolver::new(grammar)
        })
    }

    /// Reuse a cache filled by an earlier solver over the same grammar.
    pub fn with_cache(mut self, mut cache: DerivationCache) -> Result<Self, GrammarError> {
        if !cache.bind(&self.grammar) {
            return Err(GrammarError::ForeignCache);
        }
        self.cache = cache;
        Ok(self)
    }

    pub fn into_cache(self) -> DerivationCache {
        self.cache
    }

    pub fn grammar(&self) -> &GrammarIndex {
        &self.grammar
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn cache(&self) -> &DerivationCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn node(&self, id: NodeId) -> &DerivationNode {
        self.cache.node(id)
    }

    /// Check if `word` belongs to the language of the grammar.
    pub fn solve(&mut self, word: &str) -> bool {
        let chart = self.chart(word);
        let accepted = self.accepts(&chart);
        debug!(word, accepted, cache_size = self.cache.len(), "solved word");
        accepted
    }

    /// The start symbol derives the node at the top of the chart
    pub fn accepts(&self, chart: &Chart) -> bool {
        chart.top().is_some_and(|top| {
            self.node(top)
                .derivations()
                .iter()
                .any(|d| self.grammar.production(d.production).variable == self.start)
        })
    }

    /// Variables deriving `text` if it was examined while solving some word.
    pub fn derivers(&self, text: &str) -> Option<BTreeSet<&str>> {
        self.cache
            .lookup(text)
            .map(|node| node.variables(&self.grammar))
    }

    /// Build every row of the chart for `word`, seeding with one node per
    /// symbol and merging adjacent nodes until a single one spans the word.
    pub fn chart(&mut self, word: &str) -> Chart {
        // byte offsets of each symbol, so spans can be sliced out of the word
        let bounds: Vec<usize> = word
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(iter::once(word.len()))
            .collect();
        let span = |start: usize, len: usize| &word[bounds[start]..bounds[start + len]];
        let (grammar, cache) = (&self.grammar, &mut self.cache);

        let seed: Vec<NodeId> = (0..bounds.len() - 1)
            .map(|idx| Self::leaf(grammar, cache, span(idx, 1)))
            .collect();
        if seed.is_empty() {
            return Chart { rows: Vec::new() };
        }

        let mut rows = vec![seed];
        loop {
            let last = &rows[rows.len() - 1];
            if last.len() == 1 {
                break;
            }
            let len = rows.len() + 1;
            let next = last
                .windows(2)
                .enumerate()
                .map(|(idx, pair)| Self::combine(grammar, cache, pair[0], pair[1], span(idx, len)))
                .collect();
            rows.push(next);
        }

        if cfg!(feature = "debug") {
            for (idx, row) in rows.iter().enumerate() {
                eprintln!("=== Row {} ===", idx);
                for &id in row {
                    let node = cache.node(id);
                    let derivations = node.display(grammar).to_string().replace('\n', ", ");
                    eprintln!("{:?} -- {}", node.text(), derivations);
                }
            }
        }
        Chart { rows }
    }

    fn leaf(grammar: &GrammarIndex, cache: &mut DerivationCache, text: &str) -> NodeId {
        cache.get_or_compute(text, |_| {
            let derivations = grammar
                .lookup_terminal(text)
                .iter()
                .map(|&production| Derivation { production, split: 0 });
            DerivationNode::leaf(text, derivations)
        })
    }

    // Instead of checking every split point against a table, walk the left
    // ancestors of `left` (prefixes of `text`, longest first) and the right
    // ancestors of `right` (suffixes, longest first). Pairing the i-th prefix
    // with the i-th shortest suffix yields complementary fragments of `text`.
    fn combine(
        grammar: &GrammarIndex,
        cache: &mut DerivationCache,
        left: NodeId,
        right: NodeId,
        text: &str,
    ) -> NodeId {
        cache.get_or_compute(text, |cache| {
            let prefixes = cache.chain(left, Side::Left);
            let suffixes = cache.chain(right, Side::Right);
            assert_eq!(
                prefixes.len(),
                suffixes.len(),
                "BUG: DerivationNode chains not balanced for {:?}",
                text
            );
            let mut derivations = Vec::new();
            for (&prefix, &suffix) in prefixes.iter().zip(suffixes.iter().rev()) {
                let (prefix, suffix) = (cache.node(prefix), cache.node(suffix));
                debug_assert_eq!(format!("{}{}", prefix.text(), suffix.text()), text);
                if prefix.is_underivable() || suffix.is_underivable() {
                    continue;
                }
                let split = prefix.text().chars().count();
                for head in prefix.variables(grammar) {
                    for tail in suffix.variables(grammar) {
                        derivations.extend(
                            grammar
                                .lookup_pair(head, tail)
                                .iter()
                                .map(|&production| Derivation { production, split }),
                        );
                    }
                }
            }
            DerivationNode::combined(text, derivations, left, right)
        })
    }

    /// Number of distinct parse trees rooted at the start symbol for `word`.
    /// Saturates at `u64::MAX` for very ambiguous grammars.
    pub fn count_trees(&mut self, word: &str) -> u64 {
        if self.chart(word).is_empty() {
            return 0;
        }
        let mut memo = HashMap::new();
        self.trees_of(&self.start, word, &mut memo)
    }

    /// More than one parse tree derives `word` from the start symbol
    pub fn is_ambiguous(&mut self, word: &str) -> bool {
        self.count_trees(word) > 1
    }

    // Every substring of a charted word is cached, so sub-spans are looked up
    fn trees_of<'a>(
        &'a self,
        variable: &'a str,
        text: &'a str,
        memo: &mut HashMap<(&'a str, &'a str), u64>,
    ) -> u64 {
        if let Some(&trees) = memo.get(&(variable, text)) {
            return trees;
        }
        let Some(node) = self.cache.lookup(text) else {
            return 0;
        };
        let mut total: u64 = 0;
        for derivation in node.derivations() {
            let production = self.grammar.production(derivation.production);
            if production.variable != variable {
                continue;
            }
            let trees = match &production.body {
                Body::Terminal(_) => 1,
                Body::Pair(head, tail) => {
                    let (prefix, suffix) = split_chars(text, derivation.split);
                    self.trees_of(head, prefix, memo)
                        .saturating_mul(self.trees_of(tail, suffix, memo))
                }
            };
            total = total.saturating_add(trees);
        }
        memo.insert((variable, text), total);
        total
    }
}

fn split_chars(text: &str, at: usize) -> (&str, &str) {
    let offset = text.char_indices().nth(at).map_or(text.len(), |(idx, _)| idx);
    text.split_at(offset)
}

impl fmt::Display for CykSolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Read {} rules. Current cache size: {} entries.",
            self.grammar.len(),
            self.cache.len()
        )
    }
}

///////////////////////////////////////////////////////////////////////////////

/// A `CykSolver` that can be shared across threads.
///
/// The lock is held while a whole chart is built, so each substring is still
/// computed at most once even with concurrent callers.
#[derive(Clone)]
pub struct SharedSolver(Arc<Mutex<CykSolver>>);

impl SharedSolver {
    pub fn new(solver: CykSolver) -> Self {
        SharedSolver(Arc::new(Mutex::new(solver)))
    }

    pub fn solve(&self, word: &str) -> bool {
        self.with(|solver| solver.solve(word))
    }

    /// Run `f` with exclusive access to the inner solver
    pub fn with<R>(&self, f: impl FnOnce(&mut CykSolver) -> R) -> R {
        // Nodes are published whole, a panicked holder leaves the cache usable
        let mut solver = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut solver)
    }
}

impl From<CykSolver> for SharedSolver {
    fn from(solver: CykSolver) -> Self {
        SharedSolver::new(solver)
    }
}

impl fmt::Display for SharedSolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.with(|solver| write!(f, "{}", solver))
    }
}
