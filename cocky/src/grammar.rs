#![deny(warnings)]

use crate::error::GrammarError;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::str::FromStr;

/// Right-hand side of a CNF production.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Body {
    // A -> a
    Terminal(String),
    // A -> B C
    Pair(String, String),
}

impl Body {
    /// Split a textual body on whitespace. Only 1 or 2 symbols are accepted,
    /// the arity is returned otherwise.
    fn parse(text: &str) -> Result<Body, usize> {
        match text.split_whitespace().collect::<Vec<_>>().as_slice() {
            [terminal] => Ok(Body::Terminal(terminal.to_string())),
            [left, right] => Ok(Body::Pair(left.to_string(), right.to_string())),
            symbols => Err(symbols.len()),
        }
    }
}

// The canonical key used by the index: "a" or "B C"
impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Body::Terminal(terminal) => write!(f, "{}", terminal),
            Body::Pair(left, right) => write!(f, "{} {}", left, right),
        }
    }
}

/// A single `variable -> body` rule of the grammar.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Production {
    pub variable: String,
    pub body: Body,
}

impl Production {
    pub fn new(variable: &str, body: &str) -> Result<Self, GrammarError> {
        let body = Body::parse(body).map_err(|arity| GrammarError::UnsupportedArity {
            variable: variable.to_string(),
            body: body.trim().to_string(),
            arity,
        })?;
        Ok(Production {
            variable: variable.to_string(),
            body,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.body, Body::Terminal(_))
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}->{}", self.variable, self.body)
    }
}

/// Handle to a `Production` stored in a `GrammarIndex`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionId(usize);

impl ProductionId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Productions reverse-indexed by their body, so all variables producing
/// some body are found with a single hash lookup.
#[derive(Clone, Debug, Default)]
pub struct GrammarIndex {
    productions: Vec<Production>,
    known: HashSet<Production>,
    by_body: HashMap<String, Vec<ProductionId>>,
}

impl GrammarIndex {
    /// Index a flat list of productions. Repeated productions are kept once.
    pub fn new(productions: impl IntoIterator<Item = Production>) -> Self {
        let mut index = GrammarIndex::default();
        for production in productions {
            if !index.known.insert(production.clone()) {
                continue;
            }
            let id = ProductionId(index.productions.len());
            index
                .by_body
                .entry(production.body.to_string())
                .or_default()
                .push(id);
            index.productions.push(production);
        }
        index
    }

    /// Read productions from text, one `VARIABLE->BODY` per line.
    /// Blank lines are skipped, any other malformed line is an error.
    pub fn parse(text: &str) -> Result<Self, GrammarError> {
        let mut productions = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let malformed = || GrammarError::MalformedLine {
                line: idx + 1,
                text: line.to_string(),
            };
            match line.split("->").collect::<Vec<_>>().as_slice() {
                [variable, body] if !variable.trim().is_empty() => {
                    productions.push(Production::new(variable.trim(), body)?)
                }
                _ => return Err(malformed()),
            }
        }
        Ok(GrammarIndex::new(productions))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GrammarError> {
        let text = std::fs::read_to_string(path)?;
        GrammarIndex::parse(&text)
    }

    /// All productions whose body is `body`. Empty if there are none.
    pub fn lookup(&self, body: &Body) -> &[ProductionId] {
        self.lookup_key(&body.to_string())
    }

    pub fn lookup_terminal(&self, terminal: &str) -> &[ProductionId] {
        self.lookup_key(terminal)
    }

    pub fn lookup_pair(&self, left: &str, right: &str) -> &[ProductionId] {
        self.lookup_key(&format!("{} {}", left, right))
    }

    fn lookup_key(&self, key: &str) -> &[ProductionId] {
        self.by_body.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id.index()]
    }

    pub fn productions(&self) -> impl Iterator<Item = (ProductionId, &Production)> {
        self.productions
            .iter()
            .enumerate()
            .map(|(idx, production)| (ProductionId(idx), production))
    }

    /// Distinct rule heads
    pub fn variables(&self) -> BTreeSet<&str> {
        self.productions
            .iter()
            .map(|p| p.variable.as_str())
            .collect()
    }

    pub fn has_variable(&self, variable: &str) -> bool {
        self.productions.iter().any(|p| p.variable == variable)
    }

    /// Identifies this exact list of productions. Nodes cached under one
    /// grammar only make sense for grammars with the same fingerprint.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.productions.hash(&mut hasher);
        hasher.finish()
    }

    pub fn len(&self) -> usize {
        self.productions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }
}

impl FromStr for GrammarIndex {
    type Err = GrammarError;
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        GrammarIndex::parse(text)
    }
}

impl fmt::Display for GrammarIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for production in &self.productions {
            writeln!(f, "{}", production)?;
        }
        Ok(())
    }
}

/// Builds a GrammarIndex programmatically, remembering the first bad rule.
#[derive(Default)]
pub struct GrammarBuilder {
    productions: Vec<Production>,
    error: Option<GrammarError>,
}

impl GrammarBuilder {
    fn add_rule(&mut self, head: &str, body: &[&str]) {
        if self.error.is_some() {
            return;
        }
        let body = match body {
            [terminal] => Body::Terminal(terminal.to_string()),
            [left, right] => Body::Pair(left.to_string(), right.to_string()),
            _ => {
                self.error = Some(GrammarError::UnsupportedArity {
                    variable: head.to_string(),
                    body: body.join(" "),
                    arity: body.len(),
                });
                return;
            }
        };
        self.productions.push(Production {
            variable: head.to_string(),
            body,
        });
    }

    /// `head -> left right` or, with a single symbol, `head -> terminal`
    pub fn rule(mut self, head: &str, body: &[&str]) -> Self {
        self.add_rule(head, body);
        self
    }

    pub fn terminal(mut self, head: &str, terminal: &str) -> Self {
        self.add_rule(head, &[terminal]);
        self
    }

    // Non chaining version, handy to add rules in a loop.
    pub fn rule_try(&mut self, head: &str, body: &[&str]) {
        self.add_rule(head, body);
    }

    pub fn into_index(self) -> Result<GrammarIndex, GrammarError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(GrammarIndex::new(self.productions)),
        }
    }
}

///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{Body, GrammarBuilder, GrammarIndex, Production};
    use crate::error::GrammarError;

    const PALINDROMES: &str = include_str!("../grammars/palindromes.cnf");

    #[test]
    fn parse_bundled_grammar() {
        let index = GrammarIndex::parse(PALINDROMES).unwrap();
        assert_eq!(index.len(), 8);
        assert_eq!(
            index.variables().into_iter().collect::<Vec<_>>(),
            vec!["A", "B", "S", "X", "Y"]
        );
        assert!(index.has_variable("S"));
        assert!(!index.has_variable("a"));
    }

    #[test]
    fn lookup_by_body() {
        let index = GrammarIndex::parse(PALINDROMES).unwrap();
        let heads = |ids: &[_]| {
            ids.iter()
                .map(|&id| index.production(id).variable.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(heads(index.lookup_terminal("a")), vec!["A"]);
        assert_eq!(heads(index.lookup_pair("S", "A")), vec!["X"]);
        assert_eq!(heads(index.lookup(&Body::Pair("B".into(), "B".into()))), vec!["S"]);
        // Missing bodies aren't errors
        assert!(index.lookup_terminal("c").is_empty());
        assert!(index.lookup_pair("A", "B").is_empty());
    }

    #[test]
    fn shared_bodies() {
        let index = GrammarIndex::parse("S->A B\nT->A B\nA->a\nC->a\nB->b").unwrap();
        let mut heads = index
            .lookup_pair("A", "B")
            .iter()
            .map(|&id| index.production(id).variable.as_str())
            .collect::<Vec<_>>();
        heads.sort();
        assert_eq!(heads, vec!["S", "T"]);
        assert_eq!(index.lookup_terminal("a").len(), 2);
    }

    #[test]
    fn parse_tolerates_whitespace() {
        let index = GrammarIndex::parse("S -> A  B\r\n\nA->a\n  B->b  \n").unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.lookup_pair("A", "B").len(), 1);
        assert_eq!(index.to_string(), "S->A B\nA->a\nB->b\n");
    }

    #[test]
    fn parse_dedups_productions() {
        let index: GrammarIndex = "A->a\nA->a\nS->A A".parse().unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup_terminal("a").len(), 1);
    }

    #[test]
    fn grammar_fingerprint() {
        let index = GrammarIndex::parse(PALINDROMES).unwrap();
        assert_eq!(index.fingerprint(), GrammarIndex::parse(PALINDROMES).unwrap().fingerprint());
        let other = GrammarIndex::parse("S->B B\nB->b").unwrap();
        assert_ne!(index.fingerprint(), other.fingerprint());
        // Order matters, ids are positions in the list
        let swapped = GrammarIndex::parse("B->b\nS->B B").unwrap();
        assert_ne!(other.fingerprint(), swapped.fingerprint());
    }

    #[test]
    fn production_ids_are_positions() {
        let index = GrammarIndex::parse("S->A A\nA->a\nS->A A").unwrap();
        let ids: Vec<_> = index.productions().map(|(id, _)| id.index()).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(index.production(index.lookup_terminal("a")[0]).variable, "A");
    }

    #[test]
    fn malformed_lines() {
        let err = GrammarIndex::parse("S->A B\nS A B").unwrap_err();
        assert!(matches!(err, GrammarError::MalformedLine { line: 2, .. }));
        let err = GrammarIndex::parse("S->A->B").unwrap_err();
        assert!(matches!(err, GrammarError::MalformedLine { line: 1, .. }));
        let err = GrammarIndex::parse("->a").unwrap_err();
        assert_eq!(err.to_string(), r#"Malformed production at line 1: "->a""#);
    }

    #[test]
    fn unsupported_arity() {
        let err = GrammarIndex::parse("A->a\nS->A B C").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported production S->A B C: 3 symbols in body"
        );
        let err = GrammarIndex::parse("S->").unwrap_err();
        assert!(matches!(err, GrammarError::UnsupportedArity { arity: 0, .. }));
    }

    #[test]
    fn missing_grammar_file() {
        let err = GrammarIndex::from_file("/nonexistent/grammar.cnf").unwrap_err();
        assert!(matches!(err, GrammarError::Io(_)));
    }

    #[test]
    fn production_display() {
        let p = Production::new("S", "A X").unwrap();
        assert_eq!(p.to_string(), "S->A X");
        assert!(!p.is_terminal());
        assert!(Production::new("A", " a ").unwrap().is_terminal());
    }

    #[test]
    fn build_grammar() {
        let index = GrammarBuilder::default()
            .rule("S", &["A", "B"])
            .terminal("A", "a")
            .terminal("B", "b")
            .into_index()
            .unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.lookup_pair("A", "B").len(), 1);
    }

    #[test]
    fn build_grammar_bad_arity() {
        let err = GrammarBuilder::default()
            .rule("S", &["A", "B", "C"])
            .rule("S", &[])
            .into_index()
            .unwrap_err();
        // First error wins
        assert_eq!(
            err.to_string(),
            "Unsupported production S->A B C: 3 symbols in body"
        );
    }

    #[test]
    fn build_grammar_in_loop() {
        let mut builder = GrammarBuilder::default();
        for (head, terminal) in [("A", "a"), ("B", "b"), ("A", "a")] {
            builder.rule_try(head, &[terminal]);
        }
        let index = builder.into_index().unwrap();
        assert_eq!(index.len(), 2);
    }
}
