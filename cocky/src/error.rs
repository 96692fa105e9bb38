#![deny(warnings)]

use thiserror::Error;

/// Errors raised while loading a grammar or configuring a solver.
///
/// Not finding a derivation for a word is never an error: `solve` answers
/// `false` for that.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// The grammar resource could not be read.
    #[error("Failed to read grammar: {0}")]
    Io(#[from] std::io::Error),

    /// A line that isn't of the form `VARIABLE->BODY`.
    #[error("Malformed production at line {line}: {text:?}")]
    MalformedLine { line: usize, text: String },

    /// Bodies must hold exactly one terminal or two nonterminals.
    #[error("Unsupported production {variable}->{body}: {arity} symbols in body")]
    UnsupportedArity { variable: String, body: String, arity: usize },

    /// No production has the requested start symbol as its head.
    #[error("Missing start Symbol: {0}")]
    MissingStart(String),

    /// A non empty cache filled under some other grammar.
    #[error("Derivation cache was built for a different grammar")]
    ForeignCache,
}
