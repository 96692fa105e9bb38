use anyhow::Context;
use clap::Parser;
use cocky::{CykSolver, GrammarIndex};
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// Even length palindromes over {a, b}, used when no grammar is given
const PALINDROMES: &str = include_str!("../../cocky/grammars/palindromes.cnf");

/// Check words against a grammar in Chomsky Normal Form
#[derive(Parser)]
struct Options {
    /// Grammar file, one `VARIABLE->BODY` production per line
    #[arg(short, long)]
    grammar: Option<PathBuf>,

    /// Symbol every accepted word derives from
    #[arg(short, long, default_value = cocky::DEFAULT_START)]
    start: String,

    /// Also print the derivations found for the whole word
    #[arg(long)]
    chart: bool,

    /// Words to check. Reads them from a prompt when empty
    words: Vec<String>,
}

fn check(solver: &mut CykSolver, word: &str, chart: bool) {
    println!("{}: {}", word, solver.solve(word));
    if chart {
        if let Some(node) = solver.cache().lookup(word) {
            println!("{}", node.display(solver.grammar()));
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let options = Options::parse();
    let grammar = match &options.grammar {
        Some(path) => GrammarIndex::from_file(path)
            .with_context(|| format!("failed to load grammar `{}`", path.display()))?,
        None => GrammarIndex::parse(PALINDROMES)?,
    };
    let mut solver = CykSolver::with_start(grammar, &options.start)?;

    if !options.words.is_empty() {
        for word in &options.words {
            check(&mut solver, word, options.chart);
        }
        println!("{}", solver);
        return Ok(());
    }

    let mut rl = rustyline::DefaultEditor::new()?;
    loop {
        match rl.readline("~> ") {
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("readline failed"),
            Ok(line) => {
                let word = line.trim();
                if word.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(word);
                check(&mut solver, word, options.chart);
            }
        }
    }
    println!("{}", solver);
    Ok(())
}
