fn main() {
    // Grammar: S -> a S a | b S b | a a | b b  (in Chomsky Normal Form)
    let grammar = cocky::GrammarIndex::parse(include_str!("../grammars/palindromes.cnf"))
        .expect("Bad grammar");

    let mut solver = cocky::CykSolver::new(grammar);
    for word in ["abaaba", "abbbba", "bbabbbaabbaabbbabb", "aaabbbb"] {
        println!("{}: {}", word, solver.solve(word));
    }
    println!("{}", solver);
}
