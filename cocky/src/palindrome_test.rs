#![deny(warnings)]

use crate::{CykSolver, GrammarIndex};
use proptest::prelude::*;

fn palindrome_solver() -> CykSolver {
    let grammar = GrammarIndex::parse(include_str!("../grammars/palindromes.cnf"))
        .expect("Bad grammar");
    CykSolver::new(grammar)
}

fn mirrored(half: &str) -> String {
    half.chars().chain(half.chars().rev()).collect()
}

proptest! {
    #[test]
    fn accepts_mirrored_words(half in "[ab]{1,9}") {
        let word = mirrored(&half);
        prop_assert!(palindrome_solver().solve(&word), "{}", word);
    }

    #[test]
    fn rejects_trailing_symbol(half in "[ab]{1,9}", tail in "[ab]") {
        let word = mirrored(&half) + &tail;
        prop_assert!(!palindrome_solver().solve(&word), "{}", word);
    }

    #[test]
    fn repeated_solve_agrees(word in "[ab]{1,14}") {
        let mut solver = palindrome_solver();
        let first = solver.solve(&word);
        let size = solver.cache().len();
        prop_assert_eq!(solver.solve(&word), first);
        prop_assert_eq!(solver.cache().len(), size);
    }

    #[test]
    fn shared_substring_reused(
        shared in "[ab]{1,5}",
        (p1, s1) in ("[ab]{0,4}", "[ab]{0,4}"),
        (p2, s2) in ("[ab]{0,4}", "[ab]{0,4}"),
    ) {
        let w1 = format!("{}{}{}", p1, shared, s1);
        let w2 = format!("{}{}{}", p2, shared, s2);
        let mut solver = palindrome_solver();
        solver.solve(&w1);
        let id = solver.cache().get(&shared);
        prop_assert!(id.is_some());
        solver.solve(&w2);
        prop_assert_eq!(solver.cache().get(&shared), id);

        // Same derivations when the other word reaches the substring first
        let mut other = palindrome_solver();
        other.solve(&w2);
        prop_assert_eq!(other.derivers(&shared), solver.derivers(&shared));
    }
}
