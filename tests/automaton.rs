use robin_table::{AutomatonError, FiniteAutomaton};
use std::fs;

const INTEGER_FA: &str = "alphabet = {0123456789-}\n\
                          states = {start, sign, zero, digits}\n\
                          transitions = {start|-|sign, start|0|zero, start|123456789|digits, \
                          sign|123456789|digits, digits|0123456789|digits}\n\
                          initial_state = start\n\
                          final_states = {zero, digits}\n";

#[test]
fn integer_automaton_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("integer.fa");
    fs::write(&path, INTEGER_FA).unwrap();
    let fa = FiniteAutomaton::from_path(&path).unwrap();

    for ok in ["0", "7", "-42", "1000"] {
        assert!(fa.accepts(ok), "{ok} should be accepted");
    }
    for bad in ["", "-", "-0", "007", "12a", "1-2"] {
        assert!(!fa.accepts(bad), "{bad} should be rejected");
    }
}

#[test]
fn nondeterministic_choice_is_explored() {
    // Strings over {a,b} ending in "ab".
    let fa = FiniteAutomaton::parse(
        "alphabet = {ab}\n\
         states = {p, q, r}\n\
         transitions = {p|ab|p, p|a|q, q|b|r}\n\
         initial_state = p\n\
         final_states = {r}\n",
    )
    .unwrap();
    assert!(fa.accepts("ab"));
    assert!(fa.accepts("babab"));
    assert!(!fa.accepts("aba"));
    assert_eq!(fa.transitions_from(0).len(), 3);
}

#[test]
fn describe_lists_everything() {
    let fa = FiniteAutomaton::parse(
        "alphabet = {01}\n\
         states = {q0, q1}\n\
         transitions = {q0|1|q1, q1|0|q0}\n\
         initial_state = q0\n\
         final_states = {q1}\n",
    )
    .unwrap();
    let mut out = Vec::new();
    fa.describe(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "States: q0, q1\nAlphabet: 01\nTransitions:\nq0 -> 1 -> q1\nq1 -> 0 -> q0\n\
         Initial state: q0\nFinal states: q1\n"
    );
}

#[test]
fn bad_definitions_are_rejected() {
    assert!(matches!(
        FiniteAutomaton::parse("alphabet = {a}\n"),
        Err(AutomatonError::LineCount { found: 1 })
    ));
    let unknown = FiniteAutomaton::parse(
        "alphabet = {a}\nstates = {s}\ntransitions = {s|a|t}\ninitial_state = s\nfinal_states = {s}\n",
    );
    assert!(matches!(unknown, Err(AutomatonError::UnknownState(name)) if name == "t"));
    let symbol = FiniteAutomaton::parse(
        "alphabet = {a}\nstates = {s}\ntransitions = {s|b|s}\ninitial_state = s\nfinal_states = {s}\n",
    );
    assert!(matches!(symbol, Err(AutomatonError::UnknownSymbol('b'))));
}
