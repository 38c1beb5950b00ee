//! FiniteAutomaton: a (possibly nondeterministic) automaton whose per-state
//! transition lists live in a `RobinTable` keyed by state index.
//!
//! Definition files have exactly five non-blank lines:
//!
//! ```text
//! alphabet = {abc}
//! states = {q0, q1, q2}
//! transitions = {q0|ab|q1, q1|c|q2}
//! initial_state = q0
//! final_states = {q2}
//! ```
//!
//! A transition `from|symbols|to` adds one edge per symbol character.

use crate::dyn_array::DynArray;
use crate::policy::{BuildIdentity, PowerOfTwo};
use crate::robin_table::{RobinTable, TableError};
use hashbrown::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Capacity of the transition table of a fresh automaton.
pub const TRANSITION_TABLE_CAPACITY: usize = 32;

/// Errors raised while building or parsing an automaton.
#[derive(Debug, Error)]
pub enum AutomatonError {
    /// Reading the definition file failed.
    #[error("I/O error reading {path}: {error}")]
    Io { path: PathBuf, error: io::Error },

    /// The definition does not have exactly five lines.
    #[error("expected 5 definition lines, found {found}")]
    LineCount { found: usize },

    /// A line does not start with the expected label.
    #[error("line {line}: expected it to start with `{expected}`")]
    MissingPrefix { line: usize, expected: &'static str },

    /// A `{...}` list is missing or empty.
    #[error("line {line}: empty or missing brace list")]
    EmptyList { line: usize },

    /// A transition is not of the form `from|symbols|to`.
    #[error("malformed transition `{0}`")]
    MalformedTransition(String),

    /// A state name that was never declared.
    #[error("unknown state `{0}`")]
    UnknownState(String),

    /// A transition symbol outside the alphabet.
    #[error("symbol `{0}` is not in the alphabet")]
    UnknownSymbol(char),

    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub symbol: char,
    pub target: usize,
}

type TransitionTable = RobinTable<usize, DynArray<Transition>, PowerOfTwo<BuildIdentity>>;

pub struct FiniteAutomaton {
    states: Vec<String>,
    alphabet: DynArray<char>,
    initial_state: Option<usize>,
    final_states: DynArray<usize>,
    transitions: TransitionTable,
}

impl FiniteAutomaton {
    pub fn new() -> Result<Self, AutomatonError> {
        let transitions = RobinTable::with_capacity_and_policy(
            TRANSITION_TABLE_CAPACITY,
            PowerOfTwo::with_hasher(BuildIdentity),
        )?;
        Ok(Self {
            states: Vec::new(),
            alphabet: DynArray::new(),
            initial_state: None,
            final_states: DynArray::new(),
            transitions,
        })
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn alphabet(&self) -> &[char] {
        self.alphabet.as_slice()
    }

    pub fn initial_state(&self) -> Option<usize> {
        self.initial_state
    }

    pub fn final_states(&self) -> &[usize] {
        self.final_states.as_slice()
    }

    /// Declare a state, returning its index. Redeclaring returns the
    /// existing index.
    pub fn add_state(&mut self, name: &str) -> usize {
        if let Some(index) = self.state_index(name) {
            return index;
        }
        self.states.push(name.to_owned());
        self.states.len() - 1
    }

    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s == name)
    }

    fn require_state(&self, name: &str) -> Result<usize, AutomatonError> {
        self.state_index(name)
            .ok_or_else(|| AutomatonError::UnknownState(name.to_owned()))
    }

    /// Add `symbol` to the alphabet unless already present.
    pub fn add_symbol(&mut self, symbol: char) {
        if !self.alphabet.contains(&symbol) {
            self.alphabet.push(symbol);
        }
    }

    /// Transition list of `state`, created empty on first use.
    pub fn transitions_mut(&mut self, state: usize) -> Result<&mut DynArray<Transition>, AutomatonError> {
        if !self.transitions.contains_key(&state) {
            self.transitions.insert_and_grow(state, DynArray::new())?;
        }
        Ok(self
            .transitions
            .get_mut(&state)
            .expect("transition list present after insert"))
    }

    /// Edges leaving `state`.
    pub fn transitions_from(&self, state: usize) -> &[Transition] {
        self.transitions
            .get(&state)
            .map(DynArray::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_transition(&mut self, from: usize, symbol: char, to: usize) -> Result<(), AutomatonError> {
        if !self.alphabet.contains(&symbol) {
            return Err(AutomatonError::UnknownSymbol(symbol));
        }
        for state in [from, to] {
            if state >= self.states.len() {
                return Err(AutomatonError::UnknownState(state.to_string()));
            }
        }
        let edge = Transition { symbol, target: to };
        let list = self.transitions_mut(from)?;
        if !list.contains(&edge) {
            list.push(edge);
        }
        Ok(())
    }

    pub fn set_initial(&mut self, state: usize) -> Result<(), AutomatonError> {
        if state >= self.states.len() {
            return Err(AutomatonError::UnknownState(state.to_string()));
        }
        self.initial_state = Some(state);
        Ok(())
    }

    pub fn add_final(&mut self, state: usize) -> Result<(), AutomatonError> {
        if state >= self.states.len() {
            return Err(AutomatonError::UnknownState(state.to_string()));
        }
        if !self.final_states.contains(&state) {
            self.final_states.push(state);
        }
        Ok(())
    }

    pub fn is_final(&self, state: usize) -> bool {
        self.final_states.contains(&state)
    }

    /// Whether some path from the initial state consumes all of `sequence`
    /// and ends in a final state.
    pub fn accepts(&self, sequence: &str) -> bool {
        let Some(initial) = self.initial_state else {
            return false;
        };
        let input: Vec<char> = sequence.chars().collect();
        let mut visited: HashSet<(usize, usize)> = HashSet::new();
        let mut stack = vec![(initial, 0usize)];
        while let Some((state, pos)) = stack.pop() {
            if !visited.insert((state, pos)) {
                continue;
            }
            let Some(&symbol) = input.get(pos) else {
                if self.is_final(state) {
                    return true;
                }
                continue;
            };
            // Reversed so the first listed edge is explored first.
            for edge in self.transitions_from(state).iter().rev() {
                if edge.symbol == symbol {
                    stack.push((edge.target, pos + 1));
                }
            }
        }
        false
    }

    /// Parse the five-line definition format.
    pub fn parse(text: &str) -> Result<Self, AutomatonError> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.len() != 5 {
            return Err(AutomatonError::LineCount { found: lines.len() });
        }
        let mut fa = Self::new()?;

        let alphabet = brace_list(lines[0], 1, "alphabet = {")?;
        for symbol in alphabet.chars().filter(|c| *c != ',' && !c.is_whitespace()) {
            fa.add_symbol(symbol);
        }

        for name in split_list(brace_list(lines[1], 2, "states = {")?) {
            fa.add_state(name);
        }

        for spec in split_list(brace_list(lines[2], 3, "transitions = {")?) {
            let parts: Vec<&str> = spec.split('|').map(str::trim).collect();
            let [from, symbols, to] = parts[..] else {
                return Err(AutomatonError::MalformedTransition(spec.to_owned()));
            };
            if symbols.is_empty() {
                return Err(AutomatonError::MalformedTransition(spec.to_owned()));
            }
            let from = fa.require_state(from)?;
            let to = fa.require_state(to)?;
            for symbol in symbols.chars() {
                fa.add_transition(from, symbol, to)?;
            }
        }

        let initial = lines[3]
            .strip_prefix("initial_state =")
            .ok_or(AutomatonError::MissingPrefix {
                line: 4,
                expected: "initial_state =",
            })?
            .trim();
        let initial = fa.require_state(initial)?;
        fa.set_initial(initial)?;

        for name in split_list(brace_list(lines[4], 5, "final_states = {")?) {
            let state = fa.require_state(name)?;
            fa.add_final(state)?;
        }

        debug!(
            states = fa.states.len(),
            symbols = fa.alphabet.len(),
            transitions = fa.transitions.len(),
            "parsed finite automaton"
        );
        Ok(fa)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AutomatonError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|error| AutomatonError::Io {
            path: path.to_owned(),
            error,
        })?;
        Self::parse(&text)
    }

    /// Print states, alphabet, transitions, initial and final states.
    pub fn describe<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "States: {}", self.states.join(", "))?;
        let alphabet: String = self.alphabet.iter().collect();
        writeln!(out, "Alphabet: {alphabet}")?;
        writeln!(out, "Transitions:")?;
        for (index, name) in self.states.iter().enumerate() {
            for edge in self.transitions_from(index) {
                writeln!(out, "{name} -> {} -> {}", edge.symbol, self.states[edge.target])?;
            }
        }
        let initial = self
            .initial_state
            .map(|i| self.states[i].as_str())
            .unwrap_or("-");
        writeln!(out, "Initial state: {initial}")?;
        let finals: Vec<&str> = self.final_states.iter().map(|&i| self.states[i].as_str()).collect();
        writeln!(out, "Final states: {}", finals.join(", "))?;
        out.flush()
    }
}

/// Text between `{` and the last `}` of a line starting with `prefix`.
fn brace_list<'a>(line: &'a str, number: usize, prefix: &'static str) -> Result<&'a str, AutomatonError> {
    let rest = line.strip_prefix(prefix).ok_or(AutomatonError::MissingPrefix {
        line: number,
        expected: prefix,
    })?;
    let inner = rest
        .rfind('}')
        .map(|end| rest[..end].trim())
        .ok_or(AutomatonError::EmptyList { line: number })?;
    if inner.is_empty() {
        return Err(AutomatonError::EmptyList { line: number });
    }
    Ok(inner)
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}
