//! Scanner: splits source lines into tokens, classifies them against a
//! `TokenSpec` and records the program internal form (PIF). Constants and
//! identifiers are interned in a `SymbolTable`.

use crate::automaton::{AutomatonError, FiniteAutomaton};
use crate::dyn_array::DynArray;
use crate::robin_table::TableError;
use crate::symbol_table::SymbolTable;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading scanner inputs or scanning a program.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Reading an input file failed.
    #[error("I/O error reading {path}: {error}")]
    Io { path: PathBuf, error: io::Error },

    /// The token file has fewer than three lines.
    #[error("token file needs 3 lines, found {found}")]
    TokenFileLines { found: usize },

    /// A token file line lacks its `label:` prefix.
    #[error("token file line {line} has no `label:` prefix")]
    MissingLabel { line: usize },

    /// The program is not lexically correct. `line` is 1-based.
    #[error("{message} on line {line}")]
    Lexical { line: usize, message: String },

    #[error(transparent)]
    Automaton(#[from] AutomatonError),

    #[error(transparent)]
    Table(#[from] TableError),
}

fn read_input(path: &Path) -> Result<String, ScanError> {
    std::fs::read_to_string(path).map_err(|error| ScanError::Io {
        path: path.to_owned(),
        error,
    })
}

/// Operators, separators and reserved words of the scanned language.
#[derive(Clone, Debug, Default)]
pub struct TokenSpec {
    operators: DynArray<String>,
    separators: DynArray<String>,
    reserved: DynArray<String>,
}

fn owned_list<'a>(items: impl IntoIterator<Item = &'a str>) -> DynArray<String> {
    items
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn labelled(line: &str, number: usize) -> Result<DynArray<String>, ScanError> {
    let (_, items) = line
        .split_once(':')
        .ok_or(ScanError::MissingLabel { line: number })?;
    Ok(owned_list(items.split_whitespace()))
}

fn position(list: &DynArray<String>, token: &str) -> Option<usize> {
    list.iter().position(|s| s == token)
}

impl TokenSpec {
    pub fn new<'a>(
        operators: impl IntoIterator<Item = &'a str>,
        separators: impl IntoIterator<Item = &'a str>,
        reserved: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            operators: owned_list(operators),
            separators: owned_list(separators),
            reserved: owned_list(reserved),
        }
    }

    /// Parse three labelled lines, in order operators, separators, reserved
    /// words. Everything after the first `:` is split on whitespace.
    pub fn parse(text: &str) -> Result<Self, ScanError> {
        let lines: Vec<&str> = text.lines().take(3).collect();
        let [operators, separators, reserved] = lines[..] else {
            return Err(ScanError::TokenFileLines { found: lines.len() });
        };
        let spec = Self {
            operators: labelled(operators, 1)?,
            separators: labelled(separators, 2)?,
            reserved: labelled(reserved, 3)?,
        };
        debug!(
            operators = spec.operators.len(),
            separators = spec.separators.len(),
            reserved = spec.reserved.len(),
            "loaded token spec"
        );
        Ok(spec)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        Self::parse(&read_input(path.as_ref())?)
    }

    pub fn operators(&self) -> &[String] {
        self.operators.as_slice()
    }

    pub fn separators(&self) -> &[String] {
        self.separators.as_slice()
    }

    pub fn reserved(&self) -> &[String] {
        self.reserved.as_slice()
    }

    pub fn operator_index(&self, token: &str) -> Option<usize> {
        position(&self.operators, token)
    }

    pub fn separator_index(&self, token: &str) -> Option<usize> {
        position(&self.separators, token)
    }

    pub fn reserved_index(&self, token: &str) -> Option<usize> {
        position(&self.reserved, token)
    }

    /// Length of the longest operator or separator `rest` starts with.
    fn symbol_len_at(&self, rest: &str) -> Option<usize> {
        self.operators
            .iter()
            .chain(self.separators.iter())
            .filter(|s| rest.starts_with(s.as_str()))
            .map(String::len)
            .max()
    }
}

/// Split one source line into tokens.
///
/// Whitespace separates tokens, every operator and separator is a token of
/// its own (longest match wins), and a `"` starts a string span that runs to
/// the next `"` on the line, or to the end of the line if there is none.
pub fn split_line<'a>(line: &'a str, spec: &TokenSpec) -> Vec<&'a str> {
    let mut tokens = Vec::new();
    let mut word: Option<usize> = None;
    let mut i = 0;
    while let Some(c) = line[i..].chars().next() {
        let symbol = spec.symbol_len_at(&line[i..]);
        if c == '"' || c.is_whitespace() || symbol.is_some() {
            if let Some(start) = word.take() {
                tokens.push(&line[start..i]);
            }
        }
        if c == '"' {
            let end = line[i + 1..]
                .find('"')
                .map_or(line.len(), |close| i + 1 + close + 1);
            tokens.push(&line[i..end]);
            i = end;
        } else if c.is_whitespace() {
            i += c.len_utf8();
        } else if let Some(len) = symbol {
            tokens.push(&line[i..i + len]);
            i += len;
        } else {
            word.get_or_insert(i);
            i += c.len_utf8();
        }
    }
    if let Some(start) = word {
        tokens.push(&line[start..]);
    }
    tokens
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenClass {
    Reserved,
    Operator,
    Separator,
    StringConstant,
    IntConstant,
    FloatConstant,
    BoolConstant,
    Identifier,
}

/// One PIF record. `index` points into the token spec for reserved words,
/// operators and separators, and is a symbol-table id otherwise.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PifEntry {
    pub class: TokenClass,
    pub index: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Pif {
    entries: DynArray<PifEntry>,
}

impl Pif {
    pub fn entries(&self) -> &[PifEntry] {
        self.entries.as_slice()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line per token, in source order.
    pub fn write_report<W: Write>(&self, mut out: W, spec: &TokenSpec) -> io::Result<()> {
        for entry in &self.entries {
            let fixed = match entry.class {
                TokenClass::Reserved => spec.reserved().get(entry.index),
                TokenClass::Operator => spec.operators().get(entry.index),
                TokenClass::Separator => spec.separators().get(entry.index),
                _ => None,
            };
            let label = match entry.class {
                TokenClass::IntConstant => "int constant",
                TokenClass::FloatConstant => "float constant",
                TokenClass::BoolConstant => "bool constant",
                TokenClass::StringConstant => "string constant",
                TokenClass::Identifier => "identifier",
                _ => fixed.map_or("?", String::as_str),
            };
            writeln!(out, "{label} | {}", entry.index)?;
        }
        out.flush()
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>, spec: &TokenSpec) -> io::Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_report(BufWriter::new(file), spec)
    }
}

/// Scanner inputs: the token spec plus optional automata that replace the
/// built-in identifier and integer shape rules.
#[derive(Default)]
pub struct ScanConfig {
    pub tokens: TokenSpec,
    pub identifier_automaton: Option<FiniteAutomaton>,
    pub integer_automaton: Option<FiniteAutomaton>,
}

impl ScanConfig {
    pub fn new(tokens: TokenSpec) -> Self {
        Self {
            tokens,
            identifier_automaton: None,
            integer_automaton: None,
        }
    }

    pub fn with_identifier_automaton(mut self, fa: FiniteAutomaton) -> Self {
        self.identifier_automaton = Some(fa);
        self
    }

    pub fn with_integer_automaton(mut self, fa: FiniteAutomaton) -> Self {
        self.integer_automaton = Some(fa);
        self
    }
}

enum Shape {
    Fixed(TokenClass, usize),
    Symbol(TokenClass),
}

fn in_alphabet(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
}

fn is_int(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn is_float(token: &str) -> bool {
    token.matches('.').count() == 1
        && token.chars().any(|c| c.is_ascii_digit())
        && token.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn is_string(token: &str) -> bool {
    token.len() >= 2 && token.starts_with('"') && token.ends_with('"')
}

pub struct Scanner {
    config: ScanConfig,
    symbols: SymbolTable,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            symbols: SymbolTable::new(),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn into_symbols(self) -> SymbolTable {
        self.symbols
    }

    fn classify(&self, token: &str) -> Result<Shape, &'static str> {
        let spec = &self.config.tokens;
        if let Some(i) = spec.reserved_index(token) {
            return Ok(Shape::Fixed(TokenClass::Reserved, i));
        }
        if let Some(i) = spec.operator_index(token) {
            return Ok(Shape::Fixed(TokenClass::Operator, i));
        }
        if let Some(i) = spec.separator_index(token) {
            return Ok(Shape::Fixed(TokenClass::Separator, i));
        }
        if is_string(token) {
            return Ok(Shape::Symbol(TokenClass::StringConstant));
        }
        if !in_alphabet(token) {
            return Err("Invalid token");
        }
        let int = match &self.config.integer_automaton {
            Some(fa) => fa.accepts(token),
            None => is_int(token),
        };
        if int {
            return Ok(Shape::Symbol(TokenClass::IntConstant));
        }
        if is_float(token) {
            return Ok(Shape::Symbol(TokenClass::FloatConstant));
        }
        if token == "true" || token == "false" {
            return Ok(Shape::Symbol(TokenClass::BoolConstant));
        }
        let identifier = match &self.config.identifier_automaton {
            Some(fa) => fa.accepts(token),
            None => !token.starts_with(|c: char| c.is_ascii_digit()),
        };
        if identifier {
            Ok(Shape::Symbol(TokenClass::Identifier))
        } else {
            Err("Invalid identifier")
        }
    }

    /// Scan a whole program, stopping at the first lexical error.
    pub fn scan(&mut self, source: &str) -> Result<Pif, ScanError> {
        let mut pif = Pif::default();
        for (number, line) in source.lines().enumerate() {
            for token in split_line(line, &self.config.tokens) {
                let entry = match self.classify(token) {
                    Ok(Shape::Fixed(class, index)) => PifEntry { class, index },
                    Ok(Shape::Symbol(class)) => PifEntry {
                        class,
                        index: self.symbols.get_or_insert(token)?,
                    },
                    Err(kind) => {
                        return Err(ScanError::Lexical {
                            line: number + 1,
                            message: format!("{kind} {token}"),
                        })
                    }
                };
                pif.entries.push(entry);
            }
        }
        debug!(tokens = pif.len(), symbols = self.symbols.len(), "scanned program");
        Ok(pif)
    }

    pub fn scan_path(&mut self, path: impl AsRef<Path>) -> Result<Pif, ScanError> {
        let source = read_input(path.as_ref())?;
        self.scan(&source)
    }
}
