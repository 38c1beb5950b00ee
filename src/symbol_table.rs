//! SymbolTable: interns identifier and constant text, handing out dense ids
//! in first-seen order.

use crate::policy::Modulo;
use crate::robin_table::{RobinTable, TableError};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::trace;

pub struct SymbolTable {
    table: RobinTable<String, usize, Modulo>,
    next_id: usize,
}

impl SymbolTable {
    /// Empty table; storage is allocated on the first symbol.
    pub fn new() -> Self {
        Self::from_table(RobinTable::with_policy(Modulo::default()))
    }

    pub fn with_capacity(capacity: usize) -> Result<Self, TableError> {
        let table = RobinTable::with_capacity_and_policy(capacity, Modulo::default())?;
        Ok(Self::from_table(table))
    }

    fn from_table(table: RobinTable<String, usize, Modulo>) -> Self {
        Self { table, next_id: 0 }
    }

    /// Id of `token`, assigning the next free id on first sight.
    pub fn get_or_insert(&mut self, token: &str) -> Result<usize, TableError> {
        if let Some(&id) = self.table.get(token) {
            return Ok(id);
        }
        let id = self.next_id;
        self.table.insert_and_grow(token.to_owned(), id)?;
        self.next_id += 1;
        trace!(token, id, "interned symbol");
        Ok(id)
    }

    pub fn get(&self, token: &str) -> Option<usize> {
        self.table.get(token).copied()
    }

    /// Forget `token`. Its id is not reused.
    pub fn remove(&mut self, token: &str) -> Option<usize> {
        self.table.remove(token).map(|(_, id)| id)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// `(token, id)` pairs ordered by id.
    pub fn entries(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> =
            self.table.iter().map(|(k, &id)| (k.as_str(), id)).collect();
        entries.sort_unstable_by_key(|&(_, id)| id);
        entries
    }

    /// One `token | id` line per entry, in id order.
    pub fn write_report<W: Write>(&self, mut out: W) -> io::Result<()> {
        for (token, id) in self.entries() {
            writeln!(out, "{token} | {id}")?;
        }
        out.flush()
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_report(BufWriter::new(file))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: get-or-create is idempotent and ids follow first sight.
    #[test]
    fn ids_are_stable_and_dense() {
        let mut st = SymbolTable::new();
        assert_eq!(st.get_or_insert("x").unwrap(), 0);
        assert_eq!(st.get_or_insert("42").unwrap(), 1);
        assert_eq!(st.get_or_insert("x").unwrap(), 0);
        assert_eq!(st.len(), 2);
        assert_eq!(st.get("42"), Some(1));
        assert_eq!(st.get("y"), None);
    }

    /// Invariant: removed ids are never handed out again.
    #[test]
    fn removed_ids_are_not_reused() {
        let mut st = SymbolTable::new();
        st.get_or_insert("a").unwrap();
        st.get_or_insert("b").unwrap();
        assert_eq!(st.remove("a"), Some(0));
        assert_eq!(st.remove("a"), None);
        assert_eq!(st.get_or_insert("c").unwrap(), 2);
        assert_eq!(st.get_or_insert("a").unwrap(), 3);
    }

    /// Invariant: the report lists entries in id order regardless of layout.
    #[test]
    fn report_is_in_id_order() {
        let mut st = SymbolTable::with_capacity(3).unwrap();
        for token in ["zeta", "alpha", "\"hi\"", "7", "alpha"] {
            st.get_or_insert(token).unwrap();
        }
        let mut out = Vec::new();
        st.write_report(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "zeta | 0\nalpha | 1\n\"hi\" | 2\n7 | 3\n"
        );
    }

    /// Invariant: interning many symbols grows the table without losing any.
    #[test]
    fn grows_past_initial_capacity() {
        let mut st = SymbolTable::with_capacity(1).unwrap();
        for i in 0..500 {
            assert_eq!(st.get_or_insert(&format!("v{i}")).unwrap(), i);
        }
        for i in 0..500 {
            assert_eq!(st.get(&format!("v{i}")), Some(i));
        }
        assert_eq!(st.entries().len(), 500);
    }
}
