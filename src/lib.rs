//! robin-table: a single-threaded Robin Hood hash table with backward-shift
//! deletion, plus the lexical-analysis pieces built on top of it.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an open-addressing table whose lookups are bounded by the
//!   longest probe distance currently stored, with every unsafe operation
//!   confined to one storage type.
//! - Layers:
//!   - RawSlots<K, V>: one allocation split into value, key and metadata
//!     regions. A slot's key and value are initialized iff its metadata
//!     byte (the probe distance, 0 = empty) is non-zero.
//!   - RobinTable<K, V, P>: Robin Hood insertion, bounded lookup,
//!     backward-shift removal and rehashing over RawSlots. Hashing,
//!     slot mapping, equality and growth come from a `TablePolicy`.
//!   - DynArray<T>: growable sequence with an explicit 1.5x growth rule,
//!     used for transition lists, token lists and the PIF.
//!   - SymbolTable, FiniteAutomaton, Scanner: collaborators that use the
//!     table as a map (find, then insert if absent).
//!
//! Constraints
//! - Single-threaded: tables are `!Send`/`!Sync`.
//! - No wrap-around probing: `MAX_PROBE_DISTANCE` extra slots follow the
//!   `capacity` usable ones, so a record's stored distance is always
//!   `slot - home + 1`.
//! - `insert` never deduplicates; callers wanting map semantics look the
//!   key up first.
//! - `insert` reports when the table should grow (load above
//!   `MAX_LOAD_FACTOR` or a record placed at `MAX_PROBE_DISTANCE`) and
//!   leaves the decision to the caller. It grows on its own only when a
//!   probe would otherwise leave the overflow margin.
//!
//! Why this split?
//! - Localize invariants: RawSlots owns initialization state, the table
//!   owns placement.
//! - Policies as one trait: a capacity scheme (power of two, any size)
//!   always travels with the mapping that depends on it.
//!
//! Failure policy
//! - `rehash` first replays the moves on a distance array and only then
//!   touches records, so a growth that cannot fit every record returns an
//!   error with the table unchanged.
//! - A failing `insert` drops at most the one record it was carrying when
//!   forced growth gave up.
//!
//! Slots
//! - `find` returns a `Slot` tied to its table and that table's current
//!   epoch. Any insert, removal or rehash moves records, bumps the epoch and
//!   turns older slots stale; accessors then return `None` instead of
//!   another record. Slots handed to a different table, clones included,
//!   are rejected the same way.
//!
//! Notes and non-goals
//! - No iteration order guarantee; iteration follows physical slots.
//! - `max_search_length` never shrinks on removal; `reset_search_length`
//!   recomputes it.
//! - No persistence of the table itself; the symbol table and PIF write
//!   plain-text reports.

pub mod automaton;
pub mod dyn_array;
pub mod policy;
mod raw_slots;
pub mod robin_table;
mod robin_table_proptest;
pub mod scanner;
pub mod symbol_table;

// Public surface
pub use automaton::{AutomatonError, FiniteAutomaton, Transition};
pub use dyn_array::{ArrayError, DynArray};
pub use policy::{BuildIdentity, IdentityHasher, Modulo, PowerOfTwo, TablePolicy, MIN_CAPACITY};
pub use robin_table::{RobinTable, Slot, TableError, MAX_LOAD_FACTOR, MAX_PROBE_DISTANCE};
pub use scanner::{split_line, Pif, PifEntry, ScanConfig, ScanError, Scanner, TokenClass, TokenSpec};
pub use symbol_table::SymbolTable;
