use robin_table::SymbolTable;

#[test]
fn get_or_insert_is_idempotent() {
    let mut st = SymbolTable::new();
    let a = st.get_or_insert("alpha").unwrap();
    let b = st.get_or_insert("beta").unwrap();
    assert_ne!(a, b);
    assert_eq!(st.get_or_insert("alpha").unwrap(), a);
    assert_eq!(st.len(), 2);
}

#[test]
fn report_round_trips_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ST.out");
    let mut st = SymbolTable::with_capacity(5).unwrap();
    for token in ["i", "0", "\"done\"", "i", "3.14"] {
        st.get_or_insert(token).unwrap();
    }
    st.write_to_path(&path).unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "i | 0\n0 | 1\n\"done\" | 2\n3.14 | 3\n"
    );
}

#[test]
fn entries_survive_growth_and_removal() {
    let mut st = SymbolTable::default();
    for i in 0..1000 {
        st.get_or_insert(&format!("sym{i}")).unwrap();
    }
    for i in (0..1000).step_by(3) {
        assert_eq!(st.remove(&format!("sym{i}")), Some(i));
    }
    let entries = st.entries();
    assert_eq!(entries.len(), 666);
    assert!(entries.windows(2).all(|w| w[0].1 < w[1].1));
    assert_eq!(st.get("sym1"), Some(1));
    assert_eq!(st.get("sym3"), None);
}
