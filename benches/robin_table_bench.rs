use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use robin_table::{RobinTable, SymbolTable};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn filled(seed: u64, n: usize) -> (RobinTable<String, u64>, Vec<String>) {
    let mut t = RobinTable::new();
    let keys: Vec<String> = lcg(seed).take(n).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        t.insert_and_grow(k.clone(), i as u64).unwrap();
    }
    (t, keys)
}

// 10k indices into a population of `n`.
fn picks(n: usize) -> Vec<usize> {
    let mut s = 0x9e3779b97f4a7c15u64;
    (0..10_000)
        .map(|_| {
            s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
            (s as usize) % n
        })
        .collect()
}

fn bench_insert_fresh_100k(c: &mut Criterion) {
    c.bench_function("robin::insert_fresh_100k", |b| {
        b.iter_batched(
            RobinTable::<String, u64>::new,
            |mut t| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    t.insert_and_grow(key(x), i as u64).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_presized_100k(c: &mut Criterion) {
    c.bench_function("robin::insert_presized_100k", |b| {
        b.iter_batched(
            || RobinTable::<String, u64>::with_capacity(1 << 17).unwrap(),
            |mut t| {
                for (i, x) in lcg(3).take(100_000).enumerate() {
                    t.insert_and_grow(key(x), i as u64).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit_10k(c: &mut Criterion) {
    c.bench_function("robin::find_hit_10k_on_100k", |b| {
        let (t, keys) = filled(7, 100_000);
        let queries: Vec<&str> = picks(keys.len()).into_iter().map(|i| keys[i].as_str()).collect();
        b.iter(|| {
            for k in &queries {
                black_box(t.find(*k));
            }
        })
    });
}

fn bench_find_miss_10k(c: &mut Criterion) {
    c.bench_function("robin::find_miss_10k_on_100k", |b| {
        let (t, _) = filled(11, 100_000);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = key(miss.next().unwrap());
                black_box(t.find(k.as_str()));
            }
        })
    });
}

fn bench_remove_random_10k(c: &mut Criterion) {
    c.bench_function("robin::remove_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let (t, keys) = filled(5, 110_000);
                let doomed: Vec<String> = picks(keys.len()).into_iter().map(|i| keys[i].clone()).collect();
                (t, doomed)
            },
            |(mut t, doomed)| {
                for k in &doomed {
                    let _ = t.remove(k.as_str());
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_symbol_interning(c: &mut Criterion) {
    c.bench_function("robin::symbol_get_or_insert_100k", |b| {
        // Repeats every token ten times, like identifiers in a program.
        let tokens: Vec<String> = lcg(13).take(10_000).map(key).collect();
        b.iter_batched(
            SymbolTable::new,
            |mut st| {
                for _ in 0..10 {
                    for token in &tokens {
                        black_box(st.get_or_insert(token).unwrap());
                    }
                }
                black_box(st)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_insert;
    config = bench_config();
    targets = bench_insert_fresh_100k, bench_insert_presized_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_find_hit_10k,
              bench_find_miss_10k,
              bench_remove_random_10k,
              bench_symbol_interning
}
criterion_main!(benches_insert, benches_ops);
