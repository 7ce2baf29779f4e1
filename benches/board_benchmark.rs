//! Board benchmark: claim toggling under the board lock and set search.
//!
//! Target: toggles well under 1µs, a full-table search under 50µs.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crossbeam_channel::Receiver;
use set_arena::{Board, CardRules, NullSink, Solver, Validator};
use std::sync::Arc;
use std::time::Duration;

fn full_board() -> (Board, Receiver<usize>) {
    let (board, claims) = Board::new(12, 81, 4, Duration::ZERO, Arc::new(NullSink));
    for slot in 0..12 {
        board.place_item(slot, slot * 7).unwrap();
    }
    (board, claims)
}

fn toggle_claim(c: &mut Criterion) {
    let (board, _claims) = full_board();

    c.bench_function("toggle_on_off", |b| {
        b.iter(|| {
            board.toggle_claim(black_box(0), black_box(4));
            board.toggle_claim(black_box(0), black_box(4))
        })
    });
}

fn validate_triple(c: &mut Criterion) {
    let rules = CardRules::new(4, 3);

    c.bench_function("is_valid_set", |b| {
        b.iter(|| rules.is_valid_set(black_box(&[0, 1, 2])))
    });
}

fn find_sets(c: &mut Criterion) {
    let rules = CardRules::new(4, 3);
    let table: Vec<usize> = (0..12).map(|i| i * 7).collect();
    let deck: Vec<usize> = (0..81).collect();

    c.bench_function("find_sets_table", |b| {
        b.iter(|| rules.find_sets(black_box(&table), usize::MAX))
    });

    c.bench_function("has_set_deck", |b| b.iter(|| rules.has_set(black_box(&deck))));
}

criterion_group!(benches, toggle_claim, validate_triple, find_sets);
criterion_main!(benches);
