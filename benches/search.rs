use criterion::{black_box, criterion_group, criterion_main, Criterion};

use molperceive::{
    find_sub_structure, BondOrder, ComparisonLevel, ConnectorAssignment, Fragment, SearchOptions,
};

fn chain(len: usize) -> Fragment {
    let bonds: Vec<_> = (1..len).map(|i| (i - 1, i, BondOrder::Single)).collect();
    Fragment::from_atoms(&vec![6; len], &bonds).unwrap()
}

fn kekule_benzene_with_tail(tail: usize) -> Fragment {
    let mut atoms = vec![6; 6];
    let mut bonds: Vec<_> = (0..6)
        .map(|i| {
            let order = if i % 2 == 0 {
                BondOrder::Double
            } else {
                BondOrder::Single
            };
            (i, (i + 1) % 6, order)
        })
        .collect();
    let mut prev = 0;
    for _ in 0..tail {
        let next = atoms.len();
        atoms.push(6);
        bonds.push((prev, next, BondOrder::Single));
        prev = next;
    }
    atoms.push(8);
    bonds.push((prev, atoms.len() - 1, BondOrder::Single));
    Fragment::from_atoms(&atoms, &bonds).unwrap()
}

fn bench_search(c: &mut Criterion) {
    let target = kekule_benzene_with_tail(8);
    let ring_query = kekule_benzene_with_tail(0);
    let chain_query = chain(5);

    let defaults = SearchOptions::default();
    let exhaustive = SearchOptions {
        strategy: ConnectorAssignment::Exhaustive,
        ..SearchOptions::with_level(ComparisonLevel::Skeletal)
    };
    let exact = SearchOptions {
        exact_match: true,
        ..SearchOptions::default()
    };

    let mut group = c.benchmark_group("find_sub_structure");

    group.bench_function("phenol_in_tail", |b| {
        b.iter(|| black_box(find_sub_structure(black_box(&ring_query), &target, &defaults)))
    });
    group.bench_function("chain_in_tail", |b| {
        b.iter(|| black_box(find_sub_structure(black_box(&chain_query), &target, &defaults)))
    });
    group.bench_function("chain_in_tail_exhaustive", |b| {
        b.iter(|| black_box(find_sub_structure(black_box(&chain_query), &target, &exhaustive)))
    });
    group.bench_function("exact_self", |b| {
        b.iter(|| black_box(find_sub_structure(black_box(&target), &target, &exact)))
    });

    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
