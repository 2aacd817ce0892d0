// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dispatch Latency Benchmark
//!
//! Measures the per-access cost of the typed dispatch layer:
//! - scalar get/set on an Active handle (hot path)
//! - soft failures (type mismatch, orphaned handle)
//! - array reads at different sizes
//! - writes fanning out to shared-data subscribers
//!
//! Consumers hit these paths every frame, so they must stay in the tens of
//! nanoseconds.

#![allow(clippy::uninlined_format_args)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use datarefs::{
    AccessorTable, ArrayAccessor, Extent, Registry, RegistryConfig, ScalarAccessor, TypeTag,
};
use parking_lot::RwLock;
use std::hint::black_box as bb;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn registry() -> Registry {
    Registry::with_config(RegistryConfig::builtin())
}

/// Scalar get/set on a live handle, plus the soft-failure paths
fn bench_scalar(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalar_dispatch");

    let reg = registry();
    let cell = Arc::new(RwLock::new(0.0f32));
    let h = reg
        .register(
            "bench/altitude",
            true,
            AccessorTable::new().scalar(ScalarAccessor::backed_by(cell)),
            "bench",
        )
        .expect("register");

    let orphan = reg
        .register(
            "bench/orphan",
            true,
            AccessorTable::new().scalar(ScalarAccessor::<f32>::read_only(|| 1.0)),
            "bench",
        )
        .expect("register");
    reg.unregister(orphan);

    group.bench_function("get_float", |b| {
        b.iter(|| bb(reg.get_float(bb(h))));
    });

    group.bench_function("set_float", |b| {
        b.iter(|| reg.set_float(bb(h), bb(1.5)));
    });

    group.bench_function("get_int_type_mismatch", |b| {
        b.iter(|| bb(reg.get_int(bb(h))));
    });

    group.bench_function("get_float_orphaned", |b| {
        b.iter(|| bb(reg.get_float(bb(orphan))));
    });

    group.bench_function("find", |b| {
        b.iter(|| bb(reg.find(bb("bench/altitude"))));
    });

    group.finish();
}

/// Array reads of increasing length
fn bench_array_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_read");
    let reg = registry();

    for len in [8usize, 64, 512, 4096] {
        let cell = Arc::new(RwLock::new(vec![1.0f32; len]));
        let h = reg
            .register(
                &format!("bench/array/{}", len),
                false,
                AccessorTable::new().array(ArrayAccessor::backed_by(cell, Extent::Declared)),
                "bench",
            )
            .expect("register");
        let mut out = vec![0.0f32; len];

        group.bench_with_input(BenchmarkId::new("get_float_array", len), &len, |b, &len| {
            b.iter(|| bb(reg.get_float_array(h, Some(&mut out[..]), 0, len)));
        });
    }

    group.finish();
}

/// Writes through a shared slot with N subscribers
fn bench_shared_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_fanout");

    for subscribers in [1usize, 8, 64] {
        let reg = registry();
        let hits = Arc::new(AtomicU64::new(0));
        let mut data_ref = None;
        for _ in 0..subscribers {
            let sink = hits.clone();
            let sub = reg
                .share("bench/rpm", TypeTag::Float, move |_, _| {
                    sink.fetch_add(1, Ordering::Relaxed);
                })
                .expect("share");
            data_ref = Some(sub.data_ref());
        }
        let h = data_ref.expect("at least one subscriber");

        group.bench_with_input(
            BenchmarkId::new("set_float", subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| reg.set_float(h, bb(2400.0)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_scalar, bench_array_read, bench_shared_fanout);
criterion_main!(benches);
