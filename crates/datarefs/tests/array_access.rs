// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Array and byte access: offset/max clipping and size queries.

use datarefs::{
    AccessorTable, ArrayAccessor, DataRef, Error, Extent, Registry, RegistryConfig, TypeTag,
};
use parking_lot::RwLock;
use std::sync::Arc;

fn registry() -> Registry {
    Registry::with_config(RegistryConfig::builtin())
}

fn publish_ints(reg: &Registry, name: &str, data: Vec<i32>) -> (Arc<RwLock<Vec<i32>>>, DataRef) {
    let cell = Arc::new(RwLock::new(data));
    let h = reg
        .register(
            name,
            true,
            AccessorTable::new().array(ArrayAccessor::backed_by(cell.clone(), Extent::Declared)),
            "arrays",
        )
        .expect("register");
    (cell, h)
}

#[test]
fn test_five_element_scenario() {
    let reg = registry();
    let (_, h) = publish_ints(&reg, "demo/engines", vec![1, 2, 3, 4, 5]);

    let mut out = [0; 2];
    assert_eq!(reg.get_int_array(h, Some(&mut out[..]), 3, 10), Ok(2));
    assert_eq!(out, [4, 5]);

    assert_eq!(reg.get_int_array(h, None, 0, 0), Ok(5));
    assert_eq!(reg.get_int_array(h, Some(&mut out[..]), 5, 2), Ok(0));
    assert_eq!(
        reg.get_int_array(h, Some(&mut out[..]), -1, 2),
        Err(Error::InvalidOffset(-1))
    );
}

#[test]
fn test_random_offset_max_sweep_matches_slice_semantics() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    let reg = registry();

    for round in 0..50 {
        let len = rng.usize(0..64);
        let data: Vec<i32> = (0..len).map(|_| rng.i32(..)).collect();
        let (_, h) = publish_ints(&reg, &format!("demo/sweep/{}", round), data.clone());

        for _ in 0..40 {
            let offset = rng.usize(0..80);
            let max = rng.usize(0..80);
            let buf_len = rng.usize(0..80);
            let mut out = vec![0i32; buf_len];

            let copied = reg
                .get_int_array(h, Some(&mut out[..]), offset as i32, max)
                .expect("non-negative offset");

            let expected = if offset >= len {
                0
            } else {
                max.min(buf_len).min(len - offset)
            };
            assert_eq!(
                copied, expected,
                "len={} offset={} max={} buf={}",
                len, offset, max, buf_len
            );
            assert_eq!(&out[..copied], &data[offset.min(len)..offset.min(len) + copied]);
            assert!(out[copied..].iter().all(|&v| v == 0));
        }
    }
}

#[test]
fn test_random_writes_stay_within_declared_length() {
    let mut rng = fastrand::Rng::with_seed(7);
    let reg = registry();
    let len = 16;
    let (cell, h) = publish_ints(&reg, "demo/grid", vec![0; len]);
    let mut model = vec![0i32; len];

    for _ in 0..200 {
        let offset = rng.usize(0..24);
        let values: Vec<i32> = (0..rng.usize(0..10)).map(|_| rng.i32(-100..100)).collect();

        let written = reg.set_int_array(h, &values, offset as i32).unwrap();
        let expected = if offset >= len {
            0
        } else {
            values.len().min(len - offset)
        };
        assert_eq!(written, expected);
        model[offset.min(len)..offset.min(len) + written].copy_from_slice(&values[..written]);
        assert_eq!(*cell.read(), model);
    }
}

#[test]
fn test_float_array_partial_read() {
    let reg = registry();
    let cell = Arc::new(RwLock::new(vec![0.5f32, 1.5, 2.5]));
    let h = reg
        .register(
            "demo/fuel",
            false,
            AccessorTable::new().array(ArrayAccessor::backed_by(cell, Extent::Declared)),
            "fuel",
        )
        .unwrap();

    let mut out = [0.0f32; 4];
    assert_eq!(reg.get_float_array(h, Some(&mut out[..]), 1, 4), Ok(2));
    assert_eq!(&out[..2], &[1.5, 2.5]);
    assert_eq!(reg.set_float_array(h, &[9.0], 0), Ok(0));
}

#[test]
fn test_bytes_as_text() {
    let reg = registry();
    let cell = Arc::new(RwLock::new(b"N172SP".to_vec()));
    let h = reg
        .register(
            "demo/tailnum",
            true,
            AccessorTable::new().array(ArrayAccessor::backed_by(cell.clone(), Extent::Growable)),
            "acf",
        )
        .unwrap();

    let len = reg.get_bytes(h, None, 0, 0).unwrap();
    let mut buf = vec![0u8; len];
    let n = reg.get_bytes(h, Some(&mut buf[..]), 0, len).unwrap();
    assert_eq!(std::str::from_utf8(&buf[..n]), Ok("N172SP"));

    // Growable: a longer write extends the value.
    assert_eq!(reg.set_bytes(h, b"N12345X", 0), Ok(7));
    assert_eq!(reg.get_bytes(h, None, 0, 0), Ok(7));
    assert_eq!(&*cell.read(), b"N12345X");
}

#[test]
fn test_shared_array_slot_grows() {
    let reg = registry();
    let sub = reg.share_silent("demo/shared/ints", TypeTag::IntArray).unwrap();
    let h = sub.data_ref();

    assert_eq!(reg.get_int_array(h, None, 0, 0), Ok(0));
    assert_eq!(reg.set_int_array(h, &[1, 2], 0), Ok(2));
    assert_eq!(reg.set_int_array(h, &[3, 4, 5], 2), Ok(3));
    assert_eq!(reg.get_int_array(h, None, 0, 0), Ok(5));

    let mut out = [9; 5];
    assert_eq!(reg.get_int_array(h, Some(&mut out[..]), 0, 5), Ok(5));
    assert_eq!(out, [1, 2, 3, 4, 5]);
}

#[test]
fn test_shared_array_rejects_far_offsets() {
    let reg = registry();
    let sub = reg.share_silent("demo/trim", TypeTag::FloatArray).unwrap();
    let h = sub.data_ref();

    assert_eq!(
        reg.set_float_array(h, &[1.0], i32::MAX),
        Err(Error::InvalidOffset(i32::MAX))
    );
    assert_eq!(reg.set_bytes(h, b"x", 0), Ok(0));
    assert_eq!(reg.get_float_array(h, None, 0, 0), Ok(0));

    assert_eq!(reg.set_float_array(h, &[1.0, 2.0], 0), Ok(2));
    assert_eq!(
        reg.set_float_array(h, &[3.0], 3),
        Err(Error::InvalidOffset(3))
    );
    assert_eq!(reg.get_float_array(h, None, 0, 0), Ok(2));
}
