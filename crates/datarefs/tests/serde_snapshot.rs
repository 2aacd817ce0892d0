// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON shape of introspection snapshots (requires the `serde` feature).

#![cfg(feature = "serde")]

use datarefs::{AccessorTable, ArrayAccessor, Registry, RegistryConfig, ScalarAccessor, TypeTag};

#[test]
fn test_info_serializes_to_json() {
    let reg = Registry::with_config(RegistryConfig::builtin());
    let table = AccessorTable::new()
        .scalar(ScalarAccessor::<f32>::read_only(|| 1.0))
        .array(ArrayAccessor::<f32>::read_only(|_, _| 0));
    let h = reg.register("demo/pitot", false, table, "pitot").unwrap();

    let json = serde_json::to_value(reg.info(h).unwrap()).expect("serialize");
    assert_eq!(json["name"], "demo/pitot");
    assert_eq!(json["capabilities"], 18);
    assert_eq!(json["writable"], false);
    assert_eq!(json["owner"], "pitot");
    assert_eq!(json["state"], "Active");
    assert_eq!(json["generation"], 0);
    assert_eq!(json["shared"], false);
}

#[test]
fn test_slot_info_serializes_to_json() {
    let reg = Registry::with_config(RegistryConfig::builtin());
    reg.share_silent("demo/rpm", TypeTag::Float).unwrap();

    let json = serde_json::to_value(reg.shared_slot_info("demo/rpm").unwrap()).expect("serialize");
    assert_eq!(json["name"], "demo/rpm");
    assert_eq!(json["refcount"], 1);
    assert_eq!(json["owns_backing"], true);
}
