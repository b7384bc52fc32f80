//! Proptest strategies for key lists.
//!
//! A plan is a list of [`EntrySpec`]s. [`write_plan`] turns it into key files
//! and a key list inside a [`KeyringFixture`], and says which identifiers a
//! load is expected to produce.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ecdh_keyring_core::{Curve, KeyExchange};
use proptest::prelude::*;
use serde_json::{json, Value};

use crate::fixtures::KeyringFixture;

/// How one key-list entry should look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySpec {
    /// Valid entry, raw key file.
    Valid(Curve),
    /// Valid entry, hex key file.
    HexValid(Curve),
    /// Valid key file but `"enable": false`.
    Disabled(Curve),
    /// `"curve": ""`.
    EmptyCurve,
    /// `"privateKey": ""`.
    EmptyPrivateKey,
    /// Key file never written.
    MissingFile(Curve),
    /// Key file with content no curve accepts.
    CorruptKey(Curve),
    /// A curve name outside the supported set.
    UnsupportedCurve,
    /// Entry value is not an object.
    Malformed,
}

impl EntrySpec {
    /// Whether the loader looks at the entry at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, EntrySpec::Disabled(_))
    }

    /// Whether the entry ends up in the registry.
    pub fn loads(&self) -> bool {
        matches!(self, EntrySpec::Valid(_) | EntrySpec::HexValid(_))
    }
}

/// Any supported curve.
pub fn curve() -> impl Strategy<Value = Curve> {
    prop_oneof![
        Just(Curve::X25519),
        Just(Curve::Secp256k1),
        Just(Curve::Secp256r1),
    ]
}

/// One entry, biased toward valid ones.
pub fn entry_spec() -> impl Strategy<Value = EntrySpec> {
    prop_oneof![
        4 => curve().prop_map(EntrySpec::Valid),
        1 => curve().prop_map(EntrySpec::HexValid),
        1 => curve().prop_map(EntrySpec::Disabled),
        1 => Just(EntrySpec::EmptyCurve),
        1 => Just(EntrySpec::EmptyPrivateKey),
        1 => curve().prop_map(EntrySpec::MissingFile),
        1 => curve().prop_map(EntrySpec::CorruptKey),
        1 => Just(EntrySpec::UnsupportedCurve),
        1 => Just(EntrySpec::Malformed),
    ]
}

/// Up to `max_len` entries.
pub fn entry_plan(max_len: usize) -> impl Strategy<Value = Vec<EntrySpec>> {
    proptest::collection::vec(entry_spec(), 0..=max_len)
}

/// What [`write_plan`] wrote.
#[derive(Debug)]
pub struct PlanLayout {
    /// The key-list file.
    pub keys_list: PathBuf,
    /// Identifiers a load should register, sorted.
    pub expected_ids: Vec<String>,
    /// Enabled entries a load should skip.
    pub expected_failures: usize,
    /// The keys behind `expected_ids`.
    pub exchanges: BTreeMap<String, KeyExchange>,
}

/// Materialize `plan` as `keys.json` plus key files, and configure the
/// fixture to use it. Entry `i` gets identifier `key-{i:03}`.
pub fn write_plan(fixture: &KeyringFixture, plan: &[EntrySpec]) -> PlanLayout {
    let mut list = serde_json::Map::new();
    let mut exchanges = BTreeMap::new();

    for (i, spec) in plan.iter().enumerate() {
        let id = format!("key-{i:03}");
        let file = format!("{id}.key");

        let entry = match *spec {
            EntrySpec::Valid(curve) => {
                exchanges.insert(id.clone(), fixture.write_key(&file, curve));
                json!({ "curve": curve.name(), "privateKey": file })
            }
            EntrySpec::HexValid(curve) => {
                exchanges.insert(id.clone(), fixture.write_hex_key(&file, curve));
                json!({ "curve": curve.name(), "privateKey": file })
            }
            EntrySpec::Disabled(curve) => {
                fixture.write_key(&file, curve);
                json!({ "curve": curve.name(), "privateKey": file, "enable": false })
            }
            EntrySpec::EmptyCurve => {
                fixture.write_key(&file, Curve::X25519);
                json!({ "curve": "", "privateKey": file })
            }
            EntrySpec::EmptyPrivateKey => json!({ "curve": "x25519", "privateKey": "" }),
            EntrySpec::MissingFile(curve) => json!({ "curve": curve.name(), "privateKey": file }),
            EntrySpec::CorruptKey(curve) => {
                fixture.write_file(&file, "not a private key");
                json!({ "curve": curve.name(), "privateKey": file })
            }
            EntrySpec::UnsupportedCurve => {
                fixture.write_key(&file, Curve::Secp256r1);
                json!({ "curve": "secp384r1", "privateKey": file })
            }
            EntrySpec::Malformed => json!(["not", "an", "object"]),
        };
        list.insert(id, entry);
    }

    let keys_list = fixture.write_keys_list("keys.json", &Value::Object(list));
    let expected_failures = plan
        .iter()
        .filter(|spec| spec.is_enabled() && !spec.loads())
        .count();

    PlanLayout {
        keys_list,
        expected_ids: exchanges.keys().cloned().collect(),
        expected_failures,
        exchanges,
    }
}
