//! # ECDH Keyring Testkit
//!
//! Testing utilities for the ECDH keyring.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a temporary directory plus settings, with helpers to write
//!   key files and key lists and to build a registry over them
//! - **Generators**: proptest strategies for key lists mixing good and bad
//!   definitions
//!
//! ## Test Fixtures
//!
//! ```rust
//! use ecdh_keyring_testkit::fixtures::KeyringFixture;
//! use ecdh_keyring_core::Curve;
//! use serde_json::json;
//!
//! let fixture = KeyringFixture::new();
//! let k1 = fixture.write_key("k1.key", Curve::X25519);
//! fixture.write_keys_list("keys.json", &json!({
//!     "k1": { "curve": "x25519", "privateKey": "k1.key" }
//! }));
//!
//! let registry = fixture.registry().unwrap();
//! assert!(ecdh_keyring_testkit::fixtures::agrees(&registry, "k1", &k1));
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ecdh_keyring_testkit::generators::{entry_plan, write_plan};
//!
//! proptest! {
//!     #[test]
//!     fn only_good_entries_load(plan in entry_plan(12)) {
//!         let fixture = KeyringFixture::new();
//!         let layout = write_plan(&fixture, &plan);
//!         let registry = fixture.registry().unwrap();
//!         prop_assert_eq!(registry.key_ids(), layout.expected_ids);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{agrees, init_tracing, FixtureRegistry, KeyringFixture};
pub use generators::{entry_plan, entry_spec, write_plan, EntrySpec, PlanLayout};
