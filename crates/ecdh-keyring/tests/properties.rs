//! Property: N enabled entries with M bad ones load exactly N - M keys.

use ecdh_keyring::KeyRegistry;
use ecdh_keyring::source::FsSecretLoader;
use ecdh_keyring_testkit::{agrees, entry_plan, write_plan, KeyringFixture};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn only_well_formed_entries_load(plan in entry_plan(10)) {
        let fixture = KeyringFixture::new();
        let layout = write_plan(&fixture, &plan);

        let (registry, report) = KeyRegistry::initialize_with_report(
            fixture.protocol(),
            fixture.settings().clone(),
            FsSecretLoader,
        )
        .unwrap();

        prop_assert_eq!(registry.key_ids(), layout.expected_ids.clone());
        prop_assert_eq!(report.failures.len(), layout.expected_failures);
        for (id, exchange) in &layout.exchanges {
            prop_assert!(agrees(&registry, id, exchange));
        }
    }

    #[test]
    fn anonymous_key_is_added_on_top(plan in entry_plan(6)) {
        let fixture = KeyringFixture::new();
        let layout = write_plan(&fixture, &plan);
        let anon = fixture.write_key("anon.key", ecdh_keyring::Curve::Secp256k1);
        fixture.configure_anonymous("secp256k1", fixture.path("anon.key"));

        let registry = fixture.registry().unwrap();

        prop_assert_eq!(registry.len(), layout.expected_ids.len() + 1);
        prop_assert!(agrees(&registry, "", &anon));
    }

    #[test]
    fn failed_reload_preserves_every_key(plan in entry_plan(6)) {
        let fixture = KeyringFixture::new();
        let layout = write_plan(&fixture, &plan);
        let registry = fixture.registry().unwrap();

        fixture.write_file("keys.json", "not json at all");
        prop_assert!(registry.reload().is_err());

        prop_assert_eq!(registry.key_ids(), layout.expected_ids.clone());
        for (id, exchange) in &layout.exchanges {
            prop_assert!(agrees(&registry, id, exchange));
        }
    }
}
