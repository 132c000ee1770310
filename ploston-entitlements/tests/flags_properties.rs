//! Property-based tests for flag derivation.

mod common;

use common::license_with;
use ploston_entitlements::{derive, PremiumFeature};
use proptest::prelude::*;

fn feature_subset() -> impl Strategy<Value = Vec<&'static str>> {
    prop::sample::subsequence(
        PremiumFeature::ALL.iter().map(|f| f.token()).collect::<Vec<_>>(),
        0..=PremiumFeature::ALL.len(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn derive_is_deterministic(features in feature_subset()) {
        let info = license_with(&features);
        prop_assert_eq!(derive(&info), derive(&info));
    }

    #[test]
    fn core_flags_hold_for_any_features(features in feature_subset()) {
        let flags = derive(&license_with(&features));
        prop_assert!(flags.workflows && flags.mcp && flags.rest_api);
    }

    #[test]
    fn premium_flag_iff_token_present(features in feature_subset()) {
        let flags = derive(&license_with(&features));
        for feature in PremiumFeature::ALL {
            prop_assert_eq!(flags.is_enabled(feature), features.contains(&feature.token()));
        }
    }
}
