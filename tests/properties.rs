use std::collections::BTreeSet;

use bulkdeck::field::parse_real;
use bulkdeck::format::print_float;
use bulkdeck::{FieldValue, collapse_thru, expand_thru};
use proptest::prelude::*;

fn tokens(values: &[FieldValue]) -> Vec<String> {
    values
        .iter()
        .map(|value| match value {
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Text(t) => t.clone(),
            other => panic!("unexpected {other:?}"),
        })
        .collect()
}

proptest! {
    #[test]
    fn range_compression_is_invertible(ids in prop::collection::btree_set(1u32..400, 0..80), min_run in 2usize..6) {
        let ids: Vec<u32> = ids.into_iter().collect();
        let written = tokens(&collapse_thru(&ids, min_run));
        let expanded = expand_thru(&written).unwrap();
        prop_assert_eq!(&expanded, &ids);
        prop_assert_eq!(tokens(&collapse_thru(&expanded, min_run)), written);
    }

    #[test]
    fn expanded_ranges_are_sorted_and_unique(ids in prop::collection::btree_set(1u32..10_000, 1..50)) {
        let ids: Vec<u32> = ids.into_iter().collect();
        let expanded = expand_thru(&tokens(&collapse_thru(&ids, 3))).unwrap();
        let unique: BTreeSet<u32> = expanded.iter().copied().collect();
        prop_assert_eq!(unique.len(), expanded.len());
    }

    #[test]
    fn floats_fit_eight_columns(mantissa in 1.0f64..10.0, exponent in -30i32..30, negative in any::<bool>()) {
        let sign = if negative { -1.0 } else { 1.0 };
        let value = sign * mantissa * 10f64.powi(exponent);
        let text = print_float(value, 8).unwrap();
        prop_assert!(text.len() <= 8, "{} -> {}", value, text);
        let parsed = parse_real(&text).unwrap();
        prop_assert!(((parsed - value) / value).abs() < 1e-2, "{} -> {}", value, text);
    }
}
