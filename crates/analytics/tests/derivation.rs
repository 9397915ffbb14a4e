use analytics::{AnalyticsError, MetricsEngine};
use core_types::{ElasticityRecord, PromotionSummary};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn record(
    category: &str,
    elasticity: f64,
    current: f64,
    optimum: f64,
    change: f64,
) -> ElasticityRecord {
    ElasticityRecord::new(category, elasticity, current, optimum, change)
}

fn promotion(name: &str) -> PromotionSummary {
    PromotionSummary {
        name: name.to_string(),
        sales_increase: dec!(12.5),
        average_check: dec!(3),
        conversion_rate: None,
    }
}

/// Two categories, one on each side of the elastic threshold.
fn reference_records() -> Vec<ElasticityRecord> {
    vec![
        record("A", -1.8, 100.0, 90.0, -10.0),
        record("B", -0.4, 200.0, 210.0, 5.0),
    ]
}

#[test]
fn reference_metrics() {
    let engine = MetricsEngine::default();
    let metrics = engine
        .derive_metrics(&reference_records(), &[promotion("Spring"), promotion("Summer")])
        .unwrap();

    assert_eq!(metrics.avg_elasticity, dec!(-1.10));
    // Only "A" is elastic: |-10| * 100 / 100.
    assert_eq!(metrics.lost_profit, dec!(10));
    // Only "B" counts towards growth: 5 * 200 / 100.
    assert_eq!(metrics.potential_growth, dec!(10));
    assert_eq!(metrics.active_promotions, 2);
    assert_eq!(metrics.record_count, 2);
}

#[test]
fn materiality_threshold_is_strict() {
    let engine = MetricsEngine::default();
    let recommendations = engine.derive_recommendations(&reference_records()).unwrap();
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0].product, "A");

    let mut records = reference_records();
    records[1].recommended_change = 6.0;
    let recommendations = engine.derive_recommendations(&records).unwrap();
    let products: Vec<&str> = recommendations.iter().map(|r| r.product.as_str()).collect();
    assert_eq!(products, vec!["A", "B"]);
}

#[test]
fn recommendation_fields() {
    let engine = MetricsEngine::default();
    let recommendations = engine.derive_recommendations(&reference_records()).unwrap();
    let a = &recommendations[0];

    assert_eq!(a.current_price, dec!(100));
    assert_eq!(a.recommended_price, dec!(90));
    assert_eq!(a.potential_profit.absolute.round_dp(9), dec!(10));
    assert_eq!(a.potential_profit.percentage, dec!(10));
    assert_eq!(a.confidence.round_dp(9), dec!(90));
    assert_eq!(a.priority.round_dp(9), dec!(18));
}

#[test]
fn empty_input_yields_zeroed_metrics() {
    let engine = MetricsEngine::default();
    let metrics = engine.derive_metrics(&[], &[promotion("Spring")]).unwrap();

    assert!(metrics.is_empty());
    assert_eq!(metrics.avg_elasticity, Decimal::ZERO);
    assert_eq!(metrics.lost_profit, Decimal::ZERO);
    assert_eq!(metrics.potential_growth, Decimal::ZERO);
    assert_eq!(metrics.active_promotions, 1);

    assert!(engine.derive_recommendations(&[]).unwrap().is_empty());
}

#[test]
fn average_is_the_arithmetic_mean() {
    let engine = MetricsEngine::default();
    let records: Vec<ElasticityRecord> = (0..10)
        .map(|i| record(&format!("C{i}"), -0.25 * i as f64, 10.0, 10.0, 0.0))
        .collect();
    let metrics = engine.derive_metrics(&records, &[]).unwrap();
    // -11.25 / 10 = -1.125, rounded half away from zero.
    assert_eq!(metrics.avg_elasticity, dec!(-1.13));
}

#[test]
fn rounding_is_half_away_from_zero() {
    let engine = MetricsEngine::default();

    let metrics = engine
        .derive_metrics(&[record("X", -0.125, 10.0, 10.0, 0.0)], &[])
        .unwrap();
    assert_eq!(metrics.avg_elasticity, dec!(-0.13));

    // 2.5 of lost profit and -2.5 of growth.
    let metrics = engine
        .derive_metrics(
            &[
                record("Elastic", -2.0, 50.0, 47.5, -5.0),
                record("Inelastic", -0.5, 50.0, 47.5, -5.0),
            ],
            &[],
        )
        .unwrap();
    assert_eq!(metrics.lost_profit, dec!(3));
    assert_eq!(metrics.potential_growth, dec!(-3));
}

#[test]
fn unit_elasticity_counts_towards_growth_only() {
    let engine = MetricsEngine::default();
    let metrics = engine
        .derive_metrics(&[record("Edge", -1.0, 100.0, 110.0, 10.0)], &[])
        .unwrap();
    assert_eq!(metrics.lost_profit, dec!(0));
    assert_eq!(metrics.potential_growth, dec!(10));
}

#[test]
fn partition_covers_every_record_once() {
    let engine = MetricsEngine::default();
    let records = vec![
        record("E1", -3.0, 100.0, 80.0, -20.0),
        record("E2", -1.5, 40.0, 36.0, -10.0),
        record("I1", -1.0, 10.0, 11.0, 10.0),
        record("I2", -0.5, 20.0, 24.0, 20.0),
    ];
    let metrics = engine.derive_metrics(&records, &[]).unwrap();

    let elastic_only = engine.derive_metrics(&records[..2], &[]).unwrap();
    let inelastic_only = engine.derive_metrics(&records[2..], &[]).unwrap();

    assert_eq!(metrics.lost_profit, elastic_only.lost_profit);
    assert_eq!(inelastic_only.lost_profit, Decimal::ZERO);
    assert_eq!(metrics.potential_growth, inelastic_only.potential_growth);
    assert_eq!(elastic_only.potential_growth, Decimal::ZERO);
    assert_eq!(metrics.lost_profit, dec!(24));
    assert_eq!(metrics.potential_growth, dec!(5));
}

#[test]
fn list_is_capped_and_sorted_by_priority() {
    let engine = MetricsEngine::default();
    let records: Vec<ElasticityRecord> = (1..=8)
        .map(|i| record(&format!("P{i}"), -0.5 * i as f64, 10.0, 11.0, 10.0))
        .collect();
    let recommendations = engine.derive_recommendations(&records).unwrap();

    assert_eq!(recommendations.len(), 5);
    for pair in recommendations.windows(2) {
        assert!(pair[0].priority >= pair[1].priority);
    }
    let products: Vec<&str> = recommendations.iter().map(|r| r.product.as_str()).collect();
    assert_eq!(products, vec!["P8", "P7", "P6", "P5", "P4"]);
}

#[test]
fn equal_priorities_keep_input_order() {
    let engine = MetricsEngine::default();
    let records = vec![
        record("First", -1.0, 10.0, 12.0, 20.0),
        record("Second", -2.0, 10.0, 11.0, 10.0),
        record("Third", -0.5, 10.0, 14.0, 40.0),
    ];
    let products: Vec<String> = engine
        .derive_recommendations(&records)
        .unwrap()
        .into_iter()
        .map(|r| r.product)
        .collect();
    assert_eq!(products, vec!["First", "Second", "Third"]);
}

#[test]
fn confidence_stays_within_bounds() {
    let engine = MetricsEngine::default();
    let records = vec![
        record("Flat", 0.0, 10.0, 11.0, 10.0),
        record("Steep", -4.0, 10.0, 9.0, -10.0),
        record("Positive", 3.0, 10.0, 11.0, 10.0),
    ];
    for r in engine.derive_recommendations(&records).unwrap() {
        assert!(r.confidence >= Decimal::ZERO && r.confidence <= dec!(100), "{:?}", r);
    }
}

#[test]
fn malformed_record_is_reported_with_its_index() {
    let engine = MetricsEngine::default();
    let mut records = reference_records();
    records.push(record("Broken", f64::NAN, 10.0, 10.0, 0.0));

    let err = engine.derive_metrics(&records, &[]).unwrap_err();
    match err {
        AnalyticsError::MalformedRecord { index, category, .. } => {
            assert_eq!(index, 2);
            assert_eq!(category, "Broken");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    records[2] = record("Negative", -1.0, -10.0, 10.0, 0.0);
    assert!(engine.derive_recommendations(&records).is_err());
}

#[test]
fn products_outside_decimal_range_are_errors_not_panics() {
    let engine = MetricsEngine::default();
    // Every field fits in a Decimal, but change * price does not.
    let records = vec![
        record("A", -1.8, 100.0, 90.0, -10.0),
        record("Big", -0.5, 1e20, 1e21, 1e10),
    ];

    for err in [
        engine.derive_metrics(&records, &[]).unwrap_err(),
        engine.derive_recommendations(&records).unwrap_err(),
        engine.derive_dashboard(&records, &[]).unwrap_err(),
    ] {
        match err {
            AnalyticsError::MalformedRecord { index, category, .. } => {
                assert_eq!(index, 1);
                assert_eq!(category, "Big");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

#[test]
fn overflowing_totals_are_calculation_errors() {
    let engine = MetricsEngine::default();
    // Each lost-profit term is 7e26; two hundred of them exceed the decimal range.
    let records: Vec<ElasticityRecord> = (0..200)
        .map(|i| record(&format!("C{i}"), -2.0, 7e26, 7e26, -100.0))
        .collect();

    let err = engine.derive_metrics(&records, &[]).unwrap_err();
    assert!(matches!(err, AnalyticsError::Calculation(_)), "{err:?}");
}

#[test]
fn combined_derivation_matches_separate_calls() {
    let engine = MetricsEngine::default();
    let records = reference_records();
    let promotions = vec![promotion("Spring")];

    let (metrics, recommendations) = engine.derive_dashboard(&records, &promotions).unwrap();
    assert_eq!(metrics, engine.derive_metrics(&records, &promotions).unwrap());
    assert_eq!(recommendations, engine.derive_recommendations(&records).unwrap());
}
