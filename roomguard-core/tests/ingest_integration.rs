//! Ingestion path tests: normalizer, store and evaluators together
//!
//! The normalizer must accept anything a device or a broken bridge can put
//! on the wire, so its never-fail contract is checked with generated
//! payloads.

mod common;

use std::sync::Arc;

use proptest::prelude::*;
use roomguard_core::{
    fields, AlertCategory, FixedTime, FusionScorer, MemoryStore, Normalizer, RawPayload, Reading,
    ReadingStore, SensorKind, StoreConfig, TrendEvaluator, WindowQuery,
};
use serde_json::{json, Map, Value};

use common::{count, T0};

fn normalizer() -> Normalizer {
    Normalizer::new(Arc::new(FixedTime::new(T0)))
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_topic() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("sensors/pir/NODE_01".to_string()),
        Just("sensors/ultrasonic/NODE_01".to_string()),
        Just("sensors/dht22/NODE_01".to_string()),
        Just("sensors/combined/NODE_01".to_string()),
        Just("wearable/fall/BAND_01".to_string()),
        Just("devices/NODE_01/status".to_string()),
        "[a-z/+#]{0,24}",
    ]
}

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<f64>().prop_map(Value::from),
        "[ -~]{0,12}".prop_map(Value::from),
    ]
}

fn arb_json() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map(
                prop_oneof![
                    Just("device_id".to_string()),
                    Just("timestamp".to_string()),
                    Just("sensors".to_string()),
                    Just("value".to_string()),
                    Just("motion_detected".to_string()),
                    Just("temperature_c".to_string()),
                    "[a-z_]{1,10}",
                ],
                inner,
                0..6,
            )
            .prop_map(|map| Value::Object(map.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

proptest! {
    #[test]
    fn normalize_never_panics_on_bytes(topic in arb_topic(), payload in prop::collection::vec(any::<u8>(), 0..256)) {
        let n = normalizer();
        let reading = n.normalize(&topic, &payload);
        prop_assert!(!reading.device_id.is_empty());

        let batch = n.normalize_batch(&topic, &payload);
        prop_assert!(!batch.is_empty());
    }

    #[test]
    fn normalize_never_panics_on_json(topic in arb_topic(), value in arb_json()) {
        let payload = serde_json::to_vec(&value).unwrap_or_default();
        let n = normalizer();

        let reading = n.normalize(&topic, &payload);
        let all_valid = reading.values.values().all(|v| match v {
            roomguard_core::FieldValue::Number(x) => !x.is_nan(),
            roomguard_core::FieldValue::Flag(_) => true,
        });
        prop_assert!(all_valid);
        prop_assert!(!n.normalize_batch(&topic, &payload).is_empty());
    }

    #[test]
    fn truncated_records_are_malformed(cut in 1usize..20) {
        let full = br#"{"device_id": "NODE_01", "temperature_c": 22.5}"#;
        let end = full.len().saturating_sub(cut);
        let parsed = RawPayload::parse(&full[..end]);
        prop_assert!(matches!(parsed, RawPayload::Malformed(_)));
    }
}

#[test]
fn test_stream_to_alerts() {
    let n = normalizer();
    let store = MemoryStore::new(StoreConfig::default());
    let evaluator = TrendEvaluator::default();

    let payloads = [(T0, 20.0), (T0 + 30, 20.5), (T0 + 60, 24.0)];
    let mut last_alerts = Vec::new();
    for (at, temp) in payloads {
        let payload = json!({"device_id": "NODE_01", "timestamp": at, "temperature_c": temp});
        let reading = n.normalize("sensors/dht22/NODE_01", payload.to_string().as_bytes());
        store.append_reading(reading.clone()).unwrap();

        let window = store
            .recent_readings(
                &WindowQuery::since(at - evaluator.config().fluctuation_window_secs)
                    .device("NODE_01")
                    .kind(SensorKind::TemperatureHumidity),
            )
            .unwrap();
        last_alerts = evaluator.evaluate(&reading.device_id, &reading, &window);
    }

    assert_eq!(last_alerts.len(), 1);
    assert_eq!(count(&last_alerts, AlertCategory::RapidFluctuation), 1);
}

#[test]
fn test_combined_payload_feeds_fusion() {
    let n = normalizer();
    let store = MemoryStore::default();

    for i in 0..16 {
        let payload = json!({
            "device_id": "NODE_01",
            "location": "Bedroom",
            "timestamp": T0 + i * 2,
            "sensors": {
                "pir": {"motion_detected": false},
                "ultrasonic": {"distance_cm": 30.0},
                "dht22": {"temperature_c": 22.0, "humidity_percent": 45.0}
            },
            "wifi": {"rssi": -60}
        });
        for reading in n.normalize_batch("sensors/combined/NODE_01", payload.to_string().as_bytes()) {
            store.append_reading(reading).unwrap();
        }
    }

    let window = store
        .recent_readings(&WindowQuery::since(T0).device("NODE_01"))
        .unwrap();
    assert_eq!(window.len(), 64);

    let score = FusionScorer::default().score_incident(&window);
    assert!(score.detected);
    assert!(score.corroborated);
    assert_eq!(score.location, "Bedroom");
}

#[test]
fn test_bad_device_clock_does_not_starve_other_devices() {
    let n = normalizer();
    let store = MemoryStore::new(StoreConfig::default());
    let evaluator = TrendEvaluator::default();

    let future = n.normalize(
        "sensors/dht22/BAD",
        json!({"temperature_c": 22.0, "timestamp": 4_000_000_000i64}).to_string().as_bytes(),
    );
    assert_eq!(future.captured_at, T0);
    store.append_reading(future).unwrap();
    // A far-future reading that reached the store some other way
    let stray = Reading::new("BAD", SensorKind::TemperatureHumidity, 4_000_000_000)
        .with_value(fields::TEMPERATURE_C, 22.0);
    store.append_reading(stray).unwrap();

    let mut last_alerts = Vec::new();
    for (at, temp) in [(T0, 20.0), (T0 + 10, 20.5), (T0 + 20, 24.0)] {
        let payload = json!({"timestamp": at, "temperature_c": temp});
        let reading = n.normalize("sensors/dht22/GOOD", payload.to_string().as_bytes());
        store.append_reading(reading.clone()).unwrap();

        let window = store
            .recent_readings(
                &WindowQuery::since(at - evaluator.config().fluctuation_window_secs).device("GOOD"),
            )
            .unwrap();
        last_alerts = evaluator.evaluate(&reading.device_id, &reading, &window);
    }

    let good = store.recent_readings(&WindowQuery::since(0).device("GOOD")).unwrap();
    assert_eq!(good.len(), 3);
    assert_eq!(count(&last_alerts, AlertCategory::RapidFluctuation), 1);
}
