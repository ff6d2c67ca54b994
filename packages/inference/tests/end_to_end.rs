use hotspot_map_config::HotspotMapConfig;
use hotspot_map_feature_models::{FeatureSchemaDefinition, RawRecord, RawValue};
use hotspot_map_geo_models::GeoPoint;
use hotspot_map_hotspot::progress::null_progress;
use hotspot_map_hotspot_models::IncidentReport;
use hotspot_map_inference::{InferenceService, RiskBucketer};
use hotspot_map_inference_models::RiskLevel;
use hotspot_map_pipeline::{FeatureTable, TrainingInput, TrainingPipeline};

fn row(lat: f64, lng: f64, hour: f64, day: f64, month: f64) -> RawRecord {
    RawRecord::from([
        ("latitude".to_string(), RawValue::Number(lat)),
        ("longitude".to_string(), RawValue::Number(lng)),
        ("hour".to_string(), RawValue::Number(hour)),
        ("day".to_string(), RawValue::Number(day)),
        ("month".to_string(), RawValue::Number(month)),
    ])
}

fn training_input() -> TrainingInput {
    let mut reports = vec![IncidentReport::at(GeoPoint::new(40.0868, -75.7005).unwrap()); 6];
    for i in 0..10 {
        reports.push(IncidentReport::at(
            GeoPoint::new(39.0 + f64::from(i) * 0.1, -74.0).unwrap(),
        ));
    }

    let mut rows = Vec::new();
    for i in 0..25 {
        let jitter = f64::from(i % 4) * 0.0001;
        rows.push(row(
            40.0868 + jitter,
            -75.7005 + jitter,
            17.0 + f64::from(i % 4),
            f64::from(i % 7),
            6.0,
        ));
        rows.push(row(
            39.2 + f64::from(i) * 0.03,
            -74.5 + f64::from(i) * 0.02,
            f64::from(i % 24),
            f64::from((i + 2) % 7),
            1.0 + f64::from(i % 12),
        ));
    }

    TrainingInput {
        reports,
        features: FeatureTable::new(rows),
    }
}

#[test]
fn train_persist_load_and_serve() {
    let outcome = TrainingPipeline::new(HotspotMapConfig::default())
        .unwrap()
        .run(&training_input(), &null_progress())
        .unwrap();

    let dir = std::env::temp_dir().join(format!("hotspot_map_e2e_{}", uuid::Uuid::new_v4()));
    let path = dir.join("bundle.json");
    hotspot_map_artifacts::save(&outcome.artifacts, &path).unwrap();

    let service = InferenceService::from_path(
        &path,
        FeatureSchemaDefinition::hotspot_v1(),
        RiskBucketer::default(),
    )
    .unwrap();
    assert_eq!(service.version(), outcome.artifacts.version);

    let hot: RawRecord = serde_json::from_str(
        r#"{"latitude": 40.0868, "longitude": -75.7005, "hour": 18, "dayofweek": 2, "month": 6}"#,
    )
    .unwrap();
    let result = service.predict(&hot).unwrap();
    assert_eq!(result.hotspot_prediction, 1, "{result:?}");
    assert_eq!(result.risk_level, RiskLevel::High);
    assert_eq!(result.color.to_string(), "red");

    let cold: RawRecord = serde_json::from_str(
        r#"{"latitude": 39.5, "longitude": -74.3, "hour": 3, "day": 5, "month": 1}"#,
    )
    .unwrap();
    let result = service.predict(&cold).unwrap();
    assert_eq!(result.hotspot_prediction, 0, "{result:?}");
    assert_eq!(result.risk_level, RiskLevel::Low);

    let again = service.predict(&cold).unwrap();
    assert_eq!(again.probability.to_bits(), result.probability.to_bits());

    std::fs::remove_dir_all(&dir).ok();
}
