//! End-to-end pipeline behavior over a temporary cache directory.
//!
//! All tests run fully offline: generation is disabled and live fetch
//! is off, so the composer exercises its deterministic template path.

use tempfile::TempDir;

use civicmind::config::Config;
use civicmind::models::PipelineResult;
use civicmind::pipeline::Pipeline;

/// Config with an isolated cache dir and the bundled data files.
fn test_config(cache_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.cache.dir = cache_dir.path().to_path_buf();
    config.knowledge.civic_data_path = "./data/civic_data.json".into();
    config.knowledge.pincode_path = "./data/pincodes.json".into();
    config
}

fn assert_result_sane(result: &PipelineResult) {
    assert!(!result.response.is_empty());
    assert!(!result.department.is_empty());
    assert!(result.processing_time >= 0.0);
}

#[tokio::test]
async fn water_query_in_adyar_routes_to_metro_water() {
    let tmp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(test_config(&tmp));

    let result = pipeline.process("Water supply issue in Adyar").await;

    assert_eq!(result.department, "Chennai Metro Water");
    assert_eq!(result.area.as_deref(), Some("Adyar"));
    assert_eq!(result.issue_category.as_deref(), Some("water_supply"));
    assert!(result.response.contains("044-4567-4567"));
    assert!(!result.cache_hit);
}

#[tokio::test]
async fn bus_complaint_without_area_is_general_tnstc() {
    let tmp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(test_config(&tmp));

    let result = pipeline.process("Bus route complaint").await;

    assert_eq!(result.department, "TNSTC");
    assert_eq!(result.area.as_deref(), Some("Chennai"));
    assert_eq!(result.issue_category.as_deref(), Some("transport"));
}

#[tokio::test]
async fn gibberish_defaults_to_corporation() {
    let tmp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(test_config(&tmp));

    let result = pipeline.process("qwerty zxcvb asdfgh").await;

    assert_eq!(result.department, "Greater Chennai Corporation");
    assert_eq!(result.issue_category.as_deref(), Some("general"));
    assert!(result.response.contains("1913"));
}

#[tokio::test]
async fn identical_query_hits_cache_second_time() {
    let tmp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(test_config(&tmp));

    let first = pipeline.process("Garbage not collected in T. Nagar").await;
    let second = pipeline.process("Garbage not collected in T. Nagar").await;

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(second.department, first.department);
    assert_eq!(second.response, first.response);
}

#[tokio::test]
async fn spelling_variant_hits_same_cache_entry() {
    let tmp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(test_config(&tmp));

    let first = pipeline.process("Garbage problem in T. Nagar").await;
    let second = pipeline.process("garbage problem in tnagar").await;

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
}

#[tokio::test]
async fn pipeline_never_fails_on_garbled_input() {
    let tmp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(test_config(&tmp));

    let mut queries: Vec<String> = vec![
        String::new(),
        " ".to_string(),
        "\t\n".to_string(),
        "a".repeat(10_000),
        "!!!???;;;:::...".to_string(),
        "SELECT * FROM users; DROP TABLE users".to_string(),
        "水道の問題".to_string(),
        "🚰🚮🚌".to_string(),
    ];
    for i in 0..92 {
        queries.push(format!("garbled-{i}-{}", "x".repeat(i * 7 % 53)));
    }
    assert_eq!(queries.len(), 100);

    for query in &queries {
        let result = pipeline.process(query).await;
        assert_result_sane(&result);
    }
    assert_eq!(pipeline.session.query_count, 100);
}

#[tokio::test]
async fn missing_data_files_fall_back_to_embedded_dataset() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.knowledge.civic_data_path = tmp.path().join("does-not-exist.json");
    config.knowledge.pincode_path = tmp.path().join("also-missing.json");

    let mut pipeline = Pipeline::new(config);
    let result = pipeline.process("Water supply issue in Adyar").await;

    // The embedded dataset still routes water to Metro Water with the
    // standard contact number.
    assert_eq!(result.department, "Chennai Metro Water");
    assert!(result.response.contains("044-4567-4567"));
}

#[tokio::test]
async fn session_counters_accumulate() {
    let tmp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(test_config(&tmp));

    pipeline.process("water leak in Adyar").await;
    pipeline.process("pothole on my street").await;
    pipeline.process("water leak in Adyar").await; // cache hit

    assert_eq!(pipeline.session.query_count, 3);
    assert_eq!(pipeline.session.response_times.len(), 3);
    assert_eq!(pipeline.session.history.len(), 3);
    assert!(pipeline.session.average_response_time().is_some());

    let stats = pipeline.cache_stats();
    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
}

#[tokio::test]
async fn feedback_is_recorded_against_classified_category() {
    let tmp = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(test_config(&tmp));

    pipeline.process("power outage in Velachery").await;
    pipeline.record_feedback("power outage in Velachery", true);
    pipeline.record_feedback("power outage in Velachery", false);

    let counters = pipeline.feedback().category_accuracy();
    let electricity = counters.get("electricity").unwrap();
    assert_eq!(electricity.total, 2);
    assert_eq!(electricity.correct, 1);
    assert_eq!(pipeline.feedback().positive_rate(), Some(0.5));
}

#[tokio::test]
async fn maintenance_runs_without_disturbing_results() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.pipeline.maintenance_interval = 5;

    let mut pipeline = Pipeline::new(config);
    for i in 0..12 {
        let result = pipeline.process(&format!("road repair request {i}")).await;
        assert_result_sane(&result);
    }
    assert_eq!(pipeline.session.query_count, 12);
}
