//! Durable cache behavior: record format, TTL expiry, corruption
//! handling, rehydration, and eviction bounds.

use chrono::{Duration, Utc};
use tempfile::TempDir;

use civicmind::cache::{CacheEntry, ResponseCache};
use civicmind::config::CacheConfig;

fn cache_config(dir: &TempDir) -> CacheConfig {
    CacheConfig {
        dir: dir.path().to_path_buf(),
        ..CacheConfig::default()
    }
}

fn store_sample(cache: &mut ResponseCache, query: &str) {
    cache.store(
        query,
        "Contact the department at 1913.",
        "Greater Chennai Corporation",
        &["Official department reference data".to_string()],
    );
}

#[test]
fn round_trip_returns_stored_fields() {
    let tmp = TempDir::new().unwrap();
    let mut cache = ResponseCache::open(&cache_config(&tmp));

    let sources = vec!["source a".to_string(), "source b".to_string()];
    cache.store("water leak in adyar", "call 044-4567-4567", "Chennai Metro Water", &sources);

    let entry = cache.lookup("water leak in adyar").expect("entry present");
    assert_eq!(entry.response, "call 044-4567-4567");
    assert_eq!(entry.department, "Chennai Metro Water");
    assert_eq!(entry.sources, sources);
}

#[test]
fn zero_ttl_never_serves_entries() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig {
        ttl_hours: 0,
        ..cache_config(&tmp)
    };
    let mut cache = ResponseCache::open(&config);

    store_sample(&mut cache, "some query");
    assert!(cache.lookup("some query").is_none());
}

#[test]
fn durable_record_matches_contract() {
    let tmp = TempDir::new().unwrap();
    let mut cache = ResponseCache::open(&cache_config(&tmp));
    store_sample(&mut cache, "garbage in mylapore");

    let files: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .flatten()
        .filter(|e| e.path().extension().map(|x| x == "json").unwrap_or(false))
        .collect();
    assert_eq!(files.len(), 1);

    let content = std::fs::read_to_string(files[0].path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();

    for field in ["query", "response", "department", "sources", "timestamp", "cache_key"] {
        assert!(value.get(field).is_some(), "missing field {field}");
    }
    // Timestamp is ISO-8601.
    let ts = value["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    // The key in the record matches the file name.
    let stem = files[0].path().file_stem().unwrap().to_string_lossy().to_string();
    assert_eq!(value["cache_key"].as_str().unwrap(), stem);
}

#[test]
fn expired_durable_entry_is_deleted_on_lookup() {
    let tmp = TempDir::new().unwrap();
    let config = cache_config(&tmp);

    // Hand-write a record with a timestamp beyond the TTL.
    let key = ResponseCache::cache_key("old query");
    let entry = CacheEntry {
        cache_key: key.clone(),
        query: "old query".to_string(),
        response: "stale".to_string(),
        department: "Greater Chennai Corporation".to_string(),
        sources: vec![],
        timestamp: Utc::now() - Duration::hours(config.ttl_hours + 1),
    };
    let path = tmp.path().join(format!("{key}.json"));
    std::fs::write(&path, serde_json::to_string(&entry).unwrap()).unwrap();

    let mut cache = ResponseCache::open(&config);
    assert!(cache.lookup("old query").is_none());
    assert!(!path.exists(), "expired record should be deleted");
}

#[test]
fn corrupted_record_is_treated_as_miss_and_deleted() {
    let tmp = TempDir::new().unwrap();
    let config = cache_config(&tmp);

    let key = ResponseCache::cache_key("broken query");
    let path = tmp.path().join(format!("{key}.json"));
    std::fs::write(&path, "{ not valid json").unwrap();

    let mut cache = ResponseCache::open(&config);
    assert!(cache.lookup("broken query").is_none());
    assert!(!path.exists(), "corrupted record should be deleted");
}

#[test]
fn reopened_cache_rehydrates_recent_records() {
    let tmp = TempDir::new().unwrap();
    let config = cache_config(&tmp);

    {
        let mut cache = ResponseCache::open(&config);
        store_sample(&mut cache, "first query");
        store_sample(&mut cache, "second query");
    }

    let mut cache = ResponseCache::open(&config);
    assert_eq!(cache.stats().memory_size, 2);

    let entry = cache.lookup("first query").expect("rehydrated entry");
    assert_eq!(entry.department, "Greater Chennai Corporation");
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn memory_eviction_keeps_most_recent_entries() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig {
        memory_capacity: 5,
        ..cache_config(&tmp)
    };
    let mut cache = ResponseCache::open(&config);

    for i in 0..8 {
        store_sample(&mut cache, &format!("query number {i}"));
    }
    assert_eq!(cache.stats().memory_size, 5);

    // Remove durable copies so lookups can only be served from memory.
    for entry in std::fs::read_dir(tmp.path()).unwrap().flatten() {
        std::fs::remove_file(entry.path()).unwrap();
    }

    for i in 3..8 {
        assert!(
            cache.lookup(&format!("query number {i}")).is_some(),
            "entry {i} should have survived eviction"
        );
    }
    for i in 0..3 {
        assert!(
            cache.lookup(&format!("query number {i}")).is_none(),
            "entry {i} should have been evicted"
        );
    }
}

#[test]
fn durable_eviction_trims_to_bound() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig {
        memory_capacity: 3,
        durable_capacity: 4,
        ..cache_config(&tmp)
    };
    let mut cache = ResponseCache::open(&config);

    for i in 0..7 {
        store_sample(&mut cache, &format!("durable query {i}"));
    }
    cache.evict();

    assert_eq!(cache.stats().durable_count, 4);
}

#[test]
fn clear_removes_everything() {
    let tmp = TempDir::new().unwrap();
    let mut cache = ResponseCache::open(&cache_config(&tmp));

    for i in 0..4 {
        store_sample(&mut cache, &format!("clear me {i}"));
    }
    let removed = cache.clear(None);

    assert_eq!(removed, 4);
    assert_eq!(cache.stats().memory_size, 0);
    assert_eq!(cache.stats().durable_count, 0);
}

#[test]
fn overwriting_a_key_keeps_single_record() {
    let tmp = TempDir::new().unwrap();
    let mut cache = ResponseCache::open(&cache_config(&tmp));

    cache.store("same query", "first answer", "GCC", &[]);
    cache.store("same query", "second answer", "GCC", &[]);

    assert_eq!(cache.stats().durable_count, 1);
    let entry = cache.lookup("same query").unwrap();
    assert_eq!(entry.response, "second answer");
}

#[test]
fn stats_report_zero_rate_without_requests() {
    let tmp = TempDir::new().unwrap();
    let cache = ResponseCache::open(&cache_config(&tmp));
    let stats = cache.stats();
    assert_eq!(stats.total_requests, 0);
    assert_eq!(stats.hit_rate_percent, 0.0);
}
