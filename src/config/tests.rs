use super::*;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_citeflow_env() {
    let names = [
        "CITEFLOW_INPUT_CSV",
        "CITEFLOW_OUTPUT_DIR",
        "CITEFLOW_CACHE_DIR",
        "CITEFLOW_CREDENTIALS_PATH",
        "CITEFLOW_CROSSREF_MAILTO",
        "CITEFLOW_USER_AGENT",
        "CITEFLOW_MODEL_PATH",
        "CITEFLOW_FETCH_WORKERS",
        "CITEFLOW_INFERENCE_WORKERS",
        "CITEFLOW_BATCH_SIZE",
        "CITEFLOW_MAX_ATTEMPTS",
        "CITEFLOW_BASE_WAIT_SECS",
        "CITEFLOW_CAP_WAIT_SECS",
        "CITEFLOW_PAGE_TIMEOUT_SECS",
        "CITEFLOW_API_TIMEOUT_SECS",
        "CITEFLOW_CHECKPOINT_EVERY",
        "CITEFLOW_MIN_ABSTRACT_CHARS",
    ];
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        for name in names {
            env::remove_var(name);
        }
    }
}

#[test]
fn test_default_config() {
    let config = PipelineConfig::default();

    assert_eq!(config.fetch_workers, 5);
    assert_eq!(config.batch_size, 16);
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.base_wait, Duration::from_secs(15));
    assert_eq!(config.cap_wait, Duration::from_secs(180));
    assert_eq!(config.cache_dir, PathBuf::from("./cache"));
    assert!(config.model_path.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_snapshot_paths_live_under_cache_dir() {
    let config = PipelineConfig {
        cache_dir: PathBuf::from("/tmp/cf"),
        ..Default::default()
    };

    assert_eq!(config.scores_snapshot(), PathBuf::from("/tmp/cf/scores.rkyv"));
    assert_eq!(
        config.citations_snapshot(),
        PathBuf::from("/tmp/cf/citations.rkyv")
    );
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_citeflow_env();

    let config = with_env_vars(
        &[("CITEFLOW_CREDENTIALS_PATH", "/nonexistent/credentials.txt")],
        || PipelineConfig::from_env().expect("should parse with defaults"),
    );

    assert_eq!(config.fetch_workers, 5);
    assert_eq!(config.checkpoint_every, 100);
    assert!(config.crossref_mailto.is_none());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_citeflow_env();

    let config = with_env_vars(
        &[
            ("CITEFLOW_FETCH_WORKERS", "8"),
            ("CITEFLOW_BATCH_SIZE", "32"),
            ("CITEFLOW_BASE_WAIT_SECS", "2"),
            ("CITEFLOW_CAP_WAIT_SECS", "60"),
            ("CITEFLOW_CROSSREF_MAILTO", "  someone@example.org "),
        ],
        || PipelineConfig::from_env().expect("should parse overrides"),
    );

    assert_eq!(config.fetch_workers, 8);
    assert_eq!(config.batch_size, 32);
    assert_eq!(config.base_wait, Duration::from_secs(2));
    assert_eq!(config.cap_wait, Duration::from_secs(60));
    assert_eq!(config.crossref_mailto.as_deref(), Some("someone@example.org"));
}

#[test]
#[serial]
fn test_from_env_rejects_garbage_numbers() {
    clear_citeflow_env();

    let result = with_env_vars(&[("CITEFLOW_MAX_ATTEMPTS", "lots")], PipelineConfig::from_env);

    assert!(matches!(
        result,
        Err(ConfigError::InvalidNumber {
            name: "CITEFLOW_MAX_ATTEMPTS",
            ..
        })
    ));
}

#[test]
#[serial]
fn test_mailto_falls_back_to_credentials_file() {
    clear_citeflow_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("credentials.txt");
    std::fs::write(&path, "email: lab@example.edu\napi_key: abc:def\n").unwrap();

    let config = with_env_vars(
        &[("CITEFLOW_CREDENTIALS_PATH", path.to_str().unwrap())],
        || PipelineConfig::from_env().expect("should parse"),
    );

    assert_eq!(config.crossref_mailto.as_deref(), Some("lab@example.edu"));
}

#[test]
fn test_load_credentials_splits_on_first_colon() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("credentials.txt");
    std::fs::write(&path, "api_key: abc:def\nnot a pair\n\n").unwrap();

    let credentials = load_credentials(&path);

    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials["api_key"], "abc:def");
}

#[test]
fn test_validate_rejects_zero_workers() {
    let config = PipelineConfig {
        fetch_workers: 0,
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Zero {
            name: "fetch_workers"
        })
    ));
}

#[test]
fn test_validate_rejects_base_wait_above_cap() {
    let config = PipelineConfig {
        base_wait: Duration::from_secs(300),
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::WaitOrder {
            base_secs: 300,
            cap_secs: 180
        })
    ));
}

#[test]
fn test_validate_rejects_missing_model_dir() {
    let config = PipelineConfig {
        model_path: Some(PathBuf::from("/nonexistent/nli-model")),
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::PathNotFound { .. })
    ));
}

#[test]
fn test_retry_policy_from_config() {
    let config = PipelineConfig::default();
    let policy = config.retry_policy();

    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.base_wait, Duration::from_secs(15));
    assert_eq!(policy.cap_wait, Duration::from_secs(180));
}
