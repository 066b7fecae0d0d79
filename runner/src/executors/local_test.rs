use super::{local::LocalExecutor, ExecutorError};
use crate::{
    config::{HarnessConfig, IngestorConfig, OutputConfig},
    database::{ResultStore, RunResult, Transcript},
    experiments::Experiment,
    ingest::IngestorError,
    sweep::{OpacityMode, RunConfig},
};
use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};
use tempfile::{tempdir, TempDir};

// Writing a script while another test forks can make exec fail with ETXTBSY,
// so every test that writes or runs a stub holds this lock
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

    path
}

struct Setup {
    dir: TempDir,
    config: HarnessConfig,
    store: ResultStore,
}

fn setup(low: &str, high: &str) -> Setup {
    let dir = tempdir().unwrap();
    let benchmarks = vec![
        stub(dir.path(), "concurrent", low),
        stub(dir.path(), "concurrent-50", high),
    ];
    let config = HarnessConfig {
        benchmarks,
        output: OutputConfig {
            directory: dir.path().to_path_buf(),
            data_file: PathBuf::from("experiment_data.json"),
        },
        ..HarnessConfig::default()
    };
    fs::write(config.output.data_path(), "{}").unwrap();
    let store = ResultStore::load(config.output.data_path()).unwrap();

    Setup { dir, config, store }
}

const PRINT_METRICS: &str = r#"echo "Running $3 transactions"
echo "...real time: 12.345 ...ARRAY_SZ: 1000...""#;

fn single_config() -> RunConfig {
    RunConfig {
        variant: 0,
        trial: 0,
        transactions: 7_096_320,
        threads: 1,
        tx_length: 1,
        opacity: OpacityMode::Disabled,
    }
}

#[test]
fn single_run_is_recorded() {
    let _guard = serial();
    let Setup {
        dir,
        config,
        mut store,
    } = setup(PRINT_METRICS, PRINT_METRICS);
    let executor = LocalExecutor::load(&config, false).unwrap();
    let mut transcript = Transcript::new("single");

    let result = executor
        .run_single(&single_config(), &mut store, &mut transcript)
        .unwrap();

    let expected = RunResult {
        time: 12.345,
        array_size: 1000,
    };
    assert_eq!(result, expected);
    assert_eq!(store.get(&single_config().key()), Some(&expected));
    assert_eq!(store.len(), 1);

    let command = format!(
        "{} 3 array --ntrans=7096320 --nthreads=1 --opspertrans=1 --opacity=0",
        config.benchmarks[0].to_string_lossy()
    );
    assert_eq!(
        transcript.as_str(),
        format!(
            "{command}\nRunning --ntrans=7096320 transactions\n...real time: 12.345 ...ARRAY_SZ: 1000...\n"
        )
    );

    let path = transcript.save(dir.path()).unwrap();
    assert!(fs::read_to_string(path).unwrap().starts_with(&command));
}

#[test]
fn arguments_reach_the_benchmark() {
    let _guard = serial();
    let Setup {
        dir,
        config,
        mut store,
    } = setup(
        r#"echo "$@" > "$(dirname "$0")/args"
echo "real time: 1.0"
echo "ARRAY_SZ: 1""#,
        "",
    );
    let executor = LocalExecutor::load(&config, false).unwrap();
    let run = RunConfig {
        variant: 0,
        trial: 2,
        transactions: 50_000_000,
        threads: 8,
        tx_length: 5,
        opacity: OpacityMode::Slow,
    };

    executor
        .run_single(&run, &mut store, &mut Transcript::default())
        .unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("args")).unwrap(),
        "3 array --ntrans=50000000 --nthreads=8 --opspertrans=5 --opacity=2\n"
    );
}

#[test]
fn stderr_is_merged_into_output() {
    let _guard = serial();
    let Setup {
        dir: _dir,
        config,
        mut store,
    } = setup(
        r#"echo "real time: 0.75" >&2
echo "ARRAY_SZ: 64""#,
        "",
    );
    let executor = LocalExecutor::load(&config, false).unwrap();
    let mut transcript = Transcript::default();

    let result = executor
        .run_single(&single_config(), &mut store, &mut transcript)
        .unwrap();

    assert_eq!(
        result,
        RunResult {
            time: 0.75,
            array_size: 64
        }
    );
    assert!(transcript.as_str().contains("real time: 0.75\nARRAY_SZ: 64\n"));
}

#[test]
fn experiment_flushes_store_and_transcript() {
    let _guard = serial();
    let Setup {
        dir,
        config,
        mut store,
    } = setup("exit 3", PRINT_METRICS);
    let executor = LocalExecutor::load(&config, false).unwrap();

    executor
        .run_experiment(Experiment::ScalabilityHiContention, 2, &mut store)
        .unwrap();

    let reloaded = ResultStore::load(config.output.data_path()).unwrap();
    assert_eq!(reloaded.len(), 4);
    for key in [
        "1/0/4000000/1/25/0",
        "1/0/4000000/24/25/0",
        "1/1/4000000/1/25/0",
        "1/1/4000000/24/25/0",
    ] {
        assert_eq!(
            reloaded.get(&key.parse().unwrap()),
            Some(&RunResult {
                time: 12.345,
                array_size: 1000
            })
        );
    }

    let transcript =
        fs::read_to_string(dir.path().join("scalability_hi_contention_stdout.txt")).unwrap();
    assert!(transcript.starts_with("@@@ Running with no opacity, txlen 25. Trail #0\n"));
    assert!(transcript.contains("@@@ Running with no opacity, txlen 25. Trail #1\n"));
    assert_eq!(transcript.matches("--opspertrans=25").count(), 4);
}

#[test]
fn repeated_experiment_overwrites_results() {
    let _guard = serial();
    let Setup {
        dir,
        config,
        mut store,
    } = setup(
        r#"counter="$(dirname "$0")/counter"
echo x >> "$counter"
echo "real time: $(wc -l < "$counter" | tr -d ' ').5"
echo "ARRAY_SZ: 10""#,
        "",
    );
    let executor = LocalExecutor::load(&config, false).unwrap();

    executor
        .run_experiment(Experiment::ScalabilityOverhead, 1, &mut store)
        .unwrap();
    executor
        .run_experiment(Experiment::ScalabilityOverhead, 1, &mut store)
        .unwrap();

    let reloaded = ResultStore::load(config.output.data_path()).unwrap();
    assert_eq!(reloaded.len(), 13);
    // 13 runs per pass, the second pass replaced every result
    assert_eq!(
        reloaded.get(&"0/0/8000000/1/50/0".parse().unwrap()),
        Some(&RunResult {
            time: 14.5,
            array_size: 10
        })
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("counter"))
            .unwrap()
            .lines()
            .count(),
        26
    );
}

#[test]
fn failing_benchmark_aborts_without_flushing() {
    let _guard = serial();
    let Setup {
        dir,
        config,
        mut store,
    } = setup(
        r#"echo x >> "$(dirname "$0")/counter"
echo "real time: 1.0"
echo "ARRAY_SZ: 1"
exit 1"#,
        "",
    );
    let executor = LocalExecutor::load(&config, false).unwrap();

    let error = executor
        .run_experiment(Experiment::ScalabilityOverhead, 3, &mut store)
        .unwrap_err();

    assert!(matches!(error, ExecutorError::Failed { ref status, .. } if status.code() == Some(1)));
    assert!(store.is_empty());
    assert_eq!(
        fs::read_to_string(config.output.data_path()).unwrap(),
        "{}"
    );
    assert!(!dir.path().join("scalability_overhead_stdout.txt").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("counter"))
            .unwrap()
            .lines()
            .count(),
        1
    );
}

#[test]
fn missing_marker_aborts_without_recording() {
    let _guard = serial();
    let Setup {
        dir,
        config,
        mut store,
    } = setup(r#"echo "real time: 1.0""#, "");
    let executor = LocalExecutor::load(&config, false).unwrap();

    let error = executor
        .run_experiment(Experiment::ScalabilityLargeTx, 1, &mut store)
        .unwrap_err();

    assert!(matches!(
        error,
        ExecutorError::Ingest(IngestorError::MissingMarker { .. })
    ));
    assert!(store.is_empty());
    assert!(!dir.path().join("scalability_largetx_stdout.txt").exists());
}

#[test]
fn unknown_variant() {
    let _guard = serial();
    let Setup {
        dir: _dir,
        mut config,
        mut store,
    } = setup(PRINT_METRICS, PRINT_METRICS);
    config.benchmarks.truncate(1);
    let executor = LocalExecutor::load(&config, false).unwrap();

    assert!(matches!(
        executor.run_experiment(Experiment::ScalabilityHiContention, 1, &mut store),
        Err(ExecutorError::UnknownVariant(1))
    ));
}

#[test]
fn dry_run_executes_nothing() {
    let _guard = serial();
    let Setup {
        dir,
        config,
        mut store,
    } = setup(r#"echo x >> "$(dirname "$0")/counter""#, "");
    let executor = LocalExecutor::load(&config, true).unwrap();

    executor
        .run_experiment(Experiment::ScalabilityOverhead, 2, &mut store)
        .unwrap();

    assert!(!dir.path().join("counter").exists());
    assert!(!dir.path().join("scalability_overhead_stdout.txt").exists());
    assert_eq!(
        fs::read_to_string(config.output.data_path()).unwrap(),
        "{}"
    );
}

#[test]
fn yaml_ingestor_end_to_end() {
    let _guard = serial();
    let Setup {
        dir: _dir,
        mut config,
        mut store,
    } = setup("echo 'time: 2.5'\necho 'array_size: 99'", "");
    config.ingest = IngestorConfig::Yaml;
    let executor = LocalExecutor::load(&config, false).unwrap();

    let result = executor
        .run_single(&single_config(), &mut store, &mut Transcript::default())
        .unwrap();

    assert_eq!(
        result,
        RunResult {
            time: 2.5,
            array_size: 99
        }
    );
}

#[test]
fn failure_keeps_earlier_checkpoints() {
    let _guard = serial();
    let Setup {
        dir,
        config,
        mut store,
    } = setup("echo 'benchmark crashed'\nexit 1", PRINT_METRICS);
    let executor = LocalExecutor::load(&config, false).unwrap();

    executor
        .run_experiment(Experiment::ScalabilityHiContention, 3, &mut store)
        .unwrap();
    assert!(matches!(
        executor.run_experiment(Experiment::ScalabilityOverhead, 3, &mut store),
        Err(ExecutorError::Failed { .. })
    ));

    let reloaded = ResultStore::load(config.output.data_path()).unwrap();
    assert_eq!(reloaded.len(), 6);
    for trial in 0..3 {
        for threads in [1, 24] {
            let key = format!("1/{trial}/4000000/{threads}/25/0");
            assert!(reloaded.get(&key.parse().unwrap()).is_some(), "{key}");
        }
    }
    assert!(dir
        .path()
        .join("scalability_hi_contention_stdout.txt")
        .exists());
    assert!(!dir.path().join("scalability_overhead_stdout.txt").exists());
}
