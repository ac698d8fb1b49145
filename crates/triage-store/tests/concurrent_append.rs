//! Concurrent producers appending to shared runs

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use triage_core::{LogCategory, LogLevel, RunId};
use triage_store::{FileStore, MemoryStore, RunLogStore, RunLogger};

const PRODUCERS: usize = 8;
const PER_PRODUCER: usize = 50;

fn hammer(store: Arc<dyn RunLogStore>) {
    thread::scope(|scope| {
        for producer in 0..PRODUCERS {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                let shared = RunLogger::new(Arc::clone(&store), "run-shared", "task-shared");
                let own = RunLogger::new(store, format!("run-{producer}"), "task-own");
                for i in 0..PER_PRODUCER {
                    shared
                        .log(LogLevel::Info, LogCategory::AgentAction, format!("p{producer} step {i}"), None)
                        .unwrap();
                    own.error(LogCategory::Error, format!("failure {i}")).unwrap();
                }
            });
        }
    });
}

fn assert_gapless(store: &dyn RunLogStore, run: &str, expected: usize) {
    let logs = store.get_logs(&RunId::new(run)).unwrap();
    assert_eq!(logs.len(), expected, "{run}");

    let sequences: Vec<u64> = logs.iter().map(|e| e.sequence).collect();
    let expected_sequences: Vec<u64> = (0..expected as u64).collect();
    assert_eq!(sequences, expected_sequences, "{run} sequences are not contiguous");

    let unique: BTreeSet<_> = logs.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(unique.len(), expected, "{run} lost or duplicated an entry");
}

fn check(store: Arc<dyn RunLogStore>) {
    hammer(Arc::clone(&store));

    assert_gapless(store.as_ref(), "run-shared", PRODUCERS * PER_PRODUCER);
    for producer in 0..PRODUCERS {
        let run = format!("run-{producer}");
        assert_gapless(store.as_ref(), &run, PER_PRODUCER);
        let counts = store.count_by_level(&RunId::new(run)).unwrap();
        assert_eq!(counts.get(&LogLevel::Error), Some(&PER_PRODUCER));
    }
}

#[test]
fn memory_store_keeps_every_concurrent_append() {
    check(Arc::new(MemoryStore::new()));
}

#[test]
fn file_store_keeps_every_concurrent_append() {
    let dir = TempDir::new().unwrap();
    check(Arc::new(FileStore::open(dir.path()).unwrap()));
}

#[test]
fn producer_order_is_preserved_within_a_run() {
    let store: Arc<dyn RunLogStore> = Arc::new(MemoryStore::new());
    hammer(Arc::clone(&store));

    let logs = store.get_logs(&RunId::new("run-shared")).unwrap();
    for producer in 0..PRODUCERS {
        let prefix = format!("p{producer} ");
        let steps: Vec<usize> = logs
            .iter()
            .filter_map(|e| e.message.strip_prefix(&prefix))
            .map(|rest| rest.trim_start_matches("step ").parse().unwrap())
            .collect();
        assert_eq!(steps, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}
