#![allow(dead_code)]

use std::fs;

use phpantom_reflection::{Broker, ReflectConfig};

/// Build a broker from in-memory source units, registered in order.
pub fn broker_with(sources: &[&str]) -> Broker {
    let mut broker = Broker::new();
    for (i, source) in sources.iter().enumerate() {
        let file = format!("unit{i}.php");
        broker
            .register_source(source, Some(&file))
            .unwrap_or_else(|e| panic!("unit {i} failed to register: {e}"));
    }
    broker
}

/// Build a broker with a custom configuration.
pub fn broker_with_config(config: ReflectConfig, sources: &[&str]) -> Broker {
    let mut broker = Broker::with_config(config);
    for source in sources {
        broker.register_source(source, None).expect("unit failed to register");
    }
    broker
}

/// Helper: create a temp directory with PHP files, returning the guard so
/// the files outlive the test body.
pub fn create_php_tree(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (rel_path, content) in files {
        let full = dir.path().join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create dirs");
        }
        fs::write(&full, content).expect("failed to write PHP file");
    }
    dir
}

/// Sorted member names, for order-independent assertions.
pub fn names<T, F: Fn(&T) -> String>(items: &[T], f: F) -> Vec<String> {
    let mut out: Vec<String> = items.iter().map(f).collect();
    out.sort();
    out
}
