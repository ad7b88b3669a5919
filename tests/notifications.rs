// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change notifications seen through the public API.

logwise::declare_logging_domain!();

use ambient::AmbientKey;
use ambient::context::Snapshot;
use std::sync::{Arc, LazyLock, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn key_logging_to(log: &Log, name: &'static str) -> AmbientKey<&'static str> {
    let log = log.clone();
    AmbientKey::with_notifications(move |change| {
        log.lock().unwrap().push(format!(
            "{name}: {:?} -> {:?} ({})",
            change.previous.as_deref(),
            change.current.as_deref(),
            if change.context_changed { "switch" } else { "set" }
        ));
    })
}

fn drain(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

#[test]
fn documented_scenario() {
    let log = Log::default();
    let k = key_logging_to(&log, "k");

    k.set("x");
    assert_eq!(drain(&log), vec![r#"k: None -> Some("x") (set)"#]);

    Snapshot::run(Some(Snapshot::default()), || {}).unwrap();
    assert_eq!(
        drain(&log),
        vec![r#"k: Some("x") -> None (switch)"#, r#"k: None -> Some("x") (switch)"#]
    );
}

static PHASE: LazyLock<AmbientKey<&'static str>> = LazyLock::new(AmbientKey::new);

#[test]
fn handler_runs_after_the_slot_switched() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let k = AmbientKey::<u32>::with_notifications(move |change| {
        sink.lock()
            .unwrap()
            .push((change.current.as_deref().copied(), PHASE.get().map(|p| *p)));
    });

    PHASE.set("first");
    k.set(1);
    let one = Snapshot::capture();
    PHASE.set("second");
    k.set(2);
    Snapshot::run(one, || assert_eq!(*k.get().unwrap(), 1)).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (Some(1), Some("first")),
            (Some(2), Some("second")),
            (Some(1), Some("first")),
            (Some(2), Some("second")),
        ]
    );
}

#[test]
fn many_keys_each_fire_once_per_switch() {
    let log = Log::default();
    let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t"];
    let keys: Vec<_> = names.iter().map(|n| key_logging_to(&log, n)).collect();
    for (key, name) in keys.iter().zip(names) {
        key.set(name);
    }
    assert_eq!(drain(&log).len(), names.len());

    Snapshot::run(Some(Snapshot::default()), || {
        assert_eq!(drain(&log).len(), names.len());
    })
    .unwrap();
    let restored = drain(&log);
    assert_eq!(restored.len(), names.len());
    for name in names {
        assert_eq!(restored.iter().filter(|l| l.starts_with(&format!("{name}:"))).count(), 1);
    }
}
