//! Shared test fixtures: a scripted in-process fetcher and a recording consumer.

#![allow(dead_code)]

use spriteflow::MaterializedRecord;
use spriteflow::engine::{FetchResponse, Fetcher};
use spriteflow::pipeline::RecordSink;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// What the scripted fetcher does for one URL.
#[derive(Clone)]
pub enum Scripted {
    Ok(Vec<u8>),
    NotFound,
    Fail(&'static str),
    Panic,
}

/// Fetcher answering from a table after an optional per-URL delay.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: HashMap<String, (Duration, Scripted)>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, delay_ms: u64, response: Scripted) -> Self {
        self.script
            .insert(url.to_string(), (Duration::from_millis(delay_ms), response));
        self
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<FetchResponse> {
        let Some((delay, response)) = self.script.get(url) else {
            return Ok(FetchResponse::NotFound);
        };
        thread::sleep(*delay);
        match response {
            Scripted::Ok(bytes) => Ok(FetchResponse::Found(bytes.clone())),
            Scripted::NotFound => Ok(FetchResponse::NotFound),
            Scripted::Fail(msg) => anyhow::bail!("{msg}"),
            Scripted::Panic => panic!("scripted panic for {url}"),
        }
    }
}

/// Consumer that remembers every record name it saw, in order.
pub struct RecordingSink {
    pub label: String,
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new(label: &str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                label: label.to_string(),
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

impl RecordSink for RecordingSink {
    fn label(&self) -> &str {
        &self.label
    }

    fn accept(&mut self, record: &MaterializedRecord, _waited: Duration) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(record.name.clone());
        Ok(())
    }
}

/// Consumer that panics on its first record.
pub struct PanickingSink;

impl RecordSink for PanickingSink {
    fn label(&self) -> &str {
        "boom"
    }

    fn accept(&mut self, record: &MaterializedRecord, _waited: Duration) -> anyhow::Result<()> {
        panic!("cannot handle {}", record.name)
    }
}
