//! Scripted extraction processes for download tests.


use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::{AudioExtractor, DownloadQueueSupervisor, ExtractionProcess, ProcessExit};
use crate::config::DownloadConfig;
use crate::error::Error;
use crate::types::Event;

/// How a fake extraction process behaves
#[derive(Clone, Copy, Debug)]
pub(super) enum Script {
    /// Exits with `code` on the `polls`-th status check
    ExitAfter { polls: usize, code: Option<i32> },
    /// Never exits on its own
    Hang,
    /// Every status check fails
    PollError,
    /// The process cannot be started
    SpawnError,
}

pub(super) const SUCCEED: Script = Script::ExitAfter {
    polls: 1,
    code: Some(0),
};

/// What the fake extractor observed
#[derive(Debug, Default)]
pub(super) struct ProcessLog {
    pub spawned: Vec<String>,
    pub kills: HashMap<String, usize>,
    pub live: usize,
    pub max_live: usize,
}

impl ProcessLog {
    pub fn kills_of(&self, url: &str) -> usize {
        self.kills.get(url).copied().unwrap_or(0)
    }

    pub fn total_kills(&self) -> usize {
        self.kills.values().sum()
    }
}

pub(super) struct FakeExtractor {
    scripts: HashMap<String, Script>,
    default: Script,
    log: Arc<Mutex<ProcessLog>>,
}

impl FakeExtractor {
    pub fn new(default: Script) -> Self {
        Self {
            scripts: HashMap::new(),
            default,
            log: Arc::default(),
        }
    }

    pub fn with(mut self, url: &str, script: Script) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    pub fn log(&self) -> Arc<Mutex<ProcessLog>> {
        Arc::clone(&self.log)
    }
}

impl AudioExtractor for FakeExtractor {
    fn spawn(&self, url: &str) -> crate::Result<Box<dyn ExtractionProcess>> {
        let script = self.scripts.get(url).copied().unwrap_or(self.default);
        if let Script::SpawnError = script {
            return Err(Error::ExternalTool(format!("cannot run extractor for {url}")));
        }

        let mut log = self.log.lock().unwrap();
        log.spawned.push(url.to_string());
        log.live += 1;
        log.max_live = log.max_live.max(log.live);

        Ok(Box::new(FakeProcess {
            url: url.to_string(),
            script,
            polls: 0,
            alive: true,
            log: Arc::clone(&self.log),
        }))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct FakeProcess {
    url: String,
    script: Script,
    polls: usize,
    alive: bool,
    log: Arc<Mutex<ProcessLog>>,
}

impl FakeProcess {
    fn end(&mut self) {
        if self.alive {
            self.alive = false;
            self.log.lock().unwrap().live -= 1;
        }
    }
}

impl ExtractionProcess for FakeProcess {
    fn try_wait(&mut self) -> std::io::Result<Option<ProcessExit>> {
        self.polls += 1;
        match self.script {
            Script::ExitAfter { polls, code } if self.polls >= polls => {
                self.end();
                Ok(Some(ProcessExit { code }))
            }
            Script::PollError => Err(std::io::Error::other("status unavailable")),
            _ => Ok(None),
        }
    }

    fn kill(&mut self) -> std::io::Result<()> {
        *self
            .log
            .lock()
            .unwrap()
            .kills
            .entry(self.url.clone())
            .or_default() += 1;
        self.end();
        Ok(())
    }
}

pub(super) fn url(n: u32) -> String {
    format!("https://www.youtube.com/watch?v=song{n}")
}

pub(super) fn new_supervisor(
    extractor: FakeExtractor,
    config: &DownloadConfig,
) -> (DownloadQueueSupervisor, broadcast::Receiver<Event>) {
    let (event_tx, events) = broadcast::channel(1000);
    let supervisor = DownloadQueueSupervisor::new(Arc::new(extractor), config, event_tx);
    (supervisor, events)
}

pub(super) fn drain(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
