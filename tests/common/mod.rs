use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use reprolab::error::{Result, ReprolabError};
use reprolab::jobs::{JobId, JobStatusRecord, JobStatusSource};
use reprolab::summary::{
    DailySummaryCacheEntry, GeneratorPayload, SummaryCache, SummaryGenerator, SummaryKey,
};

/// Ordered log of remote calls shared between fakes
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[allow(dead_code)]
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Local time at UTC-3
#[allow(dead_code)]
pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
    FixedOffset::west_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
}

#[allow(dead_code)]
pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[derive(Default)]
struct CacheState {
    rows: Mutex<HashMap<SummaryKey, DailySummaryCacheEntry>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    fail_gets: Mutex<bool>,
}

/// Summary table held in memory; clones share state
#[derive(Clone)]
pub struct InMemorySummaryCache {
    state: Arc<CacheState>,
    log: CallLog,
}

#[allow(dead_code)]
impl InMemorySummaryCache {
    pub fn new(log: CallLog) -> Self {
        Self {
            state: Arc::new(CacheState::default()),
            log,
        }
    }

    pub fn insert(&self, key: SummaryKey, entry: DailySummaryCacheEntry) {
        self.state.rows.lock().unwrap().insert(key, entry);
    }

    pub fn row(&self, key: &SummaryKey) -> Option<DailySummaryCacheEntry> {
        self.state.rows.lock().unwrap().get(key).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.state.rows.lock().unwrap().len()
    }

    pub fn gets(&self) -> usize {
        self.state.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.state.puts.load(Ordering::SeqCst)
    }

    pub fn fail_gets(&self, fail: bool) {
        *self.state.fail_gets.lock().unwrap() = fail;
    }
}

#[async_trait]
impl SummaryCache for InMemorySummaryCache {
    async fn get(&self, key: &SummaryKey) -> Result<Option<DailySummaryCacheEntry>> {
        self.state.gets.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(format!("get {}", key.client_id));
        if *self.state.fail_gets.lock().unwrap() {
            return Err(ReprolabError::Backend {
                status: 503,
                message: "storage unavailable".to_string(),
            }
            .into());
        }
        Ok(self.row(key))
    }

    async fn put(&self, key: &SummaryKey, entry: &DailySummaryCacheEntry) -> Result<()> {
        self.state.puts.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(format!("put {}", key.client_id));
        self.insert(key.clone(), entry.clone());
        Ok(())
    }
}

/// Outcome a [`ScriptedGenerator`] returns for one call
#[derive(Clone)]
#[allow(dead_code)]
pub enum GeneratorStep {
    Summary(&'static str, DateTime<Utc>),
    Refuse(&'static str),
}

#[derive(Default)]
struct GeneratorState {
    steps: Mutex<VecDeque<GeneratorStep>>,
    payloads: Mutex<Vec<GeneratorPayload>>,
}

/// Generator that replays scripted steps and yields once per call
#[derive(Clone)]
pub struct ScriptedGenerator {
    state: Arc<GeneratorState>,
    log: CallLog,
}

#[allow(dead_code)]
impl ScriptedGenerator {
    pub fn new(log: CallLog, steps: Vec<GeneratorStep>) -> Self {
        let state = GeneratorState {
            steps: Mutex::new(steps.into()),
            payloads: Mutex::new(Vec::new()),
        };
        Self {
            state: Arc::new(state),
            log,
        }
    }

    pub fn calls(&self) -> usize {
        self.state.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<GeneratorPayload> {
        self.state.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummaryGenerator for ScriptedGenerator {
    async fn generate(&self, payload: &GeneratorPayload) -> Result<DailySummaryCacheEntry> {
        self.state.payloads.lock().unwrap().push(payload.clone());
        self.log
            .lock()
            .unwrap()
            .push(format!("generate {}", payload.client_id));

        tokio::task::yield_now().await;

        let step = self
            .state
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("generator called more times than scripted");
        self.log
            .lock()
            .unwrap()
            .push(format!("generated {}", payload.client_id));

        match step {
            GeneratorStep::Summary(text, generated_at) => Ok(DailySummaryCacheEntry {
                summary: text.to_string(),
                generated_at,
            }),
            GeneratorStep::Refuse(message) => {
                Err(ReprolabError::Generation(message.to_string()).into())
            }
        }
    }
}

/// Outcome a [`ScriptedJobSource`] returns for one fetch
#[derive(Clone)]
#[allow(dead_code)]
pub enum JobStep {
    Status(&'static str),
    /// Answer with the status after holding the fetch open this long
    Slow(&'static str, Duration),
    Missing,
}

/// Job source replaying a script; the last step repeats forever
#[derive(Clone)]
pub struct ScriptedJobSource {
    steps: Arc<Mutex<VecDeque<JobStep>>>,
    fetches: Arc<Mutex<Vec<(JobId, tokio::time::Instant)>>>,
}

#[allow(dead_code)]
impl ScriptedJobSource {
    pub fn new(steps: Vec<JobStep>) -> Self {
        assert!(!steps.is_empty());
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            fetches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn fetches(&self) -> Vec<(JobId, tokio::time::Instant)> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobStatusSource for ScriptedJobSource {
    async fn fetch_status(&self, job_id: &JobId) -> Result<JobStatusRecord> {
        self.fetches
            .lock()
            .unwrap()
            .push((job_id.clone(), tokio::time::Instant::now()));

        let step = {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front().unwrap()
            } else {
                steps.front().cloned().unwrap()
            }
        };

        match step {
            JobStep::Status(status) => Ok(JobStatusRecord::new(status)),
            JobStep::Slow(status, delay) => {
                tokio::time::sleep(delay).await;
                Ok(JobStatusRecord::new(status))
            }
            JobStep::Missing => Err(ReprolabError::NotFound(format!("job {}", job_id)).into()),
        }
    }
}
