//! Racing execution: one logical request, several candidate models.
//!
//! Every candidate is spawned as its own task and reports into a merge
//! channel. The loop consumes settlements in the order they arrive: the first
//! one that both transport-succeeds and parses is the winner. Transport and
//! parse failures are recorded and the race continues. Losing attempts are not
//! cancelled: a background task logs them as they settle and discards their
//! output.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use saga_core::config::AgentSettings;
use saga_core::persistence::{RelationalStore, SqliteStore};
use saga_core::types::{AgentCategory, AgentLogEntry, AttemptStatus};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::client::{CompletionClient, LlmClient};
use crate::error::LlmError;
use crate::types::{ChatRequest, Prompt, ResponseFormat};

// ---------------------------------------------------------------------------
// Agent contract
// ---------------------------------------------------------------------------

/// A structured-output task that can be raced across models.
pub trait LlmAgent: Send + Sync {
    /// What the agent is asked about. Logged verbatim with every attempt.
    type Input: Serialize + Send + Sync;
    /// The shape the completion must parse into.
    type Output: DeserializeOwned + Serialize + Send;

    /// Agent name, used in logs and telemetry rows.
    fn name(&self) -> &'static str;

    /// Responsibility class.
    fn category(&self) -> AgentCategory;

    /// Candidate models and generation parameters.
    fn settings(&self) -> &AgentSettings;

    /// Render the system and user instructions for `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be rendered into a prompt.
    fn prompt(&self, input: &Self::Input) -> Result<Prompt, LlmError>;

    /// The JSON schema the provider should constrain output to.
    fn response_format(&self) -> Option<ResponseFormat>;
}

// ---------------------------------------------------------------------------
// Attempt log sink
// ---------------------------------------------------------------------------

/// Where attempt telemetry goes. Writes are best-effort.
#[async_trait]
pub trait AttemptLogSink: Send + Sync {
    /// Persist a batch of attempt rows.
    ///
    /// # Errors
    ///
    /// Any storage failure; the racing engine logs and ignores it.
    async fn record(&self, entries: &[AgentLogEntry]) -> saga_core::Result<()>;
}

#[async_trait]
impl AttemptLogSink for SqliteStore {
    async fn record(&self, entries: &[AgentLogEntry]) -> saga_core::Result<()> {
        self.insert_logs(entries).await
    }
}

/// An in-process sink, handy for diagnostics and tests.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<AgentLogEntry>>,
}

impl MemoryLogSink {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<AgentLogEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl AttemptLogSink for MemoryLogSink {
    async fn record(&self, entries: &[AgentLogEntry]) -> saga_core::Result<()> {
        self.entries.lock().extend_from_slice(entries);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// One candidate's settlement, as delivered on the merge channel.
struct Settlement {
    index: usize,
    model: String,
    outcome: Result<String, LlmError>,
    respond_time: DateTime<Utc>,
}

/// Drives every candidate model of an agent concurrently and commits the
/// first structurally valid response.
#[derive(Clone)]
pub struct RacingEngine {
    client: Arc<dyn CompletionClient>,
    sink: Arc<dyn AttemptLogSink>,
}

impl RacingEngine {
    /// Create an engine over a completion client and a telemetry sink.
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>, sink: Arc<dyn AttemptLogSink>) -> Self {
        Self { client, sink }
    }

    /// An engine over the HTTP client that logs into `store`.
    #[must_use]
    pub fn with_store(client: LlmClient, store: SqliteStore) -> Self {
        Self::new(Arc::new(client), Arc::new(store))
    }

    /// Race `agent` on `input`.
    ///
    /// # Errors
    ///
    /// - [`LlmError::ConfigError`] if the agent has no candidate models.
    /// - [`LlmError::AllCandidatesFailed`] if no candidate produced output
    ///   that parses as `A::Output`.
    pub async fn run<A: LlmAgent>(&self, agent: &A, input: &A::Input) -> Result<A::Output, LlmError> {
        let settings = agent.settings();
        if settings.models.is_empty() {
            return Err(LlmError::ConfigError(format!("{} has no candidate models", agent.name())));
        }

        let prompt = agent.prompt(input)?;
        let format = agent.response_format();
        let logged_input = serde_json::to_value(input).unwrap_or(Value::Null);
        let request_time = Utc::now();

        let (tx, mut rx) = mpsc::channel::<Settlement>(settings.models.len());
        for (index, model) in settings.models.iter().enumerate() {
            let request = ChatRequest::for_model(model, settings, &prompt, format.clone());
            let client = Arc::clone(&self.client);
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = client.chat(&request).await;
                let settlement = Settlement {
                    index,
                    model: request.model,
                    outcome,
                    respond_time: Utc::now(),
                };
                if tx.send(settlement).await.is_err() {
                    debug!(candidate = index, "race already decided, dropping result");
                }
            });
        }
        drop(tx);

        debug!(agent = agent.name(), candidates = settings.models.len(), "race started");

        let race = Race {
            agent: agent.name(),
            category: agent.category(),
            input: logged_input,
            request_time,
        };
        let mut failures = Vec::new();
        let mut logs = Vec::new();

        while let Some(settled) = rx.recv().await {
            let elapsed_ms = elapsed_ms(request_time, settled.respond_time);
            let raw = match settled.outcome {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(agent = race.agent, model = %settled.model, elapsed_ms, error = %e, "candidate failed");
                    logs.push(race.entry(&settled.model, AttemptStatus::Failed, json!({ "error": e.to_string() }), settled.respond_time));
                    failures.push(format!("{}: {e}", settled.model));
                    continue;
                }
            };

            match LlmClient::parse_structured::<A::Output>(&raw) {
                Ok(output) => {
                    info!(agent = race.agent, model = %settled.model, candidate = settled.index, elapsed_ms, "race won");
                    let logged_output = serde_json::to_value(&output).unwrap_or(Value::Null);
                    logs.push(race.entry(&settled.model, AttemptStatus::Won, logged_output, settled.respond_time));
                    record_best_effort(self.sink.as_ref(), race.agent, &logs).await;
                    tokio::spawn(drain_losers(rx, race, Arc::clone(&self.sink)));
                    return Ok(output);
                }
                Err(e) => {
                    warn!(agent = race.agent, model = %settled.model, elapsed_ms, "candidate output did not parse");
                    let output = json!({ "error": e.to_string(), "raw": raw });
                    logs.push(race.entry(&settled.model, AttemptStatus::Failed, output, settled.respond_time));
                    failures.push(format!("{}: {e}", settled.model));
                }
            }
        }

        record_best_effort(self.sink.as_ref(), race.agent, &logs).await;
        error!(agent = race.agent, failed = failures.len(), "every candidate failed");
        Err(LlmError::AllCandidatesFailed {
            agent: race.agent.to_string(),
            failures,
        })
    }
}

/// What every attempt row of one race shares.
struct Race {
    agent: &'static str,
    category: AgentCategory,
    input: Value,
    request_time: DateTime<Utc>,
}

impl Race {
    fn entry(&self, model: &str, status: AttemptStatus, output: Value, respond_time: DateTime<Utc>) -> AgentLogEntry {
        AgentLogEntry {
            agent: self.agent.to_string(),
            category: self.category,
            model: model.to_string(),
            status,
            input: self.input.clone(),
            output,
            request_time: self.request_time,
            respond_time,
            elapsed_ms: elapsed_ms(self.request_time, respond_time),
        }
    }
}

/// Log attempts that settle after the race was decided. Their output is never
/// used, so a late reply is `Abandoned` even when it would have parsed.
async fn drain_losers(mut rx: mpsc::Receiver<Settlement>, race: Race, sink: Arc<dyn AttemptLogSink>) {
    while let Some(settled) = rx.recv().await {
        let (status, output) = match settled.outcome {
            Ok(raw) => (AttemptStatus::Abandoned, json!({ "raw": raw })),
            Err(e) => (AttemptStatus::Failed, json!({ "error": e.to_string(), "abandoned": true })),
        };
        debug!(agent = race.agent, model = %settled.model, "late candidate settled");
        let entry = race.entry(&settled.model, status, output, settled.respond_time);
        record_best_effort(sink.as_ref(), race.agent, &[entry]).await;
    }
}

async fn record_best_effort(sink: &dyn AttemptLogSink, agent: &str, entries: &[AgentLogEntry]) {
    if entries.is_empty() {
        return;
    }
    if let Err(e) = sink.record(entries).await {
        error!(agent, rows = entries.len(), error = %e, "failed to persist agent logs");
    }
}

fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
