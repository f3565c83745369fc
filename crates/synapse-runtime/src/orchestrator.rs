//! The conversation turn loop.
//!
//! [`ChatOrchestrator::run`] drives one conversation request: resolve the
//! provider, replay the thread's history through the codec, then loop —
//! stream the model, forward text deltas, dispatch requested tool calls
//! through the limiter, persist each completed turn atomically — until a
//! terminal finish reason or the turn budget runs out. The caller consumes
//! the run as a stream of [`AgentEvent`]s.
//!
//! Failure policy: configuration problems surface before the stream
//! exists; anything fatal mid-run becomes a terminal `error` event and the
//! turn in flight is never persisted.

use std::sync::Arc;

use futures::future::join_all;
use futures::StreamExt;
use metrics::counter;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use synapse_core::events::{AgentEvent, FinishReason, StreamEvent};
use synapse_core::messages::{ChatMessage, ToolCallRequest, UsageReport, UsageTotals};
use synapse_core::tools::ToolDefinition;
use synapse_llm::{ChatRequest, LlmProvider, ProviderRegistry};
use synapse_store::store::{AssistantTurn, ToolResultRecord};
use synapse_store::ChatStore;
use synapse_tools::registry::ToolRegistry;
use synapse_tools::traits::ContextVariables;

use crate::codec::decode_history;
use crate::config::{AgentConfig, RunOptions};
use crate::errors::{Result, RuntimeError};
use crate::executor::execute_tool_call;
use crate::limiter::StepLimiter;

/// Capacity of the event channel between the run task and the caller.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Top-level conversation engine.
pub struct ChatOrchestrator {
    providers: ProviderRegistry,
    tools: Arc<ToolRegistry>,
    context: ContextVariables,
    store: Arc<ChatStore>,
}

impl ChatOrchestrator {
    /// Create an orchestrator over explicit collaborators.
    pub fn new(
        providers: ProviderRegistry,
        tools: Arc<ToolRegistry>,
        context: ContextVariables,
        store: Arc<ChatStore>,
    ) -> Self {
        Self {
            providers,
            tools,
            context,
            store,
        }
    }

    /// Start one conversation run.
    ///
    /// Fails before any streaming on an unresolvable provider, an
    /// unregistered tool name in the config, or an unknown thread. The
    /// returned stream ends after a terminal `finish` or `error` event.
    #[instrument(skip(self, config, options, cancel), fields(thread_id = %options.thread_id, model = %config.model))]
    pub fn run(
        &self,
        config: AgentConfig,
        options: RunOptions,
        cancel: CancellationToken,
    ) -> Result<ReceiverStream<AgentEvent>> {
        let resolved = self.providers.resolve(&config.model)?;

        // Instantiating here validates tool names and context up front.
        let mut definitions = Vec::with_capacity(config.tools.len());
        for name in &config.tools {
            let tool = self.tools.instantiate(name, &self.context)?;
            definitions.push(tool.definition());
        }

        if self.store.get_thread(&options.thread_id)?.is_none() {
            return Err(RuntimeError::Store(
                synapse_store::StoreError::ThreadNotFound(options.thread_id.clone()),
            ));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let run = RunState {
            provider: resolved.provider,
            model: resolved.model,
            config,
            options,
            definitions,
            tools: Arc::clone(&self.tools),
            context: self.context.clone(),
            store: Arc::clone(&self.store),
            cancel,
            tx,
        };
        let _ = tokio::spawn(run.drive());
        Ok(ReceiverStream::new(rx))
    }
}

/// Everything one spawned run owns.
struct RunState {
    provider: Arc<dyn LlmProvider>,
    model: String,
    config: AgentConfig,
    options: RunOptions,
    definitions: Vec<ToolDefinition>,
    tools: Arc<ToolRegistry>,
    context: ContextVariables,
    store: Arc<ChatStore>,
    cancel: CancellationToken,
    tx: mpsc::Sender<AgentEvent>,
}

impl RunState {
    async fn emit(&self, event: AgentEvent) {
        // A disconnected caller does not abort the run; persistence
        // continues so the thread stays consistent.
        let _ = self.tx.send(event).await;
    }

    async fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(thread_id = %self.options.thread_id, %message, "run failed");
        self.emit(AgentEvent::Error { message }).await;
    }

    async fn drive(self) {
        let records = match self.store.history(&self.options.thread_id) {
            Ok(records) => records,
            Err(err) => return self.fail(err.to_string()).await,
        };
        let mut history = decode_history(&records);
        let mut totals = UsageTotals::default();
        let limiter = StepLimiter::new(self.options.max_parallel_tool_calls);

        for step in 0..u64::from(self.options.max_turns) {
            let step_outcome = self
                .run_step(step, &mut history, &mut totals, &limiter)
                .await;
            match step_outcome {
                StepOutcome::Continue => {}
                StepOutcome::Finished(reason) => {
                    info!(
                        thread_id = %self.options.thread_id,
                        steps = step + 1,
                        reason = ?reason,
                        "run finished"
                    );
                    self.emit(AgentEvent::Finish {
                        reason,
                        usage: totals,
                    })
                    .await;
                    return;
                }
                StepOutcome::Aborted => return,
            }
        }

        // Turn budget exhausted without a terminal finish.
        info!(thread_id = %self.options.thread_id, "turn budget exhausted");
        self.emit(AgentEvent::Finish {
            reason: FinishReason::Other,
            usage: totals,
        })
        .await;
    }

    async fn run_step(
        &self,
        step: u64,
        history: &mut Vec<ChatMessage>,
        totals: &mut UsageTotals,
        limiter: &StepLimiter,
    ) -> StepOutcome {
        let request = ChatRequest {
            model: self.model.clone(),
            temperature: self.config.temperature,
            system: self.config.system.clone(),
            messages: history.clone(),
            tools: self.definitions.clone(),
        };
        let mut stream = match self
            .provider
            .stream_chat(request, self.cancel.clone())
            .await
        {
            Ok(stream) => stream,
            Err(err) => {
                self.fail(err.to_string()).await;
                return StepOutcome::Aborted;
            }
        };

        let mut text = String::new();
        let mut calls: Vec<ToolCallRequest> = Vec::new();
        let mut finish: Option<FinishReason> = None;
        let mut usage: Option<UsageReport> = None;

        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Start | StreamEvent::ToolCallStart { .. } => {}
                StreamEvent::TextDelta { delta } => {
                    text.push_str(&delta);
                    self.emit(AgentEvent::TextDelta { delta }).await;
                }
                StreamEvent::ToolCallEnd { tool_call } => {
                    self.emit(AgentEvent::ToolCall {
                        tool_call_id: tool_call.id.clone(),
                        name: tool_call.name.clone(),
                        arguments: tool_call.arguments.clone(),
                    })
                    .await;
                    calls.push(tool_call);
                }
                StreamEvent::Done {
                    finish_reason,
                    usage: reported,
                } => {
                    finish = Some(finish_reason);
                    usage = reported;
                }
                StreamEvent::Error { error } => {
                    self.fail(error).await;
                    return StepOutcome::Aborted;
                }
            }
        }

        // A cancelled step persists nothing.
        if self.cancel.is_cancelled() {
            return StepOutcome::Aborted;
        }
        let Some(finish) = finish else {
            self.fail("provider stream ended without a finish reason")
                .await;
            return StepOutcome::Aborted;
        };
        if let Some(report) = usage.as_ref() {
            totals.absorb(report);
        }

        let preamble = (!text.is_empty()).then_some(text.as_str());
        let turn = AssistantTurn {
            thread_id: &self.options.thread_id,
            text: preamble,
            tool_calls: &calls,
            usage: usage.as_ref(),
            model: &self.model,
            selected_tools: None,
            complexity: None,
        };

        if finish == FinishReason::ToolCalls && !calls.is_empty() {
            if let Err(err) = self.store.persist_assistant_turn(&turn) {
                self.fail(err.to_string()).await;
                return StepOutcome::Aborted;
            }
            history.push(ChatMessage::AssistantToolCalls {
                text: preamble.map(String::from),
                tool_calls: calls.clone(),
            });

            let outcomes = join_all(calls.iter().map(|call| {
                execute_tool_call(
                    call,
                    step,
                    limiter,
                    &self.tools,
                    &self.context,
                    &self.options.thread_id,
                    &self.cancel,
                )
            }))
            .await;

            let mut executed = Vec::with_capacity(outcomes.len());
            for outcome in outcomes {
                match outcome {
                    Ok(executed_call) => executed.push(executed_call),
                    Err(err) => {
                        self.fail(err.to_string()).await;
                        return StepOutcome::Aborted;
                    }
                }
            }
            if self.cancel.is_cancelled() {
                return StepOutcome::Aborted;
            }

            let results: Vec<ToolResultRecord> = executed
                .iter()
                .map(|outcome| ToolResultRecord {
                    tool_call_id: outcome.tool_call_id.clone(),
                    tool_name: outcome.tool_name.clone(),
                    output: outcome.output.content.clone(),
                    is_error: outcome.output.is_error,
                })
                .collect();
            if let Err(err) = self
                .store
                .persist_tool_results(&self.options.thread_id, &results)
            {
                self.fail(err.to_string()).await;
                return StepOutcome::Aborted;
            }

            for result in results {
                self.emit(AgentEvent::ToolResult {
                    tool_call_id: result.tool_call_id.clone(),
                    name: result.tool_name.clone(),
                    output: result.output.clone(),
                    is_error: result.is_error,
                })
                .await;
                history.push(ChatMessage::ToolResult {
                    tool_call_id: result.tool_call_id,
                    tool_name: result.tool_name,
                    output: result.output,
                    is_error: result.is_error,
                });
            }

            counter!("agent_steps_total").increment(1);
            return StepOutcome::Continue;
        }

        // Terminal finish: persist the assistant message and stop.
        if let Err(err) = self.store.persist_assistant_turn(&turn) {
            self.fail(err.to_string()).await;
            return StepOutcome::Aborted;
        }
        counter!("agent_steps_total").increment(1);
        counter!("agent_runs_total").increment(1);
        StepOutcome::Finished(finish)
    }
}

enum StepOutcome {
    Continue,
    Finished(FinishReason),
    Aborted,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
