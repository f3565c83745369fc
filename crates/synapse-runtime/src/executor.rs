//! Tool executor — limiter → lookup → instantiate → execute pipeline.

use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use synapse_core::messages::ToolCallRequest;
use synapse_core::tools::{error_result, ToolOutput};
use synapse_tools::registry::ToolRegistry;
use synapse_tools::traits::{ContextVariables, ToolInvocation};
use synapse_tools::ToolError;

use crate::errors::{Result, RuntimeError};
use crate::limiter::StepLimiter;

/// Convert a `Duration` to milliseconds, rounding up (ceiling).
///
/// `Duration::as_millis()` truncates sub-millisecond values to 0, which
/// makes fast tools report "0ms". Any non-zero duration reports at least 1.
fn duration_ceil_ms(d: Duration) -> u64 {
    let micros = d.as_micros();
    if micros == 0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation)]
    {
        ((micros + 999) / 1000) as u64
    }
}

/// Outcome of one tool call dispatch.
#[derive(Clone, Debug)]
pub struct ExecutionOutcome {
    /// Originating call.
    pub tool_call_id: String,
    /// Tool name.
    pub tool_name: String,
    /// The result handed back to the model.
    pub output: ToolOutput,
    /// Wall time, ceiling milliseconds.
    pub duration_ms: u64,
}

/// Execute a single tool call through the pipeline.
///
/// Every failure mode except an unregistered tool name becomes a result
/// the model can react to: limiter rejection is a retryable answer, a
/// constructor or execution failure is an error-flagged result. An unknown
/// tool name is a model/registry mismatch and fails the run.
#[instrument(skip_all, fields(tool_name = call.name, step))]
pub async fn execute_tool_call(
    call: &ToolCallRequest,
    step: u64,
    limiter: &StepLimiter,
    registry: &ToolRegistry,
    context: &ContextVariables,
    thread_id: &str,
    cancel: &CancellationToken,
) -> Result<ExecutionOutcome> {
    let start = Instant::now();

    // Registry mismatch is fatal even when the limiter would have
    // rejected the call.
    if !registry.contains(&call.name) {
        error!(tool_name = %call.name, "tool not registered");
        return Err(RuntimeError::UnknownTool(call.name.clone()));
    }

    if !limiter.try_acquire(step) {
        debug!(tool_name = %call.name, "call rejected by step limiter");
        counter!("tool_calls_rate_limited_total", "tool" => call.name.clone()).increment(1);
        return Ok(ExecutionOutcome {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            output: limiter.rate_limit_result(&call.name),
            duration_ms: duration_ceil_ms(start.elapsed()),
        });
    }

    let output = match registry.instantiate(&call.name, context) {
        Ok(tool) => {
            let ctx = ToolInvocation {
                tool_call_id: call.id.clone(),
                thread_id: thread_id.to_string(),
                cancellation: cancel.clone(),
            };
            if cancel.is_cancelled() {
                error_result("Operation cancelled")
            } else {
                match tool.execute(call.arguments.clone(), &ctx).await {
                    Ok(output) => output,
                    Err(ToolError::Cancelled) => error_result("Operation cancelled"),
                    Err(err) => {
                        warn!(tool_name = %call.name, %err, "tool execution failed");
                        error_result(err.to_string())
                    }
                }
            }
        }
        Err(err) => {
            warn!(tool_name = %call.name, %err, "tool construction failed");
            error_result(err.to_string())
        }
    };

    let duration_ms = duration_ceil_ms(start.elapsed());
    counter!("tool_executions_total", "tool" => call.name.clone()).increment(1);
    histogram!("tool_execution_duration_seconds", "tool" => call.name.clone())
        .record(start.elapsed().as_secs_f64());
    debug!(
        tool_name = %call.name,
        tool_call_id = %call.id,
        duration_ms,
        is_error = output.is_error,
        "tool execution finished"
    );

    Ok(ExecutionOutcome {
        tool_call_id: call.id.clone(),
        tool_name: call.name.clone(),
        output,
        duration_ms,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
