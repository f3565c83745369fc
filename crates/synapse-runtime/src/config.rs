//! Run configuration.

/// Static agent configuration for a conversation run.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Model identifier, `provider/model` or a bare model name resolved
    /// against the registry's default provider.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// System instruction.
    pub system: String,
    /// Names of registered tools offered to the model, in order.
    pub tools: Vec<String>,
}

/// Per-run options.
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Thread to run in.
    pub thread_id: String,
    /// Maximum steps before the run finishes with reason `other`.
    pub max_turns: u32,
    /// Maximum tool calls executed within one step; further calls in the
    /// same step receive a synthetic rate-limit result.
    pub max_parallel_tool_calls: usize,
}

impl RunOptions {
    /// Options for a thread with the default budgets.
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            max_turns: 10,
            max_parallel_tool_calls: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budgets() {
        let opts = RunOptions::for_thread("thr_1");
        assert_eq!(opts.max_turns, 10);
        assert_eq!(opts.max_parallel_tool_calls, 5);
    }
}
