//! Per-step parallel tool-call cap.
//!
//! Within one step (one assistant turn that may request many tool calls),
//! the first N acquisitions pass and every further acquisition in the same
//! step is answered with a synthetic, retryable tool result telling the
//! model to re-issue the call next step. Purely throughput control — from
//! the model's perspective the rejection is simply the tool's answer.
//!
//! Step identity is an explicit monotonic counter supplied by the
//! orchestrator; a new step value resets the internal counter.

use parking_lot::Mutex;
use serde_json::json;

use synapse_core::tools::ToolOutput;

/// Per-step acquisition counter.
pub struct StepLimiter {
    max_calls: usize,
    state: Mutex<State>,
}

struct State {
    step: u64,
    used: usize,
}

impl StepLimiter {
    /// Create a limiter allowing `max_calls` executions per step.
    pub fn new(max_calls: usize) -> Self {
        Self {
            max_calls,
            state: Mutex::new(State { step: 0, used: 0 }),
        }
    }

    /// Try to acquire one execution slot for the given step.
    ///
    /// A step value different from the last seen one resets the counter.
    pub fn try_acquire(&self, step: u64) -> bool {
        let mut state = self.state.lock();
        if state.step != step {
            state.step = step;
            state.used = 0;
        }
        if state.used < self.max_calls {
            state.used += 1;
            true
        } else {
            false
        }
    }

    /// The synthetic result handed to the model when a slot is refused.
    pub fn rate_limit_result(&self, tool_name: &str) -> ToolOutput {
        ToolOutput {
            content: json!({
                "status": "rate_limited",
                "message": format!(
                    "Too many parallel calls to '{tool_name}' this step (limit {}). \
                     Call it again in your next step.",
                    self.max_calls
                ),
                "retryable": true,
            }),
            is_error: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_n_pass_then_reject() {
        let limiter = StepLimiter::new(3);
        for _ in 0..3 {
            assert!(limiter.try_acquire(1));
        }
        assert!(!limiter.try_acquire(1));
        assert!(!limiter.try_acquire(1));
    }

    #[test]
    fn new_step_resets_counter() {
        let limiter = StepLimiter::new(2);
        assert!(limiter.try_acquire(1));
        assert!(limiter.try_acquire(1));
        assert!(!limiter.try_acquire(1));

        assert!(limiter.try_acquire(2));
        assert!(limiter.try_acquire(2));
        assert!(!limiter.try_acquire(2));
    }

    #[test]
    fn limit_independent_per_step_not_cumulative() {
        let limiter = StepLimiter::new(1);
        for step in 0..5 {
            assert!(limiter.try_acquire(step));
            assert!(!limiter.try_acquire(step));
        }
    }

    #[test]
    fn rejection_is_retryable_not_an_error() {
        let limiter = StepLimiter::new(5);
        let output = limiter.rate_limit_result("calculator");
        assert!(!output.is_error);
        assert_eq!(output.content["status"], "rate_limited");
        assert_eq!(output.content["retryable"], true);
        assert!(output.content["message"]
            .as_str()
            .unwrap()
            .contains("calculator"));
    }
}
