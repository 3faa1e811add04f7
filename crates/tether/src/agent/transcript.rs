//! The running record of one task.

use super::parser::Invocation;
use super::prompt::NEXT_STEP_CUE;
use crate::protocol::RpcError;
use crate::tools::ToolOutcome;

/// What came back from one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub text: String,
    pub is_error: bool,
}

impl Observation {
    /// The host refused the request outright (unknown tool, bad params).
    pub fn rejected(error: &RpcError) -> Self {
        Self {
            text: format!("Error: {}", error.message),
            is_error: true,
        }
    }
}

impl From<ToolOutcome> for Observation {
    fn from(outcome: ToolOutcome) -> Self {
        Self {
            text: outcome.text,
            is_error: outcome.is_error,
        }
    }
}

/// One act/observe pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub invocation: Invocation,
    pub observation: Observation,
}

/// Task text plus every step taken so far. Only ever grows.
#[derive(Debug, Clone)]
pub struct Transcript {
    task: String,
    steps: Vec<Step>,
}

impl Transcript {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            steps: Vec::new(),
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn record(&mut self, invocation: Invocation, observation: Observation) {
        self.steps.push(Step {
            invocation,
            observation,
        });
    }

    /// Task and steps as plain text.
    pub fn render(&self) -> String {
        let mut out = format!("Task: {}\n\n", self.task);
        for Step {
            invocation,
            observation,
        } in &self.steps
        {
            let params = serde_json::to_string(&invocation.arguments).unwrap_or_default();
            out.push_str(&format!(
                "Action: Used tool '{}' with parameters {params}\nObservation: {}\n\n",
                invocation.name, observation.text
            ));
        }
        out
    }

    /// The next reasoning prompt: the rendered transcript and the cue.
    pub fn prompt(&self) -> String {
        format!("{}{NEXT_STEP_CUE}", self.render())
    }
}
