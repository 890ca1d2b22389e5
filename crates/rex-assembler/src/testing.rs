//! Test double for the union engine.

use std::cell::RefCell;
use std::collections::HashMap;

use rex_engine::{EngineError, UnionEngine};

/// Scripted union engine.
///
/// Replays canned responses for expected input batches and falls back to
/// joining the inputs with `|`, which is a valid (if unminimized) union and
/// keeps most tests free of scripting. Calls are recorded for assertions.
pub(crate) struct ScriptedEngine {
    responses: HashMap<Vec<String>, String>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedEngine {
    pub(crate) fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Script a response for an exact input batch.
    pub(crate) fn respond(mut self, inputs: &[&str], output: &str) -> Self {
        self.responses.insert(
            inputs.iter().map(|&l| l.to_owned()).collect(),
            output.to_owned(),
        );
        self
    }

    /// Input batches seen so far.
    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

impl UnionEngine for ScriptedEngine {
    fn union(&self, inputs: &[String]) -> Result<String, EngineError> {
        self.calls.borrow_mut().push(inputs.to_vec());
        if let Some(response) = self.responses.get(inputs) {
            return Ok(response.clone());
        }
        Ok(inputs.join("|"))
    }
}

/// Engine that always fails, for fault propagation tests.
pub(crate) struct FailingEngine;

impl UnionEngine for FailingEngine {
    fn union(&self, _inputs: &[String]) -> Result<String, EngineError> {
        Err(EngineError::Failed {
            stderr: "scripted failure".to_owned(),
        })
    }
}
