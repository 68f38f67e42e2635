//! # Tracers
//!
//! [`NoopTracer`] is the default and lets frames skip snapshot building.
//! [`TraceCollector`] keeps every event in order and renders them as JSON
//! lines for debugging and test assertions.

use crate::domain::entities::CallResult;
use crate::ports::outbound::{CallTrace, StepTrace, Tracer};
use serde::Serialize;

/// Tracer that observes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn is_enabled(&self) -> bool {
        false
    }
}

/// Frame exit as recorded by [`TraceCollector`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CallEndTrace {
    /// Depth of the frame that returned.
    pub depth: usize,
    /// Normal completion.
    pub success: bool,
    /// Gas handed back to the caller.
    pub gas_left: u64,
    /// Length of the returned data.
    pub output_len: usize,
    /// Halt reason, if any.
    pub error: Option<String>,
}

/// One recorded event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// An opcode finished.
    Step(StepTrace),
    /// A frame was entered.
    CallStart(CallTrace),
    /// A frame returned.
    CallEnd(CallEndTrace),
}

/// Records every tracer event in execution order.
#[derive(Clone, Debug, Default)]
pub struct TraceCollector {
    events: Vec<TraceEvent>,
}

impl TraceCollector {
    /// Empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events, in order.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Only the opcode steps.
    pub fn steps(&self) -> impl Iterator<Item = &StepTrace> {
        self.events.iter().filter_map(|event| match event {
            TraceEvent::Step(step) => Some(step),
            _ => None,
        })
    }

    /// Only the frame entries.
    pub fn calls(&self) -> impl Iterator<Item = &CallTrace> {
        self.events.iter().filter_map(|event| match event {
            TraceEvent::CallStart(call) => Some(call),
            _ => None,
        })
    }

    /// Only the frame exits.
    pub fn call_ends(&self) -> impl Iterator<Item = &CallEndTrace> {
        self.events.iter().filter_map(|event| match event {
            TraceEvent::CallEnd(end) => Some(end),
            _ => None,
        })
    }

    /// Drops everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// One JSON object per line.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl Tracer for TraceCollector {
    fn step(&mut self, step: &StepTrace) {
        self.events.push(TraceEvent::Step(step.clone()));
    }

    fn call_start(&mut self, call: &CallTrace) {
        self.events.push(TraceEvent::CallStart(call.clone()));
    }

    fn call_end(&mut self, depth: usize, result: &CallResult) {
        self.events.push(TraceEvent::CallEnd(CallEndTrace {
            depth,
            success: result.success,
            gas_left: result.gas_left,
            output_len: result.output.len(),
            error: result.error.as_ref().map(ToString::to_string),
        }));
    }
}
