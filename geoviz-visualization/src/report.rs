//! Per-unit render outcomes collected over a frame

use geoviz_core::{Error, Result};

/// Result of invoking one render unit
#[derive(Debug)]
pub struct UnitOutcome {
    pub unit: &'static str,
    pub result: Result<()>,
}

/// Outcomes of every unit a renderer invoked, in invocation order
#[derive(Debug, Default)]
pub struct RenderReport {
    outcomes: Vec<UnitOutcome>,
}

impl RenderReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, unit: &'static str, result: Result<()>) {
        self.outcomes.push(UnitOutcome { unit, result });
    }

    pub fn extend(&mut self, other: RenderReport) {
        self.outcomes.extend(other.outcomes);
    }

    pub fn outcomes(&self) -> &[UnitOutcome] {
        &self.outcomes
    }

    /// Whether no unit was invoked
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn invoked_units(&self) -> Vec<&'static str> {
        self.outcomes.iter().map(|outcome| outcome.unit).collect()
    }

    pub fn failed_units(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .map(|outcome| outcome.unit)
            .collect()
    }

    /// `Error::Render` naming every failed unit, if any failed
    pub fn into_result(self) -> Result<()> {
        let failed: Vec<String> = self.failed_units().into_iter().map(str::to_string).collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::Render { failed })
        }
    }
}

/// Everything that happened while drawing one frame
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Unit outcomes, scene renderers first, then utilities
    pub units: RenderReport,
    /// Failure to start or present the frame
    pub frame_error: Option<Error>,
}

impl FrameReport {
    pub fn is_success(&self) -> bool {
        self.frame_error.is_none() && self.units.is_success()
    }

    pub fn into_result(self) -> Result<()> {
        match self.frame_error {
            Some(error) => Err(error),
            None => self.units.into_result(),
        }
    }
}
