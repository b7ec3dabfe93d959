//! Batch driver: many requests through the dispatcher and comparator.
//!
//! Requests may run concurrently (`concurrency > 1`); each one is
//! self-contained, and verdicts come back in input order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::comparator::Comparator;
use crate::dispatcher::ShadowDispatcher;
use crate::domain::{InputData, Verdict};
use crate::metrics::METRICS;
use crate::obs::{emit_simulation_finished, record_verdict, RequestSpan};
use crate::reporting::{extract_regressions, RegressionCase, SimulationSummary};

const PROGRESS_EVERY: usize = 10;

/// One request of a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchItem {
    pub request_id: String,
    pub data: InputData,
}

impl BatchItem {
    pub fn new(request_id: impl Into<String>, data: InputData) -> Self {
        Self {
            request_id: request_id.into(),
            data,
        }
    }

    /// Assign `req_0`, `req_1`, … in order.
    pub fn numbered(records: Vec<InputData>) -> Vec<BatchItem> {
        records
            .into_iter()
            .enumerate()
            .map(|(i, data)| BatchItem::new(format!("req_{i}"), data))
            .collect()
    }
}

/// Everything a batch produced, ready for the reporting collaborators.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub run_id: Uuid,
    /// Verdicts in input order.
    pub verdicts: Vec<Verdict>,
    /// Original input payload per request id.
    pub inputs: HashMap<String, InputData>,
    pub duration: Duration,
}

impl SimulationOutcome {
    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary::from_verdicts(&self.verdicts)
    }

    /// Mismatched requests with their original inputs.
    pub fn regressions(&self) -> Vec<RegressionCase> {
        extract_regressions(&self.verdicts, &self.inputs)
    }
}

/// Runs batches of shadow tests.
#[derive(Debug, Clone)]
pub struct ShadowSimulation {
    dispatcher: Arc<ShadowDispatcher>,
    comparator: Comparator,
    concurrency: usize,
}

impl ShadowSimulation {
    pub fn new(dispatcher: Arc<ShadowDispatcher>, comparator: Comparator) -> Self {
        Self {
            dispatcher,
            comparator,
            concurrency: 1,
        }
    }

    /// Run up to `concurrency` requests at once (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run `records` with generated request ids (`req_{i}`).
    pub async fn run_records(&self, records: Vec<InputData>) -> SimulationOutcome {
        self.run(BatchItem::numbered(records)).await
    }

    /// Dispatch and compare every item of the batch.
    pub async fn run(&self, items: Vec<BatchItem>) -> SimulationOutcome {
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        let total = items.len();
        info!(run_id = %run_id, total, concurrency = self.concurrency, "starting shadow simulation");

        let dispatcher = self.dispatcher.as_ref();
        let comparator = &self.comparator;
        let mut completed = 0usize;

        let settled: Vec<(BatchItem, Verdict)> = stream::iter(items)
            .map(|item| async move {
                let pair = dispatcher
                    .run_shadow_test(item.data.clone(), &item.request_id)
                    .await;
                let verdict = comparator.compare_pair(&pair);
                (item, verdict)
            })
            .buffered(self.concurrency)
            .inspect(|(_, verdict)| {
                let _span = RequestSpan::enter(&verdict.request_id);
                record_verdict(verdict);
                completed += 1;
                if completed % PROGRESS_EVERY == 0 {
                    info!(completed, total, "simulation progress");
                }
            })
            .collect()
            .await;

        let mut verdicts = Vec::with_capacity(settled.len());
        let mut inputs = HashMap::with_capacity(settled.len());
        for (item, verdict) in settled {
            inputs.insert(item.request_id, item.data);
            verdicts.push(verdict);
        }

        let duration = start.elapsed();
        let failed = verdicts.iter().filter(|v| !v.is_match).count();
        emit_simulation_finished(
            &run_id.to_string(),
            verdicts.len(),
            failed,
            duration.as_millis() as u64,
        );
        METRICS.flush();

        SimulationOutcome {
            run_id,
            verdicts,
            inputs,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbered_assigns_sequential_ids() {
        let records = vec![
            json!({"value": 1}).as_object().cloned().expect("object"),
            json!({"value": 2}).as_object().cloned().expect("object"),
        ];
        let items = BatchItem::numbered(records);
        assert_eq!(items[0].request_id, "req_0");
        assert_eq!(items[1].request_id, "req_1");
        assert_eq!(items[1].data["value"], json!(2));
    }
}
