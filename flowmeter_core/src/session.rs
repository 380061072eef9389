//! Append-only measurement history with running averages.

use std::sync::{Arc, RwLock};

use crate::types::FlowMeasurement;

/// Flow rates and their cumulative averages, index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowrateHistory {
    pub values: Vec<f64>,
    /// `cumulative_average[k] = mean(values[0..=k])`
    pub cumulative_average: Vec<f64>,
}

/// Running means of `values`, computed in one pass.
pub fn flowrate_history(values: &[f64]) -> FlowrateHistory {
    let mut sum = 0.0;
    let cumulative_average = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            sum += v;
            sum / (i + 1) as f64
        })
        .collect();
    FlowrateHistory {
        values: values.to_vec(),
        cumulative_average,
    }
}

/// Measurements taken during one run, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSession {
    measurements: Vec<FlowMeasurement>,
    cumulative_average: Vec<f64>,
    sum: f64,
}

impl MeasurementSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a measurement and return the new cumulative average.
    pub fn append(&mut self, m: FlowMeasurement) -> f64 {
        self.sum += m.flow_rate;
        self.measurements.push(m);
        let avg = self.sum / self.measurements.len() as f64;
        self.cumulative_average.push(avg);
        avg
    }

    pub fn clear(&mut self) {
        self.measurements.clear();
        self.cumulative_average.clear();
        self.sum = 0.0;
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn measurements(&self) -> &[FlowMeasurement] {
        &self.measurements
    }

    pub fn last(&self) -> Option<&FlowMeasurement> {
        self.measurements.last()
    }

    pub fn cumulative_average(&self) -> &[f64] {
        &self.cumulative_average
    }

    /// Latest running average, `None` before the first measurement.
    pub fn current_average(&self) -> Option<f64> {
        self.cumulative_average.last().copied()
    }

    pub fn history(&self) -> FlowrateHistory {
        FlowrateHistory {
            values: self.measurements.iter().map(|m| m.flow_rate).collect(),
            cumulative_average: self.cumulative_average.clone(),
        }
    }
}

/// Cloneable, thread-safe handle to a session.
///
/// Writers append under the write lock, so readers see history and average
/// move together. A poisoned lock is recovered; the session holds plain data
/// and every mutation completes before the guard drops.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<RwLock<MeasurementSession>>,
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, m: FlowMeasurement) -> f64 {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.append(m)
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.clear();
    }

    /// Consistent copy of the whole session.
    pub fn snapshot(&self) -> MeasurementSession {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
