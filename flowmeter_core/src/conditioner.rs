//! Raw samples → time-stamped, low-pass filtered series.

use crate::config::SignalCfg;
use crate::error::FilterDegenerate;
use crate::filter::ButterworthLowpass;
use crate::types::{Channel, RawSample, SampleSeries, SamplePoint};

/// A conditioned series plus the reason filtering was skipped, if it was.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditioned {
    pub series: SampleSeries,
    pub filter_warning: Option<FilterDegenerate>,
}

#[derive(Debug, Clone)]
pub struct SignalConditioner {
    sampling_rate_hz: f64,
    filter: Result<ButterworthLowpass, FilterDegenerate>,
}

impl SignalConditioner {
    pub fn new(cfg: &SignalCfg) -> Self {
        let filter =
            ButterworthLowpass::design(cfg.filter_order, cfg.cutoff_hz, cfg.sampling_rate_hz);
        if let Err(e) = &filter {
            tracing::warn!(error = %e, "low-pass design failed; series will be unfiltered");
        }
        Self {
            sampling_rate_hz: cfg.sampling_rate_hz,
            filter,
        }
    }

    /// Convert indices to seconds and attach the filtered voltage.
    ///
    /// Never fails: if the filter cannot run, `filtered_voltage` repeats
    /// `voltage` and the reason is returned alongside.
    pub fn condition(&self, channel: Channel, raw: &[RawSample]) -> Conditioned {
        let voltages: Vec<f64> = raw.iter().map(|s| s.voltage).collect();
        let filtered = self
            .filter
            .as_ref()
            .map_err(Clone::clone)
            .and_then(|f| f.filtfilt(&voltages));
        let (filtered, filter_warning) = match filtered {
            Ok(v) => (v, None),
            Err(reason) => {
                tracing::warn!(
                    %channel,
                    samples = raw.len(),
                    error = %reason,
                    "filtering failed; using unfiltered voltage"
                );
                (voltages.clone(), Some(reason))
            }
        };

        let points = raw
            .iter()
            .zip(filtered)
            .map(|(s, f)| SamplePoint {
                time_s: s.index / self.sampling_rate_hz,
                voltage: s.voltage,
                filtered_voltage: f,
            })
            .collect();
        Conditioned {
            series: SampleSeries { points },
            filter_warning,
        }
    }
}
