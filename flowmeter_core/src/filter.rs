//! Butterworth low-pass design and zero-phase (forward-backward) filtering.
//!
//! The analog prototype is mapped with the pre-warped bilinear transform and
//! realised as a cascade of second-order sections, plus one first-order
//! section for odd orders. Forward-backward application pads both ends with
//! an odd reflection of `3 * (order + 1)` samples and starts every section
//! from its steady state for the first padded value, as `filtfilt` does.

use std::f64::consts::PI;

use biquad::{Coefficients, ToHertz, Type};

use crate::error::FilterDegenerate;

#[derive(Debug, Clone)]
pub struct ButterworthLowpass {
    order: usize,
    sections: Vec<Coefficients<f64>>,
}

impl ButterworthLowpass {
    pub fn design(
        order: usize,
        cutoff_hz: f64,
        sampling_rate_hz: f64,
    ) -> Result<Self, FilterDegenerate> {
        if order == 0 {
            return Err(FilterDegenerate::ZeroOrder);
        }
        let nyquist_hz = sampling_rate_hz / 2.0;
        if !(cutoff_hz.is_finite() && cutoff_hz > 0.0 && cutoff_hz < nyquist_hz) {
            return Err(FilterDegenerate::Cutoff {
                cutoff_hz,
                nyquist_hz,
            });
        }
        let cutoff_err = || FilterDegenerate::Cutoff {
            cutoff_hz,
            nyquist_hz,
        };

        let mut sections = Vec::with_capacity(order.div_ceil(2));
        for k in 0..order / 2 {
            // Conjugate pole pair k of the normalized prototype.
            let angle = PI * (2 * k + 1) as f64 / (2 * order) as f64;
            let q = 1.0 / (2.0 * angle.sin());
            let c = Coefficients::<f64>::from_params(
                Type::LowPass,
                sampling_rate_hz.hz(),
                cutoff_hz.hz(),
                q,
            )
            .map_err(|_| cutoff_err())?;
            sections.push(c);
        }
        if order % 2 == 1 {
            let k = (PI * cutoff_hz / sampling_rate_hz).tan();
            let norm = 1.0 / (1.0 + k);
            sections.push(Coefficients {
                a1: (k - 1.0) * norm,
                a2: 0.0,
                b0: k * norm,
                b1: k * norm,
                b2: 0.0,
            });
        }
        Ok(Self { order, sections })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Samples of odd-reflection padding applied at each end.
    pub fn padlen(&self) -> usize {
        3 * (self.order + 1)
    }

    /// Minimum series length the forward-backward pass accepts.
    pub fn min_len(&self) -> usize {
        self.padlen() + 1
    }

    /// Zero-phase filtering of `x`.
    pub fn filtfilt(&self, x: &[f64]) -> Result<Vec<f64>, FilterDegenerate> {
        let padlen = self.padlen();
        if x.len() <= padlen {
            return Err(FilterDegenerate::TooShort {
                len: x.len(),
                padlen,
            });
        }
        let n = x.len();
        let first = x[0];
        let last = x[n - 1];

        let mut ext = Vec::with_capacity(n + 2 * padlen);
        ext.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
        ext.extend_from_slice(x);
        ext.extend((1..=padlen).map(|i| 2.0 * last - x[n - 1 - i]));

        let mut y = self.run_cascade(&ext);
        y.reverse();
        let mut y = self.run_cascade(&y);
        y.reverse();

        let out = y[padlen..padlen + n].to_vec();
        if out.iter().any(|v| !v.is_finite()) {
            return Err(FilterDegenerate::NonFinite);
        }
        Ok(out)
    }

    /// One causal pass through every section, each primed at steady state
    /// for the first input value.
    fn run_cascade(&self, x: &[f64]) -> Vec<f64> {
        let mut buf = x.to_vec();
        let Some(&start) = x.first() else {
            return buf;
        };
        let mut level = start;
        for c in &self.sections {
            let gain = (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2);
            let y0 = gain * level;
            // Transposed direct form II state at equilibrium.
            let mut s1 = y0 - c.b0 * level;
            let mut s2 = c.b2 * level - c.a2 * y0;
            for v in buf.iter_mut() {
                let input = *v;
                let out = c.b0 * input + s1;
                s1 = c.b1 * input - c.a1 * out + s2;
                s2 = c.b2 * input - c.a2 * out;
                *v = out;
            }
            level = y0;
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(n: usize, freq_hz: f64, fs: f64) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / fs).sin())
            .collect()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn section_count_follows_order() {
        for (order, sections) in [(1, 1), (2, 1), (4, 2), (5, 3)] {
            let f = ButterworthLowpass::design(order, 1e6, 50e6).unwrap();
            assert_eq!(f.sections.len(), sections, "order {order}");
        }
    }

    #[test]
    fn unity_dc_gain_per_section() {
        let f = ButterworthLowpass::design(5, 1e6, 50e6).unwrap();
        for c in &f.sections {
            let g = (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2);
            assert!((g - 1.0).abs() < 1e-9, "dc gain {g}");
        }
    }

    #[test]
    fn constant_input_passes_unchanged() {
        let f = ButterworthLowpass::design(5, 1e6, 50e6).unwrap();
        let x = vec![0.75; 64];
        let y = f.filtfilt(&x).unwrap();
        for v in y {
            assert!((v - 0.75).abs() < 1e-9);
        }
    }

    #[test]
    fn attenuates_above_cutoff_and_keeps_passband() {
        let fs = 50e6;
        let f = ButterworthLowpass::design(5, 1e6, fs).unwrap();
        let pass = sine(4000, 100e3, fs);
        let stop = sine(4000, 5e6, fs);
        let pass_out = f.filtfilt(&pass).unwrap();
        let stop_out = f.filtfilt(&stop).unwrap();
        assert!((rms(&pass_out) / rms(&pass) - 1.0).abs() < 0.02);
        assert!(rms(&stop_out) / rms(&stop) < 1e-3);
    }

    #[test]
    fn zero_phase_keeps_peak_position() {
        let fs = 50e6;
        let f = ButterworthLowpass::design(5, 1e6, fs).unwrap();
        let x: Vec<f64> = (0..1000)
            .map(|i| {
                let t = (i as f64 - 500.0) / 60.0;
                (-t * t).exp()
            })
            .collect();
        let y = f.filtfilt(&x).unwrap();
        let peak = y
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
        assert_eq!(peak.0, 500);
    }

    #[test]
    fn rejects_bad_design_parameters() {
        assert_eq!(
            ButterworthLowpass::design(0, 1e6, 50e6).unwrap_err(),
            FilterDegenerate::ZeroOrder
        );
        assert!(matches!(
            ButterworthLowpass::design(5, 25e6, 50e6),
            Err(FilterDegenerate::Cutoff { .. })
        ));
        assert!(matches!(
            ButterworthLowpass::design(5, 0.0, 50e6),
            Err(FilterDegenerate::Cutoff { .. })
        ));
    }

    #[test]
    fn too_short_series_is_rejected() {
        let f = ButterworthLowpass::design(5, 1e6, 50e6).unwrap();
        assert_eq!(f.padlen(), 18);
        let err = f.filtfilt(&[0.0; 18]).unwrap_err();
        assert_eq!(err, FilterDegenerate::TooShort { len: 18, padlen: 18 });
        assert!(f.filtfilt(&[0.0; 19]).is_ok());
    }
}
