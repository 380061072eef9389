//! Speed of sound in water from temperature.
//!
//! A not-a-knot cubic spline through a (°C, m/s) reference table. The
//! default table covers 0..=100 °C; temperatures outside the table are an
//! error rather than an extrapolation.

use crate::error::FlowError;

/// Speed of sound in pure water, (°C, m/s).
pub const WATER_SOUND_SPEED: [(f64, f64); 12] = [
    (0.0, 1403.0),
    (5.0, 1427.0),
    (10.0, 1447.0),
    (20.0, 1481.0),
    (30.0, 1507.0),
    (40.0, 1526.0),
    (50.0, 1541.0),
    (60.0, 1552.0),
    (70.0, 1555.0),
    (80.0, 1555.0),
    (90.0, 1550.0),
    (100.0, 1543.0),
];

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/// Cubic spline with not-a-knot end conditions, stored as knot values and
/// second derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    second: Vec<f64>,
}

impl CubicSpline {
    pub const MIN_POINTS: usize = 4;

    pub fn not_a_knot(points: &[(f64, f64)]) -> Result<Self, FlowError> {
        let n = points.len();
        if n < Self::MIN_POINTS {
            return Err(FlowError::InvalidConfig(format!(
                "cubic spline needs at least {} points, got {n}",
                Self::MIN_POINTS
            )));
        }
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(FlowError::InvalidConfig("spline points must be finite".into()));
        }
        if points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(FlowError::InvalidConfig(
                "spline abscissae must be strictly increasing".into(),
            ));
        }
        let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

        let mut a = vec![vec![0.0; n]; n];
        let mut rhs = vec![0.0; n];
        // Third derivative continuous across the second and penultimate knots.
        a[0][0] = h[1];
        a[0][1] = -(h[0] + h[1]);
        a[0][2] = h[0];
        for i in 1..n - 1 {
            a[i][i - 1] = h[i - 1];
            a[i][i] = 2.0 * (h[i - 1] + h[i]);
            a[i][i + 1] = h[i];
            rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
        }
        a[n - 1][n - 3] = h[n - 2];
        a[n - 1][n - 2] = -(h[n - 3] + h[n - 2]);
        a[n - 1][n - 1] = h[n - 3];

        let second = solve_dense(a, rhs).ok_or_else(|| {
            FlowError::InvalidConfig("spline system is singular".into())
        })?;
        Ok(Self { xs, ys, second })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Spline value at `x`; `None` outside the knot range.
    pub fn eval(&self, x: f64) -> Option<f64> {
        let (lo, hi) = self.domain();
        if !(lo..=hi).contains(&x) {
            return None;
        }
        let last = self.xs.len() - 1;
        let i = (self.xs.partition_point(|&k| k <= x)).clamp(1, last) - 1;
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let (m0, m1) = (self.second[i], self.second[i + 1]);
        let h = x1 - x0;
        let (l, r) = (x1 - x, x - x0);
        Some(
            m0 * l * l * l / (6.0 * h)
                + m1 * r * r * r / (6.0 * h)
                + (y0 / h - m0 * h / 6.0) * l
                + (y1 / h - m1 * h / 6.0) * r,
        )
    }
}

/// Gaussian elimination with partial pivoting.
fn solve_dense(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col] == 0.0 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Temperature to speed-of-sound lookup backed by a reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundSpeedCurve {
    spline: CubicSpline,
}

impl SoundSpeedCurve {
    pub fn from_table(points: &[(f64, f64)]) -> Result<Self, FlowError> {
        Ok(Self {
            spline: CubicSpline::not_a_knot(points)?,
        })
    }

    pub fn water() -> Result<Self, FlowError> {
        Self::from_table(&WATER_SOUND_SPEED)
    }

    pub fn speed_at_celsius(&self, celsius: f64) -> Result<f64, FlowError> {
        let (min, max) = self.spline.domain();
        self.spline
            .eval(celsius)
            .ok_or(FlowError::TemperatureOutOfRange { celsius, min, max })
    }

    pub fn speed_at_fahrenheit(&self, fahrenheit: f64) -> Result<f64, FlowError> {
        self.speed_at_celsius(fahrenheit_to_celsius(fahrenheit))
    }
}

/// Speed of sound in water (m/s) at a Fahrenheit temperature.
pub fn speed_of_sound_fahrenheit(fahrenheit: f64) -> Result<f64, FlowError> {
    SoundSpeedCurve::water()?.speed_at_fahrenheit(fahrenheit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knots_are_reproduced() {
        let curve = SoundSpeedCurve::water().unwrap();
        for (c, v) in WATER_SOUND_SPEED {
            let got = curve.speed_at_celsius(c).unwrap();
            assert!((got - v).abs() < 1e-9, "{c} C: {got} != {v}");
        }
    }

    #[test]
    fn fahrenheit_conversion() {
        assert_eq!(fahrenheit_to_celsius(32.0), 0.0);
        assert_eq!(fahrenheit_to_celsius(212.0), 100.0);
        let v = speed_of_sound_fahrenheit(68.0).unwrap();
        assert!((v - 1481.0).abs() < 1e-9);
    }

    #[test]
    fn between_knots_stays_between_neighbours() {
        let v = speed_of_sound_fahrenheit(77.0).unwrap(); // 25 C
        assert!(v > 1481.0 && v < 1507.0, "{v}");
    }

    #[test]
    fn cubic_is_reproduced_exactly() {
        let f = |x: f64| x * x * x - 2.0 * x + 1.0;
        let pts: Vec<(f64, f64)> = [0.0, 1.0, 3.0, 4.0, 6.0].iter().map(|&x| (x, f(x))).collect();
        let s = CubicSpline::not_a_knot(&pts).unwrap();
        for x in [0.5, 2.5, 3.3, 5.9] {
            let got = s.eval(x).unwrap();
            assert!((got - f(x)).abs() < 1e-9, "x={x}: {got} vs {}", f(x));
        }
    }

    #[test]
    fn out_of_range_is_an_error() {
        assert!(matches!(
            speed_of_sound_fahrenheit(31.0),
            Err(FlowError::TemperatureOutOfRange { min, max, .. }) if min == 0.0 && max == 100.0
        ));
        assert!(speed_of_sound_fahrenheit(213.0).is_err());
        assert!(speed_of_sound_fahrenheit(f64::NAN).is_err());
    }

    #[test]
    fn bad_tables_are_rejected() {
        assert!(SoundSpeedCurve::from_table(&[(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]).is_err());
        assert!(
            SoundSpeedCurve::from_table(&[(0.0, 1.0), (2.0, 2.0), (1.0, 3.0), (3.0, 4.0)]).is_err()
        );
    }
}
