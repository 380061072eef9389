//! Small numeric helpers shared by the lag and flow stages.

/// `n` evenly spaced values from `start` to `stop` inclusive.
///
/// - `n == 0` yields an empty vector, `n == 1` yields `[start]`.
/// - The last value is exactly `stop`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = stop;
            out
        }
    }
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`.
///
/// `xs` must be non-decreasing. Outside `[xs[0], xs[last]]` the end values
/// are returned. Returns `None` only when `xs` is empty or lengths differ.
pub fn interp_linear(xs: &[f64], ys: &[f64], x: f64) -> Option<f64> {
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }
    let last = xs.len() - 1;
    if x <= xs[0] {
        return Some(ys[0]);
    }
    if x >= xs[last] {
        return Some(ys[last]);
    }
    // First index with xs[i] > x; clamped in case xs is not sorted.
    let hi = xs.partition_point(|&v| v <= x).clamp(1, last);
    let lo = hi - 1;
    let dx = xs[hi] - xs[lo];
    if dx == 0.0 {
        return Some(ys[hi]);
    }
    let t = (x - xs[lo]) / dx;
    Some(ys[lo] + t * (ys[hi] - ys[lo]))
}

/// Index of the first maximum of `f(v)`; `None` when empty.
///
/// NaN values never win.
pub fn first_argmax_by<T>(values: &[T], f: impl Fn(&T) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.iter().enumerate() {
        let key = f(v);
        if key.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if key <= b => {}
            _ => best = Some((i, key)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the first maximum; `None` when empty or all NaN.
pub fn first_argmax(values: &[f64]) -> Option<usize> {
    first_argmax_by(values, |v| *v)
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
