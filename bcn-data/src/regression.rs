//! Least-squares fits used by the trend and smoothing annotations.

/// Ordinary least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fit a line through the points; `None` with fewer than two distinct x values.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return None;
        }
        let n = xs.len() as f64;
        let x_mean = xs.iter().sum::<f64>() / n;
        let y_mean = ys.iter().sum::<f64>() / n;
        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            sxx += (x - x_mean).powi(2);
            sxy += (x - x_mean) * (y - y_mean);
        }
        if sxx == 0.0 {
            return None;
        }
        let slope = sxy / sxx;
        Some(LinearFit {
            slope,
            intercept: y_mean - slope * x_mean,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Coefficient of determination of `predicted` against `actual`.
///
/// A constant `actual` series scores 1.0 when matched exactly and 0.0 otherwise.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Savitzky–Golay smoothing whose window spans the whole series.
///
/// With a single window the filter is the least-squares polynomial of degree
/// `polyorder` evaluated at every sample. The fit projects the series onto
/// Legendre polynomials over [-1, 1], re-orthonormalised on the sample grid.
pub fn savgol_full_window(values: &[f64], polyorder: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return values.to_vec();
    }
    let degree = polyorder.min(n - 1);
    let grid: Vec<f64> = (0..n)
        .map(|i| -1.0 + 2.0 * i as f64 / (n - 1) as f64)
        .collect();

    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(degree + 1);
    basis.push(vec![1.0; n]);
    if degree >= 1 {
        basis.push(grid.clone());
    }
    for k in 1..degree {
        let k_f = k as f64;
        let next: Vec<f64> = (0..n)
            .map(|i| {
                ((2.0 * k_f + 1.0) * grid[i] * basis[k][i] - k_f * basis[k - 1][i]) / (k_f + 1.0)
            })
            .collect();
        basis.push(next);
    }

    let orthonormal = orthonormalize(basis);
    let mut fitted = vec![0.0; n];
    for q in &orthonormal {
        let coefficient = dot(q, values);
        for (f, qi) in fitted.iter_mut().zip(q) {
            *f += coefficient * qi;
        }
    }
    fitted
}

// Modified Gram-Schmidt, run twice; degenerate columns are dropped.
fn orthonormalize(columns: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let mut result: Vec<Vec<f64>> = Vec::with_capacity(columns.len());
    for mut column in columns {
        let original_norm = dot(&column, &column).sqrt();
        for _ in 0..2 {
            for q in &result {
                let projection = dot(q, &column);
                for (c, qi) in column.iter_mut().zip(q) {
                    *c -= projection * qi;
                }
            }
        }
        let norm = dot(&column, &column).sqrt();
        if norm <= original_norm * 1e-10 || norm == 0.0 {
            continue;
        }
        column.iter_mut().for_each(|c| *c /= norm);
        result.push(column);
    }
    result
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
