//! Savitzky-Golay polynomial sliding-window smoothing.
//!
//! Interior points use the least-squares convolution weights for the
//! window center; edge points are taken from a polynomial fitted to
//! the first (resp. last) full window, so the filter reproduces
//! polynomials up to the configured order exactly.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Filter configuration. Defaults match the deflection conditioning
/// used for the 300 fps membrane clips.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SavgolParams {
    /// Window length; clamped down to the largest odd value not
    /// exceeding the input length.
    pub window: usize,
    /// Polynomial order; must stay below the effective window.
    pub poly_order: usize,
}

impl Default for SavgolParams {
    fn default() -> Self {
        Self {
            window: 51,
            poly_order: 3,
        }
    }
}

/// Smooth a sequence. Inputs with fewer than 5 samples are returned
/// unchanged (the fit needs window > order and a minimum of samples).
pub fn savgol_filter(y: &[f64], params: SavgolParams) -> Vec<f64> {
    let n = y.len();
    if n < 5 {
        return y.to_vec();
    }

    let mut window = params.window;
    if n < window {
        window = if n % 2 == 1 { n } else { n - 1 };
        debug!("Clamped smoothing window to {}", window);
    }
    if window % 2 == 0 {
        window -= 1;
    }
    let poly = params.poly_order.min(window - 1);
    let half = window / 2;

    // Convolution weights for the window center: evaluating the
    // least-squares fit at x = 0 is linear in the samples.
    let center = center_weights(window, poly);
    let mut out = vec![0.0; n];
    for i in half..n - half {
        let mut acc = 0.0;
        for (j, &w) in center.iter().enumerate() {
            acc += w * y[i - half + j];
        }
        out[i] = acc;
    }

    // Edge handling: fit one polynomial per end and evaluate it at
    // the positions the centered window cannot reach.
    let xs: Vec<f64> = (0..window).map(|i| i as f64).collect();
    let head = polyfit(&xs, &y[..window], poly);
    for (i, slot) in out.iter_mut().take(half).enumerate() {
        *slot = polyval(&head, i as f64);
    }
    let tail = polyfit(&xs, &y[n - window..], poly);
    for i in 0..half {
        out[n - half + i] = polyval(&tail, (window - half + i) as f64);
    }

    out
}

/// Least-squares weights reproducing the fitted value at the window
/// center. Solves (AᵀA) z = e0 and returns A z.
fn center_weights(window: usize, poly: usize) -> Vec<f64> {
    let half = window as i64 / 2;
    let m = poly + 1;

    // Normal matrix AᵀA over x = -half..=half
    let mut ata = vec![vec![0.0f64; m]; m];
    for x in -half..=half {
        let mut powers = vec![1.0f64; 2 * m - 1];
        for k in 1..2 * m - 1 {
            powers[k] = powers[k - 1] * x as f64;
        }
        for r in 0..m {
            for c in 0..m {
                ata[r][c] += powers[r + c];
            }
        }
    }
    let mut e0 = vec![0.0f64; m];
    e0[0] = 1.0;
    let z = solve(ata, e0);

    (-half..=half)
        .map(|x| {
            let mut xp = 1.0;
            let mut acc = 0.0;
            for &zk in &z {
                acc += zk * xp;
                xp *= x as f64;
            }
            acc
        })
        .collect()
}

/// Least-squares polynomial fit via normal equations.
fn polyfit(xs: &[f64], ys: &[f64], poly: usize) -> Vec<f64> {
    let m = poly + 1;
    let mut ata = vec![vec![0.0f64; m]; m];
    let mut aty = vec![0.0f64; m];
    for (&x, &y) in xs.iter().zip(ys) {
        let mut powers = vec![1.0f64; 2 * m - 1];
        for k in 1..2 * m - 1 {
            powers[k] = powers[k - 1] * x;
        }
        for r in 0..m {
            aty[r] += powers[r] * y;
            for c in 0..m {
                ata[r][c] += powers[r + c];
            }
        }
    }
    solve(ata, aty)
}

fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Gaussian elimination with partial pivoting; the normal matrices
/// here are tiny (order + 1 square).
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        a.swap(col, pivot);
        b.swap(col, pivot);
        let diag = a[col][col];
        if diag.abs() < 1e-12 {
            continue;
        }
        for row in col + 1..n {
            let factor = a[row][col] / diag;
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in row + 1..n {
            acc -= a[row][k] * x[k];
        }
        x[row] = if a[row][row].abs() < 1e-12 {
            0.0
        } else {
            acc / a[row][row]
        };
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_is_identity() {
        for len in 0..5 {
            let y: Vec<f64> = (0..len).map(|i| i as f64 * 1.7).collect();
            assert_eq!(savgol_filter(&y, SavgolParams::default()), y);
        }
    }

    #[test]
    fn test_window_clamped_to_odd_length() {
        // 8 samples against the default window of 51: effective
        // window 7, still smooths without panicking
        let y: Vec<f64> = (0..8).map(|i| (i as f64).sin()).collect();
        let out = savgol_filter(&y, SavgolParams::default());
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn test_constant_preserved() {
        let y = vec![4.2; 60];
        let out = savgol_filter(&y, SavgolParams::default());
        for v in out {
            assert!((v - 4.2).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cubic_reproduced_exactly() {
        // Order-3 fit reproduces cubics, including at the edges
        let y: Vec<f64> = (0..30)
            .map(|i| {
                let x = i as f64;
                0.5 * x * x * x - 2.0 * x * x + x - 7.0
            })
            .collect();
        let out = savgol_filter(&y, SavgolParams { window: 7, poly_order: 3 });
        for (a, b) in out.iter().zip(&y) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn test_noise_variance_reduced() {
        // Deterministic pseudo-noise on a slow ramp
        let y: Vec<f64> = (0..200)
            .map(|i| i as f64 * 0.01 + ((i * 2654435761u64 as usize) % 97) as f64 * 0.01)
            .collect();
        let out = savgol_filter(&y, SavgolParams { window: 21, poly_order: 2 });
        let var = |v: &[f64]| {
            let mean = v.iter().sum::<f64>() / v.len() as f64;
            v.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / v.len() as f64
        };
        let detrended_in: Vec<f64> = y.iter().enumerate().map(|(i, v)| v - i as f64 * 0.01).collect();
        let detrended_out: Vec<f64> = out.iter().enumerate().map(|(i, v)| v - i as f64 * 0.01).collect();
        assert!(var(&detrended_out) < var(&detrended_in));
    }
}
