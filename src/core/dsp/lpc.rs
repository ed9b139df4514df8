//! Linear prediction (Burg's method) and polynomial root finding

use num_complex::Complex64;

/// Why an LPC fit could not be produced
#[derive(Debug, Clone, PartialEq)]
pub enum LpcError {
    /// Fewer samples than the model order needs
    TooShort { len: usize, order: usize },
    /// Prediction error energy vanished (e.g. an all-zero frame)
    Degenerate { step: usize },
    /// Coefficients or roots became NaN/Inf
    NonFinite,
    /// Root iteration did not settle
    NoConvergence,
}

impl std::fmt::Display for LpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LpcError::TooShort { len, order } => {
                write!(f, "{} samples is too short for order {}", len, order)
            }
            LpcError::Degenerate { step } => write!(f, "zero error energy at step {}", step),
            LpcError::NonFinite => write!(f, "non-finite coefficients"),
            LpcError::NoConvergence => write!(f, "root finding did not converge"),
        }
    }
}

/// LPC coefficients `[1, a1, ..., a_order]` by Burg's method
pub fn burg(samples: &[f32], order: usize) -> Result<Vec<f64>, LpcError> {
    if samples.len() <= order {
        return Err(LpcError::TooShort {
            len: samples.len(),
            order,
        });
    }

    let mut fwd: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
    let mut bwd = fwd.clone();
    let mut a = vec![1.0f64];

    for step in 0..order {
        let f = &fwd[1..];
        let b = &bwd[..bwd.len() - 1];

        let num: f64 = f.iter().zip(b).map(|(x, y)| x * y).sum();
        let den: f64 = f.iter().zip(b).map(|(x, y)| x * x + y * y).sum();
        if den <= f64::MIN_POSITIVE {
            return Err(LpcError::Degenerate { step });
        }
        let k = -2.0 * num / den;

        let next_f: Vec<f64> = f.iter().zip(b).map(|(x, y)| x + k * y).collect();
        let next_b: Vec<f64> = f.iter().zip(b).map(|(x, y)| y + k * x).collect();
        fwd = next_f;
        bwd = next_b;

        let m = a.len();
        a = (0..=m)
            .map(|i| {
                let ai = a.get(i).copied().unwrap_or(0.0);
                let ar = if i == 0 { 0.0 } else { a[m - i] };
                ai + k * ar
            })
            .collect();
    }

    if a.iter().all(|c| c.is_finite()) {
        Ok(a)
    } else {
        Err(LpcError::NonFinite)
    }
}

const MAX_ITERATIONS: usize = 500;

/// Largest update, relative to the root magnitude, that counts as settled
const STEP_TOLERANCE: f64 = 1e-10;

/// Largest scaled `|p(z)|` accepted when the iteration runs out
const RESIDUAL_TOLERANCE: f64 = 1e-10;

/// Roots of the polynomial `coeffs[0] z^n + coeffs[1] z^(n-1) + ... + coeffs[n]`
/// by Durand-Kerner iteration
pub fn polynomial_roots(coeffs: &[f64]) -> Result<Vec<Complex64>, LpcError> {
    // Leading zeros do not change the roots
    let first = coeffs.iter().position(|c| *c != 0.0);
    let coeffs = match first {
        Some(i) => &coeffs[i..],
        None => return Ok(Vec::new()),
    };

    let degree = coeffs.len() - 1;
    if degree == 0 {
        return Ok(Vec::new());
    }

    let lead = coeffs[0];
    let monic: Vec<f64> = coeffs.iter().map(|c| c / lead).collect();
    let eval = |z: Complex64| {
        monic
            .iter()
            .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + c)
    };

    let seed = Complex64::new(0.4, 0.9);
    let mut roots: Vec<Complex64> = (0..degree).map(|i| seed.powu(i as u32)).collect();

    for _ in 0..MAX_ITERATIONS {
        let mut settled = true;
        for i in 0..degree {
            let mut denom = Complex64::new(1.0, 0.0);
            for j in 0..degree {
                if i != j {
                    denom *= roots[i] - roots[j];
                }
            }
            if denom.norm() < 1e-300 {
                denom = Complex64::new(1e-12, 0.0);
            }
            let step = eval(roots[i]) / denom;
            roots[i] -= step;
            settled &= step.norm() <= STEP_TOLERANCE * roots[i].norm().max(1.0);
        }

        if roots.iter().any(|r| !r.re.is_finite() || !r.im.is_finite()) {
            return Err(LpcError::NonFinite);
        }
        if settled {
            return Ok(roots);
        }
    }

    // Rounding can keep steps just above tolerance once the roots are exact
    let scale: f64 = monic.iter().map(|c| c.abs()).sum();
    let residual = roots
        .iter()
        .map(|&z| eval(z).norm() / (scale * z.norm().max(1.0).powi(degree as i32)))
        .fold(0.0f64, f64::max);
    if residual <= RESIDUAL_TOLERANCE {
        Ok(roots)
    } else {
        Err(LpcError::NoConvergence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roots_of_quadratic() {
        // z^2 - 3z + 2 = (z - 1)(z - 2)
        let mut roots = polynomial_roots(&[1.0, -3.0, 2.0]).unwrap();
        roots.sort_by(|a, b| a.re.partial_cmp(&b.re).unwrap());
        assert!((roots[0].re - 1.0).abs() < 1e-9 && roots[0].im.abs() < 1e-9);
        assert!((roots[1].re - 2.0).abs() < 1e-9 && roots[1].im.abs() < 1e-9);
    }

    #[test]
    fn test_complex_roots() {
        // z^2 + 1
        let roots = polynomial_roots(&[1.0, 0.0, 1.0]).unwrap();
        assert!(roots.iter().all(|r| r.re.abs() < 1e-9 && (r.im.abs() - 1.0).abs() < 1e-9));
    }

    /// Poles at 1 kHz (r = 0.98) driven by seeded white noise, 16 kHz
    fn ar2_resonator(n: usize) -> Vec<f32> {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let sr = 16000.0f64;
        let theta = 2.0 * std::f64::consts::PI * 1000.0 / sr;
        let (a1, a2) = (2.0 * 0.98 * theta.cos(), -0.98 * 0.98);

        let mut rng = StdRng::seed_from_u64(3);
        let mut y = vec![0.0f64; n];
        for i in 0..n {
            let y1 = if i >= 1 { y[i - 1] } else { 0.0 };
            let y2 = if i >= 2 { y[i - 2] } else { 0.0 };
            y[i] = rng.random_range(-0.5f64..0.5) + a1 * y1 + a2 * y2;
        }
        let peak = y.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        y.iter().map(|v| (0.5 * v / peak) as f32).collect()
    }

    #[test]
    fn test_burg_recovers_resonance() {
        let sr = 16000.0f64;
        let a = burg(&ar2_resonator(8000), 2).unwrap();
        let roots = polynomial_roots(&a).unwrap();
        let freq = roots
            .iter()
            .filter(|z| z.im > 0.0)
            .map(|z| z.im.atan2(z.re) * sr / (2.0 * std::f64::consts::PI))
            .next()
            .unwrap();
        assert!((freq - 1000.0).abs() < 20.0, "estimated {} Hz", freq);
    }

    #[test]
    fn test_roots_near_unit_circle() {
        // Six conjugate pole pairs just inside the unit circle, as in a
        // sharply resonant order-12 LPC fit
        let angles = [0.2f64, 0.45, 0.7, 1.1, 1.6, 2.3];
        let mut poly = vec![Complex64::new(1.0, 0.0)];
        for &w in &angles {
            for z in [Complex64::from_polar(0.999, w), Complex64::from_polar(0.999, -w)] {
                let mut next = vec![Complex64::new(0.0, 0.0); poly.len() + 1];
                for (i, c) in poly.iter().enumerate() {
                    next[i] += *c;
                    next[i + 1] -= *c * z;
                }
                poly = next;
            }
        }
        let coeffs: Vec<f64> = poly.iter().map(|c| c.re).collect();

        let roots = polynomial_roots(&coeffs).unwrap();
        assert_eq!(roots.len(), 12);
        for &w in &angles {
            assert!(
                roots.iter().any(|r| (r.arg() - w).abs() < 1e-6 && (r.norm() - 0.999).abs() < 1e-6),
                "missing pole at {} rad: {:?}",
                w,
                roots
            );
        }
    }

    #[test]
    fn test_burg_zero_signal_is_degenerate() {
        assert_eq!(burg(&vec![0.0; 4096], 12), Err(LpcError::Degenerate { step: 0 }));
    }

    #[test]
    fn test_burg_too_short() {
        assert!(matches!(burg(&[0.1; 5], 12), Err(LpcError::TooShort { .. })));
    }
}
