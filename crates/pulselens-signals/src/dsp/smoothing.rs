//! Trend removal and Gaussian smoothing.

use ndarray::{Array1, ArrayView1};

/// Remove the least-squares linear trend.
pub fn detrend(x: ArrayView1<f64>) -> Array1<f64> {
    let n = x.len();
    if n < 2 {
        return Array1::zeros(n);
    }

    let nf = n as f64;
    let t_mean = (nf - 1.0) / 2.0;
    let x_mean = x.mean().unwrap_or(0.0);

    let mut cov = 0.0;
    let mut var = 0.0;
    for (i, &v) in x.iter().enumerate() {
        let dt = i as f64 - t_mean;
        cov += dt * (v - x_mean);
        var += dt * dt;
    }
    let slope = cov / var;

    Array1::from_shape_fn(n, |i| x[i] - (x_mean + slope * (i as f64 - t_mean)))
}

/// 1-D Gaussian filter.
///
/// The kernel is truncated at 4 sigma and the signal is extended by
/// half-sample reflection (`d c b a | a b c d | d c b a`), matching the
/// usual image-processing convention so edges keep their level.
pub fn gaussian_smooth(x: ArrayView1<f64>, sigma: f64) -> Array1<f64> {
    let n = x.len();
    if n == 0 || !(sigma > 0.0) || !sigma.is_finite() {
        return x.to_owned();
    }

    let radius = (4.0 * sigma + 0.5) as isize;
    let kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let norm: f64 = kernel.iter().sum();

    let reflect = |mut i: isize| -> usize {
        let len = n as isize;
        // Reflection period is 2n; fold into [0, 2n) then mirror.
        i = i.rem_euclid(2 * len);
        if i >= len {
            (2 * len - 1 - i) as usize
        } else {
            i as usize
        }
    };

    Array1::from_shape_fn(n, |i| {
        let acc: f64 = kernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * x[reflect(i as isize + k as isize - radius)])
            .sum();
        acc / norm
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_detrend_removes_line() {
        let x = Array1::from_shape_fn(50, |i| 3.0 * i as f64 - 7.0);
        let d = detrend(x.view());
        assert!(d.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_detrend_keeps_oscillation() {
        let x = Array1::from_shape_fn(60, |i| 0.5 * i as f64 + if i % 2 == 0 { 1.0 } else { -1.0 });
        let d = detrend(x.view());
        assert_relative_eq!(d.mean().unwrap(), 0.0, epsilon = 1e-9);
        assert!(d.iter().all(|v| (v.abs() - 1.0).abs() < 0.1));
    }

    #[test]
    fn test_detrend_short() {
        assert_eq!(detrend(array![5.0].view()), array![0.0]);
        assert_eq!(detrend(Array1::<f64>::zeros(0).view()).len(), 0);
    }

    #[test]
    fn test_gaussian_preserves_constant() {
        let x = Array1::from_elem(25, 4.2);
        let y = gaussian_smooth(x.view(), 3.0);
        for v in y.iter() {
            assert_relative_eq!(*v, 4.2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gaussian_attenuates_alternation() {
        let x = Array1::from_shape_fn(40, |i| if i % 2 == 0 { 1.0 } else { -1.0 });
        let y = gaussian_smooth(x.view(), 1.5);
        assert!(y.slice(ndarray::s![5..35]).iter().all(|v| v.abs() < 0.05));
    }

    #[test]
    fn test_gaussian_zero_sigma_is_identity() {
        let x = array![1.0, 5.0, 2.0];
        assert_eq!(gaussian_smooth(x.view(), 0.0), x);
    }
}
