//! Local-maximum peak detection.
//!
//! Semantics follow the common `find_peaks` contract so thresholds carry
//! over unchanged: plateaus report their (floored) midpoint, and filters run
//! in the order height → distance → prominence. The distance filter keeps
//! the tallest peak of any cluster closer than `distance` samples.

use ndarray::ArrayView1;

/// Peak selection criteria; `None` disables a filter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeakCriteria {
    /// Minimum peak height (inclusive)
    pub height: Option<f64>,
    /// Minimum horizontal distance between neighbouring peaks, in samples.
    /// Rounded up; values below 1 disable the filter.
    pub distance: Option<f64>,
    /// Minimum vertical prominence (inclusive)
    pub prominence: Option<f64>,
}

impl PeakCriteria {
    pub fn height(mut self, h: f64) -> Self {
        self.height = Some(h);
        self
    }

    pub fn distance(mut self, d: f64) -> Self {
        self.distance = Some(d);
        self
    }

    pub fn prominence(mut self, p: f64) -> Self {
        self.prominence = Some(p);
        self
    }
}

/// Indices of peaks in `x` that satisfy `criteria`, ascending.
pub fn find_peaks(x: ArrayView1<f64>, criteria: &PeakCriteria) -> Vec<usize> {
    let mut peaks = local_maxima(x);

    if let Some(h) = criteria.height {
        peaks.retain(|&p| x[p] >= h);
    }

    if let Some(d) = criteria.distance {
        if d >= 1.0 {
            peaks = select_by_distance(x, &peaks, d.ceil() as usize);
        }
    }

    if let Some(min_prominence) = criteria.prominence {
        peaks.retain(|&p| prominence(x, p) >= min_prominence);
    }

    peaks
}

fn local_maxima(x: ArrayView1<f64>) -> Vec<usize> {
    let n = x.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let i_max = n - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

fn select_by_distance(x: ArrayView1<f64>, peaks: &[usize], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; peaks.len()];

    // Visit peaks from tallest to shortest.
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| x[peaks[a]].total_cmp(&x[peaks[b]]));

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Height of a peak above the higher of its two bases.
pub fn prominence(x: ArrayView1<f64>, peak: usize) -> f64 {
    let top = x[peak];

    let mut left_min = top;
    for &v in x.slice(ndarray::s![..=peak]).iter().rev() {
        if v > top {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = top;
    for &v in x.slice(ndarray::s![peak..]).iter() {
        if v > top {
            break;
        }
        right_min = right_min.min(v);
    }

    top - left_min.max(right_min)
}
