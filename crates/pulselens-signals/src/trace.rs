//! Per-frame input traces.
//!
//! The face tracker upstream emits one averaged colour sample and one blink
//! flag per analyzed frame. Both arrive here either in memory or as
//! tab/whitespace separated tables, one row per frame.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{validate_fps, Result, RppgError};

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected {expected} columns, found {found}")]
    Malformed {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: cannot parse `{value}` as a number")]
    Parse { line: usize, value: String },
    #[error("unknown channel order `{0}` (expected `rgb` or `bgr`)")]
    ChannelOrder(String),
}

/// Column layout of a colour table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl FromStr for ChannelOrder {
    type Err = TraceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(ChannelOrder::Rgb),
            "bgr" => Ok(ChannelOrder::Bgr),
            other => Err(TraceError::ChannelOrder(other.to_string())),
        }
    }
}

impl ChannelOrder {
    fn to_rgb(self, row: [f64; 3]) -> [f64; 3] {
        match self {
            ChannelOrder::Rgb => row,
            ChannelOrder::Bgr => [row[2], row[1], row[0]],
        }
    }
}

/// Colour channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    R = 0,
    G = 1,
    B = 2,
}

/// Ordered facial colour samples with their sampling rate.
///
/// Immutable once built; trimming produces a new trace.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbTrace {
    samples: Vec<[f64; 3]>,
    fps: f64,
}

impl RgbTrace {
    pub fn new(samples: Vec<[f64; 3]>, fps: f64) -> Self {
        Self { samples, fps }
    }

    /// Build from three equally long channel slices. Extra samples in a
    /// longer channel are ignored.
    pub fn from_channels(r: &[f64], g: &[f64], b: &[f64], fps: f64) -> Self {
        let samples = r
            .iter()
            .zip(g)
            .zip(b)
            .map(|((&r, &g), &b)| [r, g, b])
            .collect();
        Self { samples, fps }
    }

    pub fn samples(&self) -> &[[f64; 3]] {
        &self.samples
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop the first `n` frames (detector warm-up).
    pub fn trim_leading(&self, n: usize) -> RgbTrace {
        let start = n.min(self.samples.len());
        RgbTrace {
            samples: self.samples[start..].to_vec(),
            fps: self.fps,
        }
    }

    pub fn channel(&self, channel: Channel) -> Array1<f64> {
        self.samples.iter().map(|s| s[channel as usize]).collect()
    }

    /// Shared extractor preconditions: non-empty, usable fps, and at least
    /// `required` frames.
    pub(crate) fn validate(&self, required: usize) -> Result<()> {
        if self.samples.is_empty() {
            return Err(RppgError::EmptyData);
        }
        validate_fps(self.fps)?;
        if self.samples.len() < required {
            return Err(RppgError::NotEnoughData {
                required,
                actual: self.samples.len(),
            });
        }
        Ok(())
    }
}

/// Per-frame eye-closure flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlinkTrace {
    flags: Vec<bool>,
}

impl BlinkTrace {
    pub fn new(flags: Vec<bool>) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn trim_leading(&self, n: usize) -> BlinkTrace {
        let start = n.min(self.flags.len());
        BlinkTrace {
            flags: self.flags[start..].to_vec(),
        }
    }
}

impl FromIterator<bool> for BlinkTrace {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}

fn parse_row(line: &str, line_no: usize) -> std::result::Result<Vec<f64>, TraceError> {
    line.split_whitespace()
        .map(|cell| {
            cell.parse::<f64>().map_err(|_| TraceError::Parse {
                line: line_no,
                value: cell.to_string(),
            })
        })
        .collect()
}

/// Parse a three-column colour table. Blank lines are skipped.
pub fn parse_rgb_tsv<R: BufRead>(
    reader: R,
    order: ChannelOrder,
    fps: f64,
) -> std::result::Result<RgbTrace, TraceError> {
    let mut samples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = parse_row(&line, idx + 1)?;
        if row.len() != 3 {
            return Err(TraceError::Malformed {
                line: idx + 1,
                expected: 3,
                found: row.len(),
            });
        }
        samples.push(order.to_rgb([row[0], row[1], row[2]]));
    }
    Ok(RgbTrace::new(samples, fps))
}

/// Parse a blink flag table. Every cell is one frame; non-zero means closed.
pub fn parse_blink_tsv<R: BufRead>(reader: R) -> std::result::Result<BlinkTrace, TraceError> {
    let mut flags = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        for value in parse_row(&line, idx + 1)? {
            flags.push(value != 0.0);
        }
    }
    Ok(BlinkTrace::new(flags))
}

pub fn read_rgb_tsv<P: AsRef<Path>>(
    path: P,
    order: ChannelOrder,
    fps: f64,
) -> std::result::Result<RgbTrace, TraceError> {
    let file = File::open(path)?;
    parse_rgb_tsv(BufReader::new(file), order, fps)
}

pub fn read_blink_tsv<P: AsRef<Path>>(path: P) -> std::result::Result<BlinkTrace, TraceError> {
    let file = File::open(path)?;
    parse_blink_tsv(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_rgb_rows() {
        let data = "10\t20\t30\n\n11 21 31\n";
        let trace = parse_rgb_tsv(Cursor::new(data), ChannelOrder::Rgb, 30.0).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.samples()[1], [11.0, 21.0, 31.0]);
        assert_eq!(trace.fps(), 30.0);
    }

    #[test]
    fn test_parse_bgr_swaps() {
        let trace = parse_rgb_tsv(Cursor::new("1\t2\t3\n"), ChannelOrder::Bgr, 30.0).unwrap();
        assert_eq!(trace.samples()[0], [3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_malformed_row() {
        let err = parse_rgb_tsv(Cursor::new("1\t2\t3\n4\t5\n"), ChannelOrder::Rgb, 30.0).unwrap_err();
        assert!(matches!(err, TraceError::Malformed { line: 2, expected: 3, found: 2 }));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_rgb_tsv(Cursor::new("1\tx\t3\n"), ChannelOrder::Rgb, 30.0).unwrap_err();
        assert!(matches!(err, TraceError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_parse_blink_flattens() {
        let blink = parse_blink_tsv(Cursor::new("0\n1\n0 1\n")).unwrap();
        assert_eq!(blink.flags(), &[false, true, false, true]);
    }

    #[test]
    fn test_channel_order_from_str() {
        assert_eq!("BGR".parse::<ChannelOrder>().unwrap(), ChannelOrder::Bgr);
        assert!("xyz".parse::<ChannelOrder>().is_err());
    }

    #[test]
    fn test_trim_leading() {
        let trace = RgbTrace::new(vec![[1.0, 1.0, 1.0]; 30], 15.0);
        assert_eq!(trace.trim_leading(21).len(), 9);
        assert_eq!(trace.trim_leading(100).len(), 0);
        assert_eq!(trace.len(), 30);
    }

    #[test]
    fn test_validate_order() {
        assert_eq!(RgbTrace::new(vec![], 3.0).validate(1), Err(RppgError::EmptyData));
        assert_eq!(
            RgbTrace::new(vec![[1.0; 3]], 3.0).validate(1),
            Err(RppgError::WrongFps { fps: 3.0 })
        );
        assert_eq!(
            RgbTrace::new(vec![[1.0; 3]; 4], 30.0).validate(5),
            Err(RppgError::NotEnoughData { required: 5, actual: 4 })
        );
    }

    #[test]
    fn test_channels() {
        let trace = RgbTrace::from_channels(&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0], 30.0);
        assert_eq!(trace.samples()[1], [2.0, 4.0, 6.0]);
        assert_eq!(trace.channel(Channel::G).to_vec(), vec![3.0, 4.0]);
    }
}
