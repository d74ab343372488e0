//! Multi-channel motion-sensor sample buffer.
//!
//! A [`SensorData`] holds one contiguous, possibly multi-channel time series:
//! an ordered channel layout, a row-major interleaved `f32` sample vector, a
//! start timestamp, and a sampling rate. Chunks arriving from a device are
//! merged into an accumulating buffer through [`SensorData::append`], which
//! enforces the temporal-continuity policy:
//!
//! - chunks overlapping the buffered tail replace it (later data wins),
//! - small gaps are bridged by per-channel linear interpolation,
//! - gaps beyond [`MAX_GAP_SECONDS`] are rejected as real discontinuities.
//!
//! Real device streams arrive in irregular chunks with small clock drift, so
//! small gaps are assumed to be transport jitter while large ones must be
//! surfaced to the caller rather than silently bridged.

use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, SensingError};

/// Wrist a wearable sensor is mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Sensor worn on the left wrist.
    LeftWrist,
    /// Sensor worn on the right wrist.
    RightWrist,
}

/// A tagged sensor source with a fixed intrinsic dimensionality.
///
/// Equality is structural: an accelerometer at the left wrist is a different
/// channel type than one at the right wrist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    /// Three-axis accelerometer at the given location.
    Accelerometer(Location),
    /// Three-axis gyroscope at the given location.
    Gyroscope(Location),
    /// Single-value heart-rate monitor.
    HeartRate,
}

impl SensorType {
    /// Number of scalar columns this channel contributes per row.
    pub fn dimension(&self) -> usize {
        match self {
            SensorType::Accelerometer(_) | SensorType::Gyroscope(_) => 3,
            SensorType::HeartRate => 1,
        }
    }
}

/// Maximum bridgeable gap, in seconds, between an accumulated buffer and a
/// newly appended chunk. Anything larger is a real discontinuity.
pub const MAX_GAP_SECONDS: f64 = 10.0;

/// One contiguous, possibly multi-channel sensor time series.
///
/// Samples are row-major interleaved in channel-layout order: one row holds
/// `dimension` scalars, where `dimension` is the sum of the per-channel
/// dimensions. The buffer is mutated only through [`SensorData::append`];
/// every other operation is read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorData {
    types: Vec<SensorType>,
    start: f64,
    samples_per_second: u8,
    samples: Vec<f32>,
}

impl SensorData {
    /// Create a buffer from an explicit sample vector.
    ///
    /// Fails with [`SensingError::InvalidSampleCountForDimension`] when the
    /// flat sample count does not form whole rows for the channel layout.
    pub fn new(
        types: Vec<SensorType>,
        start: f64,
        samples_per_second: u8,
        samples: Vec<f32>,
    ) -> CoreResult<Self> {
        let dimension: usize = types.iter().map(SensorType::dimension).sum();
        let divisible = dimension != 0 && samples.len() % dimension == 0;
        if !(samples.is_empty() || divisible) {
            return Err(SensingError::InvalidSampleCountForDimension {
                count: samples.len(),
                dimension,
            });
        }
        Ok(Self {
            types,
            start,
            samples_per_second,
            samples,
        })
    }

    /// Ordered channel layout of this buffer.
    pub fn types(&self) -> &[SensorType] {
        &self.types
    }

    /// Row-major interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Start timestamp in seconds since the epoch.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Start timestamp as a UTC instant.
    pub fn start_instant(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos((self.start * 1e9) as i64)
    }

    /// Sampling rate in rows per second.
    pub fn samples_per_second(&self) -> u8 {
        self.samples_per_second
    }

    /// Total scalar columns per row.
    pub fn dimension(&self) -> usize {
        self.types.iter().map(SensorType::dimension).sum()
    }

    /// Number of whole rows in the buffer.
    pub fn row_count(&self) -> usize {
        let dimension = self.dimension();
        if dimension == 0 {
            0
        } else {
            self.samples.len() / dimension
        }
    }

    /// Timestamp one tick past the last row.
    pub fn end(&self) -> f64 {
        self.start + self.row_count() as f64 / f64::from(self.samples_per_second)
    }

    /// Covered time span in seconds.
    pub fn duration(&self) -> f64 {
        self.end() - self.start
    }

    /// Merge `other` into this buffer, resolving overlaps and small gaps.
    ///
    /// Appending an empty chunk is a no-op. On any error the buffer is left
    /// exactly as it was before the call.
    pub fn append(&mut self, other: &SensorData) -> CoreResult<()> {
        if other.samples.is_empty() {
            return Ok(());
        }
        if other.samples_per_second != self.samples_per_second {
            return Err(SensingError::MismatchedSamplesPerSecond {
                expected: self.samples_per_second,
                actual: other.samples_per_second,
            });
        }
        if other.types != self.types {
            return Err(SensingError::MismatchedDimension {
                expected: self.dimension(),
                actual: other.dimension(),
            });
        }

        // An empty buffer has no meaningful end; adopt the chunk wholesale.
        if self.samples.is_empty() {
            self.start = other.start;
            self.samples = other.samples.clone();
            return Ok(());
        }

        let rate = f64::from(self.samples_per_second);
        let dimension = self.dimension();
        let gap = other.start - self.end();
        if gap > MAX_GAP_SECONDS {
            return Err(SensingError::TooDiscontinuous { gap });
        }

        if gap < 0.0 {
            let overlap_rows = (-gap * rate).round() as usize;
            if overlap_rows >= self.row_count() {
                // The chunk covers everything we have.
                self.start = other.start;
                self.samples.clear();
            } else {
                let keep = self.samples.len() - overlap_rows * dimension;
                self.samples.truncate(keep);
            }
            self.samples.extend_from_slice(&other.samples);
        } else {
            let gap_rows = (gap * rate).floor() as usize;
            if gap_rows > 0 {
                self.interpolate_gap(other, gap_rows, dimension);
            }
            self.samples.extend_from_slice(&other.samples);
        }

        debug!(
            "appended {} rows (gap {:.3} s), buffer now {} rows",
            other.row_count(),
            gap,
            self.row_count()
        );
        Ok(())
    }

    /// Synthesize `gap_rows` filler rows between the last buffered row and
    /// the first row of `other`, each column interpolated independently.
    ///
    /// The per-column step is `(first - last) / (gap_rows + 1)`; the exact
    /// arithmetic is contractual, including its boundary behavior for very
    /// small deltas.
    fn interpolate_gap(&mut self, other: &SensorData, gap_rows: usize, dimension: usize) {
        let last_begin = self.samples.len() - dimension;
        let mut filler = Vec::with_capacity(gap_rows * dimension);
        for i in 1..=gap_rows {
            for column in 0..dimension {
                let last = self.samples[last_begin + column];
                let first = other.samples[column];
                let step = (first - last) / (gap_rows as f32 + 1.0);
                filler.push(last + step * i as f32);
            }
        }
        self.samples.extend_from_slice(&filler);
    }

    /// Extract the dense sub-series for the channels present in `wanted`.
    ///
    /// Returns the selected dimension and the column-filtered samples, with
    /// channels kept in this buffer's layout order. A selected dimension of
    /// zero means no channel matched.
    pub fn samples_along(&self, wanted: &[SensorType]) -> (usize, Vec<f32>) {
        let mut columns = Vec::new();
        let mut offset = 0;
        for t in &self.types {
            if wanted.contains(t) {
                columns.extend(offset..offset + t.dimension());
            }
            offset += t.dimension();
        }
        if columns.is_empty() {
            return (0, Vec::new());
        }

        let dimension = self.dimension();
        let mut selected = Vec::with_capacity(self.row_count() * columns.len());
        for row in self.samples.chunks_exact(dimension) {
            selected.extend(columns.iter().map(|&c| row[c]));
        }
        (columns.len(), selected)
    }

    /// Extract a one-dimensional channel as a flat scalar series.
    pub fn scalar_along(&self, wanted: SensorType) -> CoreResult<Vec<f32>> {
        if wanted.dimension() != 1 {
            return Err(SensingError::MismatchedDimension {
                expected: 1,
                actual: wanted.dimension(),
            });
        }
        let (dimension, samples) = self.samples_along(&[wanted]);
        if dimension == 0 {
            return Err(SensingError::NoSensorDataType {
                received: self.types.clone(),
                required: vec![wanted],
            });
        }
        Ok(samples)
    }

    /// Extract a three-dimensional channel as `[x, y, z]` triples.
    pub fn triples_along(&self, wanted: SensorType) -> CoreResult<Vec<[f32; 3]>> {
        if wanted.dimension() != 3 {
            return Err(SensingError::MismatchedDimension {
                expected: 3,
                actual: wanted.dimension(),
            });
        }
        let (dimension, samples) = self.samples_along(&[wanted]);
        if dimension == 0 {
            return Err(SensingError::NoSensorDataType {
                received: self.types.clone(),
                required: vec![wanted],
            });
        }
        Ok(samples
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect())
    }

    /// Carve out the rows covering `[offset, offset + duration)` seconds,
    /// both measured from this buffer's start. The range is clamped to the
    /// available rows.
    pub fn slice(&self, offset: f64, duration: f64) -> SensorData {
        let rate = f64::from(self.samples_per_second);
        let dimension = self.dimension();
        let first_row = ((offset.max(0.0) * rate).floor() as usize).min(self.row_count());
        let rows = ((duration.max(0.0) * rate).floor() as usize).min(self.row_count() - first_row);
        SensorData {
            types: self.types.clone(),
            start: self.start + first_row as f64 / rate,
            samples_per_second: self.samples_per_second,
            samples: self.samples[first_row * dimension..(first_row + rows) * dimension].to_vec(),
        }
    }
}
