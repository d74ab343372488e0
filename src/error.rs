//! Custom error types for the sensing core.
//!
//! This module defines the primary error type, `SensingError`, for the whole
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to report the failures that can occur along the pipeline,
//! from malformed byte buffers to model/data shape mismatches.
//!
//! ## Error Categories
//!
//! - **Shape mismatches** (`MismatchedSamplesPerSecond`, `MismatchedDimension`,
//!   `InvalidSampleCountForDimension`): the incoming data does not line up
//!   with the buffer or accessor it is being combined with.
//! - **Discontinuity** (`TooDiscontinuous`): the gap between an accumulated
//!   buffer and a newly appended chunk exceeds the continuity limit. Small
//!   gaps are interpolated away; this one must be surfaced to the caller.
//! - **Malformed input** (`NotEnoughInput`, `BadHeader`, `InvalidDeviceBlock`,
//!   `Unencodable`): a byte buffer is truncated, carries an unexpected
//!   constant, or a buffer cannot be represented on the wire.
//! - **Compression** (`DecompressionFailed`): the block decompressor signaled
//!   failure or produced a length that disagrees with the declared one.
//! - **Model mismatches** (`InvalidWeightsForLayerConfiguration`,
//!   `InvalidLayerConfiguration`, `InvalidFeatureMatrixSize`): the supplied
//!   network description and the data fed through it do not agree.
//! - **Insufficient data** (`NoSensorDataType`, `NotEnoughRows`): the
//!   classifier was handed a buffer it cannot produce a single window from.
//!
//! All errors are local, non-retryable, and reported synchronously to the
//! immediate caller; none are swallowed inside the core. Operations that can
//! fail never partially mutate their receiver.

use thiserror::Error;

use crate::sensor::SensorType;

/// Convenience alias for results using the core error type.
pub type CoreResult<T> = std::result::Result<T, SensingError>;

/// Primary error type for the sensing core.
#[derive(Error, Debug)]
pub enum SensingError {
    /// Sample vector length is not divisible by the channel dimension.
    ///
    /// Raised when constructing a buffer whose flat sample count does not
    /// form whole rows for the declared channel layout.
    #[error("Sample count {count} is not divisible by channel dimension {dimension}")]
    InvalidSampleCountForDimension {
        /// Flat scalar sample count that was supplied.
        count: usize,
        /// Total dimension of the declared channel layout.
        dimension: usize,
    },

    /// Sampling rates of the two buffers differ on `append`.
    #[error("Mismatched sampling rate: expected {expected} Hz, got {actual} Hz")]
    MismatchedSamplesPerSecond {
        /// Rate of the accumulating buffer.
        expected: u8,
        /// Rate of the chunk being appended.
        actual: u8,
    },

    /// Channel layouts or dimensions of the two sides differ.
    ///
    /// Raised on `append` when the channel layouts disagree, and by the
    /// scalar/triple accessors when the requested type does not have the
    /// expected dimensionality.
    #[error("Mismatched channel dimension: expected {expected}, got {actual}")]
    MismatchedDimension {
        /// Dimension the receiver expects.
        expected: usize,
        /// Dimension that was supplied.
        actual: usize,
    },

    /// Gap between buffer end and chunk start exceeds the continuity limit.
    ///
    /// Small gaps are transport jitter and get interpolated away; a gap this
    /// large indicates a real discontinuity that the caller must handle.
    #[error("Too discontinuous: gap of {gap:.3} s exceeds the continuity limit")]
    TooDiscontinuous {
        /// Gap in seconds between the buffer's end and the chunk's start.
        gap: f64,
    },

    /// Byte buffer ended before the declared content did.
    #[error("Not enough input while reading {context}")]
    NotEnoughInput {
        /// Wire field being parsed when the input ran out.
        context: &'static str,
    },

    /// A header constant did not carry its expected value.
    ///
    /// Covers a wrong magic byte, an unsupported version, and unrecognized
    /// channel tags.
    #[error("Bad header: unexpected value for {context}")]
    BadHeader {
        /// Wire field that carried the unexpected value.
        context: &'static str,
    },

    /// The block decompressor failed or produced a surprising length.
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// A legacy device block had the wrong size.
    #[error("Device block must be {expected} bytes, got {actual}")]
    InvalidDeviceBlock {
        /// The fixed block length the device emits.
        expected: usize,
        /// Length of the block that was received.
        actual: usize,
    },

    /// The buffer cannot be represented in the wire format.
    ///
    /// The primary format stores the channel count in one byte and the
    /// sample count in four; buffers beyond those bounds are rejected at
    /// encode time rather than silently truncated.
    #[error("Buffer is not encodable: {context}")]
    Unencodable {
        /// The wire bound that was exceeded.
        context: &'static str,
    },

    /// Flat weight vector length does not match the layer configuration.
    #[error("Weight vector of length {actual} does not match layer configuration (expected {expected})")]
    InvalidWeightsForLayerConfiguration {
        /// Weight count implied by the layer sizes.
        expected: usize,
        /// Weight count that was supplied.
        actual: usize,
    },

    /// The layer configuration itself is unusable.
    #[error("Invalid layer configuration: {0}")]
    InvalidLayerConfiguration(&'static str),

    /// Feature matrix length is not a non-zero multiple of the input size.
    #[error("Feature matrix of length {length} is not a non-zero multiple of input size {input_size}")]
    InvalidFeatureMatrixSize {
        /// Flat length of the feature matrix that was supplied.
        length: usize,
        /// Size of the network's input layer.
        input_size: usize,
    },

    /// None of the buffer's channels match the model's requirement.
    #[error("No sensor data of the required type (received {received:?}, required {required:?})")]
    NoSensorDataType {
        /// Channel types present in the classified buffer.
        received: Vec<SensorType>,
        /// Channel types the model requires.
        required: Vec<SensorType>,
    },

    /// Fewer rows available than one classification window needs.
    #[error("Not enough rows for one classification window: received {received}, required {required}")]
    NotEnoughRows {
        /// Rows available in the matching channels.
        received: usize,
        /// Rows one window requires.
        required: usize,
    },

    /// Standard I/O operation failed while streaming encoded samples.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend failed while exporting data.
    #[error("Storage error: {0}")]
    Storage(String),
}
