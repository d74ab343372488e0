//! # Exercise Sensing Core Library
//!
//! This crate implements the sensor-data-to-classified-interval pipeline for
//! wearable motion data: chunks of multi-channel samples
//! (accelerometer/gyroscope/heart-rate) arrive as bytes, are decoded and
//! merged into a continuity-checked buffer, and sliding windows of that
//! buffer are classified by a small feed-forward neural network into
//! labeled, time-bounded exercise intervals with confidence scores.
//!
//! The crate is a library on purpose: transport, storage, and UI live in
//! the surrounding applications. They hand this core a weight blob plus a
//! layer/label description (a [`classifier::Model`]) and raw byte buffers,
//! and get classified intervals back.
//!
//! ## Crate Structure
//!
//! - **`sensor`**: the [`sensor::SensorData`] buffer — channel layout,
//!   append with gap/overlap resolution, typed channel extraction, slicing.
//! - **`codec`**: the compressed primary wire format, the legacy fixed-size
//!   device block, and a streaming encoder for incremental capture.
//! - **`network`**: the batched feed-forward inference engine and its
//!   activation functions.
//! - **`classifier`**: the sliding-window classifier that drives the
//!   network and merges windows into result blocks.
//! - **`error`**: the central [`error::SensingError`] enum.
//! - **`export`**: CSV dumps of captured buffers (feature `storage_csv`).
//!
//! ## Typical Flow
//!
//! ```
//! use exercise_sensing::sensor::{SensorData, SensorType};
//!
//! # fn main() -> exercise_sensing::error::CoreResult<()> {
//! // Accumulate chunks as they arrive from the device.
//! let mut session = SensorData::new(vec![SensorType::HeartRate], 0.0, 1, vec![100.0])?;
//! let chunk = SensorData::new(vec![SensorType::HeartRate], 2.0, 1, vec![200.0])?;
//! session.append(&chunk)?;
//! assert_eq!(session.samples(), &[100.0, 150.0, 200.0]);
//!
//! // Round-trip the session through the wire format.
//! let bytes = exercise_sensing::codec::encode(&session)?;
//! assert_eq!(exercise_sensing::codec::decode(&bytes)?, session);
//! # Ok(())
//! # }
//! ```
//!
//! All operations are synchronous and run to completion; concurrency is the
//! caller's concern. A single writer appends chunks serially, and
//! classification runs over an immutable snapshot of the buffer.

pub mod classifier;
pub mod codec;
pub mod error;
pub mod network;
pub mod sensor;

#[cfg(feature = "storage_csv")]
pub mod export;

pub use classifier::{ClassifiedExercise, Classifier, ClassifierConfig, Model};
pub use error::{CoreResult, SensingError};
pub use network::{ActivationFunction, ForwardPropagator, Layer};
pub use sensor::{Location, SensorData, SensorType};
