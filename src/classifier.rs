//! Sliding-window exercise classification.
//!
//! A [`Classifier`] walks a fixed-size window over the channels a [`Model`]
//! asks for, runs each window through the model's network, and coalesces
//! consecutive windows that agree on a label into time-bounded
//! [`ClassifiedExercise`] blocks. Blocks shorter than the model's minimum
//! duration are dropped.
//!
//! The merge loop is an explicit two-state machine: either a block is open
//! and accumulating windows, or no block is open. A window whose top label
//! fails the probability threshold closes the open block; a window whose top
//! label disagrees (different label, or a confidence jump beyond the merge
//! delta) closes it and opens a fresh one.

use std::cmp::Ordering;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, SensingError};
use crate::network::{ForwardPropagator, Layer};
use crate::sensor::{SensorData, SensorType};

/// Tunable classification constants.
///
/// The probability threshold and merge delta are empirical values carried
/// over from the trained models in production use; they are configuration
/// rather than hard-coded so a retrained model can ship its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Rows fed to the network per window.
    pub window_size: usize,
    /// Rows between consecutive window starts.
    pub window_step: usize,
    /// Minimum probability for a label to count at all.
    pub probability_threshold: f64,
    /// Maximum confidence difference between adjacent windows that still
    /// merge into one block.
    pub merge_confidence_delta: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_size: 400,
            window_step: 10,
            probability_threshold: 0.7,
            merge_confidence_delta: 0.1,
        }
    }
}

/// Immutable bundle describing one trained classification model.
///
/// Supplied by an external collaborator and never mutated by the core. The
/// whole bundle is serde round-trippable so callers can load it from a JSON
/// descriptor next to the weight blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Layer sizes and activations, input first.
    pub layers: Vec<Layer>,
    /// Flat pre-trained weight vector.
    pub weights: Vec<f32>,
    /// Channel types the model was trained on.
    pub sensor_types: Vec<SensorType>,
    /// Output labels, one per class, in output order.
    pub labels: Vec<String>,
    /// Shortest block duration, in seconds, worth reporting.
    pub minimum_duration: f64,
}

impl Model {
    /// Load a model from its JSON descriptor.
    pub fn from_json(descriptor: &str) -> serde_json::Result<Self> {
        serde_json::from_str(descriptor)
    }
}

/// One classified, time-bounded interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedExercise {
    /// Merged confidence in `[0, 1]`.
    pub confidence: f64,
    /// Label of the winning class.
    pub label: String,
    /// Interval length in seconds.
    pub duration: f64,
    /// Interval start in seconds from the classified buffer's start.
    pub offset: f64,
}

/// Open accumulator for consecutive windows sharing a label.
struct Block {
    label_index: usize,
    confidence: f64,
    duration: f64,
    offset: f64,
    accumulated: f64,
}

impl Block {
    /// Whether `other` continues this block under the merge policy.
    fn accepts(&self, other: &Block, merge_confidence_delta: f64) -> bool {
        self.label_index == other.label_index
            && (self.confidence - other.confidence).abs() < merge_confidence_delta
    }

    /// Fold `other` into this block: confidence averaged weighted by the
    /// windows already accumulated on each side, durations summed.
    fn extend(&mut self, other: Block) {
        let total = self.accumulated + other.accumulated;
        self.confidence =
            (self.confidence * self.accumulated + other.confidence * other.accumulated) / total;
        self.duration += other.duration;
        self.accumulated = total;
    }
}

/// Sliding-window classifier driving one model's network.
pub struct Classifier {
    model: Model,
    config: ClassifierConfig,
    propagator: ForwardPropagator,
}

impl Classifier {
    /// Build a classifier for a model, validating the model's network
    /// configuration and label table.
    pub fn new(model: Model, config: ClassifierConfig) -> CoreResult<Self> {
        let propagator = ForwardPropagator::configure(model.layers.clone(), &model.weights)?;
        if model.labels.len() != propagator.output_size() {
            return Err(SensingError::InvalidLayerConfiguration(
                "label count must match the output layer size",
            ));
        }
        Ok(Self {
            model,
            config,
            propagator,
        })
    }

    /// The model this classifier runs.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Classify a buffer into labeled, merged, duration-filtered intervals.
    ///
    /// Per window, up to `max_results` labels above the probability
    /// threshold are considered; the top one drives merging. The returned
    /// intervals are in window order with non-decreasing offsets and no
    /// overlap. Only the two input checks can fail; everything past them is
    /// total.
    pub fn classify(
        &mut self,
        data: &SensorData,
        max_results: usize,
    ) -> CoreResult<Vec<ClassifiedExercise>> {
        let (dimension, samples) = data.samples_along(&self.model.sensor_types);
        if dimension == 0 {
            return Err(SensingError::NoSensorDataType {
                received: data.types().to_vec(),
                required: self.model.sensor_types.clone(),
            });
        }
        let rows = samples.len() / dimension;
        if rows < self.config.window_size {
            return Err(SensingError::NotEnoughRows {
                received: rows,
                required: self.config.window_size,
            });
        }

        let window_len = self.config.window_size * dimension;
        let step_len = self.config.window_step * dimension;
        let windows = (rows - self.config.window_size) / self.config.window_step + 1;
        let micro_duration =
            self.config.window_step as f64 / f64::from(data.samples_per_second());
        debug!(
            "classifying {rows} rows as {windows} windows of {} rows",
            self.config.window_size
        );

        let mut blocks: Vec<Block> = Vec::new();
        let mut open: Option<Block> = None;
        for window_index in 0..windows {
            let begin = window_index * step_len;
            let output = self.propagator.predict(&samples[begin..begin + window_len])?;
            let top = Self::top_label(
                &output,
                max_results,
                self.config.probability_threshold,
            )
            .map(|(label_index, confidence)| Block {
                label_index,
                confidence,
                duration: micro_duration,
                offset: micro_duration * window_index as f64,
                accumulated: 1.0,
            });

            match (open.take(), top) {
                (None, None) => {}
                (None, Some(micro)) => open = Some(micro),
                (Some(block), None) => blocks.push(block),
                (Some(mut block), Some(micro)) => {
                    if block.accepts(&micro, self.config.merge_confidence_delta) {
                        block.extend(micro);
                        open = Some(block);
                    } else {
                        blocks.push(block);
                        open = Some(micro);
                    }
                }
            }
        }
        if let Some(block) = open {
            blocks.push(block);
        }

        let results: Vec<ClassifiedExercise> = blocks
            .into_iter()
            .filter(|b| b.duration >= self.model.minimum_duration)
            .map(|b| ClassifiedExercise {
                confidence: b.confidence,
                label: self.model.labels[b.label_index].clone(),
                duration: b.duration,
                offset: b.offset,
            })
            .collect();
        debug!("classification produced {} block(s)", results.len());
        Ok(results)
    }

    /// Rank one window's output by descending probability and pick the top
    /// label among the `max_results` candidates above the threshold.
    fn top_label(output: &[f32], max_results: usize, threshold: f64) -> Option<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = output
            .iter()
            .enumerate()
            .map(|(index, &p)| (index, f64::from(p)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked
            .into_iter()
            .filter(|&(_, p)| p > threshold)
            .take(max_results)
            .next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ActivationFunction;
    use crate::sensor::Location;

    /// A 4-row window over one heart-rate channel, two sigmoid output
    /// units driven by the window sum with opposite signs. Rows of +10
    /// saturate class "up", rows of -10 saturate class "down", rows of 0
    /// leave both at 0.5 (below threshold).
    fn test_model(minimum_duration: f64) -> Model {
        let mut weights = vec![0.0, 0.0]; // bias row
        for _ in 0..4 {
            weights.extend_from_slice(&[0.25, -0.25]);
        }
        Model {
            layers: vec![
                Layer {
                    size: 4,
                    activation: ActivationFunction::Identity,
                },
                Layer {
                    size: 2,
                    activation: ActivationFunction::Sigmoid,
                },
            ],
            weights,
            sensor_types: vec![SensorType::HeartRate],
            labels: vec!["up".to_string(), "down".to_string()],
            minimum_duration,
        }
    }

    fn test_config() -> ClassifierConfig {
        ClassifierConfig {
            window_size: 4,
            window_step: 2,
            ..ClassifierConfig::default()
        }
    }

    fn heart_rate(samples: Vec<f32>) -> SensorData {
        SensorData::new(vec![SensorType::HeartRate], 0.0, 1, samples).expect("valid buffer")
    }

    fn classifier(minimum_duration: f64) -> Classifier {
        Classifier::new(test_model(minimum_duration), test_config()).expect("valid model")
    }

    #[test]
    fn test_rejects_irrelevant_channel_types() {
        let mut c = classifier(0.0);
        let data = SensorData::new(
            vec![SensorType::Gyroscope(Location::LeftWrist)],
            0.0,
            1,
            vec![0.0; 30],
        )
        .expect("valid buffer");
        assert!(matches!(
            c.classify(&data, 1),
            Err(SensingError::NoSensorDataType { .. })
        ));
    }

    #[test]
    fn test_rejects_fewer_rows_than_one_window() {
        let mut c = classifier(0.0);
        let data = heart_rate(vec![10.0; 3]);
        assert!(matches!(
            c.classify(&data, 1),
            Err(SensingError::NotEnoughRows {
                received: 3,
                required: 4
            })
        ));
    }

    #[test]
    fn test_constant_signal_merges_into_one_block() {
        let mut c = classifier(0.0);
        let data = heart_rate(vec![10.0; 12]);
        let results = c.classify(&data, 1).expect("classifiable");
        assert_eq!(results.len(), 1);
        let block = &results[0];
        assert_eq!(block.label, "up");
        assert_eq!(block.offset, 0.0);
        // 5 windows of step 2 over 12 rows
        assert_eq!(block.duration, 10.0);
        assert!(block.confidence > 0.99);
    }

    #[test]
    fn test_below_threshold_gap_splits_blocks() {
        let mut c = classifier(0.0);
        let mut samples = vec![10.0; 8];
        samples.extend_from_slice(&[0.0; 8]);
        samples.extend_from_slice(&[-10.0; 8]);
        let results = c.classify(&heart_rate(samples), 1).expect("classifiable");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label, "up");
        assert_eq!(results[1].label, "down");
        assert!(results[0].offset < results[1].offset);
    }

    #[test]
    fn test_minimum_duration_filters_short_blocks() {
        let mut c = classifier(60.0);
        let data = heart_rate(vec![10.0; 12]);
        let results = c.classify(&data, 1).expect("classifiable");
        assert!(results.is_empty());
    }

    #[test]
    fn test_confidence_is_window_weighted() {
        let mut c = classifier(0.0);
        let data = heart_rate(vec![10.0; 12]);
        let results = c.classify(&data, 1).expect("classifiable");
        // All windows saturate, so the weighted average stays saturated.
        assert!((results[0].confidence - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_label_table_must_match_output_layer() {
        let mut model = test_model(0.0);
        model.labels.pop();
        assert!(matches!(
            Classifier::new(model, test_config()),
            Err(SensingError::InvalidLayerConfiguration(_))
        ));
    }

    #[test]
    fn test_model_round_trips_through_json() {
        let model = test_model(2.5);
        let json = serde_json::to_string(&model).expect("serializable");
        let back = Model::from_json(&json).expect("deserializable");
        assert_eq!(back, model);
    }
}
