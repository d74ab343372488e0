//! CSV export for captured sensor sessions.
//!
//! Dumps a buffer as one record per sample row with absolute timestamps,
//! for offline inspection and for diffing decoder output against device
//! logs.

use std::io::Write;

use crate::error::{CoreResult, SensingError};
use crate::sensor::{Location, SensorData, SensorType};

fn column_labels(sensor_type: SensorType) -> Vec<String> {
    let (stem, axes) = match sensor_type {
        SensorType::Accelerometer(location) => (format!("accel_{}", side(location)), true),
        SensorType::Gyroscope(location) => (format!("gyro_{}", side(location)), true),
        SensorType::HeartRate => ("heart_rate".to_string(), false),
    };
    if axes {
        ["x", "y", "z"]
            .iter()
            .map(|axis| format!("{stem}_{axis}"))
            .collect()
    } else {
        vec![stem]
    }
}

fn side(location: Location) -> &'static str {
    match location {
        Location::LeftWrist => "left",
        Location::RightWrist => "right",
    }
}

/// Write a buffer as CSV: a header row derived from the channel layout,
/// then one record per sample row with its absolute timestamp.
pub fn write_csv<W: Write>(data: &SensorData, target: W) -> CoreResult<()> {
    let mut writer = csv::Writer::from_writer(target);

    let mut header = vec!["time".to_string()];
    for &t in data.types() {
        header.extend(column_labels(t));
    }
    writer
        .write_record(&header)
        .map_err(|e| SensingError::Storage(e.to_string()))?;

    let rate = f64::from(data.samples_per_second());
    for (index, row) in data.samples().chunks_exact(data.dimension()).enumerate() {
        let time = data.start() + index as f64 / rate;
        let mut record = vec![format!("{time:.3}")];
        record.extend(row.iter().map(|v| v.to_string()));
        writer
            .write_record(&record)
            .map_err(|e| SensingError::Storage(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| SensingError::Storage(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_has_header_and_one_record_per_row() {
        let data = SensorData::new(
            vec![
                SensorType::Accelerometer(Location::LeftWrist),
                SensorType::HeartRate,
            ],
            100.0,
            2,
            vec![0.1, 0.2, 0.3, 72.0, 0.4, 0.5, 0.6, 73.0],
        )
        .expect("two whole rows");

        let mut out = Vec::new();
        write_csv(&data, &mut out).expect("writable");
        let text = String::from_utf8(out).expect("utf-8");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "time,accel_left_x,accel_left_y,accel_left_z,heart_rate"
        );
        assert_eq!(lines[1], "100.000,0.1,0.2,0.3,72");
        assert_eq!(lines[2], "100.500,0.4,0.5,0.6,73");
    }
}
