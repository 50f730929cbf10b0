//! Results CSV output.
//!
//! Writes one row per prediction, in batch order. When a query carries a
//! ground-truth coordinate (flight-log input), per-axis errors and the
//! haversine distance in meters are filled in for later accuracy analysis.

use std::path::Path;

use crate::error::Result;
use crate::pipeline::GeoPrediction;
use crate::query::QueryStreamer;

const HEADER: &[&str] = &[
    "Filename",
    "Matched",
    "Latitude",
    "Longitude",
    "Calculated_Latitude",
    "Calculated_Longitude",
    "Latitude_Error",
    "Longitude_Error",
    "Meters_Error",
];

/// Write predictions (and ground-truth errors where available) to a CSV
/// file at `path`.
pub fn write_predictions_csv<P: AsRef<Path>>(
    path: P,
    predictions: &[GeoPrediction],
    queries: &QueryStreamer,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(HEADER)?;

    for prediction in predictions {
        let ground_truth = queries
            .entries()
            .iter()
            .find(|e| e.name == prediction.name)
            .and_then(|e| e.ground_truth);

        let mut row: Vec<String> = vec![
            prediction.name.clone(),
            prediction.is_match.to_string(),
        ];
        match ground_truth {
            Some(gt) => {
                row.push(format!("{:.6}", gt.lat));
                row.push(format!("{:.6}", gt.lon));
            }
            None => row.extend([String::new(), String::new()]),
        }
        match prediction.predicted_coordinate {
            Some(coord) => {
                row.push(format!("{:.6}", coord.lat));
                row.push(format!("{:.6}", coord.lon));
            }
            None => row.extend([String::new(), String::new()]),
        }
        match (ground_truth, prediction.predicted_coordinate) {
            (Some(gt), Some(coord)) => {
                row.push(format!("{:.6}", gt.lat - coord.lat));
                row.push(format!("{:.6}", gt.lon - coord.lon));
                row.push(format!("{:.1}", gt.haversine_m(&coord)));
            }
            _ => row.extend([String::new(), String::new(), String::new()]),
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
