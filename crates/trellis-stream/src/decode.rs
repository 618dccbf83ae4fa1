use serde_json::Value;
use trellis_core::config::RepairStrategy;
use trellis_core::error::DecodeError;
use trellis_core::event::EventRecord;

use crate::repair::{brace_depth_repair, pattern_repair};

/// Decode one raw chunk into event records, in stream order.
///
/// Elements of the repaired array that lack a string `run_id` are dropped
/// with a warning; every other element is kept, unknown event names
/// included.
pub fn decode(chunk: &str, strategy: RepairStrategy) -> Result<Vec<EventRecord>, DecodeError> {
    let values = match strategy {
        RepairStrategy::Pattern => parse_array(&pattern_repair(chunk))?,
        RepairStrategy::BraceDepth => parse_array(&brace_depth_repair(chunk)?)?,
        RepairStrategy::Auto => match parse_array(&pattern_repair(chunk)) {
            Ok(values) => values,
            Err(e) => {
                tracing::debug!(error = %e, "pattern repair failed, scanning object boundaries");
                parse_array(&brace_depth_repair(chunk)?)?
            }
        },
    };
    Ok(records_from_values(values))
}

fn parse_array(text: &str) -> Result<Vec<Value>, DecodeError> {
    let document: Value = serde_json::from_str(text).map_err(|e| DecodeError::Malformed {
        detail: e.to_string(),
    })?;
    match document {
        Value::Array(values) => Ok(values),
        _ => Err(DecodeError::NotAnArray),
    }
}

fn records_from_values(values: Vec<Value>) -> Vec<EventRecord> {
    values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let record = EventRecord::from_json(value);
            if record.is_none() {
                tracing::warn!(index, "dropping event without a run_id");
            }
            record
        })
        .collect()
}
