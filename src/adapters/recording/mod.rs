//! Recording adapters that capture interactions to cassettes.

pub mod fetch;

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::cassette::recorder::CassetteRecorder;

pub use fetch::RecordingScoreboardSource;

/// Records a `Result<T, E>` interaction using the Ok/Err JSON convention.
///
/// - `Ok(v)` is recorded as `{"Ok": v}`
/// - `Err(e)` is recorded as `{"Err": e.to_string()}`
///
/// # Errors
///
/// Returns an error if the input or the `Ok` value cannot be serialized;
/// nothing is recorded in that case.
pub(crate) fn record_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) -> Result<(), serde_json::Error>
where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let input_json = serde_json::to_value(input)?;
    let output_json = match result {
        Ok(v) => serde_json::json!({ "Ok": serde_json::to_value(v)? }),
        Err(e) => serde_json::json!({ "Err": e.to_string() }),
    };

    recorder.lock().unwrap_or_else(PoisonError::into_inner).record(
        port,
        method,
        input_json,
        output_json,
    );
    Ok(())
}
