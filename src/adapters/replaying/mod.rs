//! Replaying adapters that serve recorded interactions.

pub mod fetch;

pub use fetch::ReplayingScoreboardSource;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// A recorded `Result` output that could not be interpreted.
#[derive(Debug)]
pub(crate) struct UnexpectedOutput(pub(crate) String);

/// Decodes a recorded output using the Ok/Err JSON convention.
///
/// Returns `Ok(Ok(v))` for `{"Ok": v}`, `Ok(Err(text))` for `{"Err": text}`.
pub(crate) fn replay_result<T: DeserializeOwned>(
    output: Value,
) -> Result<Result<T, String>, UnexpectedOutput> {
    let Value::Object(mut map) = output else {
        return Err(UnexpectedOutput("recorded output is not an Ok/Err object".into()));
    };
    if let Some(ok) = map.remove("Ok") {
        return serde_json::from_value(ok)
            .map(Ok)
            .map_err(|e| UnexpectedOutput(e.to_string()));
    }
    match map.remove("Err") {
        Some(Value::String(text)) => Ok(Err(text)),
        Some(other) => Ok(Err(other.to_string())),
        None => Err(UnexpectedOutput("recorded output has neither Ok nor Err".into())),
    }
}
