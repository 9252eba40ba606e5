//! Response shapes for the analyze endpoint.

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Fixed message carried by every success envelope.
pub const ANALYZED_MESSAGE: &str = "Contract analyzed successfully";

/// Error body returned for both 400 and 500 responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Documented shape of the success envelope.
///
/// The live response additionally carries every field of the upstream analysis
/// document (e.g. `riskScore`, `risks`); the relay does not constrain that
/// schema.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzeResponse {
    /// Fixed success message
    pub message: String,
    /// Original client-supplied filename
    pub filename: String,
}

/// Merge the upstream document into the success envelope.
///
/// `message` and `filename` are inserted last: on a field collision the
/// envelope wins, and every other upstream field passes through untouched.
pub fn success_envelope(filename: &str, mut upstream: Map<String, Value>) -> Value {
    upstream.insert("message".to_string(), Value::String(ANALYZED_MESSAGE.to_string()));
    upstream.insert("filename".to_string(), Value::String(filename.to_string()));
    Value::Object(upstream)
}
