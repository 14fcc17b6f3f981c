// Payload Validator Port
// Consulted only when strict validation is enabled

use serde::de::IgnoredAny;

/// Well-formedness check for message payloads
pub trait PayloadValidator: Send + Sync {
    /// True if `text` is an acceptable payload
    fn is_well_formed(&self, text: &str) -> bool;
}

/// JSON validator backed by serde_json (production)
///
/// Parses without building a value tree.
pub struct JsonPayloadValidator;

impl PayloadValidator for JsonPayloadValidator {
    fn is_well_formed(&self, text: &str) -> bool {
        serde_json::from_str::<IgnoredAny>(text).is_ok()
    }
}
