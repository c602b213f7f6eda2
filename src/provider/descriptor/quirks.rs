// self
use crate::_prelude::*;

/// Provider-specific quirks that influence how requests and responses are shaped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Rewrites every `POST` into a `GET` carrying the form body in the query string.
	pub query_string_requests: bool,
	/// Accepts form-encoded or callback-wrapped token responses and rewrites them as JSON.
	pub lenient_token_response: bool,
	/// Character used to join scopes when constructing `scope` parameters.
	pub scope_delimiter: char,
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self { query_string_requests: false, lenient_token_response: false, scope_delimiter: ' ' }
	}
}
