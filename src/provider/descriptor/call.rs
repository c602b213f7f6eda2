// self
use crate::_prelude::*;

/// Outbound provider calls issued during one authentication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCall {
	/// Authorization-code exchange at the token endpoint.
	TokenExchange,
	/// "Who am I" lookup resolving the access token to an openid.
	Identity,
	/// User-info lookup keyed by the openid.
	UserInfo,
}
impl ProviderCall {
	/// Returns a stable label for error messages and telemetry.
	pub fn as_str(self) -> &'static str {
		match self {
			ProviderCall::TokenExchange => "token",
			ProviderCall::Identity => "identity",
			ProviderCall::UserInfo => "user_info",
		}
	}
}
impl Display for ProviderCall {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
