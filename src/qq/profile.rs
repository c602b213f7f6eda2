//! Two-step profile resolution: access token → openid → user info.
//!
//! QQ does not return the user id with the token. The resolver first asks the identity
//! endpoint who the token belongs to (the answer is wrapped in a `callback( ... );`
//! envelope), then fetches the user-info document for that openid. Both calls go
//! through [`AuthenticatedGet`], which is the only way this module reaches the network.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ParseError, TransportError},
	flows::Profile,
	http::quirks::extract_json_object,
	oauth::ClientFuture,
	provider::{ProviderCall, truncate_preview},
	qq::{PROVIDER, UserInfoFormat},
};

/// Issues GETs authenticated with an access token.
pub trait AuthenticatedGet
where
	Self: Send + Sync,
{
	/// Fetches `url` with the provider's authentication parameters appended.
	fn authenticated_get<'a>(
		&'a self,
		call: ProviderCall,
		url: Url,
		access_token: &'a TokenSecret,
	) -> ClientFuture<'a, String>;
}

/// Endpoints and request shape used by [`resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileEndpoints {
	/// Identity ("who am I") endpoint.
	pub identity: Url,
	/// User-info endpoint.
	pub user_info: Url,
	/// Shape of the user-info request.
	pub format: UserInfoFormat,
}

#[derive(Debug, Deserialize)]
struct IdentityResult {
	openid: Option<String>,
	error: Option<Value>,
	error_description: Option<String>,
}

/// Resolves `access_token` into a normalized [`Profile`].
///
/// Transport failures on either call are wrapped in [`TransportError::ProfileFetch`]; the
/// user-info call is skipped when the identity step fails.
pub async fn resolve<A>(
	api: &A,
	endpoints: &ProfileEndpoints,
	access_token: &TokenSecret,
) -> Result<Profile>
where
	A: ?Sized + AuthenticatedGet,
{
	let identity_body = api
		.authenticated_get(ProviderCall::Identity, endpoints.identity.clone(), access_token)
		.await
		.map_err(profile_fetch)?;
	let openid = parse_identity(&identity_body)?;
	let mut url = endpoints.user_info.clone();

	{
		let mut pairs = url.query_pairs_mut();

		if endpoints.format == UserInfoFormat::Json {
			pairs.append_pair("format", "json");
		}

		pairs.append_pair("openid", &openid);
	}

	let raw_body = api
		.authenticated_get(ProviderCall::UserInfo, url, access_token)
		.await
		.map_err(profile_fetch)?;

	parse_user_info(openid, raw_body)
}

/// Extracts the openid from an identity response such as `callback( {"openid":"..."} );`.
pub fn parse_identity(body: &str) -> Result<String> {
	const CALL: ProviderCall = ProviderCall::Identity;

	let object = extract_json_object(body).ok_or_else(|| ParseError::MissingObject {
		call: CALL,
		body_preview: truncate_preview(body.to_owned()),
	})?;
	let identity = parse_json::<IdentityResult>(CALL, object)?;

	if let Some(error) = identity.error {
		return Err(Error::Provider {
			code: error_code(&error),
			message: identity.error_description.unwrap_or_default(),
		});
	}

	identity
		.openid
		.filter(|openid| !openid.is_empty())
		.ok_or_else(|| ParseError::MissingField { call: CALL, field: "openid" }.into())
}

/// Builds the profile from a user-info body.
pub fn parse_user_info(openid: String, raw_body: String) -> Result<Profile> {
	let raw_json = parse_json::<Value>(ProviderCall::UserInfo, &raw_body)?;

	if let Some(ret) = raw_json.get("ret").and_then(Value::as_i64)
		&& ret != 0
	{
		return Err(Error::Provider {
			code: ret,
			message: raw_json.get("msg").and_then(Value::as_str).unwrap_or_default().to_owned(),
		});
	}

	let nickname = raw_json.get("nickname").and_then(Value::as_str).map(str::to_owned);

	Ok(Profile { provider: PROVIDER.into(), id: openid, nickname, raw_body, raw_json })
}

fn parse_json<T>(call: ProviderCall, text: &str) -> Result<T, ParseError>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_str(text);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ParseError::Json { call, source })
}

fn error_code(value: &Value) -> i64 {
	match value {
		Value::Number(number) => number.as_i64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
	.unwrap_or(-1)
}

// Errors the caller can act on pass through; everything else is a fetch failure.
fn profile_fetch(err: Error) -> Error {
	match err {
		Error::Config(_) | Error::Parse(_) | Error::Provider { .. } => err,
		other => TransportError::profile_fetch(other).into(),
	}
}
