//! Transport decorator that reshapes traffic for providers deviating from RFC 6749.
//!
//! [`apply_provider_quirks`] wraps any [`ProviderHttpClient`] and, according to the
//! descriptor's [`ProviderQuirks`]:
//!
//! - rewrites every `POST` into a `GET` whose query string carries the former form body, dropping
//!   the `Content-Type` header that described it;
//! - rewrites token responses that arrive form-encoded or wrapped in a JSONP-style callback into
//!   the JSON document the `oauth2` decoder expects.
//!
//! The decorator is composed explicitly at construction time; the wrapped transport is
//! never mutated.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Error as HttpError, HeaderValue, Method, StatusCode, Uri,
		header::{CONTENT_LENGTH, CONTENT_TYPE},
	},
};
use serde_json::{Map, Value};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	http::{ProviderHttpClient, ResponseMetadataSlot},
	provider::ProviderQuirks,
};

/// Wraps `base` so every request it issues honors `quirks`.
pub fn apply_provider_quirks<C>(base: Arc<C>, quirks: ProviderQuirks) -> QuirkTransport<C>
where
	C: ?Sized + ProviderHttpClient,
{
	QuirkTransport { inner: base, quirks }
}

/// [`ProviderHttpClient`] decorator returned by [`apply_provider_quirks`].
pub struct QuirkTransport<C>
where
	C: ?Sized,
{
	inner: Arc<C>,
	quirks: ProviderQuirks,
}
impl<C> QuirkTransport<C>
where
	C: ?Sized,
{
	/// Quirks applied by this transport.
	pub fn quirks(&self) -> ProviderQuirks {
		self.quirks
	}
}
impl<C> Clone for QuirkTransport<C>
where
	C: ?Sized,
{
	fn clone(&self) -> Self {
		Self { inner: Arc::clone(&self.inner), quirks: self.quirks }
	}
}
impl<C> Debug for QuirkTransport<C>
where
	C: ?Sized,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("QuirkTransport").field("quirks", &self.quirks).finish()
	}
}
impl<C> ProviderHttpClient for QuirkTransport<C>
where
	C: ?Sized + ProviderHttpClient,
{
	type Handle = QuirkHandle<C>;
	type TransportError = C::TransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		QuirkHandle { inner: self.inner.with_metadata(slot), quirks: self.quirks }
	}
}

/// Request handle that rewrites traffic before delegating to the wrapped handle.
pub struct QuirkHandle<C>
where
	C: ?Sized + ProviderHttpClient,
{
	inner: C::Handle,
	quirks: ProviderQuirks,
}
impl<'c, C> AsyncHttpClient<'c> for QuirkHandle<C>
where
	C: ?Sized + ProviderHttpClient,
{
	type Error = HttpClientError<C::TransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let normalize = self.quirks.lenient_token_response && request.method() == Method::POST;
		let request = if self.quirks.query_string_requests {
			match rewrite_request(request) {
				Ok(request) => request,
				Err(e) => return Box::pin(async move { Err(HttpClientError::Http(e)) }),
			}
		} else {
			request
		};
		let pending = self.inner.call(request);

		Box::pin(async move {
			let response = pending.await?;

			Ok(if normalize { normalize_token_response(response) } else { response })
		})
	}
}

/// Rewrites a `POST` into a `GET` carrying the body in the query string.
///
/// Requests using any other method pass through untouched.
pub fn rewrite_request(request: HttpRequest) -> Result<HttpRequest, HttpError> {
	if request.method() != Method::POST {
		return Ok(request);
	}

	let (mut parts, body) = request.into_parts();

	if !body.is_empty() {
		let uri = parts.uri.to_string();
		let separator = if uri.contains('?') { '&' } else { '?' };
		let query = String::from_utf8_lossy(&body);

		parts.uri = format!("{uri}{separator}{query}").parse::<Uri>()?;
	}

	parts.method = Method::GET;
	parts.headers.remove(CONTENT_TYPE);
	parts.headers.remove(CONTENT_LENGTH);

	Ok(HttpRequest::from_parts(parts, Vec::new()))
}

/// Returns the slice between the first `{` and the last `}` (inclusive).
///
/// Providers that wrap JSON in `callback( ... );` envelopes are parsed by locating the
/// outermost object this way.
pub fn extract_json_object(text: &str) -> Option<&str> {
	let start = text.find('{')?;
	let end = text.rfind('}')?;

	if end < start {
		return None;
	}

	Some(&text[start..=end])
}

/// Rewrites a lenient token response into the JSON shape `oauth2` decodes.
///
/// Bodies that cannot be interpreted are returned unchanged so the decoder reports
/// its usual error.
pub fn normalize_token_response(response: HttpResponse) -> HttpResponse {
	let (mut parts, body) = response.into_parts();
	let Some(object) = lenient_token_object(&body) else {
		return HttpResponse::from_parts(parts, body);
	};
	let is_error = object.contains_key("error");
	let Ok(json) = serde_json::to_vec(&Value::Object(object)) else {
		return HttpResponse::from_parts(parts, body);
	};

	parts.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
	parts.headers.remove(CONTENT_LENGTH);

	if is_error && parts.status.is_success() {
		parts.status = StatusCode::BAD_REQUEST;
	}

	HttpResponse::from_parts(parts, json)
}

fn lenient_token_object(body: &[u8]) -> Option<Map<String, Value>> {
	let text = std::str::from_utf8(body).ok()?.trim();

	if text.is_empty() {
		return None;
	}

	let mut object = match extract_json_object(text) {
		Some(json) => match serde_json::from_str::<Value>(json) {
			Ok(Value::Object(object)) => object,
			_ => return None,
		},
		None => {
			let object = form_urlencoded::parse(text.as_bytes())
				.map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
				.collect::<Map<_, _>>();

			if !object.contains_key("access_token") && !object.contains_key("error") {
				return None;
			}

			object
		},
	};

	if let Some(Value::String(raw)) = object.get("expires_in")
		&& let Ok(secs) = raw.trim().parse::<u64>()
	{
		object.insert("expires_in".into(), Value::from(secs));
	}
	if let Some(Value::Number(code)) = object.get("error") {
		let code = code.to_string();

		object.insert("error".into(), Value::String(code));
	}
	if object.contains_key("access_token") && !object.contains_key("token_type") {
		object.insert("token_type".into(), Value::String("bearer".into()));
	}

	Some(object)
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::Request;
	// self
	use super::*;

	#[derive(Clone, Default)]
	struct RecordingClient {
		seen: Arc<Mutex<Vec<HttpRequest>>>,
		reply: Vec<u8>,
	}
	impl ProviderHttpClient for RecordingClient {
		type Handle = RecordingClient;
		type TransportError = std::io::Error;

		fn with_metadata(&self, _slot: ResponseMetadataSlot) -> Self::Handle {
			self.clone()
		}
	}
	impl<'c> AsyncHttpClient<'c> for RecordingClient {
		type Error = HttpClientError<std::io::Error>;
		type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			self.seen.lock().push(request);

			let reply = self.reply.clone();

			Box::pin(async move { Ok(HttpResponse::new(reply)) })
		}
	}

	fn qq_quirks() -> ProviderQuirks {
		ProviderQuirks {
			query_string_requests: true,
			lenient_token_response: true,
			scope_delimiter: ',',
		}
	}

	fn token_post(uri: &str) -> HttpRequest {
		Request::builder()
			.method(Method::POST)
			.uri(uri)
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.body(b"grant_type=authorization_code&code=CODE".to_vec())
			.expect("Token request fixture should build.")
	}

	#[test]
	fn post_with_body_becomes_get_with_query() {
		let rewritten = rewrite_request(token_post("https://graph.qq.com/oauth2.0/token"))
			.expect("Rewrite should succeed for a valid form body.");

		assert_eq!(rewritten.method(), Method::GET);
		assert_eq!(
			rewritten.uri().to_string(),
			"https://graph.qq.com/oauth2.0/token?grant_type=authorization_code&code=CODE"
		);
		assert!(rewritten.headers().get(CONTENT_TYPE).is_none());
		assert!(rewritten.body().is_empty());
	}

	#[test]
	fn existing_query_is_extended_with_ampersand() {
		let rewritten = rewrite_request(token_post("https://graph.qq.com/oauth2.0/token?fmt=json"))
			.expect("Rewrite should succeed when a query already exists.");

		assert_eq!(
			rewritten.uri().query(),
			Some("fmt=json&grant_type=authorization_code&code=CODE")
		);
	}

	#[test]
	fn get_requests_pass_through() {
		let request = Request::builder()
			.method(Method::GET)
			.uri("https://graph.qq.com/oauth2.0/me?access_token=TKN")
			.header(CONTENT_TYPE, "text/plain")
			.body(Vec::new())
			.expect("GET fixture should build.");
		let untouched = rewrite_request(request).expect("GET requests are never rewritten.");

		assert_eq!(untouched.method(), Method::GET);
		assert_eq!(untouched.uri().query(), Some("access_token=TKN"));
		assert!(untouched.headers().get(CONTENT_TYPE).is_some());
	}

	#[test]
	fn envelope_extraction_tolerates_noise() {
		assert_eq!(extract_json_object("foo({\"openid\":\"O1\"})bar"), Some("{\"openid\":\"O1\"}"));
		assert_eq!(
			extract_json_object("callback( {\"a\":{\"b\":1}} );\n"),
			Some("{\"a\":{\"b\":1}}")
		);
		assert_eq!(extract_json_object("no object here"), None);
		assert_eq!(extract_json_object("} backwards {"), None);
	}

	#[test]
	fn form_encoded_token_bodies_become_json() {
		let response = normalize_token_response(HttpResponse::new(
			b"access_token=AT&expires_in=7776000&refresh_token=RT".to_vec(),
		));
		let body: Value =
			serde_json::from_slice(response.body()).expect("Normalized body should be JSON.");

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(
			response.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok()),
			Some("application/json")
		);
		assert_eq!(
			body,
			serde_json::json!({
				"access_token": "AT",
				"expires_in": 7776000,
				"refresh_token": "RT",
				"token_type": "bearer",
			})
		);
	}

	#[test]
	fn callback_errors_become_oauth_errors() {
		let response = normalize_token_response(HttpResponse::new(
			b"callback( {\"error\":100019,\"error_description\":\"code to access token error\"} );"
				.to_vec(),
		));
		let body: Value =
			serde_json::from_slice(response.body()).expect("Normalized body should be JSON.");

		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "100019");
		assert_eq!(body["error_description"], "code to access token error");
	}

	#[test]
	fn unrecognized_bodies_are_left_alone() {
		let response = normalize_token_response(HttpResponse::new(b"<html>oops</html>".to_vec()));

		assert_eq!(response.body().as_slice(), b"<html>oops</html>");
		assert!(response.headers().get(CONTENT_TYPE).is_none());
	}

	#[tokio::test]
	async fn decorated_transport_rewrites_on_the_wire() {
		let base = Arc::new(RecordingClient {
			reply: b"access_token=AT&expires_in=3600".to_vec(),
			..Default::default()
		});
		let transport = apply_provider_quirks(Arc::clone(&base), qq_quirks());
		let handle = transport.with_metadata(ResponseMetadataSlot::default());
		let response = handle
			.call(token_post("https://graph.qq.com/oauth2.0/token"))
			.await
			.expect("Recording transport never fails.");
		let seen = base.seen.lock();
		let wire = seen.first().expect("The wrapped transport should see one request.");

		assert_eq!(seen.len(), 1);
		assert_eq!(wire.method(), Method::GET);
		assert_eq!(wire.uri().query(), Some("grant_type=authorization_code&code=CODE"));
		assert!(wire.headers().get(CONTENT_TYPE).is_none());

		let body: Value =
			serde_json::from_slice(response.body()).expect("Token reply should be normalized.");

		assert_eq!(body["expires_in"], 3600);
	}

	#[tokio::test]
	async fn default_quirks_leave_traffic_untouched() {
		let base = Arc::new(RecordingClient {
			reply: b"access_token=AT".to_vec(),
			..Default::default()
		});
		let transport = apply_provider_quirks(Arc::clone(&base), ProviderQuirks::default());
		let response = transport
			.with_metadata(ResponseMetadataSlot::default())
			.call(token_post("https://example.com/token"))
			.await
			.expect("Recording transport never fails.");

		assert_eq!(base.seen.lock()[0].method(), Method::POST);
		assert_eq!(response.body().as_slice(), b"access_token=AT");
	}
}
