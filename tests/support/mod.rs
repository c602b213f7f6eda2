//! Shared fixtures for the QQ integration tests.

#![allow(dead_code)]

// std
use std::future::Future;
// crates.io
use httpmock::MockServer;
// self
use oauth2_qq::{
	auth::TokenSecret,
	error::BoxError,
	flows::Profile,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	qq::{QqOptions, QqStrategy, ReqwestQqStrategy},
	reqwest::Client,
	url::Url,
};

pub const CLIENT_ID: &str = "101";
pub const CLIENT_SECRET: &str = "app-key";
pub const CALLBACK_URL: &str = "https://app.example.com/auth/qq/callback";
pub const TOKEN_PATH: &str = "/oauth2.0/token";
pub const IDENTITY_PATH: &str = "/oauth2.0/me";
pub const USER_INFO_PATH: &str = "/user/get_user_info";

pub type Verified = Result<Option<String>, BoxError>;
pub type VerifyFn = fn(TokenSecret, Option<TokenSecret>, Profile) -> VerifyFuture;
pub type VerifyFuture = std::pin::Pin<Box<dyn Future<Output = Verified> + Send>>;

/// Accepts every login, returning `openid:nickname`.
pub fn accept_all(_access: TokenSecret, _refresh: Option<TokenSecret>, profile: Profile) -> VerifyFuture {
	Box::pin(async move {
		Ok(Some(format!("{}:{}", profile.id, profile.nickname.unwrap_or_default())))
	})
}

pub fn url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock server URL should parse.")
}

/// Options pointing every QQ endpoint at `server`.
pub fn options(server: &MockServer) -> QqOptions {
	QqOptions::new(CLIENT_ID, CLIENT_SECRET)
		.callback_url(Url::parse(CALLBACK_URL).expect("Callback fixture should parse."))
		.authorization_url(url(server, "/oauth2.0/authorize"))
		.token_url(url(server, TOKEN_PATH))
		.identity_url(url(server, IDENTITY_PATH))
		.user_info_url(url(server, USER_INFO_PATH))
}

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock`.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

pub fn strategy(options: QqOptions) -> ReqwestQqStrategy<VerifyFn> {
	QqStrategy::with_http_client(
		options,
		accept_all as VerifyFn,
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
	.expect("Strategy should build.")
}
