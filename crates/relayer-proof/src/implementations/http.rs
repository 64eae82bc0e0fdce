//! HTTP proof oracle client.
//!
//! Supports the two request shapes seen in deployments: a bare GET that
//! returns the oracle's current proof (optionally keyed by a query
//! parameter), and a POST carrying `{"index": <subject>}`.

use crate::{ProofError, ProofInterface};
use async_trait::async_trait;
use relayer_types::{
	validate_http_url, ConfigSchema, Field, FieldType, ProofSubject, Schema, ValidationError,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// HTTP verb used to ask the oracle for a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
	/// `GET`, with the subject as an optional query parameter.
	Get,
	/// `POST` with a `{"index": <subject>}` JSON body.
	Post,
}

/// Oracle response body. Deployments disagree on the field name.
#[derive(Debug, Deserialize)]
struct ProofResponse {
	/// Hex proof, prefixed or not. Absent while the oracle has none ready.
	#[serde(alias = "proof_bytes")]
	proof: Option<String>,
}

/// Proof oracle reached over plain HTTP.
pub struct HttpProofClient {
	/// Shared client carrying the per-request timeout.
	client: reqwest::Client,
	/// Oracle endpoint.
	url: String,
	/// Request shape the oracle expects.
	method: RequestMethod,
	/// Query key for the subject on `GET`. Without one the oracle's current
	/// proof is requested.
	subject_param: Option<String>,
}

impl HttpProofClient {
	/// Creates a client; `timeout` bounds each single request.
	pub fn new(
		url: impl Into<String>,
		method: RequestMethod,
		subject_param: Option<String>,
		timeout: Duration,
	) -> Result<Self, ProofError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| ProofError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			client,
			url: url.into(),
			method,
			subject_param,
		})
	}

	/// Builds one oracle request for `subject`.
	fn request(&self, subject: Option<ProofSubject>) -> reqwest::RequestBuilder {
		match self.method {
			RequestMethod::Get => {
				let request = self.client.get(&self.url);
				match (&self.subject_param, subject) {
					(Some(param), Some(subject)) => {
						request.query(&[(param.as_str(), subject.value().to_string())])
					}
					_ => request,
				}
			}
			RequestMethod::Post => {
				let body = match subject {
					Some(subject) => serde_json::json!({ "index": subject.value() }),
					None => serde_json::json!({}),
				};
				self.client.post(&self.url).json(&body)
			}
		}
	}
}

/// Configuration schema for [`HttpProofClient`].
pub struct HttpProofClientSchema;

impl ConfigSchema for HttpProofClientSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			// Required fields
			vec![Field::new("url", FieldType::String).with_validator(validate_http_url)],
			// Optional fields
			vec![
				Field::new("method", FieldType::OneOf(&["get", "post"])),
				Field::new("subject_param", FieldType::String),
				Field::new(
					"timeout_ms",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl ProofInterface for HttpProofClient {
	async fn fetch_raw(&self, subject: Option<ProofSubject>) -> Result<String, ProofError> {
		let response = self
			.request(subject)
			.send()
			.await
			.map_err(|e| ProofError::Request(e.to_string()))?;

		// Any non-2xx answer is a miss, retried by the service.
		let status = response.status();
		if !status.is_success() {
			return Err(ProofError::Request(format!("oracle returned {}", status)));
		}

		// A body without a proof is a miss, not a decode error
		let body: ProofResponse = response
			.json()
			.await
			.map_err(|e| ProofError::Request(format!("invalid response body: {}", e)))?;

		debug!(%status, has_proof = body.proof.is_some(), "Oracle responded");

		body.proof
			.filter(|proof| !proof.trim().is_empty())
			.ok_or(ProofError::MissingProof)
	}
}

/// Creates the HTTP oracle client from `[proof.config]`.
///
/// Required: `url`. Optional: `method` (`get` | `post`, default `get`),
/// `subject_param`, `timeout_ms`.
pub fn create_proof_client(
	config: &toml::Value,
) -> Result<Box<dyn ProofInterface>, ProofError> {
	HttpProofClientSchema
		.validate(config)
		.map_err(|e| ProofError::InvalidConfig(e.to_string()))?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ProofError::InvalidConfig("url is required".to_string()))?;

	let method = match config.get("method").and_then(|v| v.as_str()) {
		None | Some("get") => RequestMethod::Get,
		Some("post") => RequestMethod::Post,
		Some(other) => {
			return Err(ProofError::InvalidConfig(format!(
				"method must be 'get' or 'post', got '{}'",
				other
			)));
		}
	};

	let subject_param = config
		.get("subject_param")
		.and_then(|v| v.as_str())
		.map(str::to_string);

	// Per-request timeout, independent of the retry delay
	let timeout_ms = config
		.get("timeout_ms")
		.and_then(|v| v.as_integer())
		.map(|ms| ms as u64)
		.unwrap_or(DEFAULT_TIMEOUT_MS);

	Ok(Box::new(HttpProofClient::new(
		url,
		method,
		subject_param,
		Duration::from_millis(timeout_ms),
	)?))
}
