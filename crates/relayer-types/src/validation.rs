//! Schema validation for pluggable implementation configs.
//!
//! Each reader, proof, delivery and account implementation describes the
//! `config` table it accepts with a [`Schema`]; the builder checks the table
//! before calling the factory.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: &'static str,
		actual: String,
	},
}

/// Expected type of a config field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
	/// Any string.
	String,
	/// An integer within optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	/// A string drawn from a fixed set.
	OneOf(&'static [&'static str]),
}

/// Extra check run after the type check passes.
pub type FieldValidator = fn(&toml::Value) -> Result<(), String>;

/// One key of a config table.
pub struct Field {
	/// Key name in the TOML table.
	pub name: &'static str,
	/// Expected value type.
	pub field_type: FieldType,
	/// Optional custom check.
	pub validator: Option<FieldValidator>,
}

impl Field {
	pub fn new(name: &'static str, field_type: FieldType) -> Self {
		Self {
			name,
			field_type,
			validator: None,
		}
	}

	pub fn with_validator(mut self, validator: FieldValidator) -> Self {
		self.validator = Some(validator);
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(self.name, value, &self.field_type)?;
		if let Some(validator) = self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.to_string(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of one config table.
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "config".to_string(),
				expected: "table",
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.to_string()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn check_type(
	field: &str,
	value: &toml::Value,
	expected: &FieldType,
) -> Result<(), ValidationError> {
	let mismatch = |expected: &'static str| ValidationError::TypeMismatch {
		field: field.to_string(),
		expected,
		actual: value.type_str().to_string(),
	};
	let invalid = |message: String| ValidationError::InvalidValue {
		field: field.to_string(),
		message,
	};

	match expected {
		FieldType::String => {
			value.as_str().ok_or_else(|| mismatch("string"))?;
		}
		FieldType::Integer { min, max } => {
			let n = value.as_integer().ok_or_else(|| mismatch("integer"))?;
			if let Some(min) = min.filter(|min| n < *min) {
				return Err(invalid(format!("{} is less than minimum {}", n, min)));
			}
			if let Some(max) = max.filter(|max| n > *max) {
				return Err(invalid(format!("{} is greater than maximum {}", n, max)));
			}
		}
		FieldType::OneOf(choices) => {
			let s = value.as_str().ok_or_else(|| mismatch("string"))?;
			if !choices.contains(&s) {
				return Err(invalid(format!(
					"'{}' is not one of {}",
					s,
					choices.join(", ")
				)));
			}
		}
	}

	Ok(())
}

/// Implemented by every pluggable component to describe its config table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

/// Accepts `http://` and `https://` URLs.
pub fn validate_http_url(value: &toml::Value) -> Result<(), String> {
	let url = value.as_str().unwrap_or_default();
	if url.starts_with("http://") || url.starts_with("https://") {
		Ok(())
	} else {
		Err("URL must start with http:// or https://".to_string())
	}
}

/// Accepts 20-byte `0x`-prefixed addresses.
pub fn validate_address(value: &toml::Value) -> Result<(), String> {
	let addr = value.as_str().unwrap_or_default();
	match addr.strip_prefix("0x") {
		Some(digits) if digits.len() == 40 && hex::decode(digits).is_ok() => Ok(()),
		_ => Err("must be a 0x-prefixed 20 byte address".to_string()),
	}
}

/// Accepts 32-byte private keys with or without the `0x` prefix.
pub fn validate_private_key(value: &toml::Value) -> Result<(), String> {
	let key = value.as_str().unwrap_or_default();
	let digits = key.strip_prefix("0x").unwrap_or(key);

	if digits.len() != 64 {
		return Err("Private key must be 64 hex characters (32 bytes)".to_string());
	}
	if hex::decode(digits).is_err() {
		return Err("Private key must be valid hexadecimal".to_string());
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![
				Field::new("rpc_url", FieldType::String).with_validator(validate_http_url),
				Field::new("contract_address", FieldType::String)
					.with_validator(validate_address),
			],
			vec![
				Field::new(
					"max_attempts",
					FieldType::Integer {
						min: Some(1),
						max: Some(100),
					},
				),
				Field::new("method", FieldType::OneOf(&["get", "post"])),
			],
		)
	}

	fn parse(s: &str) -> toml::Value {
		toml::Value::Table(toml::from_str(s).unwrap())
	}

	#[test]
	fn test_valid_config() {
		let config = parse(
			r#"
rpc_url = "http://localhost:8545"
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
max_attempts = 5
method = "post"
"#,
		);
		assert_eq!(schema().validate(&config), Ok(()));
	}

	#[test]
	fn test_missing_required_field() {
		let config = parse(r#"rpc_url = "http://localhost:8545""#);
		assert_eq!(
			schema().validate(&config),
			Err(ValidationError::MissingField("contract_address".into()))
		);
	}

	#[test]
	fn test_rejects_out_of_range_and_bad_values() {
		let base = r#"
rpc_url = "http://localhost:8545"
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
"#;
		for extra in [
			"max_attempts = 0",
			"max_attempts = 101",
			"method = \"put\"",
			"max_attempts = \"five\"",
		] {
			let config = parse(&format!("{}{}", base, extra));
			assert!(schema().validate(&config).is_err(), "{}", extra);
		}

		let config = parse(
			r#"
rpc_url = "ws://localhost:8545"
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
"#,
		);
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_private_key_validator() {
		let key = toml::Value::String(format!("0x{}", "ab".repeat(32)));
		assert!(validate_private_key(&key).is_ok());
		let short = toml::Value::String("0x1234".into());
		assert!(validate_private_key(&short).is_err());
	}
}
