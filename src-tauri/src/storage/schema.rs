use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed value: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Range and consistency checks applied after a value parses.
pub trait Validate {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Runtime shape check for persisted text.
pub trait Schema: Send + Sync {
    type Value: Clone + Send + Sync;

    fn decode(&self, raw: &str) -> Result<Self::Value, SchemaError>;

    fn encode(&self, value: &Self::Value, pretty: bool) -> Result<String, serde_json::Error>;
}

/// Serde-driven schema for any `Validate` type.
pub struct JsonSchema<T>(PhantomData<fn() -> T>);

impl<T> JsonSchema<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for JsonSchema<T>
where
    T: Serialize + DeserializeOwned + Validate + Clone + Send + Sync,
{
    type Value = T;

    fn decode(&self, raw: &str) -> Result<T, SchemaError> {
        let value: T = serde_json::from_str(raw)?;
        value.validate().map_err(SchemaError::Invalid)?;
        Ok(value)
    }

    fn encode(&self, value: &T, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }
}

impl Validate for String {}
impl Validate for bool {}
impl Validate for serde_json::Value {}

impl Validate for f64 {
    fn validate(&self) -> Result<(), String> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(format!("{self} is not a finite number"))
        }
    }
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> Result<(), String> {
        self.as_ref().map_or(Ok(()), Validate::validate)
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), String> {
        self.iter().try_for_each(Validate::validate)
    }
}
