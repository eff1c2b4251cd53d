use json::JsonValue;

use crate::error::{ParamError, Result};

pub const IMPORT_RADIUS: &str = "IMPORT_RADIUS";
pub const TEST_PARAM: &str = "TEST_PARAM";
pub const EXPORT_PARAM: &str = "EXPORT_PARAM";
pub const RADIUS: &str = "RADIUS";
pub const RFILE: &str = "RFILE";
pub const OUTPUT_DIR: &str = "OutputDir";

/// Keyed access to the configuration record
///
/// A missing key is an error carrying the optional description, which the
/// caller propagates unchanged.
pub trait ParamStore {
    fn bool_value(&self, key: &str, description: Option<&str>) -> Result<bool>;
    fn real_value(&self, key: &str, description: Option<&str>) -> Result<f64>;
    fn string_value(&self, key: &str, description: Option<&str>) -> Result<String>;
}

fn missing(key: &str, description: Option<&str>) -> ParamError {
    ParamError::MissingKey {
        key: key.to_owned(),
        description: description.unwrap_or("required parameter").to_owned(),
    }
}

/// Configuration record backed by a flat json object
#[derive(Debug, Clone)]
pub struct JsonParamStore {
    root: JsonValue,
}

impl JsonParamStore {
    /// Wraps an already parsed json object
    pub fn from_value(root: JsonValue) -> Result<JsonParamStore> {
        if !root.is_object() {
            return Err(ParamError::Input(
                "Parameter file must contain a json object".to_owned(),
            ));
        }
        Ok(JsonParamStore { root })
    }

    pub fn parse(contents: &str) -> Result<JsonParamStore> {
        let root = match json::parse(contents) {
            Ok(v) => v,
            Err(err) => {
                return Err(ParamError::Input(format!(
                    "Error in parameter file json: {err}"
                )))
            }
        };
        JsonParamStore::from_value(root)
    }

    /// Parses the parameter file into a store
    ///
    /// # Arguments
    /// * `input_file` - The path to the json parameter file
    pub fn from_file(input_file: &str) -> Result<JsonParamStore> {
        let file_string = match std::fs::read_to_string(input_file) {
            Ok(f) => f,
            Err(err) => {
                return Err(ParamError::Input(format!(
                    "Unable to open parameter file {input_file}: {err}"
                )))
            }
        };
        let store = JsonParamStore::parse(&file_string)?;
        log::info!("loaded {} parameters from {}", store.root.len(), input_file);
        Ok(store)
    }

    fn lookup(&self, key: &str, description: Option<&str>) -> Result<&JsonValue> {
        if !self.root.has_key(key) || self.root[key].is_null() {
            return Err(missing(key, description));
        }
        Ok(&self.root[key])
    }
}

impl ParamStore for JsonParamStore {
    /// Flags may be json booleans or integers, zero meaning false
    fn bool_value(&self, key: &str, description: Option<&str>) -> Result<bool> {
        let value = self.lookup(key, description)?;
        if let Some(b) = value.as_bool() {
            return Ok(b);
        }
        match value.as_f64() {
            Some(n) => Ok(n != 0.0),
            None => Err(ParamError::InvalidValue {
                key: key.to_owned(),
                expected: "boolean",
            }),
        }
    }

    fn real_value(&self, key: &str, description: Option<&str>) -> Result<f64> {
        self.lookup(key, description)?
            .as_f64()
            .ok_or_else(|| ParamError::InvalidValue {
                key: key.to_owned(),
                expected: "number",
            })
    }

    fn string_value(&self, key: &str, description: Option<&str>) -> Result<String> {
        self.lookup(key, description)?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| ParamError::InvalidValue {
                key: key.to_owned(),
                expected: "string",
            })
    }
}
