use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Runtime parameters passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    /// Create empty params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse from CLI args like "key=value".
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut params = Self::new();
        for arg in args {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid param '{}', expected key=value", arg))
            })?;
            if key.trim().is_empty() {
                return Err(Error::Config(format!("invalid param '{}', empty key", arg)));
            }
            params.values.insert(key.trim().to_string(), value.to_string());
        }
        Ok(params)
    }
}

/// Parameter definition in config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamDef {
    #[serde(default)]
    pub required: bool,

    pub default: Option<String>,

    pub description: Option<String>,
}

/// Where placeholder values come from, in lookup order.
pub struct Sources<'a> {
    pub params: &'a Params,
    pub defs: &'a HashMap<String, ParamDef>,
    pub env: &'a dyn Fn(&str) -> Option<String>,
}

impl Sources<'_> {
    fn lookup(&self, name: &str) -> Result<Option<String>> {
        if let Some(v) = self.params.get(name) {
            return Ok(Some(v.to_string()));
        }
        let def = self.defs.get(name);
        if let Some(default) = def.and_then(|d| d.default.clone()) {
            return Ok(Some(default));
        }
        if let Some(v) = (self.env)(name) {
            return Ok(Some(v));
        }
        match def {
            Some(d) if d.required => Err(Error::Config(format!(
                "missing required parameter: {}",
                name
            ))),
            Some(_) => Ok(Some(String::new())),
            None => Ok(None),
        }
    }
}

/// Substitute `${name}` patterns in a string.
///
/// Unknown names without an environment value are left untouched.
pub fn substitute(template: &str, sources: &Sources<'_>) -> Result<String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(offset) = result[start..].find("${") {
        let var_start = start + offset;
        let Some(len) = result[var_start..].find('}') else {
            break;
        };
        let var_end = var_start + len;
        let name = result[var_start + 2..var_end].trim().to_string();

        match sources.lookup(&name)? {
            Some(value) => {
                result.replace_range(var_start..=var_end, &value);
                start = var_start + value.len();
            }
            None => start = var_end + 1,
        }
    }

    Ok(result)
}

/// Recursively substitute params in every string of a JSON value.
pub fn substitute_value(value: &mut Value, sources: &Sources<'_>) -> Result<()> {
    match value {
        Value::String(s) => {
            *s = substitute(s, sources)?;
        }
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                substitute_value(v, sources)?;
            }
        }
        Value::Array(seq) => {
            for v in seq.iter_mut() {
                substitute_value(v, sources)?;
            }
        }
        _ => {}
    }
    Ok(())
}
