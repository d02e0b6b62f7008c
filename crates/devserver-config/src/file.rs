use std::path::Path;

use crate::binding::{OptionKey, OptionValue};
use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "appengine.toml";
const TABLE: &str = "devserver";

/// Reads the `[devserver]` table of a config file into bound options, in
/// key order. A file without the table yields no options.
pub fn load_devserver_options(path: &Path) -> Result<Vec<(OptionKey, OptionValue)>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_devserver_options(&contents).map_err(|err| match err {
        ConfigError::Parse { message, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

pub fn parse_devserver_options(
    contents: &str,
) -> Result<Vec<(OptionKey, OptionValue)>, ConfigError> {
    let document: toml::Table = toml::from_str(contents).map_err(|err| ConfigError::Parse {
        path: CONFIG_FILE_NAME.into(),
        message: err.message().to_string(),
    })?;

    let Some(table) = document.get(TABLE) else {
        return Ok(Vec::new());
    };
    let table = table.as_table().ok_or_else(|| ConfigError::Parse {
        path: CONFIG_FILE_NAME.into(),
        message: format!("[{TABLE}] must be a table"),
    })?;

    let mut options = Vec::with_capacity(table.len());
    for (name, value) in table {
        let key = name.parse::<OptionKey>()?;
        options.push((key, convert_value(key, value)?));
    }
    Ok(options)
}

fn convert_value(key: OptionKey, value: &toml::Value) -> Result<OptionValue, ConfigError> {
    match value {
        toml::Value::String(text) => Ok(OptionValue::Text(text.clone())),
        toml::Value::Integer(number) => Ok(OptionValue::Integer(*number)),
        toml::Value::Boolean(flag) => Ok(OptionValue::Bool(*flag)),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| ConfigError::InvalidValue {
                    option: key.name(),
                    expected: "a list of strings",
                    found: format!("array item {item}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(OptionValue::List),
        other => Err(ConfigError::InvalidValue {
            option: key.name(),
            expected: "a string, integer, boolean or list of strings",
            found: other.type_str().to_string(),
        }),
    }
}
