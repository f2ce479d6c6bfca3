use crate::{Error, Result};
use std::collections::BTreeMap;

const SEPARATOR: &str = "://";

/// Backend name plus the backend specific connect string, with optional explicit options.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    backend: String,
    connect_string: String,
    options: BTreeMap<String, String>,
}

impl ConnectionParameters {
    pub fn new(backend: impl Into<String>, connect_string: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            connect_string: connect_string.into(),
            options: Default::default(),
        }
    }

    /// Splits `backend://parameters`.
    pub fn parse(connection: &str) -> Result<Self> {
        match connection.split_once(SEPARATOR) {
            Some((backend, parameters)) if !backend.is_empty() => {
                Ok(Self::new(backend, parameters))
            }
            _ => {
                let error = Error::msg(format!("No backend name found in {}", connection));
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    pub fn backend_name(&self) -> &str {
        &self.backend
    }

    pub fn connect_string(&self) -> &str {
        &self.connect_string
    }

    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Explicitly set option, [`options`](Self::options) also includes the connect string ones.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    /// Options from the connect string merged with the explicit ones, explicit options win.
    pub fn options(&self) -> Result<BTreeMap<String, String>> {
        let mut result: BTreeMap<String, String> = parse_options(&self.connect_string)?
            .into_iter()
            .collect();
        result.extend(
            self.options
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Ok(result)
    }
}

/// Parses space separated `key=value` pairs, values may be quoted with `'` or `"`.
pub fn parse_options(input: &str) -> Result<Vec<(String, String)>> {
    let mut result = Vec::new();
    let mut chars = input.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }
        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }
        if chars.next_if_eq(&'=').is_none() {
            return Err(Error::msg(format!(
                "Expected '=' after the option name `{}` in `{}`",
                key, input
            )));
        }
        if key.is_empty() {
            return Err(Error::msg(format!("Missing option name in `{}`", input)));
        }
        let mut value = String::new();
        match chars.peek().copied() {
            Some(quote @ ('\'' | '"')) => {
                chars.next();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => {
                            return Err(Error::msg(format!(
                                "Unterminated quoted value for the option `{}`",
                                key
                            )));
                        }
                    }
                }
            }
            _ => {
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    value.push(c);
                }
            }
        }
        result.push((key, value));
    }
    Ok(result)
}

/// Reads a boolean option value.
pub fn parse_bool_option(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::msg(format!(
            "Invalid value `{}` for the boolean option `{}`",
            value, name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split() {
        let parameters = ConnectionParameters::parse("sqlite://db=test.db timeout=2")
            .expect("well formed connection string");
        assert_eq!(parameters.backend_name(), "sqlite");
        assert_eq!(parameters.connect_string(), "db=test.db timeout=2");
        let error = ConnectionParameters::parse("test.db").expect_err("missing backend");
        assert_eq!(error.to_string(), "No backend name found in test.db");
        assert!(ConnectionParameters::parse("://x").is_err());
    }

    #[test]
    fn options() {
        let options = parse_options(r#"  db='my file.db' timeout=5 vfs="unix-none" empty=  "#)
            .expect("valid options");
        assert_eq!(
            options,
            [
                ("db".to_string(), "my file.db".to_string()),
                ("timeout".to_string(), "5".to_string()),
                ("vfs".to_string(), "unix-none".to_string()),
                ("empty".to_string(), "".to_string()),
            ]
        );
        assert!(parse_options("db").is_err());
        assert!(parse_options("db='open").is_err());
        assert!(parse_options("=1").is_err());
        assert!(parse_options("").expect("empty is fine").is_empty());
    }

    #[test]
    fn explicit_options_win() {
        let mut parameters = ConnectionParameters::new("empty", "a=1 b=2");
        parameters.set_option("b", "3");
        let options = parameters.options().expect("valid options");
        assert_eq!(options.get("a").map(String::as_str), Some("1"));
        assert_eq!(options.get("b").map(String::as_str), Some("3"));
        assert_eq!(parameters.option("a"), None);
    }

    #[test]
    fn booleans() {
        assert!(parse_bool_option("readonly", "Yes").expect("valid"));
        assert!(!parse_bool_option("readonly", "0").expect("valid"));
        assert!(parse_bool_option("readonly", "maybe").is_err());
    }
}
