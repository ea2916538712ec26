use crate::error::CliError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Environment variable manager that merges an optional .env-format
/// file over the process environment.
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (key, value) in std::env::vars() {
            vars.insert(key, value);
        }
        Self { vars }
    }

    /// Load variables from a .env file; file values override process
    /// values.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse KEY=VALUE format
            if let Some(eq_pos) = line.find('=') {
                let key = line[..eq_pos].trim();
                let value = line[eq_pos + 1..].trim();

                if key.is_empty() {
                    return Err(CliError::Config(format!(
                        "Invalid env file: empty key at line {}",
                        line_num + 1
                    )));
                }

                let value = Self::unquote_value(value);
                self.vars.insert(key.to_string(), value);
            } else {
                return Err(CliError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            }
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();

        if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
            return value[1..value.len() - 1].to_string();
        }

        if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
            return value[1..value.len() - 1].to_string();
        }

        value.to_string()
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> EnvManager {
        EnvManager {
            vars: HashMap::new(),
        }
    }

    #[test]
    fn test_parse_basic_env() {
        let mut env = empty();
        let content = r#"
# Comment
KEY1=value1
KEY2=value2
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get("KEY1").unwrap(), "value1");
        assert_eq!(env.get("KEY2").unwrap(), "value2");
    }

    #[test]
    fn test_parse_quoted_values() {
        let mut env = empty();
        let content = r#"
QUOTED="value with spaces"
SINGLE='single quoted'
UNQUOTED=no_spaces
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get("QUOTED").unwrap(), "value with spaces");
        assert_eq!(env.get("SINGLE").unwrap(), "single quoted");
        assert_eq!(env.get("UNQUOTED").unwrap(), "no_spaces");
    }

    #[test]
    fn test_invalid_env_format() {
        let mut env = empty();
        let content = "INVALID LINE WITHOUT EQUALS";
        assert!(env.parse_env_content(content).is_err());
    }

    #[test]
    fn test_file_values_override_existing_keys() {
        let mut env = empty();
        env.set("KEY", "old");
        env.parse_env_content("KEY=new").unwrap();
        assert_eq!(env.get("KEY").unwrap(), "new");
    }
}
