//! libpq `keyword=value` connection strings

use std::fmt;

/// Ordered set of conninfo pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conninfo {
    pairs: Vec<(String, String)>,
}

impl Conninfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Parse a connection string. Malformed trailing input is dropped.
    pub fn parse(input: &str) -> Self {
        let mut pairs = Vec::new();
        let mut chars = input.chars().peekable();

        loop {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}

            let mut key = String::new();
            while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != '=') {
                key.push(c);
            }
            if key.is_empty() {
                break;
            }

            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            if chars.next_if_eq(&'=').is_none() {
                break;
            }
            while chars.next_if(|c| c.is_whitespace()).is_some() {}

            let mut value = String::new();
            if chars.next_if_eq(&'\'').is_some() {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => value.extend(chars.next()),
                        '\'' => break,
                        c => value.push(c),
                    }
                }
            } else {
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    if c == '\\' {
                        value.extend(chars.next());
                    } else {
                        value.push(c);
                    }
                }
            }

            pairs.push((key, value));
        }

        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a pair in place, or append it. Returns whether anything changed.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) if v == value => false,
            Some((_, v)) => {
                *v = value.to_string();
                true
            }
            None => {
                self.pairs.push((key.to_string(), value.to_string()));
                true
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\')
}

impl fmt::Display for Conninfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if needs_quoting(value) {
                let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
                write!(f, "{}='{}'", key, escaped)?;
            } else {
                write!(f, "{}={}", key, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_pairs() {
        let info = Conninfo::parse("host=pg-primary port=5432 user=repl sslmode=prefer");
        assert_eq!(info.get("host"), Some("pg-primary"));
        assert_eq!(info.get("port"), Some("5432"));
        assert_eq!(info.get("sslmode"), Some("prefer"));
        assert_eq!(info.get("password"), None);
        assert_eq!(
            info.keys().collect::<Vec<_>>(),
            vec!["host", "port", "user", "sslmode"]
        );
    }

    #[test]
    fn test_parse_quoted_and_spaced_values() {
        let info = Conninfo::parse(r"host = db  password='it\'s a secret' user=r\ x");
        assert_eq!(info.get("host"), Some("db"));
        assert_eq!(info.get("password"), Some("it's a secret"));
        assert_eq!(info.get("user"), Some("r x"));
    }

    #[test]
    fn test_render_quotes_when_needed() {
        let info = Conninfo::new()
            .with("host", "db")
            .with("password", "it's a secret")
            .with("options", "");
        assert_eq!(
            info.to_string(),
            r"host=db password='it\'s a secret' options=''"
        );
        assert_eq!(Conninfo::parse(&info.to_string()), info);
    }

    #[test]
    fn test_set_reports_changes() {
        let mut info = Conninfo::parse("host=a port=5432");
        assert!(!info.set("port", "5432"));
        assert!(info.set("port", "6432"));
        assert!(info.set("user", "repl"));
        assert_eq!(info.to_string(), "host=a port=6432 user=repl");
    }

    #[test]
    fn test_parse_stops_at_garbage() {
        let info = Conninfo::parse("host=a dangling");
        assert_eq!(info.keys().count(), 1);
    }
}
