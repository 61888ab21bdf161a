//! `postgresql.conf` parameter substitution

use super::{append_line, rewrite};
use crate::error::{EntrypointError, Result};
use std::path::Path;
use tracing::info;

/// A `key = value` line, possibly commented out.
struct ParamLine<'a> {
    commented: bool,
    key: &'a str,
    raw_value: &'a str,
}

fn parse_line(line: &str) -> Option<ParamLine<'_>> {
    let trimmed = line.trim_start();
    let (commented, rest) = match trimmed.strip_prefix('#') {
        Some(rest) => (true, rest.trim_start_matches('#').trim_start()),
        None => (false, trimmed),
    };

    let key_end = rest.find(|c: char| c.is_whitespace() || c == '=')?;
    let key = &rest[..key_end];
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return None;
    }

    let raw_value = rest[key_end..].trim_start().strip_prefix('=')?.trim_start();
    Some(ParamLine {
        commented,
        key,
        raw_value,
    })
}

/// Quote a value for a configuration file (`'` doubled, `\` escaped).
pub fn quote_value(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// Decode a raw value: a quoted string up to its closing quote, or a bare
/// word up to whitespace or a trailing comment.
fn unquote_value(raw: &str) -> String {
    let Some(quoted) = raw.strip_prefix('\'') else {
        return raw
            .split(|c: char| c.is_whitespace() || c == '#')
            .next()
            .unwrap_or_default()
            .to_string();
    };

    let mut value = String::new();
    let mut chars = quoted.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                value.push('\'');
            }
            '\'' => break,
            '\\' => {
                if let Some(escaped) = chars.next() {
                    value.push(escaped);
                }
            }
            c => value.push(c),
        }
    }
    value
}

fn render_param(key: &str, value: &str) -> String {
    format!("{} = {}", key, quote_value(value))
}

/// Current value of an active (uncommented) parameter.
pub fn get_param(content: &str, key: &str) -> Option<String> {
    content
        .lines()
        .filter_map(parse_line)
        .filter(|p| !p.commented && p.key.eq_ignore_ascii_case(key))
        .last()
        .map(|p| unquote_value(p.raw_value))
}

/// Set `key` to `value`, returning the new content or None if unchanged.
///
/// The last active line for `key` wins (as it does for the server); failing
/// that, the first commented default is uncommented. Missing keys are appended.
pub fn apply_param(content: &str, key: &str, value: &str) -> Option<String> {
    let lines: Vec<&str> = content.lines().collect();
    let params: Vec<(usize, ParamLine<'_>)> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| parse_line(line).map(|p| (i, p)))
        .filter(|(_, p)| p.key.eq_ignore_ascii_case(key))
        .collect();

    let target = match params.iter().filter(|(_, p)| !p.commented).last() {
        Some((_, p)) if unquote_value(p.raw_value) == value => return None,
        Some((i, _)) => Some(*i),
        None => params.iter().find(|(_, p)| p.commented).map(|(i, _)| *i),
    };

    let rendered = render_param(key, value);
    match target {
        Some(index) => {
            let mut updated: String = lines
                .iter()
                .enumerate()
                .map(|(i, line)| if i == index { rendered.as_str() } else { *line })
                .collect::<Vec<_>>()
                .join("\n");
            if content.ends_with('\n') {
                updated.push('\n');
            }
            Some(updated)
        }
        None => Some(append_line(content, &rendered)),
    }
}

/// Read the current value of a parameter from `postgresql.conf`.
pub fn get_postgresql_param(conf: &Path, key: &str) -> Result<Option<String>> {
    let content =
        std::fs::read_to_string(conf).map_err(|e| EntrypointError::config_file(conf, e))?;
    Ok(get_param(&content, key))
}

/// Set a parameter in `postgresql.conf`. Empty values are skipped.
pub fn set_postgresql_param(conf: &Path, key: &str, value: &str) -> Result<bool> {
    if value.is_empty() {
        return Ok(false);
    }

    let changed = rewrite(conf, |content| apply_param(content, key, value))?;
    if changed {
        info!(key, value, "Setting postgresql.conf parameter");
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
# - Settings -

#wal_level = minimal\t\t\t# minimal, replica, or logical
#max_wal_senders = 10\t\t# max number of walsender processes
data_directory = '/var/lib/postgresql/11/main'\t\t# use data in another directory
log_filename = 'postgresql-%Y-%m-%d_%H%M%S.log'
";

    #[test]
    fn test_get_param_reads_active_values_only() {
        assert_eq!(
            get_param(SAMPLE, "data_directory").as_deref(),
            Some("/var/lib/postgresql/11/main")
        );
        assert_eq!(get_param(SAMPLE, "wal_level"), None);
        assert_eq!(get_param("port = 5433 # custom", "port").as_deref(), Some("5433"));
    }

    #[test]
    fn test_uncomments_default() {
        let updated = apply_param(SAMPLE, "wal_level", "replica").unwrap();
        assert!(updated.contains("\nwal_level = 'replica'\n"));
        assert!(!updated.contains("#wal_level"));
        assert_eq!(get_param(&updated, "wal_level").as_deref(), Some("replica"));
        assert_eq!(updated.lines().count(), SAMPLE.lines().count());
    }

    #[test]
    fn test_replaces_active_value() {
        let updated = apply_param(SAMPLE, "data_directory", "/data/pg").unwrap();
        assert!(updated.contains("data_directory = '/data/pg'"));
        assert!(!updated.contains("/var/lib/postgresql/11/main"));
    }

    #[test]
    fn test_unchanged_value_is_noop() {
        assert!(apply_param(SAMPLE, "data_directory", "/var/lib/postgresql/11/main").is_none());
    }

    #[test]
    fn test_missing_key_is_appended() {
        let updated = apply_param(SAMPLE, "hot_standby", "on").unwrap();
        assert!(updated.ends_with("hot_standby = 'on'\n"));
    }

    #[test]
    fn test_key_prefix_does_not_match() {
        let content = "#wal_level_extra = 1\n";
        let updated = apply_param(content, "wal_level", "replica").unwrap();
        assert_eq!(updated, "#wal_level_extra = 1\nwal_level = 'replica'\n");
    }

    #[test]
    fn test_quotes_are_escaped() {
        let updated = apply_param("", "primary_conninfo", "password='it''s'").unwrap();
        assert_eq!(get_param(&updated, "primary_conninfo").as_deref(), Some("password='it''s'"));

        assert_eq!(quote_value("a'b\\c"), "'a''b\\\\c'");
    }

    #[test]
    fn test_set_postgresql_param_on_disk() {
        let dir = TempDir::new().unwrap();
        let conf = dir.path().join("postgresql.conf");
        std::fs::write(&conf, SAMPLE).unwrap();

        assert!(set_postgresql_param(&conf, "max_wal_senders", "16").unwrap());
        assert!(!set_postgresql_param(&conf, "max_wal_senders", "16").unwrap());
        assert!(!set_postgresql_param(&conf, "log_directory", "").unwrap());

        assert_eq!(
            get_postgresql_param(&conf, "max_wal_senders").unwrap().as_deref(),
            Some("16")
        );
    }
}
