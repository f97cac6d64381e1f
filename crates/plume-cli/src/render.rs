use std::io::Write;

use chrono::{DateTime, Utc};
use colored::Colorize;
use plume_profile::{Broadcast, Document, RemoteProfile};
use serde_json::{json, Value};

/// Render a publish time as a UTC timestamp, falling back to the raw number.
pub fn format_time(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Interpret command-line words as a profile field value: JSON if the joined
/// text parses, otherwise a plain string.
pub fn parse_field_value(words: &[String]) -> Value {
    let raw = words.join(" ");
    serde_json::from_str(&raw).unwrap_or_else(|_| Value::String(raw))
}

pub fn entry_json(entry: &Broadcast) -> Value {
    json!({
        "url": entry.reference(),
        "author": entry.author.url(),
        "path": entry.name,
        "publish_time": entry.publish_time,
        "published": format_time(entry.publish_time),
        "content": entry.content,
        "error": entry.error.as_ref().map(ToString::to_string),
    })
}

pub fn write_json(out: &mut dyn Write, value: &impl serde::Serialize) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub fn write_fields(out: &mut dyn Write, doc: &Document, indent: &str) -> anyhow::Result<()> {
    for (key, value) in doc.fields() {
        let shown = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        writeln!(out, "{indent}{}: {shown}", key.bold())?;
    }
    Ok(())
}

pub fn write_remote(out: &mut dyn Write, remote: &RemoteProfile) -> anyhow::Result<()> {
    let status = if remote.downloaded {
        "✓".green()
    } else {
        "?".yellow()
    };
    let name = remote.profile.get_str("name").unwrap_or_default();
    writeln!(out, "{status} {}  {name}", remote.url.cyan())?;
    if !remote.downloaded {
        writeln!(out, "    {}", "timed out".yellow())?;
    }
    Ok(())
}

pub fn write_entry(out: &mut dyn Write, entry: &Broadcast) -> anyhow::Result<()> {
    writeln!(
        out,
        "{}  {}",
        format_time(entry.publish_time).dimmed(),
        entry.reference().cyan()
    )?;
    match (&entry.content, &entry.error) {
        (Some(content), _) => {
            if let Some(text) = content.get_str("text") {
                writeln!(out, "    {text}")?;
            }
            for media in ["image", "video", "audio"] {
                if let Some(link) = content.get_str(media) {
                    writeln!(out, "    [{media}] {}", link.blue())?;
                }
            }
        }
        (None, Some(error)) => writeln!(out, "    {} {error}", "unreadable:".red())?,
        (None, None) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_is_rendered_in_utc() {
        assert_eq!(format_time(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_time(1_000), "1970-01-01 00:00:01 UTC");
        assert_eq!(format_time(u64::MAX), u64::MAX.to_string());
    }

    #[test]
    fn field_values_prefer_json() {
        let words = |w: &[&str]| w.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(parse_field_value(&words(&["42"])), json!(42));
        assert_eq!(parse_field_value(&words(&["true"])), json!(true));
        assert_eq!(parse_field_value(&words(&["[1,", "2]"])), json!([1, 2]));
        assert_eq!(parse_field_value(&words(&["hello", "world"])), json!("hello world"));
    }
}
