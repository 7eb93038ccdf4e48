//! Content document envelope — rendering and parsing.
//!
//! Every entry is a markdown file with a fixed frontmatter envelope:
//!
//! ```text
//! ---
//! title: "4:05:33 PM - July 9, 2025"
//! date: 2025-07-09T16:05:33.123Z
//! timestamp: 1752077133123
//! ---
//!
//! <body>
//! ```
//!
//! The body is either free text or one or more `## <Heading>` section blocks.
//! Backfill re-parses these files, so [`parse`] must accept exactly what
//! [`render_free_text`] and [`render_sections`] produce.

use chrono::{DateTime, Local, SecondsFormat, Utc};

use crate::journal::types::SectionKey;

const DELIMITER: &str = "---";

/// The moment an entry was written, captured once per write so the day
/// folder, file name, title, and timestamp all agree.
#[derive(Debug, Clone, Copy)]
pub struct EntryStamp {
    pub local: DateTime<Local>,
    pub epoch_ms: i64,
}

impl EntryStamp {
    pub fn now() -> Self {
        let utc = Utc::now();
        Self {
            local: utc.with_timezone(&Local),
            epoch_ms: utc.timestamp_millis(),
        }
    }

    /// Day-folder key, e.g. `2025-07-09`.
    pub fn day_key(&self) -> String {
        self.local.format("%Y-%m-%d").to_string()
    }

    /// Display title, e.g. `4:05:33 PM - July 9, 2025`.
    pub fn title(&self) -> String {
        self.local.format("%-I:%M:%S %p - %B %-d, %Y").to_string()
    }

    /// ISO-8601 date with millisecond precision.
    pub fn iso_date(&self) -> String {
        self.local
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

fn render_envelope(stamp: &EntryStamp) -> String {
    format!(
        "{DELIMITER}\ntitle: \"{}\"\ndate: {}\ntimestamp: {}\n{DELIMITER}\n\n",
        stamp.title(),
        stamp.iso_date(),
        stamp.epoch_ms,
    )
}

/// Render a free-text entry document.
pub fn render_free_text(stamp: &EntryStamp, text: &str) -> String {
    format!("{}{}\n", render_envelope(stamp), text.trim_end())
}

/// Body of a structured entry: `## <Heading>` blocks separated by blank lines.
pub fn sections_body(sections: &[(SectionKey, &str)]) -> String {
    sections
        .iter()
        .map(|(key, content)| format!("## {}\n\n{}", key.heading(), content.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render a structured entry document with `## <Heading>` blocks.
pub fn render_sections(stamp: &EntryStamp, sections: &[(SectionKey, &str)]) -> String {
    format!("{}{}\n", render_envelope(stamp), sections_body(sections))
}

/// A content document parsed back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    pub title: String,
    pub timestamp: i64,
    /// Everything after the envelope and its separating blank line.
    pub body: String,
    /// Section headings found in the body, in order.
    pub sections: Vec<String>,
}

/// Parse a content document. Returns `None` for anything that does not carry
/// a well-formed envelope — backfill skips such files rather than aborting.
pub fn parse(content: &str) -> Option<ParsedEntry> {
    let rest = content.strip_prefix(DELIMITER)?.strip_prefix('\n')?;
    let (envelope, body) = rest.split_once(&format!("\n{DELIMITER}\n"))?;

    let mut title = None;
    let mut timestamp = None;
    for line in envelope.lines() {
        if let Some(value) = line.strip_prefix("title: ") {
            title = Some(value.trim().trim_matches('"').to_string());
        } else if let Some(value) = line.strip_prefix("timestamp: ") {
            timestamp = value.trim().parse::<i64>().ok();
        }
    }

    let body = body.strip_prefix('\n').unwrap_or(body).trim_end().to_string();
    let sections = body
        .lines()
        .filter_map(|line| line.strip_prefix("## "))
        .map(|heading| heading.trim().to_string())
        .collect();

    Some(ParsedEntry {
        title: title?,
        timestamp: timestamp?,
        body,
        sections,
    })
}
