use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use tracing::debug;

use crate::task::{Priority, TaskDraft};

/// Result of the one-line parser: a ready draft plus what was recognized.
#[derive(Debug, Clone, Default)]
pub struct QuickAdd {
    pub draft: TaskDraft,

    /// Effort estimate mentioned inline ("2 hours", "30 min"). The record
    /// itself does not carry it; the entry screen folds it into its echo.
    pub time_estimate_minutes: Option<u32>,

    /// True when any keyword was recognized, so the UI can tell the user
    /// what it understood.
    pub matched: bool,
}

/// Best-effort keyword matcher over a one-line task entry. Not natural
/// language understanding: fixed phrases for priority and relative dates,
/// plus a scan for known category names.
pub fn parse(input: &str, categories: &[String], now: DateTime<Utc>) -> QuickAdd {
    let lowered = input.to_lowercase();
    let mut parsed = QuickAdd {
        draft: TaskDraft {
            title: input.trim().to_string(),
            ..TaskDraft::default()
        },
        ..QuickAdd::default()
    };

    if lowered.contains("urgent") || lowered.contains("asap") {
        parsed.draft.priority = Priority::Urgent;
        parsed.matched = true;
    } else if lowered.contains("high priority") || lowered.contains("important") {
        parsed.draft.priority = Priority::High;
        parsed.matched = true;
    } else if lowered.contains("low priority") || lowered.contains("whenever") {
        parsed.draft.priority = Priority::Low;
        parsed.matched = true;
    }

    if lowered.contains("today") {
        parsed.draft.due_date = Some(now);
        parsed.matched = true;
    } else if lowered.contains("tomorrow") {
        parsed.draft.due_date = Some(now + Duration::days(1));
        parsed.matched = true;
    } else if lowered.contains("next week") {
        parsed.draft.due_date = Some(now + Duration::days(7));
        parsed.matched = true;
    }

    if let Some(re) = estimate_regex()
        && let Some(caps) = re.captures(&lowered)
    {
        let amount: u32 = caps[1].parse().unwrap_or(0);
        let hours = caps[2].starts_with("hour") || caps[2].starts_with("hr");
        parsed.time_estimate_minutes = Some(if hours { amount * 60 } else { amount });
        parsed.matched = true;
    }

    for category in categories {
        if lowered.contains(&category.to_lowercase()) {
            parsed.draft.category = Some(category.clone());
            parsed.matched = true;
        }
    }
    if parsed.draft.category.is_none() {
        parsed.draft.category = Some(
            categories
                .first()
                .cloned()
                .unwrap_or_else(|| "Personal".to_string()),
        );
    }

    if parsed.matched {
        let mut title = input.to_string();
        if let Some(re) = keyword_regex() {
            title = re.replace_all(&title, "").into_owned();
        }
        if let Some(re) = estimate_regex() {
            title = re.replace_all(&title, "").into_owned();
        }
        parsed.draft.title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        debug!(title = %parsed.draft.title, "quick add recognized keywords");
    }

    parsed
}

fn estimate_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| compile(r"(?i)\b(\d+)\s*(minutes|minute|mins|min|hours|hour|hrs|hr)\b"))
        .as_ref()
}

fn keyword_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        compile(
            r"(?i)\b(urgent|asap|high priority|important|low priority|whenever|today|tomorrow|next week)\b",
        )
    })
    .as_ref()
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::error!(pattern, error = %err, "quick add regex failed to compile");
            None
        }
    }
}
