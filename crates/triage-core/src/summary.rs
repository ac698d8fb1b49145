//! Log summarization
//!
//! Compresses a run log into a short narrative for reports and prompts.
//! The summary keeps, in order of importance:
//!
//! 1. every ERROR entry,
//! 2. the first agent action and the last action before the failure
//!    (any non-debug entry stands in when the run has no agent actions),
//! 3. warnings and blocker entries.
//!
//! Lines are emitted in log order. The result never exceeds the configured
//! byte length; when space runs out the oldest, least informative lines go
//! first and a trailing note records how many entries were left out.

use crate::types::{LogCategory, LogLevel, RunLogEntry};
use std::cmp::Reverse;

/// Default summary length bound
pub const DEFAULT_SUMMARY_MAX_LENGTH: usize = 1000;

/// Default per-entry message cap
pub const DEFAULT_MAX_ENTRY_CHARS: usize = 200;

/// Summary used when a run has no log entries
pub const EMPTY_LOG_SUMMARY: &str = "No log entries found for this run.";

const ELLIPSIS: &str = "...";

/// Smallest remainder worth spending on a partial error line
const MIN_PARTIAL_LINE: usize = 24;

/// Importance tier, lower is kept first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Error,
    Anchor,
    Warning,
}

#[derive(Debug)]
struct Candidate {
    index: usize,
    tier: Tier,
    line: String,
}

/// Summarizer with a length bound
#[derive(Debug, Clone, Copy)]
pub struct LogSummarizer {
    max_length: usize,
    max_entry_chars: usize,
}

impl LogSummarizer {
    /// Create summarizer bounded to `max_length` bytes
    #[inline]
    #[must_use]
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            max_entry_chars: DEFAULT_MAX_ENTRY_CHARS,
        }
    }

    /// With per-entry message cap (in characters)
    #[inline]
    #[must_use]
    pub fn with_max_entry_chars(mut self, max_entry_chars: usize) -> Self {
        self.max_entry_chars = max_entry_chars.max(ELLIPSIS.len() + 1);
        self
    }

    /// Configured length bound
    #[inline]
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Summarize log entries
    #[must_use]
    pub fn summarize(&self, logs: &[RunLogEntry]) -> String {
        if logs.is_empty() {
            return truncate_bytes(EMPTY_LOG_SUMMARY, self.max_length);
        }

        let mut candidates = self.candidates(logs);
        candidates.sort_by_key(|c| (c.tier, Reverse(c.index)));

        let mut selected: Vec<(usize, String)> = Vec::new();
        let mut used = 0usize;

        for candidate in &candidates {
            let separator = usize::from(!selected.is_empty());
            let remaining = self.max_length.saturating_sub(used + separator);

            if candidate.line.len() <= remaining {
                used += separator + candidate.line.len();
                selected.push((candidate.index, candidate.line.clone()));
            } else if candidate.tier == Tier::Error && remaining >= MIN_PARTIAL_LINE {
                let partial = truncate_bytes(&candidate.line, remaining);
                used += separator + partial.len();
                selected.push((candidate.index, partial));
            }
        }

        if selected.is_empty() {
            // Not even a partial line fit; keep the most important one cut to size
            return candidates
                .first()
                .map(|c| truncate_bytes(&c.line, self.max_length))
                .unwrap_or_default();
        }

        selected.sort_by_key(|(index, _)| *index);
        let mut summary = selected
            .iter()
            .map(|(_, line)| line.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let omitted = logs.len() - selected.len();
        if omitted > 0 {
            let note = format!("\n({omitted} more entries omitted)");
            if summary.len() + note.len() <= self.max_length {
                summary.push_str(&note);
            }
        }

        truncate_bytes(&summary, self.max_length)
    }

    fn candidates(&self, logs: &[RunLogEntry]) -> Vec<Candidate> {
        let failure_at = logs.iter().position(RunLogEntry::is_error).unwrap_or(logs.len());

        let first_action = logs
            .iter()
            .position(|e| e.category == LogCategory::AgentAction)
            .or_else(|| logs.iter().position(|e| e.level != LogLevel::Debug));
        let last_action = logs[..failure_at]
            .iter()
            .rposition(|e| e.category == LogCategory::AgentAction)
            .or_else(|| logs[..failure_at].iter().rposition(|e| e.level != LogLevel::Debug));

        let mut out: Vec<Candidate> = logs
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let tier = if entry.is_error() {
                    Tier::Error
                } else if Some(index) == first_action || Some(index) == last_action {
                    Tier::Anchor
                } else if entry.level == LogLevel::Warning || entry.category == LogCategory::Blocker {
                    Tier::Warning
                } else {
                    return None;
                };
                Some(Candidate {
                    index,
                    tier,
                    line: self.format_entry(entry),
                })
            })
            .collect();

        if out.is_empty() {
            // Debug-only run; bracket it with its first and last lines
            let last = logs.len() - 1;
            out.push(Candidate {
                index: 0,
                tier: Tier::Anchor,
                line: self.format_entry(&logs[0]),
            });
            if last > 0 {
                out.push(Candidate {
                    index: last,
                    tier: Tier::Anchor,
                    line: self.format_entry(&logs[last]),
                });
            }
        }

        out
    }

    fn format_entry(&self, entry: &RunLogEntry) -> String {
        let message = entry.message.replace(['\r', '\n'], " ");
        format!(
            "[{}] {}: {}",
            entry.level.as_str(),
            entry.category.as_str(),
            truncate_chars(message.trim(), self.max_entry_chars)
        )
    }
}

impl Default for LogSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARY_MAX_LENGTH)
    }
}

/// Summarize log entries into at most `max_length` bytes
#[must_use]
pub fn summarize_logs(logs: &[RunLogEntry], max_length: usize) -> String {
    LogSummarizer::new(max_length).summarize(logs)
}

/// Cut `text` to at most `max_chars` characters, marking the cut
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Cut `text` to at most `max_bytes` bytes on a char boundary, marking the cut
#[must_use]
pub fn truncate_bytes(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    if max_bytes < ELLIPSIS.len() {
        return text[..floor_boundary(text, max_bytes)].to_string();
    }
    let cut = floor_boundary(text, max_bytes - ELLIPSIS.len());
    format!("{}{ELLIPSIS}", &text[..cut])
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
