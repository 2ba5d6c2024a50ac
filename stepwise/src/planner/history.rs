//! Text renderings of request data used as contract inputs.

use std::fmt::Write as _;

use crate::error::Result;
use crate::types::{ConversationTurn, StepRecord};

/// Sentinel shown to the oracle when there is no last step.
pub const NO_STEP: &str = "none";

/// One `role: content` line per turn, attachment URLs appended inline.
#[must_use]
pub fn flatten_history(turns: &[ConversationTurn]) -> String {
    let mut text = String::new();
    for turn in turns {
        let _ = write!(text, "{}: {}", turn.role, turn.content);
        for media in &turn.attachments {
            let _ = write!(text, " {}", media.url);
        }
        text.push('\n');
    }
    text
}

/// The latest user message with its first attachment URL, or empty when
/// the latest turn is not from the user.
#[must_use]
pub fn new_message(turns: &[ConversationTurn]) -> String {
    match turns.last() {
        Some(turn) if turn.is_user() => message_text(turn),
        _ => String::new(),
    }
}

/// A turn's content with its first attachment URL appended.
#[must_use]
pub fn message_text(turn: &ConversationTurn) -> String {
    match turn.first_attachment_url() {
        Some(url) => format!("{} {url}", turn.content),
        None => turn.content.clone(),
    }
}

/// Past steps as a JSON array, oldest first.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if a step cannot be serialized.
pub fn render_steps(steps: &[StepRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(steps)?)
}

/// The most recent step as JSON, or [`NO_STEP`].
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if the step cannot be serialized.
pub fn render_last_step(steps: &[StepRecord]) -> Result<String> {
    match steps.last() {
        Some(step) => Ok(serde_json::to_string_pretty(step)?),
        None => Ok(NO_STEP.to_string()),
    }
}

/// Numbered plan, one instruction per line.
#[must_use]
pub fn render_plan(plan: &[String]) -> String {
    plan.iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {step}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether a step looks like it is still waiting on the user.
#[must_use]
pub fn looks_pending(step: &StepRecord) -> bool {
    const MARKERS: &[&str] = &["pending", "awaiting", "confirm", "waiting"];
    let detail = step.detail.to_lowercase();
    let result = step.result.to_lowercase();
    MARKERS
        .iter()
        .any(|m| detail.contains(m) || result.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Media;

    #[test]
    fn test_flatten_history_inlines_attachments() {
        let turns = vec![
            ConversationTurn::user("make a token with this logo")
                .with_attachment(Media::from_url("1", "https://img/a.png"))
                .with_attachment(Media::from_url("2", "https://img/b.png")),
            ConversationTurn::assistant("Sure"),
        ];
        assert_eq!(
            flatten_history(&turns),
            "user: make a token with this logo https://img/a.png https://img/b.png\nassistant: Sure\n"
        );
    }

    #[test]
    fn test_new_message() {
        let with_logo = vec![
            ConversationTurn::user("logo").with_attachment(Media::from_url("1", "https://img/a.png")),
        ];
        assert_eq!(new_message(&with_logo), "logo https://img/a.png");

        let assistant_last = vec![ConversationTurn::user("hi"), ConversationTurn::assistant("hey")];
        assert_eq!(new_message(&assistant_last), "");
        assert_eq!(new_message(&[]), "");
    }

    #[test]
    fn test_render_steps() {
        assert_eq!(render_last_step(&[]).unwrap(), NO_STEP);
        let steps = vec![
            StepRecord::new("ANALYZE_TOKEN", "check BONK", "ok"),
            StepRecord::new("AUTO_TASK", "pending confirmation", "awaiting user"),
        ];
        let last = render_last_step(&steps).unwrap();
        assert!(last.contains("AUTO_TASK"));
        assert!(!last.contains("ANALYZE_TOKEN"));
        let all = render_steps(&steps).unwrap();
        assert!(all.find("ANALYZE_TOKEN").unwrap() < all.find("AUTO_TASK").unwrap());
    }

    #[test]
    fn test_render_plan() {
        let plan = vec!["swap".to_string(), "send".to_string()];
        assert_eq!(render_plan(&plan), "1. swap\n2. send");
    }

    #[test]
    fn test_looks_pending() {
        assert!(looks_pending(&StepRecord::new(
            "AUTO_TASK",
            "pending confirmation",
            "awaiting user"
        )));
        assert!(!looks_pending(&StepRecord::new("SWAP_TOKEN", "buy", "tx 0xabc")));
    }
}
