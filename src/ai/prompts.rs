//! Prompts for classification, reply generation, follow-up conversation and
//! entry analysis, and the fallback reply.

use crate::constants::{ANALYSIS_MAX_TAGS, FOLLOW_UP_HISTORY_TURNS};
use crate::journal::{DiaryEntry, EntryMessage, MessageRole};
use crate::mood::MoodLabel;

/// Framing shared by every reply request.
///
/// Establishes the assistant as a warm, non-clinical companion for someone's
/// private diary.
pub const SYSTEM_PROMPT: &str = r#"You are a warm and empathetic companion reading someone's private diary entry.

Guidelines:
- Respond directly to what the person wrote, not with generic advice
- Acknowledge the feeling before anything else
- Be gentle and non-judgmental; never diagnose
- Keep it to 2-3 sentences
- Do not repeat the entry back or mention that you are an AI"#;

/// Builds the prompt for a supportive reply to a labeled entry.
///
/// # Arguments
///
/// * `entry_text` - The diary text as submitted
/// * `mood` - The label the classifier assigned
pub fn reply_prompt(entry_text: &str, mood: MoodLabel) -> String {
    format!(
        r#"{system}

The writer's overall mood today reads as: {mood}.

Diary entry:
---
{entry}
---

Write your reply now:"#,
        system = SYSTEM_PROMPT,
        mood = mood,
        entry = entry_text
    )
}

/// Builds the prompt asking the model for a single mood label as JSON.
pub fn classify_prompt(entry_text: &str) -> String {
    let labels = MoodLabel::ALL
        .iter()
        .map(|label| label.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Classify the dominant emotion of the diary entry below.
Choose exactly one of: {labels}.
Answer with JSON only, no markdown and no explanation, in the form {{"mood":"<label>"}}.

Diary entry:
---
{entry}
---"#,
        labels = labels,
        entry = entry_text
    )
}

/// Builds the prompt for answering the writer's follow-up on an entry.
///
/// Only the last [`FOLLOW_UP_HISTORY_TURNS`] turns of `history` are included;
/// turns without text are skipped.
pub fn follow_up_prompt(entry: &DiaryEntry, history: &[EntryMessage], message: &str) -> String {
    let skip = history.len().saturating_sub(FOLLOW_UP_HISTORY_TURNS);
    let mut transcript = String::new();
    if let Some(reply) = entry.reply_text() {
        transcript.push_str(&format!("Companion: {}\n", reply));
    }
    for turn in &history[skip..] {
        let Some(text) = turn.text() else { continue };
        let speaker = match turn.role() {
            MessageRole::User => "Writer",
            MessageRole::Assistant => "Companion",
        };
        transcript.push_str(&format!("{}: {}\n", speaker, text));
    }
    if transcript.is_empty() {
        transcript.push_str("(no earlier conversation)\n");
    }

    format!(
        r#"{system}

You are continuing a conversation about this diary entry. The writer's mood reads as: {mood}.

Diary entry:
---
{entry}
---

Conversation so far:
{transcript}
Writer: {message}

Answer the writer in 3-5 warm, empathetic sentences. Reply with your answer only:"#,
        system = SYSTEM_PROMPT,
        mood = entry.mood,
        entry = entry.text,
        transcript = transcript,
        message = message
    )
}

/// Builds the prompt asking for a summary and topic tags as JSON.
pub fn analysis_prompt(entry_text: &str) -> String {
    format!(
        r#"Summarize the diary entry below in one sentence and list up to {max_tags} short topic tags.
Answer with JSON only, no markdown and no explanation, in the form {{"summary":"<sentence>","tags":["<tag>"]}}.

Diary entry:
---
{entry}
---"#,
        max_tags = ANALYSIS_MAX_TAGS,
        entry = entry_text
    )
}

/// Renders the fallback reply for `mood`.
///
/// `{mood}` in the template is replaced by the label. Returns `None` when the
/// rendered text is blank, which the pipeline records as a failed reply.
///
/// # Examples
///
/// ```
/// use moodlog::ai::prompts::render_fallback;
/// use moodlog::mood::MoodLabel;
///
/// let reply = render_fallback("You seem {mood} today.", MoodLabel::Calm);
/// assert_eq!(reply.as_deref(), Some("You seem calm today."));
/// assert_eq!(render_fallback("   ", MoodLabel::Calm), None);
/// ```
pub fn render_fallback(template: &str, mood: MoodLabel) -> Option<String> {
    let rendered = template.replace("{mood}", mood.as_str());
    let rendered = rendered.trim();
    if rendered.is_empty() {
        None
    } else {
        Some(rendered.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_FALLBACK_TEMPLATE;
    use crate::journal::{MessageBody, Reply};
    use chrono::Utc;

    #[test]
    fn test_reply_prompt_includes_entry_and_mood() {
        let prompt = reply_prompt("I finally finished the marathon", MoodLabel::Joy);
        assert!(prompt.contains("I finally finished the marathon"));
        assert!(prompt.contains("mood today reads as: joy"));
        assert!(prompt.starts_with(SYSTEM_PROMPT));
    }

    #[test]
    fn test_classify_prompt_lists_every_label() {
        let prompt = classify_prompt("meh");
        for label in MoodLabel::ALL {
            assert!(prompt.contains(label.as_str()), "missing {}", label);
        }
        assert!(prompt.contains(r#"{"mood":"<label>"}"#));
    }

    fn entry(reply: Reply) -> DiaryEntry {
        DiaryEntry {
            id: 1,
            owner_id: "alice".into(),
            text: "Missed the train again".into(),
            created_at: Utc::now(),
            mood: MoodLabel::Anger,
            reply,
        }
    }

    fn turn(id: i64, body: MessageBody) -> EntryMessage {
        EntryMessage {
            id,
            entry_id: 1,
            body,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_follow_up_prompt_carries_the_thread() {
        let history = vec![
            turn(1, MessageBody::User("It happens every week".into())),
            turn(2, MessageBody::Assistant(Reply::Failed)),
        ];
        let prompt = follow_up_prompt(&entry(Reply::Generated("That is frustrating.".into())), &history, "What can I do?");

        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.contains("Missed the train again"));
        assert!(prompt.contains("mood reads as: anger"));
        assert!(prompt.contains("Companion: That is frustrating.\nWriter: It happens every week\n"));
        assert!(prompt.contains("Writer: What can I do?"));
        assert!(!prompt.contains("no earlier conversation"));
    }

    #[test]
    fn test_follow_up_prompt_keeps_only_recent_turns() {
        let history: Vec<_> = (0..FOLLOW_UP_HISTORY_TURNS as i64 + 5)
            .map(|i| turn(i, MessageBody::User(format!("turn-{:03}", i))))
            .collect();
        let prompt = follow_up_prompt(&entry(Reply::Failed), &history, "still there?");

        assert!(!prompt.contains("turn-004"));
        assert!(prompt.contains("turn-005"));
        assert!(prompt.contains(&format!("turn-{:03}", FOLLOW_UP_HISTORY_TURNS + 4)));
    }

    #[test]
    fn test_follow_up_prompt_without_history() {
        let prompt = follow_up_prompt(&entry(Reply::Failed), &[], "hello");
        assert!(prompt.contains("(no earlier conversation)"));
    }

    #[test]
    fn test_analysis_prompt_asks_for_json() {
        let prompt = analysis_prompt("Gardening all afternoon");
        assert!(prompt.contains("Gardening all afternoon"));
        assert!(prompt.contains(r#"{"summary":"<sentence>","tags":["<tag>"]}"#));
        assert!(prompt.contains("up to 5"));
    }

    #[test]
    fn test_default_fallback_mentions_mood() {
        let reply = render_fallback(DEFAULT_FALLBACK_TEMPLATE, MoodLabel::Sadness).unwrap();
        assert!(reply.contains("sadness"));
        assert!(!reply.contains("{mood}"));
    }

    #[test]
    fn test_template_without_placeholder_is_used_verbatim() {
        let reply = render_fallback("Thanks for writing.", MoodLabel::Anger);
        assert_eq!(reply.as_deref(), Some("Thanks for writing."));
    }
}
