// Zhenwo Engine — Content Classifier & Renderer
// Decides which of three content schemas an accumulated message text
// represents and extracts the display structure. Runs on EVERY update —
// the schema-deciding prefix (a JSON brace, a ::: delimiter) may only
// become visible after enough of the stream has arrived, so nothing here
// is cached between calls.
//
// Classification priority: QuickReplies → MasterSections → PlainProse.
// The first schema whose structural precondition holds wins; PlainProse
// never fails. Malformed input can only ever degrade to a weaker schema.
//
// Section extraction is explicit indexed substring search, not regex:
// the text grows on every chunk and is re-classified each time, so
// worst-case behavior has to stay linear in text length.

use crate::atoms::constants::{
    ACTION_OPTION_HEADING, COMMENTARY_MARKER, COPY_INSTRUCTION_MARKER, SECTION_ACTION,
    SECTION_ANALYSIS, SECTION_NEXT,
};
use serde::{Deserialize, Serialize};

// ── Schemas ────────────────────────────────────────────────────────────

/// One quick-reply card: `label` is the backend's reply category
/// ("direct", "playful", …), `copy_text` an optional send-ready variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReplyEntry {
    pub label: String,
    pub content: String,
    pub copy_text: Option<String>,
}

/// How the current message text should be interpreted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum RenderSchema {
    QuickReplies {
        entries: Vec<QuickReplyEntry>,
    },
    MasterSections {
        analysis: Option<String>,
        action: Option<String>,
        next_steps: Option<String>,
    },
    PlainProse {
        text: String,
    },
}

// ── Classification ─────────────────────────────────────────────────────

/// Classify the full current text of a message. Pure function; call it
/// after every accumulator mutation.
pub fn classify(content: &str) -> RenderSchema {
    let text = strip_code_fence(content);

    if let Some(schema) = try_quick_replies(text) {
        return schema;
    }
    if let Some(schema) = try_master_sections(text) {
        return schema;
    }
    RenderSchema::PlainProse {
        text: text.to_string(),
    }
}

/// Strip a single wrapping fenced-code marker. Models sometimes wrap the
/// whole payload in ```json … ``` — tolerate that, including the case
/// where the closing fence has not arrived yet mid-stream.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the opening fence line (with its optional language tag).
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        // Only the fence itself has streamed in so far.
        None => return "",
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

// ── Quick replies (JSON payload) ───────────────────────────────────────

#[derive(Deserialize)]
struct QuickRepliesPayload {
    replies: Vec<QuickReplyItem>,
}

#[derive(Deserialize)]
struct QuickReplyItem {
    #[serde(rename = "type", default)]
    label: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    copy_text: Option<String>,
}

/// The `"replies"` substring check is a cheap prefilter, not proof of the
/// schema — only a successful full parse commits. While the JSON object is
/// still mid-stream the parse fails and we fall through, but the test is
/// re-run on the next update, so the message is never permanently
/// disqualified from being QuickReplies.
fn try_quick_replies(text: &str) -> Option<RenderSchema> {
    if !text.starts_with('{') || !text.contains("\"replies\"") {
        return None;
    }
    let payload: QuickRepliesPayload = serde_json::from_str(text).ok()?;
    let entries = payload
        .replies
        .into_iter()
        .map(|item| QuickReplyEntry {
            label: item.label,
            content: item.content,
            copy_text: item.copy_text,
        })
        .collect();
    Some(RenderSchema::QuickReplies { entries })
}

// ── Master sections (`:::NAME:::` delimited) ───────────────────────────

fn try_master_sections(text: &str) -> Option<RenderSchema> {
    if !text.contains(":::") {
        return None;
    }
    let analysis = extract_section(text, SECTION_ANALYSIS);
    let action = extract_section(text, SECTION_ACTION);
    let next_steps = extract_section(text, SECTION_NEXT);

    // A bare ::: with none of the known markers is not master format.
    if analysis.is_none() && action.is_none() && next_steps.is_none() {
        return None;
    }
    Some(RenderSchema::MasterSections {
        analysis,
        action,
        next_steps,
    })
}

/// Extract the section `NAME` spanning `:::NAME:::` … `:::END_NAME:::`.
/// While the stream is still arriving the end marker may not exist yet;
/// the section is then open-ended and runs to the end of the available
/// text so the UI can render it growing live.
fn extract_section(text: &str, name: &str) -> Option<String> {
    let start_marker = format!(":::{name}:::");
    let start = text.find(&start_marker)? + start_marker.len();
    let end_marker = format!(":::END_{name}:::");
    let body = match text[start..].find(&end_marker) {
        Some(end) => &text[start..start + end],
        None => &text[start..],
    };
    Some(body.trim().to_string())
}

// ── ACTION option extraction ───────────────────────────────────────────

/// One displayable piece of an ACTION section. When the model embedded a
/// send-ready message behind the copy-instruction marker, the payload is
/// lifted into `copy_text` and the instruction itself is removed from
/// `text` — the UI renders a copy affordance instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPart {
    pub text: String,
    pub copy_text: Option<String>,
}

/// Split a committed ACTION section into its suggested options.
/// Options are delimited by the `**Option` heading at a line start; any
/// preamble before the first heading becomes its own part.
pub fn split_action_options(action: &str) -> Vec<ActionPart> {
    let mut boundaries: Vec<usize> = Vec::new();
    if action.starts_with(ACTION_OPTION_HEADING) {
        boundaries.push(0);
    }
    let needle = format!("\n{ACTION_OPTION_HEADING}");
    let mut from = 0;
    while let Some(i) = action[from..].find(&needle) {
        boundaries.push(from + i + 1);
        from += i + 1;
    }

    if boundaries.is_empty() {
        return vec![extract_copy_block(action.trim())];
    }

    let mut parts = Vec::new();
    if boundaries[0] > 0 {
        let preamble = action[..boundaries[0]].trim();
        if !preamble.is_empty() {
            parts.push(extract_copy_block(preamble));
        }
    }
    for (i, &start) in boundaries.iter().enumerate() {
        let end = boundaries.get(i + 1).copied().unwrap_or(action.len());
        parts.push(extract_copy_block(action[start..end].trim()));
    }
    parts
}

/// Lift the copy-instruction payload out of one option part. The payload
/// runs from the marker to the commentary marker or the end of the part.
fn extract_copy_block(part: &str) -> ActionPart {
    let Some(marker) = part.find(COPY_INSTRUCTION_MARKER) else {
        return ActionPart {
            text: part.to_string(),
            copy_text: None,
        };
    };

    let after = &part[marker + COPY_INSTRUCTION_MARKER.len()..];
    let (payload_raw, commentary) = match after.find(COMMENTARY_MARKER) {
        Some(c) => (&after[..c], Some(&after[c..])),
        None => (after, None),
    };
    let payload = payload_raw.trim().trim_matches('"').trim();

    let mut text = part[..marker].trim_end().to_string();
    if let Some(commentary) = commentary {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(commentary.trim());
    }

    ActionPart {
        text,
        copy_text: (!payload.is_empty()).then(|| payload.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_replies_commit_on_full_parse() {
        let schema = classify(r#"{"replies":[{"type":"A","content":"x"}]}"#);
        assert_eq!(
            schema,
            RenderSchema::QuickReplies {
                entries: vec![QuickReplyEntry {
                    label: "A".into(),
                    content: "x".into(),
                    copy_text: None,
                }]
            }
        );
    }

    #[test]
    fn quick_replies_carry_copy_text() {
        let schema = classify(
            r#"{"replies":[{"type":"direct","content":"Be honest.","copy_text":"I miss you."}]}"#,
        );
        let RenderSchema::QuickReplies { entries } = schema else {
            panic!("expected quick replies");
        };
        assert_eq!(entries[0].copy_text.as_deref(), Some("I miss you."));
    }

    #[test]
    fn partial_quick_replies_fall_through_until_complete() {
        // Mid-stream: prefilter matches but the parse can't yet.
        let partial = r#"{"replies":[{"type":"A","con"#;
        assert!(matches!(classify(partial), RenderSchema::PlainProse { .. }));

        // Same message, next update: now it commits.
        let complete = r#"{"replies":[{"type":"A","content":"x"}]}"#;
        assert!(matches!(
            classify(complete),
            RenderSchema::QuickReplies { .. }
        ));
    }

    #[test]
    fn replies_substring_alone_does_not_commit() {
        let text = r#"{"meta":"mentions \"replies\" but has no such field"}"#;
        assert!(matches!(classify(text), RenderSchema::PlainProse { .. }));
    }

    #[test]
    fn master_sections_closed() {
        let schema = classify(":::ANALYSIS:::hello:::END_ANALYSIS:::");
        assert_eq!(
            schema,
            RenderSchema::MasterSections {
                analysis: Some("hello".into()),
                action: None,
                next_steps: None,
            }
        );
    }

    #[test]
    fn master_section_open_ended_while_streaming() {
        let schema = classify(":::ANALYSIS:::partial tex");
        assert_eq!(
            schema,
            RenderSchema::MasterSections {
                analysis: Some("partial tex".into()),
                action: None,
                next_steps: None,
            }
        );
    }

    #[test]
    fn master_sections_any_order_and_subset() {
        let text = ":::NEXT:::later:::END_NEXT::: :::ACTION:::do it:::END_ACTION:::";
        let schema = classify(text);
        assert_eq!(
            schema,
            RenderSchema::MasterSections {
                analysis: None,
                action: Some("do it".into()),
                next_steps: Some("later".into()),
            }
        );
    }

    #[test]
    fn bare_delimiter_without_known_sections_falls_through() {
        let text = "C++ scope resolution looks like ::: sometimes";
        assert_eq!(
            classify(text),
            RenderSchema::PlainProse { text: text.into() }
        );
    }

    #[test]
    fn plain_prose_is_verbatim_after_trim() {
        let schema = classify("  Just talk to her.\n");
        assert_eq!(
            schema,
            RenderSchema::PlainProse {
                text: "Just talk to her.".into()
            }
        );
    }

    #[test]
    fn fence_stripping_reaches_the_json() {
        let fenced = "```json\n{\"replies\":[{\"type\":\"A\",\"content\":\"x\"}]}\n```";
        assert!(matches!(
            classify(fenced),
            RenderSchema::QuickReplies { .. }
        ));
    }

    #[test]
    fn open_fence_without_close_still_strips() {
        let fenced = "```json\n{\"replies\":[{\"type\":\"A\",\"content\":\"x\"}]}";
        assert!(matches!(
            classify(fenced),
            RenderSchema::QuickReplies { .. }
        ));
        // Only the fence line has arrived: nothing renderable yet, no panic.
        assert_eq!(classify("```js"), RenderSchema::PlainProse { text: "".into() });
    }

    #[test]
    fn action_options_split_and_lift_copy_payload() {
        let action = "Lead with empathy.\n\
            **Option 1 — De-escalate**\n\
            Copy this: \"I hear you, and I want to understand.\"\n\
            (Why: lowers the temperature without conceding.)\n\
            **Option 2 — Hold the line**\n\
            Copy this: \"I need us to talk about this properly.\"";

        let parts = split_action_options(action);
        assert_eq!(parts.len(), 3);

        assert_eq!(parts[0].text, "Lead with empathy.");
        assert_eq!(parts[0].copy_text, None);

        assert_eq!(
            parts[1].copy_text.as_deref(),
            Some("I hear you, and I want to understand.")
        );
        assert!(parts[1].text.starts_with("**Option 1 — De-escalate**"));
        assert!(parts[1].text.contains("(Why: lowers the temperature"));
        assert!(!parts[1].text.contains("Copy this:"));

        assert_eq!(
            parts[2].copy_text.as_deref(),
            Some("I need us to talk about this properly.")
        );
        assert!(!parts[2].text.contains("Copy this:"));
    }

    #[test]
    fn action_without_options_is_one_part() {
        let parts = split_action_options("Give her space for a day or two.");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].text, "Give her space for a day or two.");
        assert_eq!(parts[0].copy_text, None);
    }

    #[test]
    fn copy_payload_without_commentary_runs_to_part_end() {
        let parts = split_action_options("**Option 1**\nCopy this: \"Good night.\"");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].copy_text.as_deref(), Some("Good night."));
        assert_eq!(parts[0].text, "**Option 1**");
    }
}
