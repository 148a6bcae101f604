//! Plain-text rendering for the terminal.

use std::fmt::Write;

use crate::agent::{ ModelList, ModelSource };
use crate::llm::format_model_name;
use crate::models::chat::Conversation;

const SUBTITLE_LIMIT: usize = 100;
const ID_PREFIX_LEN: usize = 8;

pub fn conversation_title(conversation: &Conversation) -> &str {
    conversation.chats
        .first()
        .map(|c| c.question.as_str())
        .unwrap_or("Empty conversation")
}

/// Last answer, cut to 100 characters.
pub fn conversation_subtitle(conversation: &Conversation) -> String {
    let Some(answer) = conversation.last_answer() else {
        return String::new();
    };
    if answer.chars().count() > SUBTITLE_LIMIT {
        let cut: String = answer.chars().take(SUBTITLE_LIMIT).collect();
        format!("{}...", cut)
    } else {
        answer.to_string()
    }
}

pub fn exchanges_label(count: usize) -> String {
    if count == 1 { "1 exchange".to_string() } else { format!("{} exchanges", count) }
}

/// Pinned first, each group most recently updated first.
pub fn sort_sections(conversations: &[Conversation]) -> (Vec<&Conversation>, Vec<&Conversation>) {
    let (mut pinned, mut recent): (Vec<&Conversation>, Vec<&Conversation>) = conversations
        .iter()
        .partition(|c| c.pinned);
    pinned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    (pinned, recent)
}

fn short_id(conversation: &Conversation) -> String {
    conversation.id.to_string().chars().take(ID_PREFIX_LEN).collect()
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn write_row(out: &mut String, conversation: &Conversation) {
    let _ = writeln!(
        out,
        "  {}  {}\n            {} | {} | {}",
        short_id(conversation),
        single_line(conversation_title(conversation)),
        format_model_name(&conversation.model),
        exchanges_label(conversation.chats.len()),
        conversation.updated_at.format("%Y-%m-%d %H:%M")
    );
    let subtitle = conversation_subtitle(conversation);
    if !subtitle.is_empty() {
        let _ = writeln!(out, "            {}", single_line(&subtitle));
    }
}

pub fn render_conversation_list(conversations: &[Conversation]) -> String {
    if conversations.is_empty() {
        return "No Conversations Yet\nStart a new conversation with `ask`.\n".to_string();
    }
    let (pinned, recent) = sort_sections(conversations);
    let mut out = String::new();
    if !pinned.is_empty() {
        let _ = writeln!(out, "Pinned ({})", pinned.len());
        for conversation in &pinned {
            write_row(&mut out, conversation);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "Recent ({})", recent.len());
    for conversation in &recent {
        write_row(&mut out, conversation);
    }
    out
}

pub fn render_transcript(conversation: &Conversation) -> String {
    let mut out = format!(
        "# {} ({}){}\n",
        format_model_name(&conversation.model),
        exchanges_label(conversation.chats.len()),
        if conversation.pinned { " [pinned]" } else { "" }
    );
    for (idx, chat) in conversation.chats.iter().enumerate() {
        let _ = write!(out, "\n## Q{}: {}\n\n{}\n", idx + 1, chat.question, chat.answer);
    }
    out
}

pub fn render_plain(conversation: &Conversation) -> String {
    conversation.chats
        .iter()
        .map(|chat| format!("Q: {}\n\nA: {}", chat.question, chat.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_models(list: &ModelList, selected: Option<&str>) -> String {
    let mut out = String::new();
    match list.source {
        ModelSource::Live => {}
        ModelSource::Cache(Some(at)) => {
            let _ = writeln!(out, "(cached list from {})", at.format("%Y-%m-%d %H:%M"));
        }
        ModelSource::Cache(None) => {
            let _ = writeln!(out, "(cached list)");
        }
        ModelSource::Fallback => {
            let _ = writeln!(out, "(built-in list)");
        }
    }
    for option in &list.options {
        let marker = if selected == Some(option.value.as_str()) { "*" } else { " " };
        let _ = writeln!(out, "{} {:<40} {}", marker, option.title, option.value);
    }
    out
}
