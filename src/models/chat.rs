use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged turn sent upstream. Built per request, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A completed question/answer exchange.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            answer: answer.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub model: String,
    pub chats: Vec<Chat>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub pinned: bool,
}

impl Conversation {
    /// Starts a conversation from its first successful exchange.
    pub fn start(model: impl Into<String>, first: Chat) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            model: model.into(),
            chats: vec![first],
            created_at: now,
            updated_at: now,
            pinned: false,
        }
    }

    pub fn append(&mut self, chat: Chat) {
        self.chats.push(chat);
        self.updated_at = Utc::now();
    }

    pub fn toggle_pin(&mut self) -> bool {
        self.pinned = !self.pinned;
        self.updated_at = Utc::now();
        self.pinned
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn last_answer(&self) -> Option<&str> {
        self.chats.last().map(|c| c.answer.as_str())
    }
}
