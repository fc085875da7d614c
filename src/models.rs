use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Teacher,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Parent, Role::Teacher, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// The authenticated person acting in a session. Fixed for the session's lifetime.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Only ever flips false -> true.
    pub read: bool,
}

/// Position of a participant within a two-party conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    pub fn other(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

/// Pairwise thread. `messages` and `last_message` are private so the cached
/// tail can only move together with the sequence it mirrors.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub participants: [String; 2],
    pub participant_names: [String; 2],
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    last_message: Option<Message>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, first: &Participant, second: &Participant) -> Self {
        Self {
            id: id.into(),
            participants: [first.id.clone(), second.id.clone()],
            participant_names: [first.name.clone(), second.name.clone()],
            messages: Vec::new(),
            last_message: None,
        }
    }

    /// Builder used for seed data; messages are taken in the given order.
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self.resync();
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.last_message.as_ref()
    }

    /// Explicit id -> seat lookup. For a self-conversation the id maps to
    /// the first seat.
    pub fn roster(&self) -> BTreeMap<&str, Seat> {
        let mut roster = BTreeMap::new();
        for seat in [Seat::First, Seat::Second] {
            roster
                .entry(self.participants[seat.index()].as_str())
                .or_insert(seat);
        }
        roster
    }

    pub fn seat_of(&self, user_id: &str) -> Option<Seat> {
        self.roster().get(user_id).copied()
    }

    pub fn name_at(&self, seat: Seat) -> &str {
        &self.participant_names[seat.index()]
    }

    /// True when the conversation is exactly between `a` and `b`, in either order.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        let [x, y] = &self.participants;
        (x == a && y == b) || (x == b && y == a)
    }

    pub(crate) fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message.clone());
        self.last_message.insert(message)
    }

    pub(crate) fn messages_mut(&mut self) -> &mut [Message] {
        &mut self.messages
    }

    /// Re-derive `last_message` from the sequence. Called after any bulk
    /// change and on every conversation entering the store.
    pub(crate) fn resync(&mut self) {
        self.last_message = self.messages.last().cloned();
    }
}

/// Id/name pair used when opening a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl From<&User> for Participant {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
        }
    }
}

impl From<&Contact> for Participant {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id.clone(),
            name: contact.name.clone(),
        }
    }
}

/// Someone the viewer may start a conversation with.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl Contact {
    /// Case-insensitive match on name, subject taught, or a child's name.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term)
            || self
                .subject
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(&term))
            || self
                .children
                .iter()
                .any(|c| c.to_lowercase().contains(&term))
    }

    /// Secondary line shown under the name.
    pub fn role_info(&self) -> String {
        match self.role {
            Role::Teacher => self.subject.clone().unwrap_or_default(),
            Role::Parent => self.children.join(", "),
            Role::Admin => self.department.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GradeCategory {
    Quiz,
    Homework,
    Project,
    Assignment,
    Test,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub subject: String,
    pub assignment_name: String,
    pub category: GradeCategory,
    pub score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub letter_grade: String,
    pub date: DateTime<Utc>,
    pub teacher_name: String,
    #[serde(default)]
    pub comments: Option<String>,
}
