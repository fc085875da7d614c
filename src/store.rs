//! Message Store: the single state container behind the messaging view.
//!
//! One store belongs to one viewer session. Every mutation goes through a
//! method here and is atomic per call: inputs are validated and targets
//! resolved before anything is written, so a failed call leaves the state
//! exactly as it was.
//!
//! After every mutation each conversation's cached `last_message` equals the
//! last element of its `messages`, and messages are stored in chronological
//! order (timestamps never decrease along the sequence).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Contact, Conversation, Message, Participant, User};
use crate::validation::{check_message_content, ValidationErrors};

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("conversation '{0}' not found")]
    NotFound(String),

    #[error("user '{user_id}' is not a participant of conversation '{conversation_id}'")]
    AmbiguousParticipant {
        conversation_id: String,
        user_id: String,
    },
}

/// What the chat pane is showing. Sending never changes this.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MessagingView {
    #[default]
    NoActiveConversation,
    ConversationSelected(String),
}

#[derive(Debug, Clone)]
pub struct MessageStore {
    viewer: User,
    conversations: Vec<Conversation>,
    view: MessagingView,
}

impl MessageStore {
    pub fn new(viewer: User) -> Self {
        Self {
            viewer,
            conversations: Vec::new(),
            view: MessagingView::NoActiveConversation,
        }
    }

    pub fn viewer(&self) -> &User {
        &self.viewer
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn view(&self) -> &MessagingView {
        &self.view
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        match &self.view {
            MessagingView::ConversationSelected(id) => self.conversation(id),
            MessagingView::NoActiveConversation => None,
        }
    }

    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn upsert(&mut self, mut conversation: Conversation) -> usize {
        conversation.resync();
        match self
            .conversations
            .iter()
            .position(|c| c.id == conversation.id)
        {
            Some(idx) => {
                self.conversations[idx] = conversation;
                idx
            }
            None => {
                self.conversations.push(conversation);
                self.conversations.len() - 1
            }
        }
    }

    /// Replace the whole collection. Conversations absent from `list` are
    /// forgotten; if the selected one is among them the view closes.
    ///
    /// Every conversation is checked first; one bad entry rejects the whole
    /// list and the current collection stays as it was.
    pub fn set_conversations(&mut self, list: Vec<Conversation>) -> Result<(), StoreError> {
        for conversation in &list {
            check_conversation(conversation).map_err(|e| {
                warn!("Conversation list rejected at {}: {}", conversation.id, e);
                e
            })?;
        }

        self.conversations.clear();
        for conversation in list {
            self.upsert(conversation);
        }

        if let MessagingView::ConversationSelected(id) = &self.view {
            if self.conversation(id).is_none() {
                debug!("Active conversation {} dropped by replacement", id);
                self.view = MessagingView::NoActiveConversation;
            }
        }
        debug!("Conversation list replaced ({} held)", self.conversations.len());
        Ok(())
    }

    /// Append a new conversation, or replace the one with the same id in place.
    pub fn add_conversation(&mut self, conversation: Conversation) -> Result<(), StoreError> {
        check_conversation(&conversation).map_err(|e| {
            warn!("Conversation {} rejected: {}", conversation.id, e);
            e
        })?;
        let id = conversation.id.clone();
        let idx = self.upsert(conversation);
        debug!("Conversation {} stored at position {}", id, idx);
        Ok(())
    }

    /// Select a conversation (`Some`) or close the chat pane (`None`).
    pub fn set_active_conversation(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        self.view = match id {
            Some(id) => {
                self.position(id).map_err(|e| {
                    warn!("Cannot select conversation: {}", e);
                    e
                })?;
                MessagingView::ConversationSelected(id.to_string())
            }
            None => MessagingView::NoActiveConversation,
        };
        Ok(())
    }

    pub fn send_message(
        &mut self,
        conversation_id: &str,
        content: &str,
    ) -> Result<&Message, StoreError> {
        self.send_message_at(conversation_id, content, Utc::now())
    }

    /// Same as [`send_message`](Self::send_message) with an explicit clock
    /// reading. The stored timestamp is clamped to the conversation's current
    /// last message so the sequence stays chronological.
    pub fn send_message_at(
        &mut self,
        conversation_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<&Message, StoreError> {
        let content = check_message_content(content)?;
        let idx = self.position(conversation_id).map_err(|e| {
            warn!("Send rejected: {}", e);
            e
        })?;
        if self.conversations[idx].seat_of(&self.viewer.id).is_none() {
            let err = StoreError::AmbiguousParticipant {
                conversation_id: conversation_id.to_string(),
                user_id: self.viewer.id.clone(),
            };
            warn!("Send rejected: {}", err);
            return Err(err);
        }

        let message = self.compose(&self.conversations[idx], content, now);
        debug!(
            "Message {} appended to conversation {}",
            message.id, conversation_id
        );

        Ok(self.conversations[idx].push(message))
    }

    /// The "new message" flow. Reuses an existing conversation with
    /// `contact` when there is one, otherwise opens a new conversation whose
    /// first message is `content`. Either way the conversation becomes active.
    /// Returns the conversation id.
    pub fn start_conversation(
        &mut self,
        contact: &Contact,
        content: &str,
    ) -> Result<String, StoreError> {
        self.start_conversation_at(contact, content, Utc::now())
    }

    pub fn start_conversation_at(
        &mut self,
        contact: &Contact,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let content = check_message_content(content)?;

        let existing = self
            .conversations
            .iter()
            .position(|c| c.is_between(&self.viewer.id, &contact.id));

        let idx = match existing {
            Some(idx) => idx,
            None => {
                let conversation = Conversation::new(
                    Uuid::new_v4().to_string(),
                    &Participant::from(&self.viewer),
                    &Participant::from(contact),
                );
                debug!(
                    "Opening conversation {} with {}",
                    conversation.id, contact.id
                );
                self.upsert(conversation)
            }
        };

        let message = self.compose(&self.conversations[idx], content, now);
        let conversation = &mut self.conversations[idx];
        conversation.push(message);
        let id = conversation.id.clone();
        self.view = MessagingView::ConversationSelected(id.clone());
        Ok(id)
    }

    /// Mark every message the viewer received in this conversation as read.
    /// Returns how many flipped.
    pub fn mark_conversation_read(&mut self, conversation_id: &str) -> Result<usize, StoreError> {
        let idx = self.position(conversation_id)?;
        let viewer_id = self.viewer.id.clone();
        let conversation = &mut self.conversations[idx];

        let mut flipped = 0;
        for message in conversation.messages_mut() {
            if message.sender_id != viewer_id && !message.read {
                message.read = true;
                flipped += 1;
            }
        }
        if flipped > 0 {
            conversation.resync();
            debug!(
                "Marked {} message(s) read in conversation {}",
                flipped, conversation_id
            );
        }
        Ok(flipped)
    }

    fn compose(&self, conversation: &Conversation, content: &str, now: DateTime<Utc>) -> Message {
        let timestamp = match conversation.last_message() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            sender_id: self.viewer.id.clone(),
            sender_name: self.viewer.name.clone(),
            content: content.to_string(),
            timestamp,
            read: false,
        }
    }
}

/// Incoming conversations must already be well formed: each message belongs
/// to the conversation, ids are unique and timestamps never decrease.
fn check_conversation(conversation: &Conversation) -> Result<(), StoreError> {
    let mut errors = ValidationErrors::default();
    let mut seen = HashSet::new();
    let mut previous: Option<&Message> = None;

    for (i, message) in conversation.messages().iter().enumerate() {
        if message.conversation_id != conversation.id {
            errors.push(
                &format!("messages[{i}].conversationId"),
                format!("Message belongs to conversation '{}'", message.conversation_id),
                message.conversation_id.as_str(),
            );
        }
        if !seen.insert(message.id.as_str()) {
            errors.push(
                &format!("messages[{i}].id"),
                "Duplicate message id",
                message.id.as_str(),
            );
        }
        if previous.is_some_and(|p| message.timestamp < p.timestamp) {
            errors.push(
                &format!("messages[{i}].timestamp"),
                "Messages must be in chronological order",
                message.timestamp.to_rfc3339(),
            );
        }
        previous = Some(message);
    }

    errors.finish(()).map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::{Duration, TimeZone};

    fn parent() -> User {
        User {
            id: "u1".into(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            role: Role::Parent,
        }
    }

    fn teacher_contact() -> Contact {
        Contact {
            id: "t1".into(),
            name: "Ms. Johnson".into(),
            role: Role::Teacher,
            subject: Some("Mathematics".into()),
            children: vec![],
            department: None,
        }
    }

    fn empty_conversation(id: &str) -> Conversation {
        Conversation::new(
            id,
            &Participant::from(&parent()),
            &Participant::from(&teacher_contact()),
        )
    }

    fn incoming(conversation_id: &str, id: &str, at: DateTime<Utc>) -> Message {
        Message {
            id: id.into(),
            conversation_id: conversation_id.into(),
            sender_id: "t1".into(),
            sender_name: "Ms. Johnson".into(),
            content: "Emma did excellent work today!".into(),
            timestamp: at,
            read: false,
        }
    }

    fn seeded() -> MessageStore {
        let mut store = MessageStore::new(parent());
        store.set_conversations(vec![empty_conversation("c1")]).unwrap();
        store
    }

    fn assert_tail_consistent(store: &MessageStore) {
        for conv in store.conversations() {
            assert_eq!(conv.last_message(), conv.messages().last());
        }
    }

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn send_appends_and_updates_last_message() {
        let mut store = seeded();
        let sent = store.send_message("c1", "Hello").unwrap().clone();

        let c1 = store.conversation("c1").unwrap();
        assert_eq!(c1.messages().len(), 1);
        let last = c1.last_message().unwrap();
        assert_eq!(last, &sent);
        assert_eq!(last.content, "Hello");
        assert!(!last.read);
        assert_eq!(last.sender_id, "u1");
        assert_eq!(last.sender_name, "Alice");
        assert_eq!(last.conversation_id, "c1");
    }

    #[test]
    fn send_to_missing_conversation_is_not_found_and_changes_nothing() {
        let mut store = seeded();
        store.send_message("c1", "Hello").unwrap();
        let before = store.conversation("c1").unwrap().clone();

        let err = store.send_message("missing", "x").unwrap_err();
        assert_eq!(err, StoreError::NotFound("missing".into()));
        assert_eq!(store.conversation("c1").unwrap(), &before);
    }

    #[test]
    fn blank_content_is_a_validation_error() {
        let mut store = seeded();
        for content in ["", "   ", "\n\t"] {
            let err = store.send_message("c1", content).unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)), "{:?}", content);
        }
        assert!(store.conversation("c1").unwrap().messages().is_empty());
        assert!(store.conversation("c1").unwrap().last_message().is_none());
    }

    #[test]
    fn validation_is_checked_before_lookup() {
        let mut store = seeded();
        let err = store.send_message("missing", "  ").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn content_is_stored_trimmed() {
        let mut store = seeded();
        let sent = store.send_message("c1", "  see you at 3pm \n").unwrap();
        assert_eq!(sent.content, "see you at 3pm");
    }

    #[test]
    fn overlong_content_is_rejected() {
        let mut store = seeded();
        let err = store.send_message("c1", &"a".repeat(1001)).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn message_ids_are_unique_and_order_is_chronological() {
        let mut store = seeded();
        for i in 0..20 {
            store.send_message("c1", &format!("msg {}", i)).unwrap();
            assert_tail_consistent(&store);
        }
        let messages = store.conversation("c1").unwrap().messages();
        let mut ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
        assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn clock_going_backwards_is_clamped() {
        let mut store = seeded();
        store.send_message_at("c1", "first", t(10, 0)).unwrap();
        let second = store.send_message_at("c1", "second", t(9, 0)).unwrap();
        assert_eq!(second.timestamp, t(10, 0));
    }

    #[test]
    fn set_conversations_replaces_and_resyncs_tail() {
        let mut store = seeded();
        store.send_message("c1", "Hello").unwrap();

        let c2 = empty_conversation("c2").with_messages(vec![incoming("c2", "m1", t(8, 0))]);
        store.set_conversations(vec![c2]).unwrap();

        assert!(store.conversation("c1").is_none());
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(
            store.conversation("c2").unwrap().last_message().unwrap().id,
            "m1"
        );
    }

    #[test]
    fn stale_last_message_from_input_is_corrected() {
        let mut conv = empty_conversation("c9");
        conv.push(incoming("c9", "m1", t(8, 0)));
        // Simulate data that arrived with a diverged cache.
        let mut raw = serde_json::to_value(&conv).unwrap();
        raw["lastMessage"]["content"] = "stale".into();
        let conv: Conversation = serde_json::from_value(raw).unwrap();
        assert_eq!(conv.last_message().unwrap().content, "stale");

        let mut store = MessageStore::new(parent());
        store.add_conversation(conv).unwrap();
        let stored = store.conversation("c9").unwrap();
        assert_eq!(stored.last_message(), stored.messages().last());
    }

    #[test]
    fn replacing_collection_closes_dropped_active_conversation() {
        let mut store = seeded();
        store.set_active_conversation(Some("c1")).unwrap();
        store.set_conversations(vec![empty_conversation("c2")]).unwrap();
        assert_eq!(store.view(), &MessagingView::NoActiveConversation);
    }

    #[test]
    fn add_conversation_appends_instead_of_replacing() {
        let mut store = seeded();
        store.add_conversation(empty_conversation("c2")).unwrap();
        store.add_conversation(empty_conversation("c3")).unwrap();
        let ids: Vec<_> = store.conversations().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2", "c3"]);
    }

    #[test]
    fn add_conversation_upserts_in_place() {
        let mut store = seeded();
        store.add_conversation(empty_conversation("c2")).unwrap();
        let updated = empty_conversation("c1").with_messages(vec![incoming("c1", "m1", t(8, 0))]);
        store.add_conversation(updated).unwrap();

        let ids: Vec<_> = store.conversations().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2"]);
        assert_eq!(store.conversation("c1").unwrap().messages().len(), 1);
    }

    #[test]
    fn view_state_machine() {
        let mut store = seeded();
        assert_eq!(store.view(), &MessagingView::NoActiveConversation);
        assert!(store.active_conversation().is_none());

        store.set_active_conversation(Some("c1")).unwrap();
        assert_eq!(
            store.view(),
            &MessagingView::ConversationSelected("c1".into())
        );
        store.send_message("c1", "still selected").unwrap();
        assert_eq!(store.active_conversation().unwrap().id, "c1");

        store.set_active_conversation(None).unwrap();
        assert_eq!(store.view(), &MessagingView::NoActiveConversation);
    }

    #[test]
    fn selecting_unknown_conversation_fails_and_keeps_view() {
        let mut store = seeded();
        store.set_active_conversation(Some("c1")).unwrap();
        let err = store.set_active_conversation(Some("nope")).unwrap_err();
        assert_eq!(err, StoreError::NotFound("nope".into()));
        assert_eq!(store.active_conversation().unwrap().id, "c1");
    }

    #[test]
    fn starting_two_conversations_keeps_both() {
        let mut store = MessageStore::new(parent());
        let first = store.start_conversation(&teacher_contact(), "Hi").unwrap();
        let principal = Contact {
            id: "admin1".into(),
            name: "Principal Wilson".into(),
            role: Role::Admin,
            subject: None,
            children: vec![],
            department: Some("Administration".into()),
        };
        let second = store.start_conversation(&principal, "Hello").unwrap();

        assert_ne!(first, second);
        assert_eq!(store.conversations().len(), 2);
        assert_eq!(store.active_conversation().unwrap().id, second);

        let opened = store.conversation(&second).unwrap();
        assert_eq!(opened.participants, ["u1".to_string(), "admin1".to_string()]);
        assert_eq!(
            opened.participant_names,
            ["Alice".to_string(), "Principal Wilson".to_string()]
        );
        assert_eq!(opened.last_message().unwrap().content, "Hello");
        assert_tail_consistent(&store);
    }

    #[test]
    fn starting_with_existing_contact_reuses_conversation() {
        let mut store = seeded();
        let id = store.start_conversation(&teacher_contact(), "Again").unwrap();
        assert_eq!(id, "c1");
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.conversation("c1").unwrap().messages().len(), 1);
        assert_eq!(store.active_conversation().unwrap().id, "c1");
    }

    #[test]
    fn starting_with_blank_message_creates_nothing() {
        let mut store = MessageStore::new(parent());
        let err = store.start_conversation(&teacher_contact(), " ").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.conversations().is_empty());
        assert_eq!(store.view(), &MessagingView::NoActiveConversation);
    }

    #[test]
    fn mark_read_flips_only_received_messages() {
        let mut store = MessageStore::new(parent());
        store.set_conversations(vec![empty_conversation("c1").with_messages(vec![
            incoming("c1", "m1", t(8, 0)),
            incoming("c1", "m2", t(8, 5)),
        ])])
        .unwrap();
        store.send_message_at("c1", "Thanks!", t(9, 0)).unwrap();

        assert_eq!(store.mark_conversation_read("c1").unwrap(), 2);
        let c1 = store.conversation("c1").unwrap();
        assert!(c1.messages()[..2].iter().all(|m| m.read));
        assert!(!c1.messages()[2].read, "own message keeps its flag");
        assert_eq!(store.mark_conversation_read("c1").unwrap(), 0);
        assert_tail_consistent(&store);
    }

    #[test]
    fn mark_read_resyncs_last_message() {
        let mut store = MessageStore::new(parent());
        store.set_conversations(vec![
            empty_conversation("c1").with_messages(vec![incoming("c1", "m1", t(8, 0))])
        ])
        .unwrap();
        store.mark_conversation_read("c1").unwrap();
        assert!(store.conversation("c1").unwrap().last_message().unwrap().read);
    }

    #[test]
    fn mark_read_on_missing_conversation_is_not_found() {
        let mut store = seeded();
        assert!(matches!(
            store.mark_conversation_read("zzz"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn tail_invariant_holds_across_mixed_operations() {
        let mut store = seeded();
        let now = t(12, 0);
        store.add_conversation(empty_conversation("c2")).unwrap();
        for i in 0..5 {
            let target = if i % 2 == 0 { "c1" } else { "c2" };
            store
                .send_message_at(target, "ping", now + Duration::minutes(i))
                .unwrap();
            let _ = store.send_message(target, "");
            let _ = store.send_message("ghost", "boo");
            assert_tail_consistent(&store);
        }
        store.mark_conversation_read("c1").unwrap();
        assert_tail_consistent(&store);
    }

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap()
    }

    fn validation_paths(err: StoreError) -> Vec<String> {
        match err {
            StoreError::Validation(errors) => errors.details.into_iter().map(|d| d.path).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn unordered_conversation_with_repeated_id_is_rejected() {
        let mut store = MessageStore::new(parent());
        let conv = empty_conversation("c1").with_messages(vec![
            incoming("c1", "m1", day(2, 9)),
            incoming("c1", "m1", day(1, 9)),
            incoming("c1", "m3", day(2, 10)),
        ]);

        let paths = validation_paths(store.add_conversation(conv).unwrap_err());
        assert_eq!(paths, ["messages[1].id", "messages[1].timestamp"]);
        assert!(store.conversations().is_empty());
    }

    #[test]
    fn foreign_message_is_rejected() {
        let mut store = MessageStore::new(parent());
        let conv = empty_conversation("c1").with_messages(vec![incoming("c2", "m1", t(8, 0))]);
        let paths = validation_paths(store.add_conversation(conv).unwrap_err());
        assert_eq!(paths, ["messages[0].conversationId"]);
    }

    #[test]
    fn bad_list_leaves_previous_collection_in_place() {
        let mut store = seeded();
        store.set_active_conversation(Some("c1")).unwrap();
        let before = store.conversations().to_vec();

        let good = empty_conversation("c2").with_messages(vec![incoming("c2", "m1", t(8, 0))]);
        let bad = empty_conversation("c3").with_messages(vec![
            incoming("c3", "m1", t(9, 0)),
            incoming("c3", "m2", t(8, 0)),
        ]);
        assert!(matches!(
            store.set_conversations(vec![good, bad]),
            Err(StoreError::Validation(_))
        ));

        assert_eq!(store.conversations(), before.as_slice());
        assert_eq!(store.active_conversation().unwrap().id, "c1");
    }

    #[test]
    fn accepted_conversations_group_each_day_once() {
        let mut store = MessageStore::new(parent());
        store
            .add_conversation(empty_conversation("c1").with_messages(vec![
                incoming("c1", "m1", day(1, 9)),
                incoming("c1", "m2", day(2, 9)),
                incoming("c1", "m3", day(2, 9)),
                incoming("c1", "m4", day(2, 10)),
            ]))
            .unwrap();

        let conv = store.conversation("c1").unwrap();
        let dates: Vec<_> = crate::presentation::group_by_date(conv.messages(), Utc)
            .map(|g| g.date)
            .collect();
        assert_eq!(dates, [day(1, 0).date_naive(), day(2, 0).date_naive()]);
    }

    #[test]
    fn viewer_outside_conversation_cannot_send() {
        let mut store = MessageStore::new(parent());
        let strangers = Conversation::new(
            "c1",
            &Participant {
                id: "p9".into(),
                name: "Someone".into(),
            },
            &Participant::from(&teacher_contact()),
        );
        store.add_conversation(strangers).unwrap();

        let err = store.send_message("c1", "Hello").unwrap_err();
        assert_eq!(
            err,
            StoreError::AmbiguousParticipant {
                conversation_id: "c1".into(),
                user_id: "u1".into(),
            }
        );
        assert!(store.conversation("c1").unwrap().messages().is_empty());
    }
}
