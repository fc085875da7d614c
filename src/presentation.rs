//! Pure read-side helpers for the conversation list and chat pane.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::models::{Conversation, Message};
use crate::store::StoreError;

/// Name of the participant across from `viewer_id`.
///
/// Fails with [`StoreError::AmbiguousParticipant`] when the viewer is not in
/// the conversation. In a self-conversation the viewer's own name is returned.
pub fn other_participant_name<'a>(
    conversation: &'a Conversation,
    viewer_id: &str,
) -> Result<&'a str, StoreError> {
    let seat = conversation
        .seat_of(viewer_id)
        .ok_or_else(|| StoreError::AmbiguousParticipant {
            conversation_id: conversation.id.clone(),
            user_id: viewer_id.to_string(),
        })?;
    Ok(conversation.name_at(seat.other()))
}

/// Unread means: sent by someone else and not yet read.
pub fn is_unread(message: &Message, viewer_id: &str) -> bool {
    message.sender_id != viewer_id && !message.read
}

/// Drives the unread dot in the conversation list.
pub fn has_unread_indicator(conversation: &Conversation, viewer_id: &str) -> bool {
    conversation
        .last_message()
        .is_some_and(|m| is_unread(m, viewer_id))
}

pub fn unread_count(conversation: &Conversation, viewer_id: &str) -> usize {
    conversation
        .messages()
        .iter()
        .filter(|m| is_unread(m, viewer_id))
        .count()
}

/// Last message text for the list row, prefixed with "You: " for the
/// viewer's own messages.
pub fn last_message_preview(conversation: &Conversation, viewer_id: &str) -> Option<String> {
    conversation.last_message().map(|m| {
        if m.sender_id == viewer_id {
            format!("You: {}", m.content)
        } else {
            m.content.clone()
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Read,
}

/// Tick state for the viewer's own messages; `None` for received ones.
pub fn delivery_status(message: &Message, viewer_id: &str) -> Option<DeliveryStatus> {
    if message.sender_id != viewer_id {
        return None;
    }
    Some(if message.read {
        DeliveryStatus::Read
    } else {
        DeliveryStatus::Sent
    })
}

// ── date grouping ───────────────────────────────────────────────────────────

/// A run of messages sharing one calendar day in the viewer's time zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGroup<'a> {
    pub date: NaiveDate,
    pub messages: &'a [Message],
}

/// Lazy iterator over [`DateGroup`]s. Cloning it restarts from the same
/// position; groups borrow the underlying slice, nothing is copied.
#[derive(Debug, Clone)]
pub struct DateGroups<'a, Tz: TimeZone> {
    remaining: &'a [Message],
    tz: Tz,
}

impl<'a, Tz: TimeZone> DateGroups<'a, Tz> {
    fn local_date(&self, message: &Message) -> NaiveDate {
        message.timestamp.with_timezone(&self.tz).date_naive()
    }
}

impl<'a, Tz: TimeZone> Iterator for DateGroups<'a, Tz> {
    type Item = DateGroup<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.remaining;
        let date = self.local_date(remaining.first()?);
        let len = remaining
            .iter()
            .position(|m| self.local_date(m) != date)
            .unwrap_or(remaining.len());

        let (group, rest) = remaining.split_at(len);
        self.remaining = rest;
        Some(DateGroup {
            date,
            messages: group,
        })
    }
}

/// Partition `messages` (already chronological) into consecutive per-day groups.
pub fn group_by_date<Tz: TimeZone>(messages: &[Message], tz: Tz) -> DateGroups<'_, Tz> {
    DateGroups {
        remaining: messages,
        tz,
    }
}

// ── time formatting ─────────────────────────────────────────────────────────

fn day_relation(date: NaiveDate, today: NaiveDate) -> Option<&'static str> {
    if date == today {
        Some("Today")
    } else if today.pred_opt() == Some(date) {
        Some("Yesterday")
    } else {
        None
    }
}

/// `HH:MM` today, `Yesterday HH:MM`, otherwise `Mon DD, HH:MM`.
pub fn format_message_time<Tz: TimeZone>(ts: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let local = ts.with_timezone(tz);
    let today = now.with_timezone(tz).date_naive();
    match day_relation(local.date_naive(), today) {
        Some("Today") => local.format("%H:%M").to_string(),
        Some(_) => local.format("Yesterday %H:%M").to_string(),
        None => local.format("%b %d, %H:%M").to_string(),
    }
}

/// Header shown above each date group.
pub fn format_date_header(date: NaiveDate, today: NaiveDate) -> String {
    match day_relation(date, today) {
        Some(label) => label.to_string(),
        None => date.format("%B %d, %Y").to_string(),
    }
}

/// Distance between `ts` and `now` in words, e.g. "about 2 hours ago".
pub fn relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(ts);
    let (past, distance) = if delta >= Duration::zero() {
        (true, delta)
    } else {
        (false, -delta)
    };
    let words = distance_in_words(distance);
    if past {
        format!("{} ago", words)
    } else {
        format!("in {}", words)
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

fn distance_in_words(distance: Duration) -> String {
    const MINUTES_IN_DAY: f64 = 1440.0;
    const MINUTES_IN_MONTH: f64 = 43200.0;

    let seconds = distance.num_seconds();
    let minutes = seconds as f64 / 60.0;

    if seconds < 30 {
        "less than a minute".to_string()
    } else if minutes < 1.5 {
        "1 minute".to_string()
    } else if minutes < 44.5 {
        plural(minutes.round() as i64, "minute")
    } else if minutes < 89.5 {
        "about 1 hour".to_string()
    } else if minutes < MINUTES_IN_DAY - 0.5 {
        format!("about {}", plural((minutes / 60.0).round() as i64, "hour"))
    } else if minutes < 2519.5 {
        "1 day".to_string()
    } else if minutes < MINUTES_IN_MONTH - 0.5 {
        plural((minutes / MINUTES_IN_DAY).round() as i64, "day")
    } else if minutes < 64799.5 {
        "about 1 month".to_string()
    } else if minutes < 86399.5 {
        "about 2 months".to_string()
    } else {
        let months = (minutes / MINUTES_IN_MONTH).round() as i64;
        if months < 12 {
            return plural(months, "month");
        }
        let years = months / 12;
        match months % 12 {
            0..=2 => format!("about {}", plural(years, "year")),
            3..=8 => format!("over {}", plural(years, "year")),
            _ => format!("almost {}", plural(years + 1, "year")),
        }
    }
}
