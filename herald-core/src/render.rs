//! Turn reminder decisions into spoken text.
//!
//! Templates use `{{.Field}}` placeholders (the leading dot and inner spaces
//! are optional). Available fields are `Event`, `TimeLeft`, `Start`, `End` and
//! `Duration`. A template that is unset, fails to parse, or refers to a field
//! the event cannot supply is replaced by the built-in phrasing for its kind.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::error::{HeraldError, HeraldResult};
use crate::event::CalendarEvent;
use crate::reminder::Decision;
use crate::utils::{format_duration, format_minutes};

pub const DEFAULT_GREETING: &str = "Hello, I'm ready to help you.";

/// User-configurable message templates (the `[messages]` config table).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageTemplates {
    #[serde(default)]
    pub announce_start: Option<String>,
    #[serde(default)]
    pub check_start: Option<String>,
    #[serde(default)]
    pub remind: Option<String>,
    #[serde(default)]
    pub announce_end: Option<String>,
    /// Spoken once at startup. Unset uses [`DEFAULT_GREETING`]; empty disables it.
    #[serde(default)]
    pub greeting: Option<String>,
}

impl MessageTemplates {
    fn for_kind(&self, kind: MessageKind) -> Option<&str> {
        let template = match kind {
            MessageKind::AnnounceStart => &self.announce_start,
            MessageKind::CheckStart => &self.check_start,
            MessageKind::Remind => &self.remind,
            MessageKind::AnnounceEnd => &self.announce_end,
        };
        template.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn greeting(&self) -> Option<&str> {
        match self.greeting.as_deref() {
            None => Some(DEFAULT_GREETING),
            Some(text) if text.trim().is_empty() => None,
            Some(text) => Some(text),
        }
    }
}

/// The notification kinds that produce speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    AnnounceStart,
    CheckStart,
    Remind,
    AnnounceEnd,
}

impl MessageKind {
    pub fn from_decision(decision: Decision) -> Option<Self> {
        match decision {
            Decision::None => None,
            Decision::AnnounceStart => Some(MessageKind::AnnounceStart),
            Decision::CheckStarted => Some(MessageKind::CheckStart),
            Decision::Remind => Some(MessageKind::Remind),
            Decision::AnnounceEnd => Some(MessageKind::AnnounceEnd),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            MessageKind::AnnounceStart => "announce_start",
            MessageKind::CheckStart => "check_start",
            MessageKind::Remind => "remind",
            MessageKind::AnnounceEnd => "announce_end",
        }
    }
}

/// Values available to templates, computed once per notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFields {
    pub event: String,
    pub start: String,
    /// `None` for events without an end.
    pub time_left: Option<String>,
    pub end: Option<String>,
    pub duration: Option<String>,
}

impl MessageFields {
    pub fn for_event(event: &CalendarEvent, now: DateTime<Utc>) -> Self {
        let zone = event.zone();
        MessageFields {
            event: event.description.clone(),
            start: zone.clock_time(event.start),
            time_left: event.end.map(|end| format_minutes(end - now)),
            end: event.end.map(|end| zone.clock_time(end)),
            duration: event.duration().map(format_duration),
        }
    }

    fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Event => Some(&self.event),
            Field::Start => Some(&self.start),
            Field::TimeLeft => self.time_left.as_deref(),
            Field::End => self.end.as_deref(),
            Field::Duration => self.duration.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Event,
    TimeLeft,
    Start,
    End,
    Duration,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "Event" => Some(Field::Event),
            "TimeLeft" => Some(Field::TimeLeft),
            "Start" => Some(Field::Start),
            "End" => Some(Field::End),
            "Duration" => Some(Field::Duration),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Field),
}

/// A parsed message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> HeraldResult<Self> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let after_open = &rest[open + 2..];
            let close = after_open.find("}}").ok_or_else(|| {
                let offset = source.len() - rest.len() + open;
                HeraldError::TemplateInvalid(format!("unclosed '{{{{' at byte {}", offset))
            })?;

            let inner = after_open[..close].trim();
            let name = inner.strip_prefix('.').unwrap_or(inner);
            let field = Field::parse(name)
                .ok_or_else(|| HeraldError::TemplateInvalid(format!("unknown field '{}'", inner)))?;
            segments.push(Segment::Field(field));

            rest = &after_open[close + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Template { segments })
    }

    pub fn render(&self, fields: &MessageFields) -> HeraldResult<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(field) => {
                    let value = fields.get(*field).ok_or_else(|| {
                        HeraldError::TemplateInvalid(format!(
                            "{:?} is not available for this event",
                            field
                        ))
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Render the text for `kind`, falling back to built-in phrasing when the
/// configured template is unset or unusable. Never fails.
pub fn render_message(
    kind: MessageKind,
    fields: &MessageFields,
    templates: &MessageTemplates,
) -> String {
    let Some(source) = templates.for_kind(kind) else {
        return fallback_message(kind, fields);
    };

    match Template::parse(source).and_then(|t| t.render(fields)) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!(
                template = kind.name(),
                "template rendered to empty text, using built-in message"
            );
            fallback_message(kind, fields)
        }
        Err(e) => {
            warn!(
                template = kind.name(),
                error = %e,
                "failed to render template, using built-in message"
            );
            fallback_message(kind, fields)
        }
    }
}

/// Fixed phrasing used when no usable template is configured.
pub fn fallback_message(kind: MessageKind, fields: &MessageFields) -> String {
    let event = &fields.event;
    match kind {
        MessageKind::AnnounceStart => {
            format!("Hey! Time to tackle \"{}\"! You have \"{}\" scheduled for now.", event, event)
        }
        MessageKind::CheckStart => format!("Have you started \"{}\" yet?", event),
        MessageKind::Remind => match &fields.time_left {
            Some(left) => format!("You have {} left for {}", left, event),
            None => format!("Keep going with {}", event),
        },
        MessageKind::AnnounceEnd => format!("Hey! The \"{}\" is over now!", event),
    }
}
