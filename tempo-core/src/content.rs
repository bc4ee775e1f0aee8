//! Temporal content records and the transition events derived from them.

use crate::{Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Collection holding page records.
pub const PAGES_COLLECTION: &str = "pages";

/// Collection holding content elements placed on pages.
pub const CONTENT_COLLECTION: &str = "content-elements";

// ============================================================================
// ENUMS
// ============================================================================

/// The two temporal fields every monitored collection exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalField {
    StartTime,
    EndTime,
}

impl TemporalField {
    pub const ALL: [TemporalField; 2] = [TemporalField::StartTime, TemporalField::EndTime];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemporalField::StartTime => "start_time",
            TemporalField::EndTime => "end_time",
        }
    }
}

impl fmt::Display for TemporalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse record kind used by strategies to pick per-type behaviour.
///
/// Records in [`PAGES_COLLECTION`] are pages; every other monitored
/// collection holds content placed on a page via `parent_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Page,
    Content,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Page => "page",
            ContentType::Content => "content",
        }
    }

    /// Derive the content type from a collection name.
    pub fn of_collection(collection: &str) -> Self {
        if collection == PAGES_COLLECTION {
            ContentType::Page
        } else {
            ContentType::Content
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" | "pages" => Ok(ContentType::Page),
            "content" | "content-elements" => Ok(ContentType::Content),
            other => Err(ValidationError::InvalidValue {
                field: "content_type".to_string(),
                reason: format!("unknown content type '{}'", other),
            }),
        }
    }
}

/// Which boundary of a visibility window was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    Start,
    End,
    Unknown,
}

impl TransitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionType::Start => "start",
            TransitionType::End => "end",
            TransitionType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TemporalField> for TransitionType {
    fn from(field: TemporalField) -> Self {
        match field {
            TemporalField::StartTime => TransitionType::Start,
            TemporalField::EndTime => TransitionType::End,
        }
    }
}

impl FromStr for TransitionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(TransitionType::Start),
            "end" => Ok(TransitionType::End),
            "unknown" => Ok(TransitionType::Unknown),
            other => Err(ValidationError::InvalidTransitionType {
                value: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// TEMPORAL CONTENT
// ============================================================================

/// One time-scoped record, as read from a content store.
///
/// Values are never mutated after construction; harmonized timestamps are
/// written back to the store and re-read as a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalContent {
    /// Record id, unique within `collection_name`.
    pub id: i64,
    pub collection_name: String,
    pub title: String,
    /// Containing record (the page, for content elements).
    pub parent_id: i64,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    /// `-1` means "all languages".
    pub language_id: i64,
    /// `0` is the live workspace.
    pub workspace_id: i64,
    pub hidden: bool,
    pub deleted: bool,
}

impl TemporalContent {
    /// Create a visible, live, default-language record with no temporal fields.
    pub fn new(id: i64, collection_name: impl Into<String>, parent_id: i64) -> Self {
        Self {
            id,
            collection_name: collection_name.into(),
            title: String::new(),
            parent_id,
            start_time: None,
            end_time: None,
            language_id: 0,
            workspace_id: 0,
            hidden: false,
            deleted: false,
        }
    }

    /// Shorthand for a record in [`PAGES_COLLECTION`].
    pub fn page(id: i64, parent_id: i64) -> Self {
        Self::new(id, PAGES_COLLECTION, parent_id)
    }

    /// Shorthand for a record in [`CONTENT_COLLECTION`] placed on `page_id`.
    pub fn content_element(id: i64, page_id: i64) -> Self {
        Self::new(id, CONTENT_COLLECTION, page_id)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_start_time(mut self, start_time: Option<Timestamp>) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_end_time(mut self, end_time: Option<Timestamp>) -> Self {
        self.end_time = end_time;
        self
    }

    pub fn with_window(self, start_time: Option<Timestamp>, end_time: Option<Timestamp>) -> Self {
        self.with_start_time(start_time).with_end_time(end_time)
    }

    pub fn with_language(mut self, language_id: i64) -> Self {
        self.language_id = language_id;
        self
    }

    pub fn with_workspace(mut self, workspace_id: i64) -> Self {
        self.workspace_id = workspace_id;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    pub fn content_type(&self) -> ContentType {
        ContentType::of_collection(&self.collection_name)
    }

    /// The page this record is displayed on: its own id for pages, the
    /// containing record otherwise.
    pub fn page_id(&self) -> i64 {
        match self.content_type() {
            ContentType::Page => self.id,
            ContentType::Content => self.parent_id,
        }
    }

    pub fn temporal_value(&self, field: TemporalField) -> Option<Timestamp> {
        match field {
            TemporalField::StartTime => self.start_time,
            TemporalField::EndTime => self.end_time,
        }
    }

    pub fn has_temporal_fields(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }

    /// Whether the record is rendered at `now`. The window is `[start, end)`.
    pub fn is_visible(&self, now: Timestamp) -> bool {
        !self.hidden
            && !self.deleted
            && self.start_time.map_or(true, |start| start <= now)
            && self.end_time.map_or(true, |end| end > now)
    }

    /// The earliest of start/end that lies strictly after `now`.
    pub fn next_transition(&self, now: Timestamp) -> Option<Timestamp> {
        [self.start_time, self.end_time]
            .into_iter()
            .flatten()
            .filter(|ts| *ts > now)
            .min()
    }

    /// Which boundary `timestamp` corresponds to. Start wins when both match.
    pub fn transition_type(&self, timestamp: Timestamp) -> Option<TransitionType> {
        if self.start_time == Some(timestamp) {
            Some(TransitionType::Start)
        } else if self.end_time == Some(timestamp) {
            Some(TransitionType::End)
        } else {
            None
        }
    }
}

// ============================================================================
// TRANSITION EVENT
// ============================================================================

/// A single start or end boundary crossing of a [`TemporalContent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    content: TemporalContent,
    timestamp: Timestamp,
    transition_type: TransitionType,
    workspace_id: i64,
    language_id: i64,
}

impl TransitionEvent {
    pub fn new(
        content: TemporalContent,
        timestamp: Timestamp,
        transition_type: TransitionType,
        workspace_id: i64,
    ) -> Self {
        Self {
            content,
            timestamp,
            transition_type,
            workspace_id,
            language_id: 0,
        }
    }

    /// Construct from a raw transition type string.
    ///
    /// Anything outside `start`, `end`, `unknown` is rejected.
    pub fn parse(
        content: TemporalContent,
        timestamp: Timestamp,
        transition_type: &str,
        workspace_id: i64,
        language_id: i64,
    ) -> Result<Self, ValidationError> {
        let transition_type = transition_type.parse::<TransitionType>()?;
        Ok(Self::new(content, timestamp, transition_type, workspace_id).with_language(language_id))
    }

    /// Build the event for `content` crossing `timestamp`, taking the type
    /// and variant dimensions from the record itself.
    pub fn for_content(content: TemporalContent, timestamp: Timestamp) -> Self {
        let transition_type = content
            .transition_type(timestamp)
            .unwrap_or(TransitionType::Unknown);
        let workspace_id = content.workspace_id;
        let language_id = content.language_id;
        Self::new(content, timestamp, transition_type, workspace_id).with_language(language_id)
    }

    /// Build the event for `content` crossing the boundary held in `field`.
    ///
    /// Unlike [`TransitionEvent::for_content`] the type comes from the field,
    /// so a zero-length window yields one start and one end event.
    pub fn for_field(content: TemporalContent, field: TemporalField) -> Option<Self> {
        let timestamp = content.temporal_value(field)?;
        let workspace_id = content.workspace_id;
        let language_id = content.language_id;
        Some(
            Self::new(content, timestamp, field.into(), workspace_id).with_language(language_id),
        )
    }

    pub fn with_language(mut self, language_id: i64) -> Self {
        self.language_id = language_id;
        self
    }

    pub fn content(&self) -> &TemporalContent {
        &self.content
    }

    pub fn into_content(self) -> TemporalContent {
        self.content
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn transition_type(&self) -> TransitionType {
        self.transition_type
    }

    pub fn workspace_id(&self) -> i64 {
        self.workspace_id
    }

    pub fn language_id(&self) -> i64 {
        self.language_id
    }

    pub fn content_type(&self) -> ContentType {
        self.content.content_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Timestamp = 1_700_000_000;

    #[test]
    fn test_visibility_window_is_half_open() {
        let content = TemporalContent::page(1, 0).with_window(Some(T), Some(T + 100));

        assert!(!content.is_visible(T - 1));
        assert!(content.is_visible(T));
        assert!(content.is_visible(T + 99));
        assert!(!content.is_visible(T + 100));
    }

    #[test]
    fn test_hidden_or_deleted_is_never_visible() {
        let hidden = TemporalContent::page(1, 0).with_hidden(true);
        let deleted = TemporalContent::page(2, 0).with_deleted(true);

        assert!(!hidden.is_visible(T));
        assert!(!deleted.is_visible(T));
        assert!(TemporalContent::page(3, 0).is_visible(T));
    }

    #[test]
    fn test_next_transition_picks_earliest_future_boundary() {
        let content =
            TemporalContent::content_element(5, 1).with_window(Some(T + 10), Some(T + 50));

        assert_eq!(content.next_transition(T), Some(T + 10));
        assert_eq!(content.next_transition(T + 10), Some(T + 50));
        assert_eq!(content.next_transition(T + 50), None);
    }

    #[test]
    fn test_next_transition_without_fields() {
        let content = TemporalContent::page(1, 0);
        assert!(!content.has_temporal_fields());
        assert_eq!(content.next_transition(T), None);
    }

    #[test]
    fn test_transition_type_lookup() {
        let content = TemporalContent::page(1, 0).with_window(Some(T), Some(T + 60));

        assert_eq!(content.transition_type(T), Some(TransitionType::Start));
        assert_eq!(content.transition_type(T + 60), Some(TransitionType::End));
        assert_eq!(content.transition_type(T + 1), None);
    }

    #[test]
    fn test_transition_type_start_wins_on_equal_fields() {
        let content = TemporalContent::page(1, 0).with_window(Some(T), Some(T));
        assert_eq!(content.transition_type(T), Some(TransitionType::Start));
    }

    #[test]
    fn test_page_id_for_pages_and_elements() {
        assert_eq!(TemporalContent::page(7, 3).page_id(), 7);
        assert_eq!(TemporalContent::content_element(12, 7).page_id(), 7);
        assert_eq!(TemporalContent::new(9, "news", 4).page_id(), 4);
    }

    #[test]
    fn test_content_type_of_collection() {
        assert_eq!(ContentType::of_collection(PAGES_COLLECTION), ContentType::Page);
        assert_eq!(ContentType::of_collection(CONTENT_COLLECTION), ContentType::Content);
        assert_eq!(ContentType::of_collection("news"), ContentType::Content);
    }

    #[test]
    fn test_event_parse_accepts_known_types() {
        for raw in ["start", "end", "unknown"] {
            let event = TransitionEvent::parse(TemporalContent::page(1, 0), T, raw, 0, 0)
                .expect("known transition type");
            assert_eq!(event.transition_type().as_str(), raw);
        }
    }

    #[test]
    fn test_event_parse_rejects_unknown_type() {
        let result = TransitionEvent::parse(TemporalContent::page(1, 0), T, "middle", 0, 0);
        assert_eq!(
            result,
            Err(ValidationError::InvalidTransitionType {
                value: "middle".to_string()
            })
        );
    }

    #[test]
    fn test_event_language_defaults_to_zero() {
        let event = TransitionEvent::new(TemporalContent::page(1, 0), T, TransitionType::Start, 2);
        assert_eq!(event.language_id(), 0);
        assert_eq!(event.workspace_id(), 2);
    }

    #[test]
    fn test_content_type_from_str() {
        assert_eq!("page".parse::<ContentType>(), Ok(ContentType::Page));
        assert_eq!(PAGES_COLLECTION.parse::<ContentType>(), Ok(ContentType::Page));
        assert_eq!("content".parse::<ContentType>(), Ok(ContentType::Content));
        assert_eq!(CONTENT_COLLECTION.parse::<ContentType>(), Ok(ContentType::Content));
        assert!(matches!(
            "news".parse::<ContentType>(),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_event_for_field_uses_field_type() {
        let content = TemporalContent::page(1, 0).with_window(Some(T), Some(T));

        let start = TransitionEvent::for_field(content.clone(), TemporalField::StartTime).unwrap();
        let end = TransitionEvent::for_field(content.clone(), TemporalField::EndTime).unwrap();

        assert_eq!(start.transition_type(), TransitionType::Start);
        assert_eq!(end.transition_type(), TransitionType::End);
        assert_eq!(end.timestamp(), T);
        assert_eq!(end.into_content(), content);

        let open = TemporalContent::page(2, 0).with_start_time(Some(T));
        assert!(TransitionEvent::for_field(open, TemporalField::EndTime).is_none());
    }

    #[test]
    fn test_event_for_content_derives_type() {
        let content = TemporalContent::content_element(3, 1)
            .with_window(None, Some(T))
            .with_language(2);
        let event = TransitionEvent::for_content(content, T);

        assert_eq!(event.transition_type(), TransitionType::End);
        assert_eq!(event.language_id(), 2);
        assert_eq!(event.content_type(), ContentType::Content);

        let other = TransitionEvent::for_content(TemporalContent::page(1, 0), T);
        assert_eq!(other.transition_type(), TransitionType::Unknown);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
