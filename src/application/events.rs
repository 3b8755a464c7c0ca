//! Content-change events delivered by the host system.
//!
//! The scheduler exposes plain methods; this event enum is the wire-friendly
//! adapter surface a host hooks its own notifications into.

use serde::{Deserialize, Serialize};
use time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Published,
    Draft,
    Pending,
    Private,
    Trashed,
}

impl PostStatus {
    pub fn is_published(self) -> bool {
        matches!(self, Self::Published)
    }
}

/// A term attached to the changed post, with its taxonomy's visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostTerm {
    pub term_id: i64,
    pub taxonomy: String,
    pub public: bool,
}

/// Snapshot of the changed post carried on the event, so fan-out does not
/// depend on re-reading state that may already have moved on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostChange {
    pub post_id: i64,
    pub author_id: i64,
    pub post_type: String,
    #[serde(default)]
    pub published_on: Option<Date>,
    #[serde(default)]
    pub terms: Vec<PostTerm>,
    #[serde(default)]
    pub autosave: bool,
    #[serde(default)]
    pub revision: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ContentEvent {
    PostStatusChanged {
        #[serde(flatten)]
        post: PostChange,
        old_status: PostStatus,
        new_status: PostStatus,
    },
    PostDeleted {
        #[serde(flatten)]
        post: PostChange,
    },
    TermSaved {
        term_id: i64,
        taxonomy: String,
        public: bool,
    },
    TermDeleted {
        term_id: i64,
        public: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_through_json() {
        let event = ContentEvent::PostStatusChanged {
            post: PostChange {
                post_id: 7,
                author_id: 3,
                post_type: "post".to_string(),
                published_on: None,
                terms: vec![PostTerm {
                    term_id: 11,
                    taxonomy: "category".to_string(),
                    public: true,
                }],
                autosave: false,
                revision: false,
            },
            old_status: PostStatus::Draft,
            new_status: PostStatus::Published,
        };

        let json = serde_json::to_string(&event).expect("serialize event");
        assert!(json.contains("\"event\":\"post_status_changed\""));

        let back: ContentEvent = serde_json::from_str(&json).expect("deserialize event");
        assert_eq!(back, event);
    }

    #[test]
    fn only_published_counts_as_published() {
        assert!(PostStatus::Published.is_published());
        assert!(!PostStatus::Draft.is_published());
        assert!(!PostStatus::Trashed.is_published());
    }
}
