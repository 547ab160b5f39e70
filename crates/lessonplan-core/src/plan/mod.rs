//! Lesson plan records: decoding, sanitation, ordering and grouping.

pub mod normalize;
pub mod record;
pub mod sanitize;

pub use normalize::{chapter_transitions, group_by_chapter, label_key, normalize, sort_records};
pub use record::{LessonPlanRecord, PresentationItem};
pub use sanitize::{DecodeError, Decoded, decode_records, escape_stray_backslashes, sanitize_response};
