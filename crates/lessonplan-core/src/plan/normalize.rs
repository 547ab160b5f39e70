//! Ordering and chapter grouping of lesson plan records.
//!
//! Records are sorted by (week key, sequence key), where each key is the
//! integer left after stripping every non-digit from the label. The sort is
//! stable: records with equal keys keep their input order. A chapter header
//! is inserted whenever the non-empty chapter label changes in sorted order.
//!
//! Nothing is ever dropped or merged. Two identical rows stay two rows.

use super::record::{LessonPlanRecord, PresentationItem};

/// Extract a numeric ordering key from a free-form label.
///
/// Every non-digit character is removed and the remaining digits are read
/// as a base-10 integer. A label without digits has key 0. Digit runs too
/// long for `u64` saturate to `u64::MAX`.
///
/// ```
/// use lessonplan_core::plan::label_key;
///
/// assert_eq!(label_key("Tuần 07"), 7);
/// assert_eq!(label_key("3B"), 3);
/// assert_eq!(label_key("abc"), 0);
/// ```
pub fn label_key(label: &str) -> u64 {
    let digits: String = label.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

/// Return a copy of `records` stably sorted by week key, then sequence key.
pub fn sort_records(records: &[LessonPlanRecord]) -> Vec<LessonPlanRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_cached_key(|r| (label_key(&r.week_label), label_key(&r.sequence_label)));
    sorted
}

/// Walk already-sorted records and insert chapter headers at each change of
/// chapter.
///
/// Labels are compared exactly as given, so `"A"` and `"A "` are different
/// chapters. A label that is empty or all whitespace never produces a
/// header and does not reset the current chapter.
pub fn group_by_chapter(sorted: Vec<LessonPlanRecord>) -> Vec<PresentationItem> {
    let mut items = Vec::with_capacity(sorted.len() + 8);
    let mut current_chapter: Option<String> = None;

    for record in sorted {
        let chapter = record.chapter_label.as_str();
        if !chapter.trim().is_empty() && current_chapter.as_deref() != Some(chapter) {
            let title = chapter.to_string();
            current_chapter = Some(title.clone());
            items.push(PresentationItem::ChapterHeader { title });
        }
        items.push(PresentationItem::Record(record));
    }

    items
}

/// Sort and group records into the sequence the table displays.
pub fn normalize(records: &[LessonPlanRecord]) -> Vec<PresentationItem> {
    group_by_chapter(sort_records(records))
}

/// Number of chapter headers in a normalized sequence.
pub fn chapter_transitions(items: &[PresentationItem]) -> usize {
    items.iter().filter(|item| item.is_header()).count()
}
