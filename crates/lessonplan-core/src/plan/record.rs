//! Lesson plan row types.
//!
//! [`LessonPlanRecord`] mirrors one object of the JSON array the model
//! returns. Field names on the wire are the short Vietnamese keys the
//! system prompt asks for (`stt`, `tuan`, `chuong`, `tenBai`, `noiDung`,
//! `nls`); in Rust they carry descriptive names.

use serde::{Deserialize, Deserializer, Serialize};

/// One row of the lesson plan.
///
/// None of the fields is guaranteed well-formed. Labels may mix digits with
/// arbitrary text ("Tuần 3", "3B"). Missing fields decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonPlanRecord {
    /// Order hint within a week (`stt`).
    #[serde(rename = "stt", default, deserialize_with = "lenient_string")]
    pub sequence_label: String,
    /// Order hint across weeks, typically "Tuần N" (`tuan`).
    #[serde(rename = "tuan", default, deserialize_with = "lenient_string")]
    pub week_label: String,
    /// Chapter or unit; may be empty (`chuong`).
    #[serde(rename = "chuong", default, deserialize_with = "lenient_string")]
    pub chapter_label: String,
    /// Lesson title (`tenBai`).
    #[serde(rename = "tenBai", default, deserialize_with = "lenient_string")]
    pub title_label: String,
    /// Core content description (`noiDung`).
    #[serde(rename = "noiDung", default, deserialize_with = "lenient_string")]
    pub content_summary: String,
    /// Proposed digital competency integration (`nls`).
    #[serde(rename = "nls", default, deserialize_with = "lenient_string")]
    pub digital_competency_note: String,
}

/// Accept strings, numbers and `null` for a text field.
///
/// Models regularly emit `"stt": 3` instead of `"stt": "3"`. Numbers keep
/// their JSON decimal form, `null` becomes an empty string. Anything else
/// (objects, arrays, booleans) fails the whole decode.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
        Raw::Null(()) => String::new(),
    })
}

/// One row of the rendered table: either a lesson or a synthetic chapter
/// heading inserted by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PresentationItem {
    Record(LessonPlanRecord),
    ChapterHeader { title: String },
}

impl PresentationItem {
    pub fn is_header(&self) -> bool {
        matches!(self, Self::ChapterHeader { .. })
    }

    /// The wrapped record, or `None` for a chapter header.
    pub fn as_record(&self) -> Option<&LessonPlanRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::ChapterHeader { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wire_names() {
        let json = r#"{
            "stt": "1",
            "tuan": "Tuần 1",
            "chuong": "Chương I",
            "tenBai": "Bài 1: Tập hợp",
            "noiDung": "Khái niệm tập hợp",
            "nls": "Dùng GeoGebra"
        }"#;
        let record: LessonPlanRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.sequence_label, "1");
        assert_eq!(record.week_label, "Tuần 1");
        assert_eq!(record.chapter_label, "Chương I");
        assert_eq!(record.title_label, "Bài 1: Tập hợp");
        assert_eq!(record.content_summary, "Khái niệm tập hợp");
        assert_eq!(record.digital_competency_note, "Dùng GeoGebra");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let record: LessonPlanRecord = serde_json::from_str(r#"{"tenBai": "Ôn tập"}"#).unwrap();
        assert_eq!(record.title_label, "Ôn tập");
        assert!(record.chapter_label.is_empty());
        assert!(record.week_label.is_empty());
    }

    #[test]
    fn numeric_and_null_labels_are_accepted() {
        let record: LessonPlanRecord =
            serde_json::from_str(r#"{"stt": 12, "tuan": null, "chuong": "A"}"#).unwrap();
        assert_eq!(record.sequence_label, "12");
        assert_eq!(record.week_label, "");
    }

    #[test]
    fn nested_values_are_rejected() {
        let result: Result<LessonPlanRecord, _> = serde_json::from_str(r#"{"stt": {"n": 1}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn presentation_item_serializes_with_kind_tag() {
        let header = PresentationItem::ChapterHeader {
            title: "Chương I".to_string(),
        };
        let value = serde_json::to_value(&header).unwrap();
        assert_eq!(value["kind"], "chapter_header");
        assert_eq!(value["title"], "Chương I");

        let record = PresentationItem::Record(LessonPlanRecord {
            title_label: "Bài 1".to_string(),
            ..Default::default()
        });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"], "record");
        assert_eq!(value["tenBai"], "Bài 1");
        assert!(!record.is_header());
        assert_eq!(record.as_record().unwrap().title_label, "Bài 1");
    }
}
