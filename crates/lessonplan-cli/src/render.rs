//! Terminal presentation of a normalized plan.

use std::fmt::Write as _;

use anyhow::{Context, Result};

use lessonplan_core::math::{SourceTypesetter, Typesetter, UnicodeTypesetter, render_fragments};
use lessonplan_core::plan::{LessonPlanRecord, PresentationItem, chapter_transitions};

const RULE_WIDTH: usize = 72;

/// Print `items` to stdout as a table or as JSON.
pub fn print_plan(items: &[PresentationItem], json: bool, raw_math: bool) -> Result<()> {
    if json {
        println!("{}", render_json(items)?);
        return Ok(());
    }

    let typesetter: &dyn Typesetter = if raw_math {
        &SourceTypesetter
    } else {
        &UnicodeTypesetter
    };
    print!("{}", render_table(items, typesetter));
    println!("{}", summary_line(items));
    Ok(())
}

pub fn render_json(items: &[PresentationItem]) -> Result<String> {
    serde_json::to_string_pretty(items).context("failed to serialize plan as JSON")
}

/// One block per item: chapter banners in upper case, lessons as a heading
/// line followed by indented content and NLS note.
pub fn render_table(items: &[PresentationItem], typesetter: &dyn Typesetter) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            PresentationItem::ChapterHeader { title } => {
                let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
                let _ = writeln!(out, "  {}", render_fragments(&title.to_uppercase(), typesetter));
                let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
            }
            PresentationItem::Record(record) => push_record(&mut out, record, typesetter),
        }
    }
    out
}

fn push_record(out: &mut String, record: &LessonPlanRecord, typesetter: &dyn Typesetter) {
    let _ = writeln!(
        out,
        "[{:>3}] {:<10} {}",
        record.sequence_label.trim(),
        record.week_label.trim(),
        render_fragments(&record.title_label, typesetter)
    );
    push_field(out, "Nội dung", &record.content_summary, typesetter);
    push_field(out, "NLS", &record.digital_competency_note, typesetter);
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
}

fn push_field(out: &mut String, label: &str, text: &str, typesetter: &dyn Typesetter) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let rendered = render_fragments(text, typesetter);
    let mut lines = rendered.lines();
    if let Some(first) = lines.next() {
        let _ = writeln!(out, "      {label}: {first}");
    }
    let indent = " ".repeat(8 + label.chars().count());
    for line in lines {
        let _ = writeln!(out, "{indent}{line}");
    }
}

/// "N lessons, M chapters".
pub fn summary_line(items: &[PresentationItem]) -> String {
    let chapters = chapter_transitions(items);
    let lessons = items.len() - chapters;
    format!("{lessons} lessons, {chapters} chapter headings")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lessonplan_core::plan::normalize;

    fn rec(week: &str, seq: &str, chapter: &str, title: &str) -> LessonPlanRecord {
        LessonPlanRecord {
            sequence_label: seq.to_string(),
            week_label: week.to_string(),
            chapter_label: chapter.to_string(),
            title_label: title.to_string(),
            content_summary: "Dòng 1\nDòng 2".to_string(),
            digital_competency_note: String::new(),
        }
    }

    #[test]
    fn table_shows_uppercase_chapters_before_lessons() {
        let items = normalize(&[
            rec("Tuần 2", "2", "Chương I. Mệnh đề", "Tập hợp"),
            rec("Tuần 1", "1", "Chương I. Mệnh đề", "Mệnh đề"),
        ]);
        let table = render_table(&items, &SourceTypesetter);

        let header = table.find("CHƯƠNG I. MỆNH ĐỀ").unwrap();
        let first = table.find("Mệnh đề\n").unwrap();
        let second = table.find("Tập hợp").unwrap();
        assert!(header < first && first < second);
        assert!(table.contains("      Nội dung: Dòng 1\n                Dòng 2\n"));
        assert!(!table.contains("NLS:"), "empty fields are omitted");
    }

    #[test]
    fn math_is_typeset_unless_raw() {
        let items = normalize(&[rec("Tuần 1", "1", "", "Góc $\\widehat{A}$")]);
        assert!(render_table(&items, &UnicodeTypesetter).contains("Góc A\u{302}"));
        assert!(render_table(&items, &SourceTypesetter).contains("Góc \\widehat{A}"));
    }

    #[test]
    fn json_output_is_tagged() {
        let items = normalize(&[rec("Tuần 1", "1", "A", "x")]);
        let value: serde_json::Value = serde_json::from_str(&render_json(&items).unwrap()).unwrap();
        assert_eq!(value[0]["kind"], "chapter_header");
        assert_eq!(value[0]["title"], "A");
        assert_eq!(value[1]["kind"], "record");
        assert_eq!(value[1]["tenBai"], "x");
    }

    #[test]
    fn summary_counts_lessons_and_headers() {
        let items = normalize(&[
            rec("Tuần 1", "1", "A", "x"),
            rec("Tuần 1", "2", "B", "y"),
            rec("Tuần 1", "3", "B", "z"),
        ]);
        assert_eq!(summary_line(&items), "3 lessons, 2 chapter headings");
    }
}
