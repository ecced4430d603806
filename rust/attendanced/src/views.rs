//! View models rendered by the browser client: the attendance summary table,
//! the per-month attendance list, marks listings and the marks entry sheet.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::models::{MarksEntry, Student};
use crate::summary::{attendance_percentage, MonthlySummary, StudentCourseSummary};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCell {
    pub course_code: String,
    pub present: u32,
    pub total: u32,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub student_id: String,
    pub cells: Vec<SummaryCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTable {
    /// Column groups, one per course, each rendered as Present / Total / Percentage.
    pub courses: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

/// Every row carries one cell per column, so a student with no records for a
/// course shows `0 / 0 / 0.00` there.
pub fn summary_table(summary: &StudentCourseSummary) -> SummaryTable {
    let mut courses: Vec<String> = Vec::new();
    for per_course in summary.values() {
        for code in per_course.keys() {
            if !courses.contains(code) {
                courses.push(code.clone());
            }
        }
    }

    let rows = summary
        .iter()
        .map(|(student_id, per_course)| SummaryRow {
            student_id: student_id.clone(),
            cells: courses
                .iter()
                .map(|code| match per_course.get(code) {
                    Some(t) => SummaryCell {
                        course_code: code.clone(),
                        present: t.present,
                        total: t.total,
                        percentage: t.percentage.clone(),
                    },
                    None => SummaryCell {
                        course_code: code.clone(),
                        present: 0,
                        total: 0,
                        percentage: attendance_percentage(0, 0),
                    },
                })
                .collect(),
        })
        .collect();

    SummaryTable { courses, rows }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyLine {
    pub label: String,
    pub present: u32,
    pub absent: u32,
}

impl fmt::Display for MonthlyLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Present - {}, Absent - {}",
            self.label, self.present, self.absent
        )
    }
}

pub fn monthly_lines(monthly: &MonthlySummary) -> Vec<MonthlyLine> {
    monthly
        .iter()
        .map(|(label, t)| MonthlyLine {
            label: label.clone(),
            present: t.present,
            absent: t.absent,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionMark {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksLine {
    pub course_code: String,
    pub exam_type: String,
    pub questions: Vec<QuestionMark>,
}

/// Display text for one question's mark; null and blank read as `N/A`.
pub fn mark_text(v: &Value) -> String {
    match v {
        Value::Null => "N/A".to_string(),
        Value::String(s) if s.trim().is_empty() => "N/A".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn marks_lines(entries: &[MarksEntry]) -> Vec<MarksLine> {
    entries
        .iter()
        .map(|e| MarksLine {
            course_code: e.course_code.clone(),
            exam_type: e.exam_type.clone(),
            questions: e
                .marks
                .iter()
                .enumerate()
                .map(|(i, m)| QuestionMark {
                    label: format!("Ques {}", i + 1),
                    value: mark_text(m),
                })
                .collect(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub enrollment: String,
    pub monthly: Vec<MonthlyLine>,
    pub marks: Vec<MarksLine>,
}

/// Fits an existing marks list to `num_questions`: pads with blanks, truncates extras.
pub fn fit_marks(existing: &[Value], num_questions: usize) -> Vec<Value> {
    let mut marks: Vec<Value> = existing.iter().take(num_questions).cloned().collect();
    if marks.len() < num_questions {
        marks.extend(std::iter::repeat(Value::String(String::new())).take(num_questions - marks.len()));
    }
    marks
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksSheetRow {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub marks: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksSheet {
    pub semester: String,
    pub course_code: String,
    pub exam_type: String,
    pub num_questions: usize,
    pub rows: Vec<MarksSheetRow>,
}

/// One row per student; the most recent saved entry for the student seeds the row.
pub fn marks_sheet(
    semester: &str,
    course_code: &str,
    exam_type: &str,
    num_questions: usize,
    students: &[Student],
    saved: &[MarksEntry],
) -> MarksSheet {
    let rows = students
        .iter()
        .map(|s| {
            let latest = saved
                .iter()
                .filter(|e| e.student_id == s.enrollment)
                .max_by_key(|e| e.id);
            MarksSheetRow {
                student_id: s.enrollment.clone(),
                first_name: s.first_name.clone(),
                last_name: s.last_name.clone(),
                marks: fit_marks(latest.map(|e| e.marks.as_slice()).unwrap_or(&[]), num_questions),
            }
        })
        .collect();
    MarksSheet {
        semester: semester.to_string(),
        course_code: course_code.to_string(),
        exam_type: exam_type.to_string(),
        num_questions,
        rows,
    }
}
