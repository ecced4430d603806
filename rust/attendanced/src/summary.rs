use crate::models::AttendanceRecord;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CourseTally {
    pub present: u32,
    pub total: u32,
    pub percentage: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthTally {
    pub present: u32,
    pub absent: u32,
}

/// student id -> course code -> tally, keyed in first-encounter order.
pub type StudentCourseSummary = IndexMap<String, IndexMap<String, CourseTally>>;

/// "Month YYYY" label -> tally, keyed in first-encounter order.
pub type MonthlySummary = IndexMap<String, MonthTally>;

/// Percentage with two decimals; a zero total reports `0.00`.
pub fn attendance_percentage(present: u32, total: u32) -> String {
    if total == 0 {
        return format!("{:.2}", 0.0);
    }
    format!("{:.2}", 100.0 * f64::from(present) / f64::from(total))
}

pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

pub fn summarize_by_course<'a, I>(records: I) -> StudentCourseSummary
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut summary = StudentCourseSummary::new();
    for r in records {
        let tally = summary
            .entry(r.student_id.clone())
            .or_default()
            .entry(r.course_code.clone())
            .or_default();
        tally.total += 1;
        if r.present {
            tally.present += 1;
        }
    }
    for courses in summary.values_mut() {
        for tally in courses.values_mut() {
            tally.percentage = attendance_percentage(tally.present, tally.total);
        }
    }
    summary
}

pub fn summarize_by_month<'a, I>(records: I) -> MonthlySummary
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut summary = MonthlySummary::new();
    for r in records {
        let tally = summary.entry(month_label(r.date)).or_default();
        if r.present {
            tally.present += 1;
        } else {
            tally.absent += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(student: &str, course: &str, date: &str, present: bool) -> AttendanceRecord {
        AttendanceRecord {
            id: 0,
            student_id: student.to_string(),
            course_code: course.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("date"),
            present,
        }
    }

    #[test]
    fn three_of_four_is_seventy_five() {
        let records = vec![
            rec("S1", "CS101", "2024-01-08", true),
            rec("S1", "CS101", "2024-01-09", true),
            rec("S1", "CS101", "2024-01-10", true),
            rec("S1", "CS101", "2024-01-11", false),
        ];
        let summary = summarize_by_course(&records);
        assert_eq!(
            summary["S1"]["CS101"],
            CourseTally {
                present: 3,
                total: 4,
                percentage: "75.00".to_string()
            }
        );
    }

    #[test]
    fn zero_total_reports_zero_percent() {
        assert_eq!(attendance_percentage(0, 0), "0.00");
        assert_eq!(attendance_percentage(1, 3), "33.33");
        assert_eq!(attendance_percentage(2, 3), "66.67");
        assert_eq!(attendance_percentage(0, 5), "0.00");
    }

    #[test]
    fn empty_input_yields_empty_summary() {
        let records: Vec<AttendanceRecord> = Vec::new();
        assert!(summarize_by_course(&records).is_empty());
        assert!(summarize_by_month(&records).is_empty());
    }

    #[test]
    fn shuffled_input_yields_same_counts() {
        let records = vec![
            rec("S1", "CS101", "2024-01-08", true),
            rec("S2", "CS101", "2024-01-08", false),
            rec("S1", "MA201", "2024-01-09", true),
            rec("S2", "MA201", "2024-01-09", true),
            rec("S1", "CS101", "2024-01-10", false),
            rec("S2", "CS101", "2024-01-10", true),
            rec("S1", "MA201", "2024-02-01", false),
        ];
        let baseline = summarize_by_course(&records);

        let mut reversed = records.clone();
        reversed.reverse();
        let mut rotated = records.clone();
        rotated.rotate_left(3);

        for shuffled in [reversed, rotated] {
            let other = summarize_by_course(&shuffled);
            assert_eq!(other.len(), baseline.len());
            for (student, courses) in &baseline {
                for (course, tally) in courses {
                    assert_eq!(&other[student][course], tally, "{} {}", student, course);
                }
            }
        }
    }

    #[test]
    fn keys_follow_first_encounter_order() {
        let records = vec![
            rec("S2", "MA201", "2024-01-08", true),
            rec("S1", "CS101", "2024-01-08", true),
            rec("S2", "CS101", "2024-01-09", true),
        ];
        let summary = summarize_by_course(&records);
        let students: Vec<&str> = summary.keys().map(|s| s.as_str()).collect();
        assert_eq!(students, vec!["S2", "S1"]);
        let s2_courses: Vec<&str> = summary["S2"].keys().map(|s| s.as_str()).collect();
        assert_eq!(s2_courses, vec!["MA201", "CS101"]);
    }

    #[test]
    fn monthly_groups_by_month_and_year() {
        let records = vec![
            rec("S1", "CS101", "2024-01-08", true),
            rec("S1", "CS101", "2024-01-31", false),
            rec("S1", "MA201", "2024-02-01", true),
            rec("S1", "CS101", "2023-01-15", true),
        ];
        let monthly = summarize_by_month(&records);
        let labels: Vec<&str> = monthly.keys().map(|s| s.as_str()).collect();
        assert_eq!(labels, vec!["January 2024", "February 2024", "January 2023"]);
        assert_eq!(monthly["January 2024"], MonthTally { present: 1, absent: 1 });
        assert_eq!(monthly["February 2024"], MonthTally { present: 1, absent: 0 });
    }
}
