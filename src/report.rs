use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{EnrollmentRecord, EnrollmentStatus, Grade};

pub fn build_report(
    generated_on: NaiveDate,
    grades: &[Grade],
    gpa: f64,
    status: &EnrollmentStatus,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Grade Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        status.student_id, generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");

    if grades.is_empty() {
        let _ = writeln!(output, "No graded work recorded for this student.");
    } else {
        let _ = writeln!(
            output,
            "| Subject | Key | Final (60) | Quiz (20) | Assign (20) | Grade | Credits | Last submitted |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
        for grade in grades {
            let last_submitted = grade
                .last_submitted
                .map(|at| at.date_naive().to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                output,
                "| {} | {} | {:.2} | {:.2} | {:.2} | {} | {:.1} | {} |",
                grade.subject_name,
                grade.subject_key,
                grade.breakdown.final_points,
                grade.breakdown.quiz_points,
                grade.breakdown.assign_points,
                grade.grade_value,
                grade.credits,
                last_submitted
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Standing");
    let _ = writeln!(output, "- Computed GPA: {:.2}", gpa);
    let _ = writeln!(output, "- GPA on record: {:.2}", status.gpa);
    let _ = writeln!(
        output,
        "- Course load: {} of {} allowed",
        status.registered, status.max_allowed
    );

    if status.registered >= status.max_allowed {
        let _ = writeln!(output, "- Registration limit reached.");
    }

    output
}

pub fn registered_courses_section(courses: &[EnrollmentRecord]) -> String {
    let mut output = String::new();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Registered Courses");

    if courses.is_empty() {
        let _ = writeln!(output, "Not registered for any course.");
    } else {
        for course in courses {
            let _ = writeln!(
                output,
                "- {} (since {})",
                course.course_code,
                course.registered_at.date_naive()
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BucketBreakdown;

    fn status(registered: usize) -> EnrollmentStatus {
        EnrollmentStatus {
            student_id: "s-1".to_string(),
            gpa: 1.8,
            max_allowed: 5,
            registered,
        }
    }

    #[test]
    fn report_lists_subject_breakdown_and_standing() {
        let grades = vec![Grade {
            subject_key: "CS101".to_string(),
            subject_name: "Intro to Computing".to_string(),
            grade_value: "76.00".to_string(),
            credits: 3.0,
            breakdown: BucketBreakdown {
                final_points: 42.0,
                quiz_points: 16.0,
                assign_points: 18.0,
            },
            last_submitted: NaiveDate::from_ymd_opt(2026, 2, 20)
                .and_then(|d| d.and_hms_opt(14, 0, 0))
                .map(|naive| naive.and_utc()),
        }];
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        let report = build_report(date, &grades, 2.0, &status(2));
        assert!(report.contains("Generated for s-1 on 2026-03-01"));
        assert!(report.contains("| Intro to Computing | CS101 | 42.00 | 16.00 | 18.00 | 76.00 | 3.0 | 2026-02-20 |"));
        assert!(report.contains("Computed GPA: 2.00"));
        assert!(report.contains("Course load: 2 of 5 allowed"));
        assert!(!report.contains("limit reached"));
    }

    #[test]
    fn empty_history_and_full_load_are_called_out() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let report = build_report(date, &[], 0.0, &status(5));
        assert!(report.contains("No graded work recorded"));
        assert!(report.contains("Registration limit reached."));
    }

    #[test]
    fn registered_courses_are_listed_with_dates() {
        let registered_at = NaiveDate::from_ymd_opt(2026, 1, 12)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            .and_utc();
        let courses = vec![EnrollmentRecord {
            id: uuid::Uuid::new_v4(),
            student_id: "s-1".to_string(),
            course_code: "CS101".to_string(),
            registered_at,
        }];

        let section = registered_courses_section(&courses);
        assert!(section.contains("- CS101 (since 2026-01-12)"));
        assert!(registered_courses_section(&[]).contains("Not registered"));
    }
}
