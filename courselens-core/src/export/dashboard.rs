//! HTML dashboard rendering
//!
//! Server-side rendering of the analytics dashboard: one section per
//! user, one block per metric domain, plus export links. Consumers that
//! want raw data use the JSON surface instead.

use crate::types::{AnalyticsRecord, Course, UserRow};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Minimal HTML escaping for text that originates in user content.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn section_header(out: &mut String, title: &str) {
    let _ = writeln!(out, "<h4>{}</h4>", title);
}

fn render_user(out: &mut String, user: &UserRow, record: &AnalyticsRecord) {
    let _ = writeln!(
        out,
        "<section class=\"analytics-user\"><h3>{} {} &lt;{}&gt;</h3>",
        escape(&user.firstname),
        escape(&user.lastname),
        escape(&user.email)
    );

    section_header(out, "Assignments");
    if record.assignments.is_empty() {
        let _ = writeln!(out, "<p>No assignment activity.</p>");
    } else {
        let _ = writeln!(
            out,
            "<table><tr><th>Assignment</th><th>Avg Grade %</th><th>On-time %</th>\
             <th>Resubmissions</th></tr>"
        );
        for metrics in record.assignments.values() {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td></tr>",
                escape(&metrics.name),
                metrics.avg_grade_pct,
                metrics.ontime_submission_rate,
                metrics.resubmission_count.unwrap_or(0)
            );
        }
        let _ = writeln!(out, "</table>");
    }

    section_header(out, "Forums");
    if record.forums.is_empty() {
        let _ = writeln!(out, "<p>No forum activity.</p>");
    } else {
        let _ = writeln!(
            out,
            "<table><tr><th>Forum</th><th>Posts</th><th>Replies</th>\
             <th>Peer Rating</th><th>Instructor Replies</th></tr>"
        );
        for metrics in record.forums.values() {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
                escape(&metrics.name),
                metrics.posts_created,
                metrics.replies_made,
                metrics.avg_peer_rating,
                metrics.instructor_replies.unwrap_or(0)
            );
        }
        let _ = writeln!(out, "</table>");
    }

    section_header(out, "Attendance");
    if record.attendance.is_empty() {
        let _ = writeln!(out, "<p>No completion data.</p>");
    } else {
        let _ = writeln!(
            out,
            "<table><tr><th>Module</th><th>Attendance %</th><th>Absences</th></tr>"
        );
        for metrics in record.attendance.values() {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
                escape(&metrics.module_name),
                metrics.attendance_rate,
                metrics.absence_count
            );
        }
        let _ = writeln!(out, "</table>");
    }

    section_header(out, "Competencies");
    if record.competencies.is_empty() {
        let _ = writeln!(out, "<p>No competency ratings.</p>");
    } else {
        let _ = writeln!(
            out,
            "<table><tr><th>Competency</th><th>Rating</th><th>Proficient</th>\
             <th>Evidence</th></tr>"
        );
        for metrics in record.competencies.values() {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{:.2}</td><td>{}</td><td>{}</td></tr>",
                escape(&metrics.shortname),
                metrics.rating,
                if metrics.proficiency_achieved { "yes" } else { "no" },
                metrics.evidence_count.unwrap_or(0)
            );
        }
        let _ = writeln!(out, "</table>");
    }

    section_header(out, "Awards");
    let _ = writeln!(
        out,
        "<p>{} badge(s), {} certificate(s).</p>",
        record.badges.len(),
        record.certificates.len()
    );

    section_header(out, "Behavior");
    let _ = write!(
        out,
        "<p>Deadline adherence: {:.2}%",
        record.behavioral.deadline_adherence
    );
    if let Some(pace) = &record.behavioral.learning_pace {
        let _ = write!(
            out,
            " &middot; Pace: {:.2}h between activities over {} active day(s)",
            pace.avg_pace_hours, pace.active_days
        );
    }
    if let Some(integrity) = &record.behavioral.academic_integrity {
        let _ = write!(
            out,
            " &middot; Similarity: {:.2}% across {} checked submission(s)",
            integrity.avg_similarity, integrity.submissions_checked
        );
    }
    let _ = writeln!(out, "</p>");

    let _ = writeln!(out, "</section>");
}

/// Render the dashboard page for a course.
pub fn render_dashboard(
    course: &Course,
    users: &[UserRow],
    records: &BTreeMap<i64, AnalyticsRecord>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(
        out,
        "<html><head><meta charset=\"utf-8\"><title>Analytics: {}</title></head><body>",
        escape(&course.shortname)
    );
    let _ = writeln!(
        out,
        "<h2>Course analytics &mdash; {} ({})</h2>",
        escape(&course.fullname),
        escape(&course.shortname)
    );
    let _ = writeln!(
        out,
        "<p><a href=\"/report?id={id}&format=csv\">Export CSV</a> \
         &middot; <a href=\"/report?id={id}&format=json\">Raw JSON</a></p>",
        id = course.id
    );

    if users.is_empty() {
        let _ = writeln!(out, "<p>No enrolled users.</p>");
    }

    let empty = AnalyticsRecord::default();
    for user in users {
        render_user(&mut out, user, records.get(&user.id).unwrap_or(&empty));
    }

    let _ = writeln!(out, "</body></html>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssignmentMetrics;

    fn course() -> Course {
        Course {
            id: 10,
            shortname: "CS101".to_string(),
            fullname: "Intro to CS".to_string(),
        }
    }

    fn user() -> UserRow {
        UserRow {
            id: 1,
            firstname: "Ana".to_string(),
            lastname: "Lyst".to_string(),
            email: "ana@example.org".to_string(),
        }
    }

    #[test]
    fn test_dashboard_renders_user_sections() {
        let mut records = BTreeMap::new();
        let mut record = AnalyticsRecord::default();
        record.assignments.insert(
            1,
            AssignmentMetrics {
                name: "Essay <1>".to_string(),
                avg_grade_pct: 70.0,
                ontime_submission_rate: 50.0,
                late_submissions: 1,
                submitted_count: 2,
                resubmission_count: None,
                feedback: None,
            },
        );
        records.insert(1_i64, record);

        let html = render_dashboard(&course(), &[user()], &records);
        assert!(html.contains("Course analytics"));
        assert!(html.contains("Ana Lyst"));
        // User content is escaped
        assert!(html.contains("Essay &lt;1&gt;"));
        assert!(html.contains("70.00"));
        assert!(html.contains("format=csv"));
    }

    #[test]
    fn test_dashboard_empty_course() {
        let html = render_dashboard(&course(), &[], &BTreeMap::new());
        assert!(html.contains("No enrolled users."));
    }

    #[test]
    fn test_user_without_record_gets_empty_sections() {
        let html = render_dashboard(&course(), &[user()], &BTreeMap::new());
        assert!(html.contains("No assignment activity."));
        assert!(html.contains("No forum activity."));
    }
}
