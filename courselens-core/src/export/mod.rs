//! Export formatter
//!
//! Renders the aggregated record set as flat CSV rows, a nested JSON
//! summary, or the HTML dashboard. Flattening reduces each one-to-many
//! domain map to a single scalar: averages for rate/average-like
//! sub-fields, sums for count-like ones, and 0 whenever the map is empty.

pub mod dashboard;

use crate::error::Result;
use crate::types::{AnalyticsRecord, UserRow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One flattened CSV row. Field order is the fixed column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRow {
    #[serde(rename = "UserID")]
    pub user_id: i64,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "AssignAvgGrade%")]
    pub assign_avg_grade_pct: f64,
    #[serde(rename = "AssignOntime%")]
    pub assign_ontime_pct: f64,
    #[serde(rename = "ResubmissionCount")]
    pub resubmission_count: i64,
    #[serde(rename = "FeedbackRichness")]
    pub feedback_richness: f64,
    #[serde(rename = "H5PInteractions")]
    pub h5p_interactions: i64,
    #[serde(rename = "VideoCompletion%")]
    pub video_completion_pct: f64,
    #[serde(rename = "SCORMScore")]
    pub scorm_score: f64,
    #[serde(rename = "LiveSessionsAttended%")]
    pub live_sessions_attended: i64,
    #[serde(rename = "Punctuality%")]
    pub punctuality_pct: f64,
    #[serde(rename = "PollsAnswered%")]
    pub polls_answered: i64,
    #[serde(rename = "HandsRaised")]
    pub hands_raised: i64,
    #[serde(rename = "ForumPosts")]
    pub forum_posts: i64,
    #[serde(rename = "ForumReplies")]
    pub forum_replies: i64,
    #[serde(rename = "ResponseLatency")]
    pub response_latency: f64,
    #[serde(rename = "InstructorEngagement")]
    pub instructor_engagement: i64,
    #[serde(rename = "PeerRating")]
    pub peer_rating: f64,
    #[serde(rename = "Attendance%")]
    pub attendance_pct: f64,
    #[serde(rename = "Late%")]
    pub late_count: i64,
    #[serde(rename = "Absence%")]
    pub absence_count: i64,
    #[serde(rename = "AttendanceStreak")]
    pub attendance_streak: i64,
    #[serde(rename = "CompetencyRating")]
    pub competency_rating: f64,
    #[serde(rename = "ProficiencyAchieved")]
    pub proficiency_achieved: i64,
    #[serde(rename = "EvidenceCount")]
    pub evidence_count: i64,
    #[serde(rename = "DateAchieved")]
    pub date_achieved: i64,
    #[serde(rename = "BadgesEarned")]
    pub badges_earned: i64,
    #[serde(rename = "CertificateAchieved")]
    pub certificate_achieved: i64,
    #[serde(rename = "TimeToCertificate")]
    pub time_to_certificate: i64,
    #[serde(rename = "DeadlineAdherence%")]
    pub deadline_adherence_pct: f64,
    #[serde(rename = "LearningPace")]
    pub learning_pace: f64,
    #[serde(rename = "AcademicIntegrity%")]
    pub academic_integrity_pct: f64,
    #[serde(rename = "TARating%")]
    pub ta_rating_pct: f64,
    #[serde(rename = "TANotesCount")]
    pub ta_notes_count: i64,
}

/// The fixed CSV header, matching [`FlatRow`] field order exactly.
pub const CSV_HEADERS: &[&str] = &[
    "UserID",
    "FirstName",
    "LastName",
    "Email",
    "AssignAvgGrade%",
    "AssignOntime%",
    "ResubmissionCount",
    "FeedbackRichness",
    "H5PInteractions",
    "VideoCompletion%",
    "SCORMScore",
    "LiveSessionsAttended%",
    "Punctuality%",
    "PollsAnswered%",
    "HandsRaised",
    "ForumPosts",
    "ForumReplies",
    "ResponseLatency",
    "InstructorEngagement",
    "PeerRating",
    "Attendance%",
    "Late%",
    "Absence%",
    "AttendanceStreak",
    "CompetencyRating",
    "ProficiencyAchieved",
    "EvidenceCount",
    "DateAchieved",
    "BadgesEarned",
    "CertificateAchieved",
    "TimeToCertificate",
    "DeadlineAdherence%",
    "LearningPace",
    "AcademicIntegrity%",
    "TARating%",
    "TANotesCount",
];

/// Mean of a sub-field across map entries; 0 for an empty map.
fn mean<T>(map: &BTreeMap<i64, T>, field: impl Fn(&T) -> f64) -> f64 {
    if map.is_empty() {
        return 0.0;
    }
    round2(map.values().map(field).sum::<f64>() / map.len() as f64)
}

/// Sum of a sub-field across map entries.
fn sum<T>(map: &BTreeMap<i64, T>, field: impl Fn(&T) -> i64) -> i64 {
    map.values().map(field).sum()
}

/// Mean over an iterator of already-collected values; 0 when empty.
fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    round2(values.iter().sum::<f64>() / values.len() as f64)
}

/// Flatten one user's record into a CSV row.
pub fn flatten(user: &UserRow, record: &AnalyticsRecord) -> FlatRow {
    let feedback_lengths: Vec<f64> = record
        .assignments
        .values()
        .filter_map(|a| a.feedback.as_ref().map(|f| f.avg_length))
        .collect();

    let punctuality: Vec<f64> = record
        .live_sessions
        .bigbluebutton
        .values()
        .map(|b| b.punctuality_rate)
        .chain(record.live_sessions.zoom.values().map(|z| z.punctuality_rate))
        .collect();

    let live_attended = sum(&record.live_sessions.bigbluebutton, |b| b.sessions_attended)
        + sum(&record.live_sessions.zoom, |z| z.sessions_attended);

    FlatRow {
        user_id: user.id,
        first_name: user.firstname.clone(),
        last_name: user.lastname.clone(),
        email: user.email.clone(),
        assign_avg_grade_pct: mean(&record.assignments, |a| a.avg_grade_pct),
        assign_ontime_pct: mean(&record.assignments, |a| a.ontime_submission_rate),
        resubmission_count: sum(&record.assignments, |a| a.resubmission_count.unwrap_or(0)),
        feedback_richness: mean_of(&feedback_lengths),
        h5p_interactions: sum(&record.interactive_content.h5p, |h| h.interaction_count),
        video_completion_pct: mean(&record.interactive_content.video, |v| v.completion_rate),
        scorm_score: mean(&record.interactive_content.scorm, |s| s.avg_score),
        live_sessions_attended: live_attended,
        punctuality_pct: mean_of(&punctuality),
        polls_answered: sum(&record.live_sessions.bigbluebutton, |b| b.polls_answered),
        hands_raised: sum(&record.live_sessions.bigbluebutton, |b| b.hands_raised),
        forum_posts: sum(&record.forums, |f| f.posts_created),
        forum_replies: sum(&record.forums, |f| f.replies_made),
        response_latency: mean(&record.forums, |f| f.avg_response_latency),
        instructor_engagement: sum(&record.forums, |f| f.instructor_replies.unwrap_or(0)),
        peer_rating: mean(&record.forums, |f| f.avg_peer_rating),
        attendance_pct: mean(&record.attendance, |a| a.attendance_rate),
        late_count: sum(&record.attendance, |a| a.late_count),
        absence_count: sum(&record.attendance, |a| a.absence_count),
        attendance_streak: sum(&record.attendance, |a| a.attendance_streak),
        competency_rating: mean(&record.competencies, |c| c.rating),
        proficiency_achieved: sum(&record.competencies, |c| i64::from(c.proficiency_achieved)),
        evidence_count: sum(&record.competencies, |c| c.evidence_count.unwrap_or(0)),
        date_achieved: record
            .competencies
            .values()
            .map(|c| c.date_achieved)
            .max()
            .unwrap_or(0),
        badges_earned: record.badges.len() as i64,
        certificate_achieved: record.certificates.len() as i64,
        // The certificate source records no enrolment-to-award interval
        time_to_certificate: 0,
        deadline_adherence_pct: record.behavioral.deadline_adherence,
        learning_pace: record
            .behavioral
            .learning_pace
            .as_ref()
            .map(|p| p.avg_pace_hours)
            .unwrap_or(0.0),
        academic_integrity_pct: record
            .behavioral
            .academic_integrity
            .as_ref()
            .map(|i| i.avg_similarity)
            .unwrap_or(0.0),
        ta_rating_pct: mean(&record.ta_evaluation, |t| t.avg_ta_rating),
        ta_notes_count: sum(&record.ta_evaluation, |t| t.feedback_count),
    }
}

/// Flatten the whole record set, one row per user in the given order.
///
/// A user with no record entry still gets a row of zeros.
pub fn to_rows(users: &[UserRow], records: &BTreeMap<i64, AnalyticsRecord>) -> Vec<FlatRow> {
    let empty = AnalyticsRecord::default();
    users
        .iter()
        .map(|user| flatten(user, records.get(&user.id).unwrap_or(&empty)))
        .collect()
}

/// Write rows as CSV, headers included.
pub fn write_csv<W: Write>(writer: W, rows: &[FlatRow]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        // serde-derived headers only appear with at least one record
        csv_writer.write_record(CSV_HEADERS)?;
    }
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(crate::error::Error::from)?;
    Ok(())
}

/// Download filename for a CSV export.
pub fn csv_filename(course_shortname: &str, now: DateTime<Utc>) -> String {
    format!(
        "analytics_{}_{}.csv",
        course_shortname,
        now.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// The nested JSON summary: the record mapping, shape preserved.
pub fn to_summary(records: &BTreeMap<i64, AnalyticsRecord>) -> Result<serde_json::Value> {
    serde_json::to_value(records).map_err(crate::error::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use chrono::TimeZone;

    fn user() -> UserRow {
        UserRow {
            id: 1,
            firstname: "Ana".to_string(),
            lastname: "Lyst".to_string(),
            email: "ana@example.org".to_string(),
        }
    }

    #[test]
    fn test_flatten_empty_record_is_all_zeros() {
        let row = flatten(&user(), &AnalyticsRecord::default());
        assert_eq!(row.assign_avg_grade_pct, 0.0);
        assert_eq!(row.forum_posts, 0);
        assert_eq!(row.forum_replies, 0);
        assert_eq!(row.competency_rating, 0.0);
        assert_eq!(row.video_completion_pct, 0.0);
        assert_eq!(row.badges_earned, 0);
        assert_eq!(row.date_achieved, 0);
        assert_eq!(row.learning_pace, 0.0);
    }

    #[test]
    fn test_flatten_means_and_sums() {
        let mut record = AnalyticsRecord::default();
        for (id, grade, ontime, resub) in [(1, 80.0, 100.0, Some(2)), (2, 60.0, 50.0, None)] {
            record.assignments.insert(
                id,
                AssignmentMetrics {
                    name: format!("A{id}"),
                    avg_grade_pct: grade,
                    ontime_submission_rate: ontime,
                    late_submissions: 0,
                    submitted_count: 1,
                    resubmission_count: resub,
                    feedback: None,
                },
            );
        }
        record.forums.insert(
            5,
            ForumMetrics {
                name: "General".to_string(),
                posts_created: 3,
                replies_made: 4,
                avg_response_latency: 12.0,
                posts_with_ratings: 1,
                avg_peer_rating: 4.5,
                instructor_replies: Some(2),
            },
        );

        let row = flatten(&user(), &record);
        assert_eq!(row.assign_avg_grade_pct, 70.0);
        assert_eq!(row.assign_ontime_pct, 75.0);
        assert_eq!(row.resubmission_count, 2);
        assert_eq!(row.forum_posts, 3);
        assert_eq!(row.forum_replies, 4);
        assert_eq!(row.instructor_engagement, 2);
        assert_eq!(row.peer_rating, 4.5);
    }

    #[test]
    fn test_punctuality_averages_across_plugins() {
        let mut record = AnalyticsRecord::default();
        record.live_sessions.bigbluebutton.insert(
            1,
            BigBlueButtonMetrics {
                sessions_attended: 2,
                total_minutes: 60,
                punctuality_rate: 100.0,
                polls_answered: 1,
                hands_raised: 0,
            },
        );
        record.live_sessions.zoom.insert(
            2,
            ZoomMetrics {
                sessions_attended: 1,
                total_minutes: 30,
                punctuality_rate: 50.0,
            },
        );

        let row = flatten(&user(), &record);
        assert_eq!(row.live_sessions_attended, 3);
        assert_eq!(row.punctuality_pct, 75.0);
        assert_eq!(row.polls_answered, 1);
    }

    #[test]
    fn test_csv_headers_match_row_order() {
        let rows = vec![flatten(&user(), &AnalyticsRecord::default())];
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &rows).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let header_line = text.lines().next().unwrap();
        assert_eq!(header_line, CSV_HEADERS.join(","));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_csv_empty_rowset_still_emits_headers() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &[]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.trim_end(), CSV_HEADERS.join(","));
    }

    #[test]
    fn test_to_rows_covers_users_without_records() {
        let users = vec![user()];
        let records = BTreeMap::new();
        let rows = to_rows(&users, &records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, 1);
        assert_eq!(rows[0].forum_posts, 0);
    }

    #[test]
    fn test_csv_filename_pattern() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 9).unwrap();
        assert_eq!(
            csv_filename("CS101", now),
            "analytics_CS101_2024-03-05_14-30-09.csv"
        );
    }

    #[test]
    fn test_summary_preserves_nesting() {
        let mut records = BTreeMap::new();
        let mut record = AnalyticsRecord::default();
        record.badges.insert(
            4,
            BadgeAward {
                name: "Star".to_string(),
                description: String::new(),
                date_earned: 100,
                unique_hash: "h".to_string(),
            },
        );
        records.insert(1_i64, record);

        let summary = to_summary(&records).unwrap();
        assert_eq!(summary["1"]["badges"]["4"]["name"], "Star");
        assert!(summary["1"]["assignments"].as_object().unwrap().is_empty());
    }
}
