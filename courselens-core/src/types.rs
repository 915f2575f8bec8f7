//! Domain types for courselens
//!
//! The central type is [`AnalyticsRecord`]: the unified per-user,
//! per-course aggregation of every metric domain. Adapters contribute
//! [`PartialRecord`]s which the engine folds in via
//! [`AnalyticsRecord::merge`].
//!
//! Records are pure values. They are computed fresh on every report
//! request and never persisted.
//!
//! Timestamps are unix epoch seconds, as stored by the host platform.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A course row from the host platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
}

/// An enrolled user, as listed on the report surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

// ============================================
// Per-domain metric records
// ============================================

/// Feedback richness for one assignment: how much written feedback the
/// user received, and how much of it exceeded the rich-text threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRichness {
    pub avg_length: f64,
    pub rich_count: i64,
}

/// Per-assignment metrics. Grade and submission-rate figures are cohort
/// aggregates over the requested user set; resubmission and feedback
/// data are per-user and only present when the source queries found any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentMetrics {
    pub name: String,
    pub avg_grade_pct: f64,
    pub ontime_submission_rate: f64,
    pub late_submissions: i64,
    pub submitted_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resubmission_count: Option<i64>,
    #[serde(rename = "feedback_richness", skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackRichness>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct H5pMetrics {
    pub title: String,
    pub interaction_count: i64,
    pub avg_interaction_score: f64,
    pub last_interaction: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetrics {
    pub view_count: i64,
    pub completion_rate: f64,
    pub last_view: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScormMetrics {
    pub interaction_count: i64,
    pub avg_score: f64,
    pub last_interaction: i64,
}

/// Interactive-content metrics, one sub-map per content plugin.
/// A plugin that is not installed leaves its sub-map empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractiveContent {
    pub h5p: BTreeMap<i64, H5pMetrics>,
    pub video: BTreeMap<i64, VideoMetrics>,
    pub scorm: BTreeMap<i64, ScormMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BigBlueButtonMetrics {
    pub sessions_attended: i64,
    pub total_minutes: i64,
    pub punctuality_rate: f64,
    pub polls_answered: i64,
    pub hands_raised: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomMetrics {
    pub sessions_attended: i64,
    pub total_minutes: i64,
    pub punctuality_rate: f64,
}

/// Live-session metrics, one sub-map per conferencing plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveSessions {
    pub bigbluebutton: BTreeMap<i64, BigBlueButtonMetrics>,
    pub zoom: BTreeMap<i64, ZoomMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumMetrics {
    pub name: String,
    pub posts_created: i64,
    pub replies_made: i64,
    pub avg_response_latency: f64,
    pub posts_with_ratings: i64,
    pub avg_peer_rating: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_replies: Option<i64>,
}

/// Attendance derived from completion tracking.
///
/// `late_count` and `attendance_streak` are carried at 0: the host
/// platform records no check-in times to compute them from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceMetrics {
    pub module_name: String,
    pub attendance_rate: f64,
    pub late_count: i64,
    pub absence_count: i64,
    pub attendance_streak: i64,
    pub last_attendance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyMetrics {
    pub shortname: String,
    pub description: String,
    pub rating: f64,
    pub proficiency_achieved: bool,
    pub status: i64,
    pub date_achieved: i64,
    pub last_updated: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evidence: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeAward {
    pub name: String,
    pub description: String,
    pub date_earned: i64,
    pub unique_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateAward {
    pub name: String,
    pub date_achieved: i64,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPace {
    pub avg_pace_hours: f64,
    pub active_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicIntegrity {
    pub avg_similarity: f64,
    pub submissions_checked: i64,
}

/// Scalar behavioral aggregates (not keyed by entity).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralMetrics {
    pub deadline_adherence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_pace: Option<LearningPace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_integrity: Option<AcademicIntegrity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaEvaluationMetrics {
    pub module: String,
    pub avg_ta_rating: f64,
    pub feedback_count: i64,
    pub avg_feedback_length: f64,
}

// ============================================
// The unified record and adapter contributions
// ============================================

/// The unified per-user, per-course analytics record.
///
/// Every requested user gets exactly one record, even when every sub-map
/// is empty. Nested maps are keyed by the source entity's id (assignment
/// id, forum id, competency id, ...), so a (user, entity) pair appears at
/// most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub assignments: BTreeMap<i64, AssignmentMetrics>,
    pub interactive_content: InteractiveContent,
    pub live_sessions: LiveSessions,
    pub forums: BTreeMap<i64, ForumMetrics>,
    pub attendance: BTreeMap<i64, AttendanceMetrics>,
    pub competencies: BTreeMap<i64, CompetencyMetrics>,
    pub badges: BTreeMap<i64, BadgeAward>,
    pub certificates: BTreeMap<i64, CertificateAward>,
    pub behavioral: BehavioralMetrics,
    pub ta_evaluation: BTreeMap<i64, TaEvaluationMetrics>,
}

/// Evidence contribution for one competency.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceContribution {
    pub count: i64,
    pub last: i64,
}

/// One adapter's contribution for one user.
///
/// Base maps land in the record wholesale; the sub-entity contributions
/// (resubmissions, feedback richness, instructor replies, evidence) apply
/// only where the base entity already exists, and are dropped otherwise.
#[derive(Debug, Default)]
pub struct PartialRecord {
    pub assignments: BTreeMap<i64, AssignmentMetrics>,
    pub resubmission_counts: BTreeMap<i64, i64>,
    pub feedback_richness: BTreeMap<i64, FeedbackRichness>,
    pub h5p: BTreeMap<i64, H5pMetrics>,
    pub video: BTreeMap<i64, VideoMetrics>,
    pub scorm: BTreeMap<i64, ScormMetrics>,
    pub bigbluebutton: BTreeMap<i64, BigBlueButtonMetrics>,
    pub zoom: BTreeMap<i64, ZoomMetrics>,
    pub forums: BTreeMap<i64, ForumMetrics>,
    pub instructor_replies: BTreeMap<i64, i64>,
    pub attendance: BTreeMap<i64, AttendanceMetrics>,
    pub competencies: BTreeMap<i64, CompetencyMetrics>,
    pub evidence: BTreeMap<i64, EvidenceContribution>,
    pub badges: BTreeMap<i64, BadgeAward>,
    pub certificates: BTreeMap<i64, CertificateAward>,
    pub deadline_adherence: Option<f64>,
    pub learning_pace: Option<LearningPace>,
    pub academic_integrity: Option<AcademicIntegrity>,
    pub ta_evaluation: BTreeMap<i64, TaEvaluationMetrics>,
}

impl AnalyticsRecord {
    /// Fold one adapter's contribution into this record.
    ///
    /// Whole-entity entries insert-or-overwrite their key, so applying
    /// the same partial twice leaves the record unchanged. Sub-entity
    /// contributions merge into their base entry when it exists and are
    /// skipped when it does not: a partial entity is never created.
    pub fn merge(&mut self, partial: PartialRecord) {
        self.assignments.extend(partial.assignments);
        for (assign_id, count) in partial.resubmission_counts {
            if let Some(entry) = self.assignments.get_mut(&assign_id) {
                entry.resubmission_count = Some(count);
            }
        }
        for (assign_id, feedback) in partial.feedback_richness {
            if let Some(entry) = self.assignments.get_mut(&assign_id) {
                entry.feedback = Some(feedback);
            }
        }

        self.interactive_content.h5p.extend(partial.h5p);
        self.interactive_content.video.extend(partial.video);
        self.interactive_content.scorm.extend(partial.scorm);

        self.live_sessions
            .bigbluebutton
            .extend(partial.bigbluebutton);
        self.live_sessions.zoom.extend(partial.zoom);

        self.forums.extend(partial.forums);
        for (forum_id, replies) in partial.instructor_replies {
            if let Some(entry) = self.forums.get_mut(&forum_id) {
                entry.instructor_replies = Some(replies);
            }
        }

        self.attendance.extend(partial.attendance);

        self.competencies.extend(partial.competencies);
        for (competency_id, evidence) in partial.evidence {
            if let Some(entry) = self.competencies.get_mut(&competency_id) {
                entry.evidence_count = Some(evidence.count);
                entry.last_evidence = Some(evidence.last);
            }
        }

        self.badges.extend(partial.badges);
        self.certificates.extend(partial.certificates);

        if let Some(adherence) = partial.deadline_adherence {
            self.behavioral.deadline_adherence = adherence;
        }
        if let Some(pace) = partial.learning_pace {
            self.behavioral.learning_pace = Some(pace);
        }
        if let Some(integrity) = partial.academic_integrity {
            self.behavioral.academic_integrity = Some(integrity);
        }

        self.ta_evaluation.extend(partial.ta_evaluation);
    }
}

/// One user's entry in the read-API result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAnalytics {
    pub userid: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub analytics: AnalyticsRecord,
}
