use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Progress of a candidate inside a single stage.
///
/// The pipeline service reports this as a free-form label (`Draft`, `Schedule`,
/// `Passed`, ...). Unknown or missing labels read as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CandidateStatus {
    #[default]
    Pending,
    Scheduled,
    InProgress,
    Passed,
    Failed,
}

impl CandidateStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "schedule" | "scheduled" => Self::Scheduled,
            "inprogress" | "in_progress" | "in progress" => Self::InProgress,
            "pass" | "passed" => Self::Passed,
            "fail" | "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl<'de> Deserialize<'de> for CandidateStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label
            .as_deref()
            .map(CandidateStatus::from_label)
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateProfile {
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CvReference {
    pub id: i64,
    pub name: String,
    pub file_url: String,
}

/// Interview metadata attached to a card once it has been scheduled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSchedule {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
}

/// A candidate's presence in one pipeline stage: the card on the board.
///
/// Mirrors `CandidateStageDetailResponse` from the pipeline service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateStage {
    pub id: i64,
    #[serde(default)]
    pub candidate_job_id: i64,
    pub job_stage_id: i64,
    #[serde(default)]
    pub status: CandidateStatus,
    #[serde(default)]
    pub interview_date: Option<NaiveDate>,
    #[serde(default)]
    pub interview_start_time: Option<NaiveTime>,
    #[serde(default)]
    pub interview_end_time: Option<NaiveTime>,
    #[serde(default)]
    pub interview_location: Option<String>,
    #[serde(default)]
    pub google_meet_link: Option<String>,
    #[serde(default)]
    pub hiring_manager_feedback: Option<String>,
    #[serde(default)]
    pub job_stage_title: Option<String>,
    #[serde(default)]
    pub user: CandidateProfile,
    #[serde(default)]
    pub cv: CvReference,
}

impl CandidateStage {
    /// The interview slot, if one has been booked. Blank location/link strings
    /// (the service uses `""` to clear them) read as absent.
    pub fn interview(&self) -> Option<InterviewSchedule> {
        let date = self.interview_date?;
        Some(InterviewSchedule {
            date,
            start_time: self.interview_start_time,
            end_time: self.interview_end_time,
            location: non_blank(self.interview_location.as_deref()),
            meeting_link: non_blank(self.google_meet_link.as_deref()),
        })
    }

    pub fn display_name(&self) -> &str {
        if self.user.full_name.trim().is_empty() {
            "Unknown"
        } else {
            &self.user.full_name
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
