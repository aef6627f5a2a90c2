//! Interview scheduling form.

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::board::FieldErrors;
use crate::models::transition::ScheduleRequest;

pub const LOCATION_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleForm {
    pub date: Option<NaiveDate>,
    /// `H:mm` or `HH:mm`, 24-hour clock.
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub meeting_link: Option<String>,
}

impl ScheduleForm {
    /// Checks the form against `today` and builds the service request.
    pub fn validate(&self, today: NaiveDate) -> Result<ScheduleRequest, FieldErrors> {
        let mut errors = FieldErrors::default();

        match self.date {
            None => errors.add("date", "Please choose an interview date"),
            Some(date) if date < today => {
                errors.add("date", "Interview date cannot be in the past")
            }
            Some(_) => {}
        }

        let start = parse_clock(&self.start_time);
        if self.start_time.trim().is_empty() {
            errors.add("startTime", "Please choose a start time");
        } else if start.is_none() {
            errors.add("startTime", "Invalid time format");
        }

        let end = parse_clock(&self.end_time);
        if self.end_time.trim().is_empty() {
            errors.add("endTime", "Please choose an end time");
        } else if end.is_none() {
            errors.add("endTime", "Invalid time format");
        } else if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                errors.add("endTime", "End time must be after the start time");
            }
        }

        let location = self.location.as_deref().unwrap_or_default().trim();
        if location.chars().count() > LOCATION_MAX_CHARS {
            errors.add(
                "location",
                format!("Location must be at most {LOCATION_MAX_CHARS} characters"),
            );
        }

        let meeting_link = self.meeting_link.as_deref().unwrap_or_default().trim();
        if !meeting_link.is_empty() && !is_web_link(meeting_link) {
            errors.add("meetingLink", "Invalid meeting link");
        }

        match (self.date, start, end) {
            (Some(date), Some(start), Some(end)) if errors.is_empty() => Ok(ScheduleRequest {
                interview_date: date,
                interview_start_time: start,
                interview_end_time: end,
                interview_location: location.to_string(),
                google_meet_link: meeting_link.to_string(),
            }),
            _ => Err(errors),
        }
    }
}

/// Parses `H:mm` / `HH:mm` (hours 0–23, minutes 00–59).
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let (hours, minutes) = value.trim().split_once(':')?;
    if hours.is_empty()
        || hours.len() > 2
        || minutes.len() != 2
        || !hours.bytes().all(|b| b.is_ascii_digit())
        || !minutes.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

fn is_web_link(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn valid_form() -> ScheduleForm {
        ScheduleForm {
            date: NaiveDate::from_ymd_opt(2025, 6, 3),
            start_time: "9:30".to_string(),
            end_time: "10:15".to_string(),
            location: Some("  Floor 3, Room B ".to_string()),
            meeting_link: Some("https://meet.google.com/abc-defg-hij".to_string()),
        }
    }

    #[test]
    fn test_valid_form_builds_request() {
        let request = valid_form().validate(today()).unwrap();
        assert_eq!(request.interview_start_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(request.interview_end_time, NaiveTime::from_hms_opt(10, 15, 0).unwrap());
        assert_eq!(request.interview_location, "Floor 3, Room B");
    }

    #[test]
    fn test_blank_optionals_clear_fields() {
        let form = ScheduleForm {
            location: None,
            meeting_link: Some("  ".to_string()),
            ..valid_form()
        };
        let request = form.validate(today()).unwrap();
        assert_eq!(request.interview_location, "");
        assert_eq!(request.google_meet_link, "");
    }

    #[test]
    fn test_today_is_allowed_past_is_not() {
        let form = ScheduleForm {
            date: Some(today()),
            ..valid_form()
        };
        assert!(form.validate(today()).is_ok());

        let form = ScheduleForm {
            date: today().pred_opt(),
            ..valid_form()
        };
        let errors = form.validate(today()).unwrap_err();
        assert!(errors.get("date").is_some());
    }

    #[test]
    fn test_clock_parsing() {
        assert_eq!(parse_clock("07:05"), NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(parse_clock("23:59"), NaiveTime::from_hms_opt(23, 59, 0));
        assert_eq!(parse_clock("24:00"), None);
        assert_eq!(parse_clock("12:60"), None);
        assert_eq!(parse_clock("12:5"), None);
        assert_eq!(parse_clock("noon"), None);
    }

    #[test]
    fn test_end_must_follow_start() {
        let form = ScheduleForm {
            end_time: "09:30".to_string(),
            ..valid_form()
        };
        let errors = form.validate(today()).unwrap_err();
        assert_eq!(errors.get("endTime"), Some("End time must be after the start time"));
    }

    #[test]
    fn test_location_and_link_rules() {
        let form = ScheduleForm {
            location: Some("x".repeat(LOCATION_MAX_CHARS + 1)),
            meeting_link: Some("meet.google.com/abc".to_string()),
            ..valid_form()
        };
        let errors = form.validate(today()).unwrap_err();
        assert!(errors.get("location").is_some());
        assert_eq!(errors.get("meetingLink"), Some("Invalid meeting link"));
        assert!(!is_web_link("https:///path"));
        assert!(is_web_link("http://teams.example.com/room?id=4"));
    }

    #[test]
    fn test_missing_fields_reported() {
        let errors = ScheduleForm::default().validate(today()).unwrap_err();
        assert!(errors.get("date").is_some());
        assert!(errors.get("startTime").is_some());
        assert!(errors.get("endTime").is_some());
    }
}
