use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Spans shorter than this many hours count as a half day.
const HALF_DAY_HOURS: f64 = 4.0;

/// Check-ins strictly after this wall-clock time count as late.
/// 09:30:00 itself is still on time.
fn late_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap()
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::HalfDay => "half-day",
        }
    }
}

/// Worked hours between the two instants, rounded to 2 decimal places.
pub fn calculate_hours(check_in: NaiveDateTime, check_out: NaiveDateTime) -> f64 {
    let seconds = (check_out - check_in).num_seconds() as f64;
    (seconds / 3600.0 * 100.0).round() / 100.0
}

/// Attendance status for a record.
///
/// Pure function of the two instants; recomputed in full at check-out so a
/// record can move from `late` to `half-day` once the span is known, but a
/// checked-out record is never touched again for that date.
pub fn determine_status(
    check_in: Option<NaiveDateTime>,
    check_out: Option<NaiveDateTime>,
) -> AttendanceStatus {
    let check_in = match check_in {
        Some(t) => t,
        None => return AttendanceStatus::Absent,
    };

    let late = check_in.time() > late_cutoff();

    let check_out = match check_out {
        Some(t) => t,
        None => {
            return if late {
                AttendanceStatus::Late
            } else {
                AttendanceStatus::Present
            };
        }
    };

    if calculate_hours(check_in, check_out) < HALF_DAY_HOURS {
        return AttendanceStatus::HalfDay;
    }

    if late {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn no_check_in_is_absent() {
        assert_eq!(determine_status(None, None), AttendanceStatus::Absent);
    }

    #[test]
    fn on_time_without_check_out_is_present() {
        assert_eq!(
            determine_status(Some(at(8, 55, 0)), None),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn cutoff_boundary_is_strict() {
        // 09:30:00 exactly is on time, one second later is late
        assert_eq!(
            determine_status(Some(at(9, 30, 0)), None),
            AttendanceStatus::Present
        );
        assert_eq!(
            determine_status(Some(at(9, 30, 1)), None),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn late_without_check_out_stays_late() {
        assert_eq!(
            determine_status(Some(at(9, 45, 0)), None),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn short_day_is_half_day_on_either_path() {
        // late arrival, 45 minutes worked
        assert_eq!(
            determine_status(Some(at(9, 45, 0)), Some(at(10, 30, 0))),
            AttendanceStatus::HalfDay
        );
        // on-time arrival, under four hours worked
        assert_eq!(
            determine_status(Some(at(9, 0, 0)), Some(at(12, 59, 0))),
            AttendanceStatus::HalfDay
        );
    }

    #[test]
    fn exactly_four_hours_is_not_half_day() {
        assert_eq!(
            determine_status(Some(at(9, 0, 0)), Some(at(13, 0, 0))),
            AttendanceStatus::Present
        );
        assert_eq!(
            determine_status(Some(at(10, 0, 0)), Some(at(14, 0, 0))),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn full_day_after_on_time_check_in_is_present() {
        let status = determine_status(Some(at(9, 15, 0)), Some(at(13, 20, 0)));
        assert_eq!(status, AttendanceStatus::Present);
        assert_eq!(calculate_hours(at(9, 15, 0), at(13, 20, 0)), 4.08);
    }

    #[test]
    fn hours_round_to_two_decimals() {
        assert_eq!(calculate_hours(at(9, 0, 0), at(17, 30, 0)), 8.5);
        assert_eq!(calculate_hours(at(9, 0, 0), at(9, 10, 0)), 0.17);
    }

    #[test]
    fn status_strings_round_trip() {
        assert_eq!(AttendanceStatus::HalfDay.as_str(), "half-day");
        assert_eq!(AttendanceStatus::HalfDay.to_string(), "half-day");
        assert_eq!(
            AttendanceStatus::from_str("half-day").unwrap(),
            AttendanceStatus::HalfDay
        );
        assert_eq!(
            AttendanceStatus::from_str("present").unwrap(),
            AttendanceStatus::Present
        );
        assert!(AttendanceStatus::from_str("vacation").is_err());
    }
}
