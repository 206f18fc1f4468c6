// Module for normalized running activities and date grouping
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One logged run, normalized from the raw API record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub date: NaiveDate,
    pub name: String,
    pub distance_km: f32,
    pub moving_time_s: u32,
    pub pace: String,
    pub avg_hr: Option<f32>,
    pub max_hr: Option<f32>,
}

/// Format a pace string as `M:SS/km`.
///
/// Returns `"N/A"` when the distance or moving time is missing or zero, so
/// treadmill entries without GPS data do not divide by zero.
pub fn format_pace(distance_km: f32, moving_time_s: u32) -> String {
    if distance_km <= 0.0 || moving_time_s == 0 {
        return "N/A".to_string();
    }
    let pace_minutes = (moving_time_s as f32 / 60.0) / distance_km;
    let whole = pace_minutes as u32;
    let seconds = ((pace_minutes - whole as f32) * 60.0) as u32;
    format!("{whole}:{seconds:02}/km")
}

/// Format a duration in seconds as `H:MM:SS`.
pub fn format_duration(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

/// Bucket activities by calendar date, preserving fetch order within a date.
///
/// The returned map is rebuilt wholesale on every refresh; callers replace
/// their previous map rather than merging into it.
pub fn group_by_date(activities: Vec<Activity>) -> BTreeMap<NaiveDate, Vec<Activity>> {
    let mut map: BTreeMap<NaiveDate, Vec<Activity>> = BTreeMap::new();
    for activity in activities {
        map.entry(activity.date).or_default().push(activity);
    }
    map
}

/// Format a user facing message after a completed fetch.
pub fn format_fetch_message(runs: usize, days: i64) -> String {
    format!("Processed {} runs from the past {} days", runs, days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(date: &str, name: &str) -> Activity {
        Activity {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            name: name.into(),
            distance_km: 10.0,
            moving_time_s: 3000,
            pace: format_pace(10.0, 3000),
            avg_hr: None,
            max_hr: None,
        }
    }

    #[test]
    fn pace_even_split() {
        assert_eq!(format_pace(10.0, 3000), "5:00/km");
    }

    #[test]
    fn pace_truncates_seconds() {
        // 1373 s over 5 km = 4.5766 min/km -> 4:34
        assert_eq!(format_pace(5.0, 1373), "4:34/km");
    }

    #[test]
    fn pace_missing_data() {
        assert_eq!(format_pace(0.0, 3000), "N/A");
        assert_eq!(format_pace(10.0, 0), "N/A");
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(3725), "1:02:05");
        assert_eq!(format_duration(125), "0:02:05");
        assert_eq!(format_duration(0), "0:00:00");
    }

    #[test]
    fn grouping_preserves_fetch_order() {
        let activities = vec![
            run("2024-01-07", "Morning Run"),
            run("2024-01-08", "Tempo"),
            run("2024-01-07", "Evening Shakeout"),
        ];
        let map = group_by_date(activities);
        assert_eq!(map.len(), 2);
        let jan7 = &map[&NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()];
        assert_eq!(jan7.len(), 2);
        assert_eq!(jan7[0].name, "Morning Run");
        assert_eq!(jan7[1].name, "Evening Shakeout");
    }

    #[test]
    fn fetch_message() {
        assert_eq!(
            format_fetch_message(12, 365),
            "Processed 12 runs from the past 365 days"
        );
    }
}
