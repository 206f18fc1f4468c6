use chrono::{Datelike, NaiveDate};
use egui_plot::{Line, PlotPoints};
use std::collections::BTreeMap;

use crate::activities::Activity;

/// Aggregate running distance into one point per ISO week.
///
/// The x value is the Monday of the week as days from the common era, the y
/// value the total kilometers logged that week. Weeks without runs produce no
/// point.
pub fn weekly_distance_points(
    activities: &BTreeMap<NaiveDate, Vec<Activity>>,
) -> Vec<[f64; 2]> {
    let mut map: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for (date, runs) in activities {
        let key = (date.iso_week().year(), date.iso_week().week());
        let km: f64 = runs.iter().map(|r| r.distance_km as f64).sum();
        *map.entry(key).or_insert(0.0) += km;
    }
    let mut points = Vec::new();
    for ((year, week), km) in map {
        if let Some(date) = NaiveDate::from_isoywd_opt(year, week, chrono::Weekday::Mon) {
            points.push([date.num_days_from_ce() as f64, km]);
        }
    }
    points
}

/// Line plot of weekly running distance.
pub fn weekly_distance_line(activities: &BTreeMap<NaiveDate, Vec<Activity>>) -> Line {
    Line::new(PlotPoints::from(weekly_distance_points(activities))).name("Weekly km")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::{format_pace, group_by_date};

    fn run(date: &str, km: f32) -> Activity {
        Activity {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            name: "Run".into(),
            distance_km: km,
            moving_time_s: 3000,
            pace: format_pace(km, 3000),
            avg_hr: None,
            max_hr: None,
        }
    }

    #[test]
    fn sums_distance_per_iso_week() {
        // 2024-01-08 through 2024-01-14 is one ISO week; the 15th starts the next.
        let activities = group_by_date(vec![
            run("2024-01-08", 10.0),
            run("2024-01-10", 5.0),
            run("2024-01-15", 21.1),
        ]);
        let points = weekly_distance_points(&activities);
        assert_eq!(points.len(), 2);
        assert!((points[0][1] - 15.0).abs() < 1e-6);
        assert!((points[1][1] - 21.1).abs() < 1e-4);
        assert!(points[0][0] < points[1][0]);
    }

    #[test]
    fn empty_input_produces_no_points() {
        let activities = BTreeMap::new();
        assert!(weekly_distance_points(&activities).is_empty());
    }
}
