//! Training plan files: CSV loading and projection onto calendar dates.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Canonical weekday codes in slot order. Slot 0 is Sunday.
pub const WEEKDAY_CODES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Cell text marking a rest day; matched case-insensitively.
pub const REST_SENTINEL: &str = "rest";

/// Plan file auto-selected from the plans folder when present.
pub const DEFAULT_PLAN_FILE: &str = "training_plan.csv";

static WEEKDAY_ALIASES: phf::Map<&'static str, usize> = phf::phf_map! {
    "sun" => 0, "sunday" => 0,
    "mon" => 1, "monday" => 1,
    "tue" => 2, "tues" => 2, "tuesday" => 2,
    "wed" => 3, "weds" => 3, "wednesday" => 3,
    "thu" => 4, "thur" => 4, "thurs" => 4, "thursday" => 4,
    "fri" => 5, "friday" => 5,
    "sat" => 6, "saturday" => 6,
};

/// Map a header cell to its weekday slot, accepting full names and common
/// abbreviations in any case. Unknown headers map to `None` and their columns
/// are ignored.
pub fn weekday_slot(header: &str) -> Option<usize> {
    WEEKDAY_ALIASES
        .get(header.trim().to_ascii_lowercase().as_str())
        .copied()
}

/// One week of the plan: a workout description per weekday slot.
///
/// Empty cells mean rest. Weekdays missing from the source file keep their
/// synthesized empty cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanRow {
    cells: [String; 7],
}

impl PlanRow {
    pub fn cell(&self, slot: usize) -> &str {
        &self.cells[slot]
    }

    pub fn set_cell(&mut self, slot: usize, text: &str) {
        self.cells[slot] = text.to_string();
    }
}

#[derive(Debug)]
pub enum PlanError {
    Io(std::io::Error),
    Csv(csv::Error),
    NoWeekdayColumns,
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::Io(e) => write!(f, "{e}"),
            PlanError::Csv(e) => write!(f, "{e}"),
            PlanError::NoWeekdayColumns => {
                write!(f, "no weekday columns found in the header row")
            }
        }
    }
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::Io(e) => Some(e),
            PlanError::Csv(e) => Some(e),
            PlanError::NoWeekdayColumns => None,
        }
    }
}

impl From<std::io::Error> for PlanError {
    fn from(e: std::io::Error) -> Self {
        PlanError::Io(e)
    }
}

impl From<csv::Error> for PlanError {
    fn from(e: csv::Error) -> Self {
        PlanError::Csv(e)
    }
}

/// Parse a weekly-grid plan CSV into ordered [`PlanRow`]s.
///
/// The header row names the weekday columns; one data row per week, in file
/// order. Any parse failure is returned as an error with no rows, so a broken
/// file never yields a partially applied plan.
pub fn parse_plan_csv<R: std::io::Read>(reader: R) -> Result<Vec<PlanRow>, PlanError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let slots: Vec<Option<usize>> = headers.iter().map(weekday_slot).collect();
    if !slots.iter().any(Option::is_some) {
        return Err(PlanError::NoWeekdayColumns);
    }
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let mut row = PlanRow::default();
        for (idx, slot) in slots.iter().enumerate() {
            if let Some(slot) = slot {
                row.cells[*slot] = record.get(idx).unwrap_or("").trim().to_string();
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn load_plan_file<P: AsRef<Path>>(path: P) -> Result<Vec<PlanRow>, PlanError> {
    let file = std::fs::File::open(path)?;
    parse_plan_csv(file)
}

/// List the CSV files in the plans folder, sorted by name.
pub fn list_plan_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if is_csv {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

/// Project plan rows onto absolute dates beginning at `start`.
///
/// The date cursor advances one day per weekday slot whether or not the cell
/// holds a workout, so slot `j` of week `i` always lands on `start + 7i + j`.
/// Cells that are empty or match the rest sentinel record nothing. The output
/// is fully determined by `rows` and `start`, so reapplying the same plan
/// after a data refresh reproduces the identical mapping.
pub fn project(rows: &[PlanRow], start: NaiveDate) -> BTreeMap<NaiveDate, Vec<String>> {
    let mut projected: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    let mut cursor = start;
    for row in rows {
        for slot in 0..WEEKDAY_CODES.len() {
            let cell = row.cell(slot);
            if !cell.is_empty() && !cell.eq_ignore_ascii_case(REST_SENTINEL) {
                projected.entry(cursor).or_default().push(cell.to_string());
            }
            cursor = cursor + Duration::days(1);
        }
    }
    projected
}

/// The date range a projected plan covers: `start` through the Saturday of
/// its final week. `None` for an empty plan.
pub fn plan_date_range(rows: &[PlanRow], start: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    if rows.is_empty() {
        None
    } else {
        Some((start, start + Duration::days(rows.len() as i64 * 7 - 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sunday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn header_aliases_normalize() {
        let rows = parse_plan_csv(
            "SUNDAY,mon,Tue,WEDS,thur,Friday,sat\na,b,c,d,e,f,g\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        for (slot, expected) in ["a", "b", "c", "d", "e", "f", "g"].iter().enumerate() {
            assert_eq!(rows[0].cell(slot), *expected);
        }
    }

    #[test]
    fn missing_weekdays_synthesize_empty_cells() {
        let rows = parse_plan_csv("Mon,Fri\ntempo,long run\n".as_bytes()).unwrap();
        assert_eq!(rows[0].cell(1), "tempo");
        assert_eq!(rows[0].cell(5), "long run");
        for slot in [0, 2, 3, 4, 6] {
            assert_eq!(rows[0].cell(slot), "");
        }
    }

    #[test]
    fn non_weekday_columns_are_ignored() {
        let rows =
            parse_plan_csv("Week,Mon,Notes\n1,tempo,taper week\n".as_bytes()).unwrap();
        assert_eq!(rows[0].cell(1), "tempo");
        assert_eq!(rows[0].cell(0), "");
    }

    #[test]
    fn no_weekday_columns_is_an_error() {
        let err = parse_plan_csv("Week,Notes\n1,hello\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PlanError::NoWeekdayColumns));
    }

    #[test]
    fn ragged_row_is_an_error() {
        let err = parse_plan_csv("Sun,Mon\neasy\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PlanError::Csv(_)));
    }

    #[test]
    fn projection_worked_example() {
        // One week: Sun "3mi easy", Mon "rest", Sat "5mi long".
        let rows =
            parse_plan_csv("Sun,Mon,Tue,Wed,Thu,Fri,Sat\n3mi easy,rest,,,,,5mi long\n".as_bytes())
                .unwrap();
        let projected = project(&rows, sunday());
        assert_eq!(projected.len(), 2);
        assert_eq!(projected[&date(2024, 1, 7)], vec!["3mi easy".to_string()]);
        assert_eq!(projected[&date(2024, 1, 13)], vec!["5mi long".to_string()]);
        assert!(!projected.contains_key(&date(2024, 1, 8)));
    }

    #[test]
    fn rest_sentinel_is_case_insensitive_and_still_advances() {
        let rows = parse_plan_csv(
            "Sun,Mon,Tue,Wed,Thu,Fri,Sat\nREST,Rest,rest,,,,easy 4\n".as_bytes(),
        )
        .unwrap();
        let projected = project(&rows, sunday());
        assert_eq!(projected.len(), 1);
        // The rest cells consumed their slots, so Saturday still lands on the 13th.
        assert_eq!(projected[&date(2024, 1, 13)], vec!["easy 4".to_string()]);
    }

    #[test]
    fn weekday_alignment_across_weeks() {
        // Week 2 (0-indexed), Wednesday (slot 3) must land on start + 7*2 + 3.
        let mut rows = vec![PlanRow::default(), PlanRow::default(), PlanRow::default()];
        rows[2].set_cell(3, "hill repeats");
        let projected = project(&rows, sunday());
        assert_eq!(projected.len(), 1);
        assert_eq!(
            projected[&(sunday() + Duration::days(7 * 2 + 3))],
            vec!["hill repeats".to_string()]
        );
    }

    #[test]
    fn projection_is_deterministic() {
        let rows = parse_plan_csv(
            "Sun,Mon,Tue,Wed,Thu,Fri,Sat\n3mi easy,rest,4mi,,5x400m,,10mi long\n\
             rest,3mi,5mi,,6x400m,,12mi long\n"
                .as_bytes(),
        )
        .unwrap();
        let first = project(&rows, sunday());
        let second = project(&rows, sunday());
        assert_eq!(first, second);
    }

    #[test]
    fn date_range_spans_whole_weeks() {
        let rows = vec![PlanRow::default(), PlanRow::default()];
        assert_eq!(
            plan_date_range(&rows, sunday()),
            Some((date(2024, 1, 7), date(2024, 1, 20)))
        );
        assert_eq!(plan_date_range(&[], sunday()), None);
    }

    #[test]
    fn plan_file_listing_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_marathon.csv"), "Sun\n").unwrap();
        std::fs::write(dir.path().join("a_base.CSV"), "Sun\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let files = list_plan_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a_base.CSV", "b_marathon.csv"]);
    }
}
