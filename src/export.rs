use crate::activities::Activity;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

pub fn write_csv<T: Serialize>(writer: impl Write, records: &[T]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(Into::into)
}

/// Save the fetched activities, flattened in date order, as CSV rows.
pub fn save_activities_csv<P: AsRef<Path>>(path: P, activities: &[Activity]) -> csv::Result<()> {
    write_csv(std::fs::File::create(path)?, activities)
}

pub fn save_activities_json<P: AsRef<Path>>(
    path: P,
    activities: &[Activity],
) -> std::io::Result<()> {
    write_json(activities, path)
}
