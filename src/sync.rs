use crate::activities::{Activity, format_pace};
use chrono::{Duration, Local, NaiveDate};
use serde::Deserialize;

const ACTIVITIES_URL: &str = "https://www.strava.com/api/v3/athlete/activities";
const PER_PAGE: usize = 100;

/// Determine the API key to use for activity requests.
///
/// If the `RUN_CAL_API_KEY` environment variable is set, its value takes
/// precedence over any key stored in the credentials file.
pub fn resolve_api_key(stored_key: Option<&str>) -> Option<String> {
    std::env::var("RUN_CAL_API_KEY").ok().or_else(|| stored_key.map(|s| s.to_string()))
}

#[derive(Debug)]
pub enum SyncError {
    Unauthorized(String),
    Forbidden(String),
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Unauthorized(body) => write!(f, "Unauthorized: {body}"),
            SyncError::Forbidden(body) => write!(f, "Forbidden: {body}"),
            SyncError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Unauthorized(_) | SyncError::Forbidden(_) => None,
            SyncError::Other(e) => Some(&**e),
        }
    }
}

/// Raw activity record as returned by the listing endpoint. Only the fields
/// the calendar consumes are extracted; everything else is ignored.
#[derive(Debug, Deserialize)]
struct RawActivity {
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    start_date_local: Option<String>,
    distance: Option<f64>,
    moving_time: Option<u64>,
    average_heartrate: Option<f32>,
    max_heartrate: Option<f32>,
}

fn fetch_page(
    url: &str,
    api_key: &str,
    page: u32,
    per_page: usize,
) -> Result<Vec<RawActivity>, SyncError> {
    let response = ureq::get(url)
        .query("page", &page.to_string())
        .query("per_page", &per_page.to_string())
        .set("Authorization", &format!("Bearer {api_key}"))
        .set("Accept", "application/json")
        .call();
    let resp = match response {
        Ok(r) => r.into_string().map_err(|e| SyncError::Other(Box::new(e)))?,
        Err(ureq::Error::Status(401, r)) => {
            let body = r.into_string().unwrap_or_default();
            return Err(SyncError::Unauthorized(body));
        }
        Err(ureq::Error::Status(403, r)) => {
            let body = r.into_string().unwrap_or_default();
            return Err(SyncError::Forbidden(body));
        }
        Err(e) => return Err(SyncError::Other(Box::new(e))),
    };
    serde_json::from_str(&resp).map_err(|e| SyncError::Other(Box::new(e)))
}

/// Map one raw record to a normalized [`Activity`].
///
/// Non-running activities, records without a parseable local start date and
/// records predating `cutoff` all yield `None`. A predating record never ends
/// pagination; the caller keeps scanning and drops it here.
fn normalize_activity(raw: &RawActivity, cutoff: NaiveDate) -> Option<Activity> {
    if raw.kind.as_deref() != Some("Run") {
        return None;
    }
    let start = raw.start_date_local.as_deref()?;
    let date =
        NaiveDate::parse_from_str(start.split('T').next().unwrap_or(""), "%Y-%m-%d").ok()?;
    if date < cutoff {
        return None;
    }
    let distance_km = (raw.distance.unwrap_or(0.0) / 1000.0) as f32;
    let moving_time_s = raw.moving_time.unwrap_or(0) as u32;
    Some(Activity {
        date,
        name: raw.name.clone().unwrap_or_else(|| "Run".to_string()),
        distance_km,
        moving_time_s,
        pace: format_pace(distance_km, moving_time_s),
        avg_hr: raw.average_heartrate,
        max_hr: raw.max_heartrate,
    })
}

fn fetch_running_activities_with_url(
    url: &str,
    api_key: &str,
    cutoff: NaiveDate,
    per_page: usize,
) -> Result<Vec<Activity>, SyncError> {
    let mut runs = Vec::new();
    let mut page = 1u32;
    loop {
        let batch = fetch_page(url, api_key, page, per_page)?;
        let batch_len = batch.len();
        for raw in &batch {
            if let Some(activity) = normalize_activity(raw, cutoff) {
                runs.push(activity);
            }
        }
        // Pagination ends on a short batch only. Records older than the
        // cutoff are skipped one by one, so a history that reaches past the
        // cutoff is still scanned to its end.
        if batch_len < per_page {
            break;
        }
        page += 1;
    }
    Ok(runs)
}

/// Fetch the user's running activities from the last `window_days` days.
///
/// The listing endpoint is paged with a fixed batch size; authentication
/// failures abort the fetch and are mapped to [`SyncError::Unauthorized`] or
/// [`SyncError::Forbidden`] with the response body attached.
pub fn fetch_running_activities(
    api_key: &str,
    window_days: i64,
) -> Result<Vec<Activity>, SyncError> {
    let cutoff = Local::now().date_naive() - Duration::days(window_days);
    log::info!("Fetching running activities since {cutoff}");
    fetch_running_activities_with_url(ACTIVITIES_URL, api_key, cutoff, PER_PAGE)
}
