//! Calendar overlay markers and the full reconciliation pass.
//!
//! The overlay owns every marker handle on the calendar. Other modules hand
//! it date-keyed data to reconcile against; nothing else creates or removes
//! markers.

use chrono::NaiveDate;
use egui::Color32;
use std::collections::BTreeMap;

/// Opaque handle for one visual marker on a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Plan,
    Activity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub date: NaiveDate,
    pub kind: MarkerKind,
    pub color: Color32,
}

#[derive(Debug)]
pub enum OverlayError {
    UnknownHandle(MarkerId),
}

impl std::fmt::Display for OverlayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayError::UnknownHandle(id) => write!(f, "unknown overlay handle #{}", id.0),
        }
    }
}

impl std::error::Error for OverlayError {}

/// Retained marker state painted by the calendar widget each frame.
pub struct CalendarOverlay {
    markers: BTreeMap<MarkerId, Marker>,
    plan_color: Color32,
    activity_color: Color32,
    next_id: u64,
}

impl Default for CalendarOverlay {
    fn default() -> Self {
        Self {
            markers: BTreeMap::new(),
            plan_color: Color32::from_rgb(84, 134, 214),
            activity_color: Color32::from_rgb(96, 176, 96),
            next_id: 0,
        }
    }
}

impl CalendarOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_marker(&mut self, date: NaiveDate, kind: MarkerKind) -> MarkerId {
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        let color = self.kind_color(kind);
        self.markers.insert(id, Marker { date, kind, color });
        id
    }

    pub fn remove_marker(&mut self, id: MarkerId) -> Result<(), OverlayError> {
        self.markers
            .remove(&id)
            .map(|_| ())
            .ok_or(OverlayError::UnknownHandle(id))
    }

    pub fn kind_color(&self, kind: MarkerKind) -> Color32 {
        match kind {
            MarkerKind::Plan => self.plan_color,
            MarkerKind::Activity => self.activity_color,
        }
    }

    /// Set the color for a marker category and restyle every live marker of
    /// that category. Safe to reapply with the current color on every pass.
    pub fn set_style(&mut self, kind: MarkerKind, color: Color32) {
        match kind {
            MarkerKind::Plan => self.plan_color = color,
            MarkerKind::Activity => self.activity_color = color,
        }
        for marker in self.markers.values_mut() {
            if marker.kind == kind {
                marker.color = color;
            }
        }
    }

    pub fn live_handles(&self) -> Vec<MarkerId> {
        self.markers.keys().copied().collect()
    }

    pub fn markers_on(&self, date: NaiveDate) -> impl Iterator<Item = &Marker> {
        self.markers.values().filter(move |m| m.date == date)
    }

    pub fn has_marker(&self, date: NaiveDate, kind: MarkerKind) -> bool {
        self.markers
            .values()
            .any(|m| m.date == date && m.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Run a full reconciliation pass against the current date-keyed data.
    ///
    /// Every live handle is removed unconditionally, then one activity marker
    /// is created per date with at least one activity and one plan marker per
    /// date with at least one projected workout, and the category styles are
    /// reapplied. After the pass the live marker set equals exactly that
    /// union; no handle from a previous fetch or plan survives.
    ///
    /// A failed removal of an individual handle is logged and skipped; the
    /// rest of the pass proceeds, and the next pass re-attempts the full
    /// rebuild.
    pub fn reconcile<'a, A, P>(&mut self, activity_dates: A, plan_dates: P)
    where
        A: IntoIterator<Item = &'a NaiveDate>,
        P: IntoIterator<Item = &'a NaiveDate>,
    {
        for id in self.live_handles() {
            if let Err(err) = self.remove_marker(id) {
                log::debug!("skipping stale overlay handle: {err}");
            }
        }
        for date in activity_dates {
            self.create_marker(*date, MarkerKind::Activity);
        }
        for date in plan_dates {
            self.create_marker(*date, MarkerKind::Plan);
        }
        let plan_color = self.plan_color;
        let activity_color = self.activity_color;
        self.set_style(MarkerKind::Plan, plan_color);
        self.set_style(MarkerKind::Activity, activity_color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn count(overlay: &CalendarOverlay, date: NaiveDate, kind: MarkerKind) -> usize {
        overlay
            .markers_on(date)
            .filter(|m| m.kind == kind)
            .count()
    }

    #[test]
    fn pass_builds_exactly_one_marker_per_date_and_kind() {
        let mut overlay = CalendarOverlay::new();
        let activity_dates = [date(1), date(2)];
        let plan_dates = [date(2), date(3)];
        overlay.reconcile(activity_dates.iter(), plan_dates.iter());

        assert_eq!(overlay.len(), 4);
        assert_eq!(count(&overlay, date(1), MarkerKind::Activity), 1);
        assert_eq!(count(&overlay, date(2), MarkerKind::Activity), 1);
        assert_eq!(count(&overlay, date(2), MarkerKind::Plan), 1);
        assert_eq!(count(&overlay, date(3), MarkerKind::Plan), 1);
        assert_eq!(overlay.markers_on(date(4)).count(), 0);
    }

    #[test]
    fn repeated_passes_do_not_duplicate_markers() {
        let mut overlay = CalendarOverlay::new();
        let activity_dates = [date(1)];
        let plan_dates = [date(1)];
        overlay.reconcile(activity_dates.iter(), plan_dates.iter());
        overlay.reconcile(activity_dates.iter(), plan_dates.iter());
        overlay.reconcile(activity_dates.iter(), plan_dates.iter());

        assert_eq!(overlay.len(), 2);
        assert_eq!(count(&overlay, date(1), MarkerKind::Activity), 1);
        assert_eq!(count(&overlay, date(1), MarkerKind::Plan), 1);
    }

    #[test]
    fn stale_markers_from_previous_data_are_dropped() {
        let mut overlay = CalendarOverlay::new();
        overlay.reconcile([date(1)].iter(), [date(5)].iter());
        overlay.reconcile([date(2)].iter(), std::iter::empty());

        assert_eq!(overlay.len(), 1);
        assert!(overlay.has_marker(date(2), MarkerKind::Activity));
        assert!(!overlay.has_marker(date(1), MarkerKind::Activity));
        assert!(!overlay.has_marker(date(5), MarkerKind::Plan));
    }

    #[test]
    fn clearing_the_plan_leaves_activity_markers() {
        let mut overlay = CalendarOverlay::new();
        let activity_dates = [date(1), date(2)];
        overlay.reconcile(activity_dates.iter(), [date(2), date(3)].iter());
        overlay.reconcile(activity_dates.iter(), std::iter::empty());

        assert_eq!(overlay.len(), 2);
        assert!(overlay.has_marker(date(1), MarkerKind::Activity));
        assert!(overlay.has_marker(date(2), MarkerKind::Activity));
        assert!(!overlay.has_marker(date(2), MarkerKind::Plan));
        assert!(!overlay.has_marker(date(3), MarkerKind::Plan));
    }

    #[test]
    fn removing_an_unknown_handle_errors() {
        let mut overlay = CalendarOverlay::new();
        let id = overlay.create_marker(date(1), MarkerKind::Activity);
        overlay.remove_marker(id).unwrap();
        assert!(matches!(
            overlay.remove_marker(id),
            Err(OverlayError::UnknownHandle(_))
        ));
    }

    #[test]
    fn pass_recovers_from_externally_removed_handles() {
        let mut overlay = CalendarOverlay::new();
        overlay.reconcile([date(1)].iter(), [date(2)].iter());
        for id in overlay.live_handles() {
            overlay.remove_marker(id).unwrap();
        }
        overlay.reconcile([date(1)].iter(), [date(2)].iter());

        assert_eq!(overlay.len(), 2);
        assert!(overlay.has_marker(date(1), MarkerKind::Activity));
        assert!(overlay.has_marker(date(2), MarkerKind::Plan));
    }

    #[test]
    fn styles_survive_reconciliation() {
        let mut overlay = CalendarOverlay::new();
        overlay.set_style(MarkerKind::Plan, Color32::RED);
        overlay.reconcile(std::iter::empty(), [date(1)].iter());
        let marker = overlay.markers_on(date(1)).next().unwrap();
        assert_eq!(marker.color, Color32::RED);

        // Reapplying the same style is a no-op.
        overlay.set_style(MarkerKind::Plan, Color32::RED);
        let marker = overlay.markers_on(date(1)).next().unwrap();
        assert_eq!(marker.color, Color32::RED);
    }
}
