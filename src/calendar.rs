//! Month-grid calendar widget.
//!
//! The widget paints marker stripes from the overlay but never mutates it;
//! all marker bookkeeping happens in the reconciliation pass.

use crate::overlay::{CalendarOverlay, MarkerKind};
use crate::plan::WEEKDAY_CODES;
use chrono::{Datelike, Local, NaiveDate};
use egui::{Align2, FontId, Rect, RichText, Sense, Stroke, pos2};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const CELL_SIZE: egui::Vec2 = egui::Vec2 { x: 40.0, y: 34.0 };
const STRIPE_HEIGHT: f32 = 5.0;

/// Displayed month with navigation state.
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
}

impl MonthCalendar {
    pub fn for_today() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn prev_month(&mut self) {
        if self.month == 1 {
            self.month = 12;
            self.year -= 1;
        } else {
            self.month -= 1;
        }
    }

    pub fn next_month(&mut self) {
        if self.month == 12 {
            self.month = 1;
            self.year += 1;
        } else {
            self.month += 1;
        }
    }

    pub fn show_month(&mut self, date: NaiveDate) {
        self.year = date.year();
        self.month = date.month();
    }

    pub fn title(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }

    /// Render the calendar and return the date clicked this frame, if any.
    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        overlay: &CalendarOverlay,
        selected: Option<NaiveDate>,
    ) -> Option<NaiveDate> {
        let mut clicked = None;
        let today = Local::now().date_naive();

        ui.horizontal(|ui| {
            if ui.button("\u{25C0}").clicked() {
                self.prev_month();
            }
            ui.label(RichText::new(self.title()).strong());
            if ui.button("\u{25B6}").clicked() {
                self.next_month();
            }
            if ui.button("Today").clicked() {
                self.show_month(today);
            }
        });
        egui::Grid::new("month_grid")
            .num_columns(7)
            .spacing([4.0, 4.0])
            .show(ui, |ui| {
                for code in WEEKDAY_CODES {
                    ui.label(RichText::new(code).small());
                }
                ui.end_row();
                for (i, cell) in month_grid(self.year, self.month).iter().enumerate() {
                    match cell {
                        Some(date) => {
                            if day_cell(ui, *date, overlay, selected, today).clicked() {
                                clicked = Some(*date);
                            }
                        }
                        None => {
                            ui.label("");
                        }
                    }
                    if i % 7 == 6 {
                        ui.end_row();
                    }
                }
            });

        clicked
    }
}

fn day_cell(
    ui: &mut egui::Ui,
    date: NaiveDate,
    overlay: &CalendarOverlay,
    selected: Option<NaiveDate>,
    today: NaiveDate,
) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(CELL_SIZE, Sense::click());
    if ui.is_rect_visible(rect) {
        let visuals = ui.style().interact(&response);
        let painter = ui.painter();
        painter.rect_filled(rect, 4.0, visuals.bg_fill);

        if overlay.has_marker(date, MarkerKind::Plan) {
            let stripe = Rect::from_min_max(
                rect.left_top(),
                pos2(rect.right(), rect.top() + STRIPE_HEIGHT),
            );
            painter.rect_filled(stripe, 2.0, overlay.kind_color(MarkerKind::Plan));
        }
        if overlay.has_marker(date, MarkerKind::Activity) {
            let stripe = Rect::from_min_max(
                pos2(rect.left(), rect.bottom() - STRIPE_HEIGHT),
                rect.right_bottom(),
            );
            painter.rect_filled(stripe, 2.0, overlay.kind_color(MarkerKind::Activity));
        }

        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            date.day().to_string(),
            FontId::proportional(13.0),
            visuals.text_color(),
        );

        if date == today {
            painter.rect_stroke(rect, 4.0, Stroke::new(1.0, ui.visuals().warn_fg_color));
        }
        if selected == Some(date) {
            painter.rect_stroke(rect, 4.0, ui.visuals().selection.stroke);
        }
    }
    response
}

/// Lay out a month as 42 cells (six weeks of seven slots, Sunday first).
/// Slots before the first and after the last day of the month are `None`.
pub fn month_grid(year: i32, month: u32) -> Vec<Option<NaiveDate>> {
    let mut cells = vec![None; 42];
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return cells;
    };
    let offset = first.weekday().num_days_from_sunday() as usize;
    for day in 1..=days_in_month(year, month) {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            let idx = offset + (day - 1) as usize;
            if idx < cells.len() {
                cells[idx] = Some(date);
            }
        }
    }
    cells
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.map(|n| (n - first).num_days() as u32).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_offset_by_the_first_weekday() {
        // 2024-01-01 is a Monday, so Sunday slot 0 is empty.
        let grid = month_grid(2024, 1);
        assert_eq!(grid.len(), 42);
        assert_eq!(grid[0], None);
        assert_eq!(grid[1], NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(grid[31], NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(grid[32], None);
    }

    #[test]
    fn leap_february_has_29_days() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn month_navigation_wraps_years() {
        let mut cal = MonthCalendar { year: 2024, month: 1 };
        cal.prev_month();
        assert_eq!((cal.year, cal.month), (2023, 12));
        cal.next_month();
        assert_eq!((cal.year, cal.month), (2024, 1));

        let mut cal = MonthCalendar {
            year: 2024,
            month: 12,
        };
        cal.next_month();
        assert_eq!((cal.year, cal.month), (2025, 1));
    }

    #[test]
    fn title_names_the_month() {
        let cal = MonthCalendar { year: 2024, month: 7 };
        assert_eq!(cal.title(), "July 2024");
    }
}
