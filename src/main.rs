//! Main application logic and persistent user settings.

use dirs_next as dirs;
use eframe::{App, Frame, NativeOptions, egui};
use egui_extras::DatePickerButton;
use egui_plot::{Legend, Plot};
use rfd::FileDialog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use log::info;

mod activities;
use activities::{Activity, format_duration, format_fetch_message, group_by_date};
mod calendar;
use calendar::MonthCalendar;
mod credentials;
use credentials::Credentials;
mod evaluations;
use evaluations::Evaluations;
mod export;
use export::{save_activities_csv, save_activities_json};
mod overlay;
use overlay::CalendarOverlay;
mod plan;
use plan::PlanRow;
mod plotting;
mod sync;

fn default_fetch_window_days() -> i64 {
    365
}

fn default_plot_width() -> f32 {
    400.0
}

fn default_plot_height() -> f32 {
    200.0
}

/// Persistent configuration for user preferences.
///
/// The values are serialized to a JSON file so choices like the plans folder
/// and the plan start date survive across application restarts. Fields are
/// `#[serde(default)]`-tolerant so configurations written by older versions
/// still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Settings {
    #[serde(default)]
    plans_dir: Option<String>,
    #[serde(default)]
    last_plan_file: Option<String>,
    #[serde(default)]
    auto_load_plan: bool,
    #[serde(default)]
    plan_start_date: Option<NaiveDate>,
    #[serde(default = "default_fetch_window_days")]
    fetch_window_days: i64,
    #[serde(default)]
    fetch_on_startup: bool,
    #[serde(default)]
    show_weekly_plot: bool,
    #[serde(default = "default_plot_width")]
    plot_width: f32,
    #[serde(default = "default_plot_height")]
    plot_height: f32,
}

impl Settings {
    const FILE: &'static str = "running_calendar_settings.json";

    fn path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                if let Ok(cfg) = serde_json::from_str(&data) {
                    return cfg;
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(data) = serde_json::to_string_pretty(self) {
                let _ = std::fs::write(path, data);
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            plans_dir: None,
            last_plan_file: None,
            auto_load_plan: true,
            plan_start_date: None,
            fetch_window_days: 365,
            fetch_on_startup: true,
            show_weekly_plot: false,
            plot_width: 400.0,
            plot_height: 200.0,
        }
    }
}

/// Assemble the detail text for one selected date.
///
/// Planned workouts come first, then logged runs, then the evaluation note.
/// When neither plan nor activities cover the date a placeholder line is
/// rendered instead. Read-only: no stored mapping is touched.
fn day_detail(
    date: NaiveDate,
    projected: &BTreeMap<NaiveDate, Vec<String>>,
    activities: &BTreeMap<NaiveDate, Vec<Activity>>,
    evaluations: &Evaluations,
) -> String {
    let mut out = String::new();
    if let Some(workouts) = projected.get(&date) {
        for workout in workouts {
            out.push_str(&format!("Planned: {workout}\n"));
        }
    }
    if let Some(runs) = activities.get(&date) {
        for run in runs {
            out.push_str(&format!(
                "Run: {}\nDistance: {:.2} km\nDuration: {}\nPace: {}\n",
                run.name,
                run.distance_km,
                format_duration(run.moving_time_s),
                run.pace
            ));
            if let Some(avg) = run.avg_hr {
                out.push_str(&format!("Avg HR: {avg:.0}\n"));
            }
            if let Some(max) = run.max_hr {
                out.push_str(&format!("Max HR: {max:.0}\n"));
            }
            out.push_str("------------------------\n");
        }
    }
    if !projected.contains_key(&date) && !activities.contains_key(&date) {
        out.push_str("No runs logged on this date.\n");
    }
    if let Some(note) = evaluations.get(date) {
        out.push_str(&format!("Evaluation: {note}\n"));
    }
    out
}

struct MyApp {
    settings: Settings,
    settings_dirty: bool,
    credentials: Option<Credentials>,
    activities: BTreeMap<NaiveDate, Vec<Activity>>,
    plan_rows: Vec<PlanRow>,
    projected: BTreeMap<NaiveDate, Vec<String>>,
    plan_files: Vec<PathBuf>,
    selected_plan: Option<PathBuf>,
    plan_start: NaiveDate,
    overlay: CalendarOverlay,
    month: MonthCalendar,
    selected_date: Option<NaiveDate>,
    evaluations: Evaluations,
    evaluation_draft: String,
    status: Option<String>,
    toast_start: Option<Instant>,
    show_settings: bool,
    show_credentials: bool,
    show_about: bool,
    athlete_id_input: String,
    api_key_input: String,
}

impl Default for MyApp {
    fn default() -> Self {
        let settings = Settings::load();
        let credentials = Credentials::load();
        let plan_start = settings
            .plan_start_date
            .unwrap_or_else(|| Local::now().date_naive());

        let mut app = Self {
            settings,
            settings_dirty: false,
            credentials,
            activities: BTreeMap::new(),
            plan_rows: Vec::new(),
            projected: BTreeMap::new(),
            plan_files: Vec::new(),
            selected_plan: None,
            plan_start,
            overlay: CalendarOverlay::new(),
            month: MonthCalendar::for_today(),
            selected_date: None,
            evaluations: Evaluations::load(),
            evaluation_draft: String::new(),
            status: None,
            toast_start: None,
            show_settings: false,
            show_credentials: false,
            show_about: false,
            athlete_id_input: String::new(),
            api_key_input: String::new(),
        };

        if let Some(creds) = &app.credentials {
            app.athlete_id_input = creds.athlete_id.clone();
            app.api_key_input = creds.api_key.clone();
        }

        app.refresh_plan_files();
        if app.settings.auto_load_plan {
            if let Some(path) = app.startup_plan_file() {
                app.apply_plan(path);
            }
        }

        let has_key =
            sync::resolve_api_key(app.credentials.as_ref().map(|c| c.api_key.as_str())).is_some();
        if !has_key {
            app.show_credentials = true;
            app.status = Some("Enter your API credentials to fetch activities".into());
        } else if app.settings.fetch_on_startup {
            app.refresh_activities();
        }

        app
    }
}

impl MyApp {
    fn plans_dir(&self) -> PathBuf {
        self.settings
            .plans_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn refresh_plan_files(&mut self) {
        self.plan_files = plan::list_plan_files(&self.plans_dir());
    }

    /// The plan file to load at startup: the remembered selection when it
    /// still exists, otherwise the default file name in the plans folder.
    fn startup_plan_file(&self) -> Option<PathBuf> {
        if let Some(last) = &self.settings.last_plan_file {
            let path = PathBuf::from(last);
            if path.exists() {
                return Some(path);
            }
        }
        let default = self.plans_dir().join(plan::DEFAULT_PLAN_FILE);
        default.exists().then_some(default)
    }

    fn reconcile_overlay(&mut self) {
        self.overlay
            .reconcile(self.activities.keys(), self.projected.keys());
    }

    /// Fetch activities and rebuild the date mapping from scratch.
    ///
    /// The mapping is cleared up front, so a failed fetch leaves no partial
    /// data behind; the plan overlay is untouched either way.
    fn refresh_activities(&mut self) {
        let Some(key) =
            sync::resolve_api_key(self.credentials.as_ref().map(|c| c.api_key.as_str()))
        else {
            self.show_credentials = true;
            self.status = Some("Enter your API credentials to fetch activities".into());
            return;
        };

        self.status = Some("Fetching your activities...".into());
        self.activities.clear();
        match sync::fetch_running_activities(&key, self.settings.fetch_window_days) {
            Ok(runs) => {
                let count = runs.len();
                self.activities = group_by_date(runs);
                info!("Fetched {count} runs");
                self.status = Some(format_fetch_message(count, self.settings.fetch_window_days));
                self.toast_start = Some(Instant::now());
            }
            Err(err @ (sync::SyncError::Unauthorized(_) | sync::SyncError::Forbidden(_))) => {
                log::error!("Authentication failed: {err}");
                self.show_credentials = true;
                self.status = Some("Authentication failed; check your API credentials".into());
            }
            Err(err) => {
                log::error!("Failed to fetch activities: {err}");
                self.status = Some(format!("Error fetching activities: {err}"));
            }
        }
        self.reconcile_overlay();
    }

    /// Load and project a plan file. A load error resets the plan to empty
    /// rather than leaving a partially applied one.
    fn apply_plan(&mut self, path: PathBuf) {
        match plan::load_plan_file(&path) {
            Ok(rows) => {
                let filename = path
                    .file_name()
                    .map(|f| f.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                info!("Loaded plan {} ({} weeks)", filename, rows.len());
                self.status = Some(format!("Loaded plan {} ({} weeks)", filename, rows.len()));
                self.plan_rows = rows;
                self.projected = plan::project(&self.plan_rows, self.plan_start);
                self.selected_plan = Some(path.clone());
                self.settings.last_plan_file = Some(path.display().to_string());
                self.settings_dirty = true;
                self.toast_start = Some(Instant::now());
            }
            Err(err) => {
                log::error!("Failed to load plan {}: {err}", path.display());
                self.plan_rows.clear();
                self.projected.clear();
                self.selected_plan = None;
                self.status = Some(format!("Error loading plan: {err}"));
            }
        }
        self.reconcile_overlay();
    }

    fn clear_plan(&mut self) {
        self.plan_rows.clear();
        self.projected.clear();
        self.selected_plan = None;
        self.status = Some("Plan cleared".into());
        self.reconcile_overlay();
    }

    /// Re-project the loaded plan after the start date changed.
    fn reproject_plan(&mut self) {
        self.projected = plan::project(&self.plan_rows, self.plan_start);
        self.reconcile_overlay();
    }

    fn save_credentials(&mut self) {
        let creds = Credentials {
            athlete_id: self.athlete_id_input.trim().to_string(),
            api_key: self.api_key_input.trim().to_string(),
        };
        if creds.athlete_id.is_empty() || creds.api_key.is_empty() {
            self.status = Some("Both athlete ID and API key are required".into());
            return;
        }
        if let Err(err) = creds.save() {
            log::error!("Failed to save credentials: {err}");
            self.status = Some(format!("Error saving credentials: {err}"));
            return;
        }
        self.credentials = Some(creds);
        self.show_credentials = false;
        self.status = Some("Credentials saved".into());
    }

    fn save_evaluation(&mut self) {
        let Some(date) = self.selected_date else {
            return;
        };
        self.evaluations.set(date, &self.evaluation_draft);
        match self.evaluations.save() {
            Ok(()) => {
                self.status = Some(format!("Evaluation saved for {date}"));
            }
            Err(err) => {
                log::error!("Failed to save evaluations: {err}");
                self.status = Some(format!("Error saving evaluation: {err}"));
            }
        }
    }

    fn export_activities(&mut self) {
        let Some(path) = FileDialog::new()
            .add_filter("JSON", &["json"])
            .add_filter("CSV", &["csv"])
            .save_file()
        else {
            return;
        };
        let all: Vec<Activity> = self.activities.values().flatten().cloned().collect();
        let result = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
        {
            Some(ext) if ext == "csv" => save_activities_csv(&path, &all).map_err(|e| e.to_string()),
            _ => save_activities_json(&path, &all).map_err(|e| e.to_string()),
        };
        match result {
            Ok(()) => self.status = Some(format!("Exported {} runs", all.len())),
            Err(err) => {
                log::error!("Failed to export activities: {err}");
                self.status = Some(format!("Error exporting activities: {err}"));
            }
        }
    }

    fn sync_settings_from_app(&mut self) {
        self.settings.plan_start_date = Some(self.plan_start);
    }
}

impl App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Settings").clicked() {
                        self.show_settings = true;
                        ui.close_menu();
                    }
                    if ui.button("Credentials").clicked() {
                        self.show_credentials = true;
                        ui.close_menu();
                    }
                    if ui.button("Export Activities").clicked() {
                        self.export_activities();
                        ui.close_menu();
                    }
                    if ui.button("Usage Tips").clicked() {
                        self.show_about = true;
                        ui.close_menu();
                    }
                });
            });
        });

        egui::TopBottomPanel::top("control_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Refresh Activities").clicked() {
                    self.refresh_activities();
                }

                ui.separator();

                ui.label("Plan:");
                let selected_label = self
                    .selected_plan
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map(|f| f.to_string_lossy().to_string())
                    .unwrap_or_else(|| "Select plan".to_string());
                let mut pick: Option<PathBuf> = None;
                egui::ComboBox::from_id_source("plan_file_combo")
                    .selected_text(selected_label)
                    .show_ui(ui, |ui| {
                        for path in &self.plan_files {
                            let name = path
                                .file_name()
                                .map(|f| f.to_string_lossy().to_string())
                                .unwrap_or_else(|| path.display().to_string());
                            let checked = self.selected_plan.as_deref() == Some(path.as_path());
                            if ui.selectable_label(checked, name).clicked() {
                                pick = Some(path.clone());
                            }
                        }
                    });
                if let Some(path) = pick {
                    self.apply_plan(path);
                }

                if ui.button("Clear Plan").clicked() {
                    self.clear_plan();
                }

                ui.label("Start:");
                let resp =
                    ui.add(DatePickerButton::new(&mut self.plan_start).id_source("plan_start"));
                if resp.changed() {
                    self.settings.plan_start_date = Some(self.plan_start);
                    self.settings_dirty = true;
                    if !self.plan_rows.is_empty() {
                        self.reproject_plan();
                    }
                }

                if ui.button("Plans Folder...").clicked() {
                    if let Some(dir) = FileDialog::new().pick_folder() {
                        self.settings.plans_dir = Some(dir.display().to_string());
                        self.settings_dirty = true;
                        self.refresh_plan_files();
                    }
                }
            });
        });

        egui::SidePanel::left("info_panel").show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                match &self.credentials {
                    Some(creds) => {
                        ui.label(format!("Athlete {}", creds.athlete_id));
                    }
                    None => {
                        ui.label("No credentials stored");
                    }
                }
                ui.separator();

                let run_count: usize = self.activities.values().map(Vec::len).sum();
                if self.activities.is_empty() {
                    ui.label("No activities fetched");
                } else {
                    ui.label(format!("{} runs on {} days", run_count, self.activities.len()));
                }

                match plan::plan_date_range(&self.plan_rows, self.plan_start) {
                    Some((start, end)) => {
                        ui.label(format!("Plan: {} weeks", self.plan_rows.len()));
                        ui.label(format!("{start} to {end}"));
                    }
                    None => {
                        ui.label("No plan applied");
                    }
                }

                if !self.evaluations.is_empty() {
                    ui.label(format!("{} evaluations", self.evaluations.len()));
                }

                ui.separator();
                if let Some(status) = &self.status {
                    ui.label(status.clone());
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let clicked = self.month.ui(ui, &self.overlay, self.selected_date);
            if let Some(date) = clicked {
                self.selected_date = Some(date);
                self.evaluation_draft = self.evaluations.get(date).unwrap_or_default().to_string();
            }

            ui.separator();
            match self.selected_date {
                Some(date) => {
                    ui.label(
                        egui::RichText::new(date.format("%A, %Y-%m-%d").to_string()).strong(),
                    );
                    let detail =
                        day_detail(date, &self.projected, &self.activities, &self.evaluations);
                    egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                        ui.label(egui::RichText::new(detail).monospace());
                    });

                    ui.label("Evaluation:");
                    ui.add(
                        egui::TextEdit::multiline(&mut self.evaluation_draft)
                            .desired_rows(3)
                            .desired_width(f32::INFINITY),
                    );
                    if ui.button("Save Evaluation").clicked() {
                        self.save_evaluation();
                    }
                }
                None => {
                    ui.label("Select a date to see planned workouts and logged runs");
                }
            }
        });

        if self.settings.show_weekly_plot {
            let mut open = true;
            egui::Window::new("Weekly Distance")
                .open(&mut open)
                .show(ctx, |ui| {
                    let line = plotting::weekly_distance_line(&self.activities);
                    Plot::new("weekly_distance_plot")
                        .legend(Legend::default())
                        .width(self.settings.plot_width)
                        .height(self.settings.plot_height)
                        .show(ui, |plot_ui| plot_ui.line(line));
                });
            if !open {
                self.settings.show_weekly_plot = false;
                self.settings_dirty = true;
            }
        }

        egui::Window::new("Settings")
            .open(&mut self.show_settings)
            .show(ctx, |ui| {
                egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Fetch window (days):");
                    if ui
                        .add(
                            egui::DragValue::new(&mut self.settings.fetch_window_days)
                                .clamp_range(1..=3650),
                        )
                        .changed()
                    {
                        self.settings_dirty = true;
                    }
                    ui.end_row();

                    ui.label("Fetch on startup:");
                    if ui.checkbox(&mut self.settings.fetch_on_startup, "").changed() {
                        self.settings_dirty = true;
                    }
                    ui.end_row();

                    ui.label("Auto-load plan:");
                    if ui.checkbox(&mut self.settings.auto_load_plan, "").changed() {
                        self.settings_dirty = true;
                    }
                    ui.end_row();

                    ui.label("Weekly distance plot:");
                    if ui.checkbox(&mut self.settings.show_weekly_plot, "").changed() {
                        self.settings_dirty = true;
                    }
                    ui.end_row();

                    ui.label("Plot width:");
                    if ui
                        .add(egui::Slider::new(&mut self.settings.plot_width, 200.0..=800.0))
                        .changed()
                    {
                        self.settings_dirty = true;
                    }
                    ui.end_row();

                    ui.label("Plot height:");
                    if ui
                        .add(egui::Slider::new(&mut self.settings.plot_height, 100.0..=600.0))
                        .changed()
                    {
                        self.settings_dirty = true;
                    }
                    ui.end_row();
                });
            });

        let mut save_credentials = false;
        egui::Window::new("Credentials")
            .open(&mut self.show_credentials)
            .show(ctx, |ui| {
                ui.label("Athlete ID:");
                ui.text_edit_singleline(&mut self.athlete_id_input);
                ui.label("API Key:");
                ui.add(egui::TextEdit::singleline(&mut self.api_key_input).password(true));
                if ui.button("Save").clicked() {
                    save_credentials = true;
                }
            });
        if save_credentials {
            self.save_credentials();
        }

        egui::Window::new("Usage Tips")
            .open(&mut self.show_about)
            .show(ctx, |ui| {
                ui.label(
                    "Refresh Activities fetches your recent runs and marks them on the calendar.",
                );
                ui.label("Plan files are CSVs with weekday columns; one row per training week.");
                ui.label("Pick a start date, then apply a plan to overlay planned workouts.");
                ui.label("Click a calendar date to review the day and write an evaluation.");
            });

        if let Some(start) = self.toast_start {
            if start.elapsed() < Duration::from_secs(4) {
                egui::Window::new("status_toast")
                    .title_bar(false)
                    .resizable(false)
                    .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
                    .show(ctx, |ui| {
                        if let Some(status) = &self.status {
                            ui.label(status.clone());
                        }
                    });
            } else {
                self.toast_start = None;
            }
        }

        if self.settings_dirty {
            self.sync_settings_from_app();
            self.settings.save();
            self.settings_dirty = false;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.sync_settings_from_app();
        self.settings.save();
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let options = NativeOptions::default();
    eframe::run_native(
        "Running Training Calendar",
        options,
        Box::new(|_cc| Box::new(MyApp::default())),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    pub static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
}
