//! View state kept between invocations: station positions and pan/zoom of
//! the factory view, the timeline selection and date range, and the theme.
//!
//! Everything is stored as JSON strings in a [`PreferenceStore`]. Reads are
//! forgiving: malformed values fall back to defaults instead of failing.
//! Every change rewrites the stored value.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use floortrack_common::Position;
use floortrack_common::routing::{StationPositions, grid_layout};
use floortrack_common::timestamp;

use crate::errors::StorageError;
use crate::prefs::PreferenceStore;

pub const STATION_POSITIONS_KEY: &str = "factory_view_station_positions";
pub const VIEW_CONFIG_KEY: &str = "factory_view_config";
pub const TIMELINE_SELECTED_KEY: &str = "timelineSelectedJobs";
pub const TIMELINE_RANGE_KEY: &str = "timelineViewDateRange";
pub const THEME_KEY: &str = "appThemePreference";

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 2.0;
pub const SCALE_STEP: f64 = 0.1;
pub const DEFAULT_SCALE: f64 = 1.0;

/// Where a station without a saved position is drawn.
pub const DEFAULT_POSITION: Position = Position { x: 50.0, y: 50.0 };

/// Default timeline window, ending now.
pub const DEFAULT_RANGE_DAYS: i64 = 14;

pub fn clamp_scale(scale: f64) -> f64 {
    if !scale.is_finite() {
        return DEFAULT_SCALE;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewConfig {
    pub scale: f64,
    pub pan: Position,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            pan: Position::new(0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(DEFAULT_RANGE_DAYS),
            end: now,
        }
    }

    /// From the start of the day `preset` weeks back to the end of today.
    pub fn preset(preset: RangePreset, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let from = (now - Duration::weeks(preset.weeks())).date_naive();
        Self {
            start: from.and_time(NaiveTime::MIN).and_utc(),
            end: (today + Duration::days(1)).and_time(NaiveTime::MIN).and_utc()
                - Duration::milliseconds(1),
        }
    }

    /// Whether a stay from `start` to `end` (still open when `None`, so
    /// lasting until `now`) shows up in this window.
    pub fn overlaps(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        start <= self.end && end.unwrap_or(now) >= self.start
    }
}

/// Quick timeline windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePreset {
    Week,
    TwoWeeks,
    Month,
}

impl RangePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::TwoWeeks => "2weeks",
            Self::Month => "month",
        }
    }

    /// A month is four weeks.
    pub fn weeks(&self) -> i64 {
        match self {
            Self::Week => 1,
            Self::TwoWeeks => 2,
            Self::Month => 4,
        }
    }
}

impl fmt::Display for RangePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(Self::Week),
            "2weeks" => Ok(Self::TwoWeeks),
            "month" => Ok(Self::Month),
            _ => Err(format!("Invalid range preset: {} (expected week, 2weeks or month)", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(format!("Invalid theme: {}", s)),
        }
    }
}

fn position_from(value: &Value) -> Option<Position> {
    let object = value.as_object()?;
    let x = object.get("x")?.as_f64()?;
    let y = object.get("y")?.as_f64()?;
    Some(Position::new(x, y))
}

/// Saved station positions. Entries with a non-integer key or without
/// numeric `x`/`y` are dropped; anything that is not a JSON object loads as
/// empty.
pub fn parse_station_positions(raw: &str) -> StationPositions {
    let Ok(Value::Object(entries)) = serde_json::from_str::<Value>(raw) else {
        return StationPositions::new();
    };
    entries
        .iter()
        .filter_map(|(key, value)| Some((key.parse::<i64>().ok()?, position_from(value)?)))
        .collect()
}

/// Saved pan/zoom; scale is clamped, malformed fields use defaults.
pub fn parse_view_config(raw: &str) -> ViewConfig {
    let mut config = ViewConfig::default();
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(raw) else {
        return config;
    };
    if let Some(scale) = object.get("scale").and_then(Value::as_f64) {
        config.scale = clamp_scale(scale);
    }
    if let Some(pan) = object.get("pan").and_then(position_from) {
        config.pan = pan;
    }
    config
}

pub fn parse_selected_jobs(raw: &str) -> Vec<i64> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items.iter().filter_map(Value::as_i64).collect(),
        _ => Vec::new(),
    }
}

pub fn parse_date_range(raw: &str) -> Option<DateRange> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let start = timestamp::parse(value.get("start")?.as_str()?)?;
    let end = timestamp::parse(value.get("end")?.as_str()?)?;
    Some(DateRange { start, end })
}

fn positions_json(positions: &StationPositions) -> String {
    let map: Map<String, Value> = positions
        .iter()
        .map(|(id, pos)| (id.to_string(), json!({ "x": pos.x, "y": pos.y })))
        .collect();
    Value::Object(map).to_string()
}

/// Typed access to the persisted view preferences.
pub struct ViewState {
    store: Box<dyn PreferenceStore>,
}

impl ViewState {
    pub fn new(store: impl PreferenceStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.store.get(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        debug!(key, "preference saved");
        self.store.set(key, value)
    }

    // ── Factory view ────────────────────────────────────────────────────

    pub fn station_positions(&self) -> Result<StationPositions, StorageError> {
        Ok(self
            .read(STATION_POSITIONS_KEY)?
            .map(|raw| parse_station_positions(&raw))
            .unwrap_or_default())
    }

    pub fn save_station_positions(&self, positions: &StationPositions) -> Result<(), StorageError> {
        self.write(STATION_POSITIONS_KEY, &positions_json(positions))
    }

    pub fn set_station_position(
        &self,
        station_id: i64,
        position: Position,
    ) -> Result<StationPositions, StorageError> {
        let mut positions = self.station_positions()?;
        positions.insert(station_id, position);
        self.save_station_positions(&positions)?;
        Ok(positions)
    }

    /// Forget positions of stations that no longer exist. Returns how many
    /// were removed.
    pub fn prune_station_positions(&self, existing: &[i64]) -> Result<usize, StorageError> {
        let mut positions = self.station_positions()?;
        let before = positions.len();
        positions.retain(|id, _| existing.contains(id));
        let removed = before - positions.len();
        if removed > 0 {
            self.save_station_positions(&positions)?;
        }
        Ok(removed)
    }

    pub fn view_config(&self) -> Result<ViewConfig, StorageError> {
        Ok(self
            .read(VIEW_CONFIG_KEY)?
            .map(|raw| parse_view_config(&raw))
            .unwrap_or_default())
    }

    fn save_view_config(&self, config: &ViewConfig) -> Result<(), StorageError> {
        let raw = serde_json::to_string(config).map_err(StorageError::Encode)?;
        self.write(VIEW_CONFIG_KEY, &raw)
    }

    pub fn zoom_to(&self, scale: f64) -> Result<ViewConfig, StorageError> {
        let mut config = self.view_config()?;
        config.scale = clamp_scale(scale);
        self.save_view_config(&config)?;
        Ok(config)
    }

    /// Zoom by whole steps (negative to zoom out).
    pub fn zoom_by(&self, steps: i32) -> Result<ViewConfig, StorageError> {
        let current = self.view_config()?.scale;
        let target = ((current + SCALE_STEP * steps as f64) * 100.0).round() / 100.0;
        self.zoom_to(target)
    }

    pub fn pan_to(&self, pan: Position) -> Result<ViewConfig, StorageError> {
        let mut config = self.view_config()?;
        config.pan = pan;
        self.save_view_config(&config)?;
        Ok(config)
    }

    /// Replace all positions with the default grid and reset zoom.
    pub fn apply_default_layout(&self, station_ids: &[i64]) -> Result<StationPositions, StorageError> {
        let positions = grid_layout(station_ids);
        self.save_station_positions(&positions)?;
        self.zoom_to(DEFAULT_SCALE)?;
        Ok(positions)
    }

    // ── Timeline ────────────────────────────────────────────────────────

    pub fn selected_jobs(&self) -> Result<Vec<i64>, StorageError> {
        Ok(self
            .read(TIMELINE_SELECTED_KEY)?
            .map(|raw| parse_selected_jobs(&raw))
            .unwrap_or_default())
    }

    pub fn set_selected_jobs(&self, job_ids: &[i64]) -> Result<(), StorageError> {
        self.write(TIMELINE_SELECTED_KEY, &json!(job_ids).to_string())
    }

    /// Add or remove a job from the selection; true when now selected.
    pub fn toggle_selected_job(&self, job_id: i64) -> Result<bool, StorageError> {
        let mut selected = self.selected_jobs()?;
        let now_selected = match selected.iter().position(|id| *id == job_id) {
            Some(index) => {
                selected.remove(index);
                false
            }
            None => {
                selected.push(job_id);
                true
            }
        };
        self.set_selected_jobs(&selected)?;
        Ok(now_selected)
    }

    pub fn date_range(&self, now: DateTime<Utc>) -> Result<DateRange, StorageError> {
        Ok(self
            .read(TIMELINE_RANGE_KEY)?
            .and_then(|raw| parse_date_range(&raw))
            .unwrap_or_else(|| DateRange::ending_at(now)))
    }

    pub fn set_date_range(&self, range: &DateRange) -> Result<(), StorageError> {
        let raw = json!({
            "start": range.start.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "end": range.end.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        });
        self.write(TIMELINE_RANGE_KEY, &raw.to_string())
    }

    // ── Theme ───────────────────────────────────────────────────────────

    pub fn theme(&self) -> Result<Theme, StorageError> {
        Ok(self
            .read(THEME_KEY)?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.write(THEME_KEY, theme.as_str())
    }

    pub fn toggle_theme(&self) -> Result<Theme, StorageError> {
        let theme = self.theme()?.toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPreferenceStore;
    use chrono::TimeZone;

    fn state() -> ViewState {
        ViewState::new(MemoryPreferenceStore::default())
    }

    // ── Parsing ─────────────────────────────────────────────────────────

    #[test]
    fn malformed_station_positions_are_dropped() {
        let raw = r#"{
            "1": {"x": 10, "y": 20.5},
            "2": {"x": "10", "y": 20},
            "3": {"x": 5},
            "4": null,
            "five": {"x": 1, "y": 1},
            "6": [1, 2]
        }"#;
        let positions = parse_station_positions(raw);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[&1], Position::new(10.0, 20.5));
    }

    #[test]
    fn non_object_positions_load_empty() {
        assert!(parse_station_positions("[1,2,3]").is_empty());
        assert!(parse_station_positions("42").is_empty());
        assert!(parse_station_positions("{broken").is_empty());
        assert!(parse_station_positions("").is_empty());
    }

    #[test]
    fn view_config_scale_is_clamped_on_load() {
        assert_eq!(parse_view_config(r#"{"scale": 5}"#).scale, MAX_SCALE);
        assert_eq!(parse_view_config(r#"{"scale": 0.01}"#).scale, MIN_SCALE);
        assert_eq!(parse_view_config(r#"{"scale": "big"}"#).scale, DEFAULT_SCALE);
    }

    #[test]
    fn view_config_malformed_pan_uses_default() {
        let config = parse_view_config(r#"{"scale": 1.5, "pan": {"x": "a", "y": 0}}"#);
        assert_eq!(config.scale, 1.5);
        assert_eq!(config.pan, Position::new(0.0, 0.0));
        assert_eq!(parse_view_config("nonsense"), ViewConfig::default());
    }

    #[test]
    fn clamp_scale_handles_non_finite() {
        assert_eq!(clamp_scale(f64::NAN), DEFAULT_SCALE);
        assert_eq!(clamp_scale(f64::INFINITY), DEFAULT_SCALE);
        assert_eq!(clamp_scale(0.5), 0.5);
    }

    // ── Factory view ────────────────────────────────────────────────────

    #[test]
    fn station_position_round_trip() {
        let view = state();
        view.set_station_position(3, Position::new(100.0, 200.0)).unwrap();
        view.set_station_position(7, Position::new(-5.0, 0.0)).unwrap();
        let positions = view.station_positions().unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[&7], Position::new(-5.0, 0.0));
    }

    #[test]
    fn prune_removes_deleted_stations() {
        let view = state();
        view.set_station_position(1, Position::new(0.0, 0.0)).unwrap();
        view.set_station_position(2, Position::new(0.0, 0.0)).unwrap();
        assert_eq!(view.prune_station_positions(&[2, 3]).unwrap(), 1);
        let positions = view.station_positions().unwrap();
        assert!(!positions.contains_key(&1));
        assert!(positions.contains_key(&2));
    }

    #[test]
    fn zoom_is_clamped_on_every_change() {
        let view = state();
        assert_eq!(view.zoom_to(3.0).unwrap().scale, MAX_SCALE);
        assert_eq!(view.zoom_by(1).unwrap().scale, MAX_SCALE);
        assert_eq!(view.zoom_to(-1.0).unwrap().scale, MIN_SCALE);
        assert_eq!(view.zoom_by(-1).unwrap().scale, MIN_SCALE);
        view.zoom_to(1.0).unwrap();
        assert_eq!(view.zoom_by(2).unwrap().scale, 1.2);
    }

    #[test]
    fn pan_keeps_scale() {
        let view = state();
        view.zoom_to(1.5).unwrap();
        let config = view.pan_to(Position::new(30.0, -40.0)).unwrap();
        assert_eq!(config.scale, 1.5);
        assert_eq!(view.view_config().unwrap().pan, Position::new(30.0, -40.0));
    }

    #[test]
    fn default_layout_resets_zoom() {
        let view = state();
        view.zoom_to(0.4).unwrap();
        let positions = view.apply_default_layout(&[1, 2, 3]).unwrap();
        assert_eq!(positions.len(), 3);
        assert_eq!(view.station_positions().unwrap(), positions);
        assert_eq!(view.view_config().unwrap().scale, DEFAULT_SCALE);
    }

    // ── Timeline and theme ──────────────────────────────────────────────

    #[test]
    fn toggle_selected_job() {
        let view = state();
        assert!(view.toggle_selected_job(4).unwrap());
        assert!(view.toggle_selected_job(9).unwrap());
        assert!(!view.toggle_selected_job(4).unwrap());
        assert_eq!(view.selected_jobs().unwrap(), vec![9]);
    }

    #[test]
    fn date_range_defaults_to_two_weeks() {
        let view = state();
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();
        let range = view.date_range(now).unwrap();
        assert_eq!(range.end, now);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn date_range_round_trip() {
        let view = state();
        let range = DateRange {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        };
        view.set_date_range(&range).unwrap();
        assert_eq!(view.date_range(Utc::now()).unwrap(), range);
    }

    #[test]
    fn presets_cover_whole_days() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 12, 30, 0).unwrap();
        let week = DateRange::preset(RangePreset::Week, now);
        assert_eq!(week.start, Utc.with_ymd_and_hms(2024, 5, 8, 0, 0, 0).unwrap());
        assert_eq!(
            week.end,
            Utc.with_ymd_and_hms(2024, 5, 15, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );

        let month = DateRange::preset(RangePreset::Month, now);
        assert_eq!(month.start, Utc.with_ymd_and_hms(2024, 4, 17, 0, 0, 0).unwrap());
        assert_eq!(month.end, week.end);

        assert_eq!("2weeks".parse::<RangePreset>(), Ok(RangePreset::TwoWeeks));
        assert!("fortnight".parse::<RangePreset>().is_err());
    }

    #[test]
    fn open_stays_overlap_until_now() {
        let day = |d| Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap();
        let range = DateRange {
            start: day(10),
            end: day(20),
        };
        assert!(range.overlaps(day(5), Some(day(12)), day(25)));
        assert!(!range.overlaps(day(1), Some(day(9)), day(25)));
        assert!(!range.overlaps(day(21), None, day(25)));
        assert!(range.overlaps(day(1), None, day(25)));
        assert!(!range.overlaps(day(1), None, day(8)));
    }

    #[test]
    fn theme_defaults_light_and_toggles() {
        let view = state();
        assert_eq!(view.theme().unwrap(), Theme::Light);
        assert_eq!(view.toggle_theme().unwrap(), Theme::Dark);
        assert_eq!(view.theme().unwrap(), Theme::Dark);
        assert_eq!(view.toggle_theme().unwrap(), Theme::Light);
    }
}
