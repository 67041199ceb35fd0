// Calendar Mapper - simulation time <-> calendar dates
// One simulation unit is DAYS_PER_UNIT earth days after the epoch

use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Earth days represented by 1.0 simulation unit
pub const DAYS_PER_UNIT: f64 = 20.0;

/// Largest day offset applied in a single calendar step (~27 years)
pub const MAX_DAY_CHUNK: u64 = 10_000;

/// Absorbs float residue such as 36.999999 days when flooring to whole days
const DAY_EPSILON: f64 = 1e-6;

pub const UNAVAILABLE_DATE: &str = "Date unavailable";

const DISPLAY_FORMAT: &str = "%B %-d, %Y";

// =============================================================================
// CALENDAR DATE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDate {
    pub earth_years: i32,
    pub formatted_date: String,
    #[serde(skip)]
    pub date: Option<NaiveDate>,
}

impl CalendarDate {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            earth_years: date.year(),
            formatted_date: date.format(DISPLAY_FORMAT).to_string(),
            date: Some(date),
        }
    }

    /// Sentinel returned when the date cannot be represented
    pub fn unavailable() -> Self {
        Self {
            earth_years: 0,
            formatted_date: UNAVAILABLE_DATE.to_string(),
            date: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.date.is_some()
    }
}

// =============================================================================
// CALENDAR MAPPER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarMapper {
    epoch: NaiveDate,
}

impl CalendarMapper {
    pub fn new(epoch: NaiveDate) -> Self {
        Self { epoch }
    }

    /// Mapper anchored at today's local date
    pub fn session_start() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    /// Calendar date reached `sim_time` units after the epoch.
    ///
    /// Never fails: anything outside the calendar comes back as
    /// [`CalendarDate::unavailable`].
    pub fn date_from_time(&self, sim_time: f64) -> CalendarDate {
        match self.offset_epoch(sim_time) {
            Some(date) => CalendarDate::from_date(date),
            None => {
                tracing::debug!(sim_time, "simulation time has no calendar date");
                CalendarDate::unavailable()
            }
        }
    }

    /// Simulation time of midnight on the given date.
    ///
    /// Days past the end of the month roll forward into the next month, and
    /// day 0 is the last day of the previous month.
    pub fn time_from_date(&self, year: i32, month: u32, day: u32) -> EngineResult<f64> {
        let target = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first| match day {
                0 => first.checked_sub_days(Days::new(1)),
                _ => first.checked_add_days(Days::new(u64::from(day) - 1)),
            })
            .ok_or(EngineError::InvalidDate { year, month, day })?;

        let days = target.signed_duration_since(self.epoch).num_days();
        Ok(days as f64 / DAYS_PER_UNIT)
    }

    /// Walk from the epoch in bounded chunks so no single step can overflow
    fn offset_epoch(&self, sim_time: f64) -> Option<NaiveDate> {
        let days = sim_time * DAYS_PER_UNIT;
        if !days.is_finite() {
            return None;
        }

        // Anything past chrono's first or last date fails without walking
        let whole_days = (days + DAY_EPSILON).floor();
        let latest = NaiveDate::MAX.signed_duration_since(self.epoch).num_days() as f64;
        let earliest = NaiveDate::MIN.signed_duration_since(self.epoch).num_days() as f64;
        if whole_days > latest || whole_days < earliest {
            return None;
        }
        let forward = whole_days >= 0.0;
        let mut remaining = whole_days.abs() as u64;
        let mut date = self.epoch;

        while remaining > 0 {
            let step = remaining.min(MAX_DAY_CHUNK);
            date = if forward {
                date.checked_add_days(Days::new(step))?
            } else {
                date.checked_sub_days(Days::new(step))?
            };
            remaining -= step;
        }

        Some(date)
    }
}

impl Default for CalendarMapper {
    fn default() -> Self {
        Self::session_start()
    }
}

// =============================================================================
// TESTS
// =============================================================================
