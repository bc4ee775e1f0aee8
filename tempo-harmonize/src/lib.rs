//! TEMPO Harmonize - Time Slot Quantization
//!
//! Snaps timestamps to a small set of configured daily slots so that many
//! records share few distinct transition instants. Misconfiguration never
//! fails: unusable slots are dropped and an empty slot set turns every
//! operation into a no-op.

pub mod content;

pub use content::{
    BulkHarmonizationReport, ContentHarmonizer, FieldChange, HarmonizationResult,
    RecordHarmonization,
};

use chrono::FixedOffset;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use tempo_core::{HarmonizationConfig, Timestamp, SECONDS_PER_DAY};
use tracing::{debug, warn};

static SLOT_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$"));

/// Parse an `"HH:MM"` slot into seconds since midnight.
pub fn parse_slot(raw: &str) -> Option<i64> {
    let pattern = SLOT_PATTERN.as_ref().ok()?;
    let captures = pattern.captures(raw.trim())?;
    let hour: i64 = captures.get(1)?.as_str().parse().ok()?;
    let minute: i64 = captures.get(2)?.as_str().parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(hour * 3_600 + minute * 60)
}

// ============================================================================
// IMPACT
// ============================================================================

/// Distinct-instant reduction achieved by harmonizing a set of timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ImpactReport {
    /// Distinct timestamps before harmonization.
    pub before: usize,
    /// Distinct timestamps after harmonization.
    pub after: usize,
    /// Percentage reduction, rounded to one decimal.
    pub reduction_percent: f64,
}

// ============================================================================
// ENGINE
// ============================================================================

/// Quantizes timestamps against parsed daily slots.
#[derive(Debug, Clone)]
pub struct HarmonizationEngine {
    enabled: bool,
    /// Seconds since midnight, ascending.
    slots: Vec<i64>,
    tolerance: i64,
    offset: FixedOffset,
}

impl HarmonizationEngine {
    pub fn new(config: &HarmonizationConfig) -> Self {
        let mut slots = Vec::with_capacity(config.slots.len());
        for raw in &config.slots {
            match parse_slot(raw) {
                Some(slot) => slots.push(slot),
                None => debug!(slot = %raw, "Ignoring malformed harmonization slot"),
            }
        }
        slots.sort_unstable();
        slots.dedup();

        if config.enabled && slots.is_empty() {
            warn!("Harmonization enabled without any valid slot; timestamps stay unchanged");
        }

        Self {
            enabled: config.enabled,
            slots,
            tolerance: config.effective_tolerance(),
            offset: config.offset(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Parsed slots in seconds since midnight.
    pub fn slots(&self) -> &[i64] {
        &self.slots
    }

    pub fn tolerance(&self) -> i64 {
        self.tolerance
    }

    /// Seconds since local midnight.
    pub fn time_of_day(&self, timestamp: Timestamp) -> i64 {
        timestamp
            .saturating_add(i64::from(self.offset.local_minus_utc()))
            .rem_euclid(SECONDS_PER_DAY)
    }

    /// Start of the local day containing `timestamp`, if representable.
    fn midnight(&self, timestamp: Timestamp) -> Option<Timestamp> {
        timestamp.checked_sub(self.time_of_day(timestamp))
    }

    /// Nearest slot and its distance. The first minimal slot wins a tie.
    fn nearest_slot(&self, time_of_day: i64) -> Option<(i64, i64)> {
        let mut best: Option<(i64, i64)> = None;
        for &slot in &self.slots {
            let distance = (time_of_day - slot).abs();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((slot, distance));
            }
        }
        best
    }

    /// Shift `timestamp` onto its nearest slot when within tolerance.
    ///
    /// Distance is measured within the day: a time just before midnight is
    /// not considered close to a `00:00` slot.
    pub fn harmonize(&self, timestamp: Timestamp) -> Timestamp {
        if !self.enabled {
            return timestamp;
        }
        let time_of_day = self.time_of_day(timestamp);
        match self.nearest_slot(time_of_day) {
            Some((slot, distance)) if distance <= self.tolerance => {
                timestamp.saturating_add(slot - time_of_day)
            }
            _ => timestamp,
        }
    }

    /// First slot instant strictly after `timestamp`, rolling into tomorrow.
    /// `None` without slots or when the instant is not representable.
    pub fn next_slot(&self, timestamp: Timestamp) -> Option<Timestamp> {
        let first = *self.slots.first()?;
        let time_of_day = self.time_of_day(timestamp);
        let midnight = self.midnight(timestamp)?;
        match self.slots.iter().find(|&&slot| slot > time_of_day) {
            Some(slot) => midnight.checked_add(*slot),
            None => midnight.checked_add(SECONDS_PER_DAY + first),
        }
    }

    /// Last slot instant strictly before `timestamp`, rolling into yesterday.
    /// `None` without slots or when the instant is not representable.
    pub fn previous_slot(&self, timestamp: Timestamp) -> Option<Timestamp> {
        let last = *self.slots.last()?;
        let time_of_day = self.time_of_day(timestamp);
        let midnight = self.midnight(timestamp)?;
        match self.slots.iter().rev().find(|&&slot| slot < time_of_day) {
            Some(slot) => midnight.checked_add(*slot),
            None => midnight.checked_sub(SECONDS_PER_DAY - last),
        }
    }

    /// Every slot instant in `[start, end]`, ascending.
    pub fn slots_in_range(&self, start: Timestamp, end: Timestamp) -> Vec<Timestamp> {
        let mut instants = Vec::new();
        if start > end || self.slots.is_empty() {
            return instants;
        }

        let Some(mut day) = self.midnight(start) else {
            return instants;
        };
        while day <= end {
            for &slot in &self.slots {
                match day.checked_add(slot) {
                    Some(instant) if instant >= start && instant <= end => instants.push(instant),
                    Some(_) => {}
                    None => break,
                }
            }
            day = match day.checked_add(SECONDS_PER_DAY) {
                Some(next) => next,
                None => break,
            };
        }
        instants
    }

    pub fn is_on_slot_boundary(&self, timestamp: Timestamp) -> bool {
        self.slots
            .binary_search(&self.time_of_day(timestamp))
            .is_ok()
    }

    pub fn calculate_impact(&self, timestamps: &[Timestamp]) -> ImpactReport {
        if timestamps.is_empty() {
            return ImpactReport::default();
        }

        let before: BTreeSet<Timestamp> = timestamps.iter().copied().collect();
        let after: BTreeSet<Timestamp> = timestamps.iter().map(|ts| self.harmonize(*ts)).collect();
        let reduction = (before.len() - after.len()) as f64 / before.len() as f64 * 100.0;

        ImpactReport {
            before: before.len(),
            after: after.len(),
            reduction_percent: (reduction * 10.0).round() / 10.0,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
