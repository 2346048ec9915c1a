use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Medication, ScheduleEntry};

/// Sort key given to times that do not parse; sorts after every real time.
pub const UNPARSEABLE_TIME: u32 = u32::MAX;

static TIME_OF_DAY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,2}):(\d{2})\s*([AaPp][Mm])\s*$").ok());

/// Parses 12-hour "H:MM AM/PM" times into minutes since midnight.
pub struct TimeOfDayParser {
    pattern: Option<&'static Regex>,
}

impl TimeOfDayParser {
    pub fn new() -> Self {
        Self {
            pattern: TIME_OF_DAY.as_ref(),
        }
    }

    pub fn minutes(&self, text: &str) -> Option<u32> {
        let caps = self.pattern?.captures(text)?;
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;

        if !(1..=12).contains(&hour) || minute > 59 {
            return None;
        }

        let pm = caps[3].eq_ignore_ascii_case("pm");
        let hour24 = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };

        Some(hour24 * 60 + minute)
    }

    pub fn sort_key(&self, text: &str) -> u32 {
        self.minutes(text).unwrap_or(UNPARSEABLE_TIME)
    }
}

impl Default for TimeOfDayParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct ScheduleBuilder {
    parser: TimeOfDayParser,
}

impl ScheduleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parser(&self) -> &TimeOfDayParser {
        &self.parser
    }

    /// One entry per time slot of every scheduled (not as-needed)
    /// medication, ordered by time of day. The sort is stable, and entries
    /// whose time does not parse go last.
    pub fn build(&self, medications: &[Medication]) -> Vec<ScheduleEntry> {
        let mut keyed: Vec<(u32, ScheduleEntry)> = medications
            .iter()
            .filter(|medication| !medication.frequency.is_as_needed())
            .flat_map(|medication| {
                medication
                    .effective_time_slots()
                    .into_iter()
                    .map(move |slot| ScheduleEntry {
                        medication_id: medication.id,
                        medication_name: medication.name.clone(),
                        time: slot.to_string(),
                        dosage: medication.dosage.clone(),
                    })
            })
            .map(|entry| (self.parser.sort_key(&entry.time), entry))
            .collect();

        keyed.sort_by_key(|(key, _)| *key);
        keyed.into_iter().map(|(_, entry)| entry).collect()
    }

    /// Scheduled doses at or after `now_minutes`; unparseable times are left out.
    pub fn upcoming(&self, medications: &[Medication], now_minutes: u32) -> Vec<ScheduleEntry> {
        self.build(medications)
            .into_iter()
            .filter(|entry| {
                self.parser
                    .minutes(&entry.time)
                    .map_or(false, |minutes| minutes >= now_minutes)
            })
            .collect()
    }
}
