//! Upcoming-change reminder arming.
//!
//! Decides *when* a reminder is due; delivering it (toast, sound,
//! window focus) is the embedding application's job. Each activity
//! fires once per approach and re-arms once its start moves back above
//! the lead window, so the same schedule can remind again tomorrow.

use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime};

use crate::schedule::ScheduleItem;

/// A reminder that is due right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub activity: String,
    /// Display time of the upcoming change.
    pub time: String,
    /// Whole minutes until the change, rounded up for messaging.
    pub minutes_until: i64,
}

/// Tracks which upcoming activities have already been announced.
#[derive(Debug)]
pub struct ReminderLedger {
    lead: Duration,
    notified: HashSet<String>,
}

impl ReminderLedger {
    #[must_use]
    pub fn new(lead_minutes: u32) -> Self {
        Self {
            lead: Duration::minutes(i64::from(lead_minutes)),
            notified: HashSet::new(),
        }
    }

    /// Returns the reminders due at `now` for the given schedule.
    ///
    /// An item is due when its day-corrected start lies within
    /// `(now, now + lead]` and it has not fired this approach. Items
    /// back above the lead window are re-armed.
    pub fn due(&mut self, schedule: &[ScheduleItem], now: NaiveDateTime) -> Vec<Reminder> {
        let mut fired = Vec::new();

        for item in schedule {
            let start = item.datetime_from(now);
            let until = start.signed_duration_since(now);
            let key = format!("{}_{}", item.time, item.activity);

            if until > Duration::zero() && until <= self.lead {
                if self.notified.insert(key) {
                    fired.push(Reminder {
                        activity: item.activity.clone(),
                        time: item.time.clone(),
                        minutes_until: until.num_seconds() / 60 + 1,
                    });
                }
            } else if until > self.lead {
                self.notified.remove(&key);
            }
        }

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{NaiveDate, NaiveTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    fn item(time: &str, activity: &str, h: u32, m: u32) -> ScheduleItem {
        ScheduleItem {
            time: time.to_string(),
            activity: activity.to_string(),
            duration: None,
            datetime: at(h, m),
        }
    }

    #[test]
    fn fires_inside_the_lead_window_only_once() {
        let schedule = vec![item("2:30 PM", "Email_1", 14, 30)];
        let mut ledger = ReminderLedger::new(5);

        assert!(ledger.due(&schedule, at(14, 20)).is_empty());

        let due = ledger.due(&schedule, at(14, 26));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].activity, "Email_1");
        assert_eq!(due[0].minutes_until, 5);

        // Subsequent checks inside the window stay quiet.
        assert!(ledger.due(&schedule, at(14, 27)).is_empty());
        // Once the start has passed, nothing fires either.
        assert!(ledger.due(&schedule, at(14, 31)).is_empty());
    }

    #[test]
    fn rearms_when_the_start_moves_back_out_of_the_window() {
        let schedule = vec![item("2:30 PM", "Email_1", 14, 30)];
        let mut ledger = ReminderLedger::new(5);

        assert_eq!(ledger.due(&schedule, at(14, 26)).len(), 1);

        // Hours later the same entry reads as tomorrow's (day-boundary
        // roll), far above the lead window: it re-arms.
        assert!(ledger.due(&schedule, at(14, 26) + Duration::hours(13)).is_empty());

        // Approaching tomorrow's start it fires again.
        let tomorrow = at(14, 26) + Duration::days(1);
        assert_eq!(ledger.due(&schedule, tomorrow).len(), 1);
    }

    #[test]
    fn minutes_until_rounds_up() {
        let schedule = vec![item("2:30 PM", "Email_1", 14, 30)];
        let mut ledger = ReminderLedger::new(5);
        let due = ledger.due(&schedule, at(14, 27) + Duration::seconds(30));
        assert_eq!(due.len(), 1);
        // 2.5 minutes out reads as "in 3 minutes".
        assert_eq!(due[0].minutes_until, 3);
    }
}
