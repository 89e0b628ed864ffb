//! Live adapter for the `Clock` port.

use chrono::{DateTime, Utc};

use crate::ports::Clock;

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveClock;

impl Clock for LiveClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use crate::model::{current_event_year, FIRST_EVENT_YEAR};

    #[test]
    fn current_event_is_this_or_last_year() {
        let now = LiveClock.now();
        let year = current_event_year(now);

        assert!(year >= FIRST_EVENT_YEAR);
        assert!((now.year() - 1..=now.year()).contains(&year));
    }
}
