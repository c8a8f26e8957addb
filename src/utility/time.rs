use std::convert::TryFrom;

/// Helper for formatting times.
#[derive(Debug, Eq, PartialEq)]
pub struct TimeParts {
    pub hours: u32,
    pub mins: u32,
    pub secs: u64,
    pub micros: u64,
}

impl TimeParts {
    pub fn from_micros(total_micros: u128) -> Self {
        // Total number of integer seconds.
        let whole_secs = u64::try_from(total_micros / 1_000_000).unwrap_or(u64::MAX);
        // Total number of integer minutes.
        let whole_mins = u32::try_from(whole_secs / 60).unwrap_or(u32::MAX);
        // Total number of integer hours, which is also the hours part.
        let whole_hours = whole_mins / 60;

        Self {
            hours: whole_hours,
            mins: whole_mins - whole_hours * 60,
            secs: whole_secs - u64::from(whole_mins) * 60,
            micros: u64::try_from(total_micros % 1_000_000).unwrap_or(0),
        }
    }
}

impl std::fmt::Display for TimeParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:06}",
            self.hours, self.mins, self.secs, self.micros
        )
    }
}

#[cfg(test)]
#[test]
fn test_time_parts() {
    use std::time::Duration;
    let parts = TimeParts::from_micros(
        (Duration::from_micros(1) + Duration::from_secs(3600 + 60 + 1)).as_micros(),
    );
    assert_eq!(
        parts,
        TimeParts {
            hours: 1,
            mins: 1,
            secs: 1,
            micros: 1
        }
    );
    assert_eq!(parts.to_string(), "01:01:01.000001");
}
