//! Helpers for resolving the configured timezone.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// Resolve the current UTC offset of the timezone named by
/// `canonical_timezone`, or `None` if the name is not a known timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Get today's date in the timezone named by `canonical_timezone`, falling
/// back to UTC if the name is not a known timezone.
pub fn local_date_today(canonical_timezone: &str) -> Date {
    let offset = get_local_offset(canonical_timezone).unwrap_or(UtcOffset::UTC);

    OffsetDateTime::now_utc().to_offset(offset).date()
}

#[cfg(test)]
mod timezone_tests {
    use super::{get_local_offset, local_date_today};

    #[test]
    fn known_timezone_resolves() {
        assert!(get_local_offset("Pacific/Auckland").is_some());
    }

    #[test]
    fn unknown_timezone_is_none() {
        assert!(get_local_offset("Moon/Crater").is_none());
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc_today() {
        let today = local_date_today("Moon/Crater");
        let utc_today = time::OffsetDateTime::now_utc().date();

        assert_eq!(today, utc_today);
    }
}
