use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, TimeZone, Timelike};

use crate::mission::DurationUnit;

/// Compute a mission's next execution time from `now`.
///
/// Every unit except MINUTE truncates `now` to its calendar boundary
/// before advancing, so all missions of one unit fire on the same
/// wall-clock alignment regardless of when they were created or last
/// checked: HOUR missions on the hour, DAY missions at midnight, WEEK
/// missions at Monday midnight, MONTH missions on the 1st at midnight.
///
/// Returns `None` when no valid next execution exists: an unrecognized
/// unit, a negative duration where the unit needs a whole count, or a
/// result outside the calendar's representable range.
pub fn calc_after_timestamp<Tz: TimeZone>(
    duration: i64,
    unit: DurationUnit,
    now: DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    match unit {
        DurationUnit::Minute => now.checked_add_signed(Duration::try_minutes(duration)?),
        DurationUnit::Hour => {
            let top_of_hour = now.with_minute(0)?.with_second(0)?.with_nanosecond(0)?;
            top_of_hour.checked_add_signed(Duration::try_hours(duration)?)
        }
        DurationUnit::Day => {
            let days = u64::try_from(duration).ok()?;
            let date = now.date_naive().checked_add_days(Days::new(days))?;
            midnight(date, now.timezone())
        }
        DurationUnit::Week => {
            // Week boundary convention: Monday. "Next" is strictly in the
            // future, so a Monday anchors to the following Monday.
            let to_boundary = 7 - u64::from(now.weekday().num_days_from_monday());
            let weeks = u64::try_from(duration).ok()?;
            let date = now
                .date_naive()
                .checked_add_days(Days::new(to_boundary))?
                .checked_add_days(Days::new(weeks.checked_mul(7)?))?;
            midnight(date, now.timezone())
        }
        DurationUnit::Month => {
            let months = u32::try_from(duration).ok()?;
            let first = now.date_naive().with_day(1)?;
            let date = first.checked_add_months(Months::new(months))?;
            midnight(date, now.timezone())
        }
        DurationUnit::Unknown => None,
    }
}

fn midnight<Tz: TimeZone>(date: NaiveDate, tz: Tz) -> Option<DateTime<Tz>> {
    date.and_hms_opt(0, 0, 0)?.and_local_timezone(tz).single()
}
