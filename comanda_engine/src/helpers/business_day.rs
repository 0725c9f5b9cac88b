use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::db_types::Order;

/// The business day (`YYYY-MM-DD`) that `at` falls on in the store's timezone.
pub fn business_day(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

/// The billing period (`YYYY-MM`) that `at` falls on in the store's timezone.
pub fn month_period(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m").to_string()
}

/// The set of orders that the live feed shows at a given moment.
///
/// An order is in the window if
/// * it has no scheduled time and was created within the last [`FeedWindow::UNSCHEDULED_LOOKBACK_DAYS`] days, or
/// * its scheduled time falls on today or tomorrow. These are calendar days in the store's timezone, not a rolling
///   48 hours, so the window is `[start of today, start of the day after tomorrow)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedWindow {
    pub created_after: DateTime<Utc>,
    pub scheduled_from: DateTime<Utc>,
    pub scheduled_until: DateTime<Utc>,
}

impl FeedWindow {
    pub const UNSCHEDULED_LOOKBACK_DAYS: i64 = 2;

    pub fn at(now: DateTime<Utc>, tz: Tz) -> Self {
        let today = now.with_timezone(&tz).date_naive();
        let scheduled_from = start_of_day(today, tz);
        let scheduled_until = start_of_day(today + Duration::days(2), tz);
        let created_after = now - Duration::days(Self::UNSCHEDULED_LOOKBACK_DAYS);
        Self { created_after, scheduled_from, scheduled_until }
    }

    pub fn contains(&self, order: &Order) -> bool {
        match order.scheduled_for {
            Some(at) => at >= self.scheduled_from && at < self.scheduled_until,
            None => order.created_at >= self.created_after,
        }
    }
}

fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::default());
    // Some zones skip midnight when DST starts; the day then begins at 01:00
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}
