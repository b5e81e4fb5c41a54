use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

// KST is UTC+9 with no DST.
const KST_OFFSET_HOURS: i64 = 9;

/// Calendar date in Korea for the given instant. Return windows are measured from this date.
pub fn kst_date(now_utc: DateTime<Utc>) -> NaiveDate {
    (now_utc + Duration::hours(KST_OFFSET_HOURS)).date_naive()
}

pub fn today_kst() -> NaiveDate {
    kst_date(Utc::now())
}

/// Converts a provider's unix timestamp (seconds) to the KST trading date it belongs to.
pub fn kst_date_from_unix(ts: i64) -> Option<NaiveDate> {
    let utc = Utc.timestamp_opt(ts, 0).single()?;
    Some(kst_date(utc))
}
