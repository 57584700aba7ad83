/// Current wall-clock time in epoch seconds.
///
/// A clock set before 1970 reads as 0.
pub fn unix_now() -> u64 {
    u64::try_from(time::OffsetDateTime::now_utc().unix_timestamp()).unwrap_or(0)
}
