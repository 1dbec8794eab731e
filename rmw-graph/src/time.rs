use tracing::debug;

use crate::qos::Duration;

const NS_PER_S: u64 = 1_000_000_000;

/// DDS represents time as a 32-bit signed second count plus a 32-bit
/// nanosecond count, so anything past this is unrepresentable.
const DDS_MAX_SECONDS: u64 = i32::MAX as u64;

/// Clamps a duration to the largest value representable as a DDS time,
/// normalizing nanosecond overflow into seconds first. Values past the
/// DDS range saturate to `i32::MAX` seconds and `10^9 - 1` nanoseconds,
/// which in particular maps the "infinite" sentinel onto the largest
/// finite DDS time.
pub fn clamp_duration_to_dds_time(duration: Duration) -> Duration {
    let mut clamped = duration;
    let extra_sec = clamped.nsec / NS_PER_S;
    clamped.nsec %= NS_PER_S;
    clamped.sec = clamped.sec.saturating_add(extra_sec);
    if clamped.sec > DDS_MAX_SECONDS {
        debug!(
            "duration {}s {}ns exceeds the DDS time range, clamping",
            duration.sec, duration.nsec
        );
        clamped.sec = DDS_MAX_SECONDS;
        clamped.nsec = NS_PER_S - 1;
    }
    clamped
}
