// Reprocessing constants (no magic values)
use std::time::Duration;

/// Maximum lookups per identifier before the ticket is terminally failed
pub const MAX_ATTEMPTS: u32 = 3;

/// Pause after every handled ticket (15s); throttles load on the lookup API
pub const PACING_DELAY: Duration = Duration::from_secs(15);

/// Pause after an error in the loop itself before resuming (10s)
pub const ERROR_RECOVERY_PAUSE: Duration = Duration::from_secs(10);
