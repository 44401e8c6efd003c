// Scheduler constants (no magic values)

/// Trigger reason for the periodic tick
pub const REASON_TICK: &str = "tick";

/// Trigger reason after a successful enqueue
pub const REASON_JOIN: &str = "join";

/// Trigger reason after a leave
pub const REASON_LEAVE: &str = "leave";

/// Trigger reason when a real-time subscriber disconnects
pub const REASON_DISCONNECT: &str = "disconnect";
