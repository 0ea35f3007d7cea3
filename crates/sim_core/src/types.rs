/// Monotonic simulation step counter.
pub type Tick = u64;

/// Submission-order identifier used to break ties between actions of the same tick.
pub type ActionId = u64;
