//! Clock classes owned by a trace class.

use uuid::Uuid;

/// A monotonic clock the tracer samples timestamps from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockClass {
    /// Unique within the owning trace class.
    pub name: String,
    pub uuid: Option<Uuid>,
    pub description: String,
    /// Ticks per second.
    pub frequency: u64,
    /// Offset in ticks since the Unix epoch.
    pub offset: i64,
}

impl ClockClass {
    pub fn new(
        name: impl Into<String>,
        uuid: Option<Uuid>,
        description: impl Into<String>,
        frequency: u64,
        offset: i64,
    ) -> Self {
        Self {
            name: name.into(),
            uuid,
            description: description.into(),
            frequency,
            offset,
        }
    }
}
