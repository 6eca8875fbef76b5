//! Event classes: the payload schema of one event kind.

use super::field::FieldType;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventClass {
    pub id: u64,
    pub name: String,
    /// Id of the stream class this event is recorded into.
    pub stream_class_id: u64,
    pub log_level: i32,
    pub model_emf_uri: Option<String>,
    pub payload: FieldType,
}

impl EventClass {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        stream_class_id: u64,
        log_level: i32,
        model_emf_uri: Option<String>,
        payload: FieldType,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            stream_class_id,
            log_level,
            model_emf_uri,
            payload,
        }
    }
}
