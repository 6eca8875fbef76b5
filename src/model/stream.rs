//! Stream classes: per-stream layout and the event classes recorded in it.

use super::error::ModelError;
use super::event::EventClass;
use super::field::FieldType;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamClass {
    pub id: u64,
    /// Name of the clock class timestamp fields of this stream map onto.
    pub default_clock_class_name: Option<String>,
    pub event_header: Option<FieldType>,
    pub packet_context: Option<FieldType>,
    pub event_context: Option<FieldType>,
    event_classes: Vec<EventClass>,
}

impl StreamClass {
    /// A stream class whose event header or packet context carries a field
    /// mapped onto the default clock must name that clock.
    pub fn new(
        id: u64,
        default_clock_class_name: Option<String>,
        event_header: Option<FieldType>,
        packet_context: Option<FieldType>,
        event_context: Option<FieldType>,
    ) -> Result<Self, ModelError> {
        if default_clock_class_name.is_none() {
            let clocked = [&event_header, &packet_context]
                .into_iter()
                .flatten()
                .any(FieldType::references_default_clock);
            if clocked {
                return Err(ModelError::MissingDefaultClockClass { id });
            }
        }

        Ok(Self {
            id,
            default_clock_class_name,
            event_header,
            packet_context,
            event_context,
            event_classes: Vec::new(),
        })
    }

    pub fn add_event_class(&mut self, event_class: EventClass) -> Result<(), ModelError> {
        if self
            .event_classes
            .iter()
            .any(|existing| existing.id == event_class.id)
        {
            return Err(ModelError::DuplicateEventClass {
                id: event_class.id,
                stream_class_id: self.id,
            });
        }
        self.event_classes.push(event_class);
        Ok(())
    }

    /// Event classes in insertion order.
    pub fn event_classes(&self) -> &[EventClass] {
        &self.event_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::abi::ByteOrder;
    use crate::model::field::{
        Field, IntegerBase, IntegerRole, IntegerType, Signedness, StructureType,
    };

    fn clocked_header() -> FieldType {
        FieldType::Structure(StructureType::new(vec![Field::new(
            "timestamp",
            FieldType::Integer(
                IntegerType::new(
                    32,
                    8,
                    Signedness::Unsigned,
                    IntegerBase::Decimal,
                    ByteOrder::Little,
                )
                .with_role(IntegerRole::DefaultClockTimestamp),
            ),
        )]))
    }

    #[test]
    fn clocked_header_requires_default_clock_name() {
        let err = StreamClass::new(0, None, Some(clocked_header()), None, None).unwrap_err();
        assert_eq!(err, ModelError::MissingDefaultClockClass { id: 0 });

        let ok = StreamClass::new(
            0,
            Some("monotonic".to_string()),
            Some(clocked_header()),
            None,
            None,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn duplicate_event_class_id_is_rejected() {
        let mut stream_class = StreamClass::new(1, None, None, None, None).unwrap();
        let payload = FieldType::Structure(StructureType::default());
        stream_class
            .add_event_class(EventClass::new(0, "first", 1, 13, None, payload.clone()))
            .unwrap();
        let err = stream_class
            .add_event_class(EventClass::new(0, "second", 1, 13, None, payload))
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateEventClass {
                id: 0,
                stream_class_id: 1
            }
        );
    }
}
