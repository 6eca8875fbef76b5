//! Trace classes: the root of the trace object model.

use uuid::Uuid;

use super::abi::Abi;
use super::clock::ClockClass;
use super::error::ModelError;
use super::field::FieldType;
use super::stream::StreamClass;

/// Environment entry value; tracers report either integers or strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvValue {
    Int(i64),
    Str(String),
}

impl From<i64> for EnvValue {
    fn from(value: i64) -> Self {
        EnvValue::Int(value)
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        EnvValue::Str(value.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(value: String) -> Self {
        EnvValue::Str(value)
    }
}

/// Everything a consumer needs to interpret the binary streams of one
/// trace: ABI, identity, environment, clocks, and the per-stream layouts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceClass {
    pub abi: Abi,
    pub uuid: Uuid,
    pub packet_header: FieldType,
    environment: Vec<(String, EnvValue)>,
    clock_classes: Vec<ClockClass>,
    stream_classes: Vec<StreamClass>,
}

impl TraceClass {
    pub fn new(abi: Abi, uuid: Uuid, packet_header: FieldType) -> Self {
        Self {
            abi,
            uuid,
            packet_header,
            environment: Vec::new(),
            clock_classes: Vec::new(),
            stream_classes: Vec::new(),
        }
    }

    /// Appends an environment entry. Order is preserved in the metadata.
    pub fn add_environment(&mut self, name: impl Into<String>, value: impl Into<EnvValue>) {
        self.environment.push((name.into(), value.into()));
    }

    pub fn environment(&self) -> &[(String, EnvValue)] {
        &self.environment
    }

    pub fn add_clock_class(&mut self, clock_class: ClockClass) -> Result<(), ModelError> {
        if self
            .clock_classes
            .iter()
            .any(|existing| existing.name == clock_class.name)
        {
            return Err(ModelError::DuplicateClockClass {
                name: clock_class.name,
            });
        }
        self.clock_classes.push(clock_class);
        Ok(())
    }

    pub fn clock_classes(&self) -> &[ClockClass] {
        &self.clock_classes
    }

    pub fn add_stream_class(&mut self, stream_class: StreamClass) -> Result<(), ModelError> {
        if self
            .stream_classes
            .iter()
            .any(|existing| existing.id == stream_class.id)
        {
            return Err(ModelError::DuplicateStreamClass {
                id: stream_class.id,
            });
        }
        self.stream_classes.push(stream_class);
        Ok(())
    }

    pub fn stream_classes(&self) -> &[StreamClass] {
        &self.stream_classes
    }

    /// Walks the tree in metadata order: the trace class itself, then each
    /// clock class, then each stream class followed by its event classes.
    pub fn accept<V: TraceClassVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        visitor.visit_trace_class(self)?;
        for clock_class in &self.clock_classes {
            visitor.visit_clock_class(clock_class)?;
        }
        for stream_class in &self.stream_classes {
            visitor.visit_stream_class(stream_class)?;
            for event_class in stream_class.event_classes() {
                visitor.visit_event_class(event_class)?;
            }
        }
        Ok(())
    }

    /// Walks the environment entries in insertion order.
    pub fn accept_environment<V: EnvironmentVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        for (name, value) in &self.environment {
            match value {
                EnvValue::Int(v) => visitor.visit_int(name, *v)?,
                EnvValue::Str(v) => visitor.visit_str(name, v)?,
            }
        }
        Ok(())
    }
}

pub trait TraceClassVisitor {
    type Error;

    fn visit_trace_class(&mut self, trace_class: &TraceClass) -> Result<(), Self::Error>;
    fn visit_clock_class(&mut self, clock_class: &ClockClass) -> Result<(), Self::Error>;
    fn visit_stream_class(&mut self, stream_class: &StreamClass) -> Result<(), Self::Error>;
    fn visit_event_class(
        &mut self,
        event_class: &super::event::EventClass,
    ) -> Result<(), Self::Error>;
}

pub trait EnvironmentVisitor {
    type Error;

    fn visit_int(&mut self, name: &str, value: i64) -> Result<(), Self::Error>;
    fn visit_str(&mut self, name: &str, value: &str) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::model::event::EventClass;
    use crate::model::field::StructureType;

    fn empty_struct() -> FieldType {
        FieldType::Structure(StructureType::default())
    }

    fn trace_class() -> TraceClass {
        TraceClass::new(Abi::linux_x86_64(), Uuid::from_bytes([7u8; 16]), empty_struct())
    }

    #[test]
    fn duplicate_clock_class_name_is_rejected() {
        let mut tc = trace_class();
        tc.add_clock_class(ClockClass::new("monotonic", None, "", 1_000_000_000, 0))
            .unwrap();
        let err = tc
            .add_clock_class(ClockClass::new("monotonic", None, "", 1, 0))
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateClockClass {
                name: "monotonic".to_string()
            }
        );
    }

    #[test]
    fn visit_order_is_trace_clocks_streams_events() {
        let mut tc = trace_class();
        tc.add_clock_class(ClockClass::new("monotonic", None, "", 1_000_000_000, 0))
            .unwrap();
        let mut sc = StreamClass::new(0, None, None, None, None).unwrap();
        sc.add_event_class(EventClass::new(0, "alpha", 0, 13, None, empty_struct()))
            .unwrap();
        sc.add_event_class(EventClass::new(1, "beta", 0, 13, None, empty_struct()))
            .unwrap();
        tc.add_stream_class(sc).unwrap();

        struct Recorder(Vec<String>);

        impl TraceClassVisitor for Recorder {
            type Error = Infallible;

            fn visit_trace_class(&mut self, _: &TraceClass) -> Result<(), Infallible> {
                self.0.push("trace".to_string());
                Ok(())
            }

            fn visit_clock_class(&mut self, cc: &ClockClass) -> Result<(), Infallible> {
                self.0.push(format!("clock:{}", cc.name));
                Ok(())
            }

            fn visit_stream_class(&mut self, sc: &StreamClass) -> Result<(), Infallible> {
                self.0.push(format!("stream:{}", sc.id));
                Ok(())
            }

            fn visit_event_class(&mut self, ec: &EventClass) -> Result<(), Infallible> {
                self.0.push(format!("event:{}", ec.name));
                Ok(())
            }
        }

        let mut recorder = Recorder(Vec::new());
        let Ok(()) = tc.accept(&mut recorder);
        assert_eq!(
            recorder.0,
            vec!["trace", "clock:monotonic", "stream:0", "event:alpha", "event:beta"]
        );
    }
}
