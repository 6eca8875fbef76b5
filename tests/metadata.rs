//! Integration tests for TSDL metadata emission: fragment ordering, the
//! escaping contract, and a full document against a UST-shaped trace class.

use std::io;

use uuid::Uuid;

use weft::model::{
    Abi, ByteOrder, ClockClass, EnumMapping, EnumerationType, EventClass, Field, FieldType,
    IntegerBase, IntegerRole, IntegerType, MappingRange, Signedness, StaticArrayType, StreamClass,
    StructureType, TraceClass,
};
use weft::tsdl::{EmitError, MetadataSink, TsdlEmitter, escape_identifier};

const TRACE_UUID: [u8; 16] = [
    0x83, 0xaf, 0x7f, 0x1c, 0x4a, 0x3e, 0x4c, 0x21, 0x97, 0x30, 0x5c, 0x55, 0x30, 0x7d, 0xa7,
    0x6a,
];

fn uint(size_bits: u32, alignment: u32) -> IntegerType {
    IntegerType::new(
        size_bits,
        alignment,
        Signedness::Unsigned,
        IntegerBase::Decimal,
        ByteOrder::Little,
    )
}

fn hex_uint(size_bits: u32, alignment: u32) -> IntegerType {
    IntegerType::new(
        size_bits,
        alignment,
        Signedness::Unsigned,
        IntegerBase::Hexadecimal,
        ByteOrder::Little,
    )
}

/// Packet header every CTF trace starts with: magic, trace uuid, stream id.
fn packet_header() -> FieldType {
    FieldType::Structure(StructureType::new(vec![
        Field::new(
            "magic",
            FieldType::Integer(hex_uint(32, 8).with_role(IntegerRole::PacketMagic)),
        ),
        Field::new(
            "uuid",
            FieldType::StaticArray(StaticArrayType {
                element: Box::new(FieldType::Integer(hex_uint(8, 8))),
                length: 16,
                alignment: 0,
            }),
        ),
        Field::new(
            "stream_id",
            FieldType::Integer(uint(32, 8).with_role(IntegerRole::PacketStreamId)),
        ),
    ]))
}

fn event_header() -> FieldType {
    FieldType::Structure(StructureType::new(vec![
        Field::new(
            "id",
            FieldType::UnsignedEnum(EnumerationType {
                container: uint(16, 8),
                mappings: vec![EnumMapping::new("compact", MappingRange::new(0, 65534))],
            }),
        ),
        Field::new(
            "timestamp",
            FieldType::Integer(uint(64, 8).with_role(IntegerRole::DefaultClockTimestamp)),
        ),
    ]))
}

fn ust_trace_class() -> TraceClass {
    let mut trace_class = TraceClass::new(
        Abi::linux_x86_64(),
        Uuid::from_bytes(TRACE_UUID),
        packet_header(),
    );
    trace_class.add_environment("hostname", "build-host");
    trace_class.add_environment("domain", "ust");
    trace_class.add_environment("tracer_name", "lttng-ust");
    trace_class.add_environment("tracer_major", 2i64);
    trace_class.add_environment("tracer_minor", 13i64);
    trace_class
        .add_clock_class(ClockClass::new(
            "monotonic",
            Some(Uuid::from_bytes([0x11; 16])),
            "Monotonic Clock",
            1_000_000_000,
            1_658_000_000,
        ))
        .unwrap();

    let mut stream_class = StreamClass::new(
        0,
        Some("monotonic".to_string()),
        Some(event_header()),
        None,
        None,
    )
    .unwrap();
    stream_class
        .add_event_class(EventClass::new(
            0,
            "my_app:my_event",
            0,
            13,
            Some("http://example.com/model".to_string()),
            FieldType::Structure(StructureType::new(vec![Field::new(
                "value",
                FieldType::Integer(IntegerType::new(
                    32,
                    8,
                    Signedness::Signed,
                    IntegerBase::Decimal,
                    ByteOrder::Little,
                )),
            )])),
        ))
        .unwrap();
    trace_class.add_stream_class(stream_class).unwrap();
    trace_class
}

/// Records each appended fragment separately.
#[derive(Default)]
struct FragmentRecorder {
    fragments: Vec<String>,
}

impl MetadataSink for FragmentRecorder {
    fn append(&mut self, fragment: &str) -> io::Result<()> {
        self.fragments.push(fragment.to_string());
        Ok(())
    }
}

/// Fails after a fixed number of appends.
struct FailingSink {
    remaining: usize,
}

impl MetadataSink for FailingSink {
    fn append(&mut self, _fragment: &str) -> io::Result<()> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "metadata channel down"));
        }
        self.remaining -= 1;
        Ok(())
    }
}

#[test]
fn identifier_escape_scenarios() {
    assert_eq!(escape_identifier("my field!").unwrap(), "_my_field_");
    assert_eq!(escape_identifier("uuid").unwrap(), "uuid");
    assert!(matches!(
        escape_identifier(""),
        Err(EmitError::InvalidIdentifier)
    ));
}

#[test]
fn fragments_arrive_in_metadata_order() {
    let trace_class = ust_trace_class();
    let mut recorder = FragmentRecorder::default();
    let abi = trace_class.abi;
    trace_class
        .accept(&mut TsdlEmitter::new(&abi, &mut recorder))
        .unwrap();

    // trace, env, one clock, one stream, one event.
    assert_eq!(recorder.fragments.len(), 5);
    assert!(recorder.fragments[0].starts_with("/* CTF 1.8 */"));
    assert!(recorder.fragments[1].starts_with("env {"));
    assert!(recorder.fragments[2].starts_with("clock {"));
    assert!(recorder.fragments[3].starts_with("stream {"));
    assert!(recorder.fragments[4].starts_with("event {"));

    for fragment in &recorder.fragments {
        assert!(fragment.ends_with(";\n\n") || fragment.ends_with("};\n\n"));
    }
}

#[test]
fn trace_fragment_carries_the_dashed_uuid() {
    let trace_class = ust_trace_class();
    let mut metadata = String::new();
    let abi = trace_class.abi;
    trace_class
        .accept(&mut TsdlEmitter::new(&abi, &mut metadata))
        .unwrap();

    assert!(metadata.contains("uuid = \"83af7f1c-4a3e-4c21-9730-5c55307da76a\";"));
    assert!(metadata.contains("byte_order = le;"));
}

#[test]
fn whole_document_matches_expected_tsdl() {
    let trace_class = ust_trace_class();
    let mut metadata = String::new();
    let abi = trace_class.abi;
    trace_class
        .accept(&mut TsdlEmitter::new(&abi, &mut metadata))
        .unwrap();

    let expected = "/* CTF 1.8 */\n\n\
        trace {\n\
        \tmajor = 1;\n\
        \tminor = 8;\n\
        \tuuid = \"83af7f1c-4a3e-4c21-9730-5c55307da76a\";\n\
        \tbyte_order = le;\n\
        \tpacket.header := struct {\n\
        \t\tinteger { size = 32; align = 8; base = 16; } magic;\n\
        \t\tinteger { size = 8; align = 8; base = 16; } uuid[16];\n\
        \t\tinteger { size = 32; align = 8; } stream_id;\n\
        \t};\n\
        };\n\n\
        env {\n\
        \thostname = \"build-host\";\n\
        \tdomain = \"ust\";\n\
        \ttracer_name = \"lttng-ust\";\n\
        \ttracer_major = 2;\n\
        \ttracer_minor = 13;\n\
        };\n\n\
        clock {\n\
        \tname = \"monotonic\";\n\
        \tuuid = \"11111111-1111-1111-1111-111111111111\";\n\
        \tdescription = \"Monotonic Clock\";\n\
        \tfreq = 1000000000;\n\
        \toffset = 1658000000;\n\
        };\n\n\
        stream {\n\
        \tid = 0;\n\
        \tevent.header := struct {\n\
        \t\tenum : integer { size = 16; align = 8; } {\n\
        \t\t\t\"compact\" = 0 ... 65534\n\
        \t\t} id;\n\
        \t\tinteger { size = 64; align = 8; map = clock.monotonic.value; } timestamp;\n\
        \t};\n\
        };\n\n\
        event {\n\
        \tname = \"my_app:my_event\";\n\
        \tid = 0;\n\
        \tstream_id = 0;\n\
        \tloglevel = 13;\n\
        \tmodel.emf.uri = \"http://example.com/model\";\n\
        \tfields := struct {\n\
        \t\tinteger { size = 32; align = 8; signed = true; } _value;\n\
        \t};\n\
        };\n\n";
    assert_eq!(metadata, expected);
}

#[test]
fn env_strings_are_escaped() {
    let mut trace_class = TraceClass::new(
        Abi::linux_x86_64(),
        Uuid::from_bytes(TRACE_UUID),
        FieldType::Structure(StructureType::default()),
    );
    trace_class.add_environment("launch_args", "a\\b \"quoted\"\nnext");

    let mut metadata = String::new();
    let abi = trace_class.abi;
    trace_class
        .accept(&mut TsdlEmitter::new(&abi, &mut metadata))
        .unwrap();

    assert!(metadata.contains("\tlaunch_args = \"a\\\\b \\\"quoted\\\"\\nnext\";\n"));
}

#[test]
fn event_context_must_not_reference_the_default_clock() {
    // The default clock class name is propagated to the event header and
    // packet context only; a clock-mapped field in the event context is an
    // invalid field type.
    let clocked = FieldType::Structure(StructureType::new(vec![Field::new(
        "ctx_ts",
        FieldType::Integer(uint(64, 8).with_role(IntegerRole::DefaultClockTimestamp)),
    )]));
    let stream_class = StreamClass::new(
        0,
        Some("monotonic".to_string()),
        None,
        None,
        Some(clocked),
    )
    .unwrap();

    let mut trace_class = TraceClass::new(
        Abi::linux_x86_64(),
        Uuid::from_bytes(TRACE_UUID),
        FieldType::Structure(StructureType::default()),
    );
    trace_class.add_stream_class(stream_class).unwrap();

    let mut metadata = String::new();
    let abi = trace_class.abi;
    let err = trace_class
        .accept(&mut TsdlEmitter::new(&abi, &mut metadata))
        .unwrap_err();
    assert!(matches!(err, EmitError::MissingDefaultClock));
}

#[test]
fn append_failures_bubble_up() {
    let trace_class = ust_trace_class();
    let abi = trace_class.abi;

    // Fails on the env fragment, the second append.
    let mut sink = FailingSink { remaining: 1 };
    let err = trace_class
        .accept(&mut TsdlEmitter::new(&abi, &mut sink))
        .unwrap_err();
    assert!(matches!(err, EmitError::Append(_)));
}

#[test]
fn empty_field_name_fails_the_fragment() {
    let mut trace_class = TraceClass::new(
        Abi::linux_x86_64(),
        Uuid::from_bytes(TRACE_UUID),
        FieldType::Structure(StructureType::new(vec![Field::new(
            "",
            FieldType::Integer(uint(32, 8)),
        )])),
    );
    trace_class.add_environment("hostname", "host");

    let mut metadata = String::new();
    let abi = trace_class.abi;
    let err = trace_class
        .accept(&mut TsdlEmitter::new(&abi, &mut metadata))
        .unwrap_err();
    assert!(matches!(err, EmitError::InvalidIdentifier));
    // Nothing was appended for the failed fragment.
    assert!(metadata.is_empty());
}
