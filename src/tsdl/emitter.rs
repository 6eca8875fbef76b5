//! Visitor serializing the trace object model to TSDL fragments.

use std::collections::VecDeque;
use std::convert::Infallible;

use crate::model::{
    Abi, ClockClass, DynamicArrayType, DynamicBlobType, DynamicStringType, EnumMapping,
    EnumerationType, EventClass, Field, FieldType, FieldTypeVisitor, FloatType, IntegerBase,
    IntegerType, Signedness, StaticArrayType, StaticBlobType, StaticStringType, StreamClass,
    StringEncoding, StringType, StructureType, TraceClass, TraceClassVisitor, VariantType,
};

use super::escape::{escape_env_string, escape_identifier};
use super::{EmitError, MetadataSink};

const CTF_SPEC_MAJOR: u32 = 1;
const CTF_SPEC_MINOR: u32 = 8;

/// Serializes one field type (and everything nested in it) to TSDL text.
///
/// Carries the rendering state TSDL needs: the indentation level, the trace
/// ABI (byte-order defaults), the enclosing stream's default clock class
/// name, the stack of field names being serialized (padding structs are
/// named after the current field), and the encoding override used when
/// sized strings are lowered to byte arrays.
struct FieldTypeSerializer<'a> {
    abi: &'a Abi,
    indent: usize,
    default_clock_class_name: Option<&'a str>,
    out: String,
    field_names: Vec<String>,
    type_suffixes: VecDeque<String>,
    encoding_override: Option<StringEncoding>,
    bypass_identifier_escape: bool,
}

impl<'a> FieldTypeSerializer<'a> {
    fn new(abi: &'a Abi, indent: usize, default_clock_class_name: Option<&'a str>) -> Self {
        Self {
            abi,
            indent,
            default_clock_class_name,
            out: String::new(),
            field_names: Vec::new(),
            type_suffixes: VecDeque::new(),
            encoding_override: None,
            bypass_identifier_escape: false,
        }
    }

    fn serialize_type(mut self, field_type: &FieldType) -> Result<String, EmitError> {
        field_type.accept(&mut self)?;
        Ok(self.out)
    }

    fn push_indent(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push('\t');
        }
    }

    /// `<type> <name><suffixes>;` where the suffix queue collects what must
    /// follow the field name (array lengths, sequence length references).
    fn serialize_field(&mut self, field: &Field) -> Result<(), EmitError> {
        let name = if self.bypass_identifier_escape {
            field.name.clone()
        } else {
            escape_identifier(&field.name)?
        };
        self.field_names.push(name);

        field.field_type.accept(self)?;
        self.out.push(' ');
        let name = self.field_names.pop().expect("field name pushed above");
        self.out.push_str(&name);

        while let Some(suffix) = self.type_suffixes.pop_front() {
            self.out.push_str(&suffix);
        }

        self.out.push(';');
        Ok(())
    }

    /// Aligned arrays, sequences and variants are not expressible in TSDL;
    /// an empty structure declaration carrying the alignment is inserted
    /// before the field, named after it.
    fn emit_alignment_padding(&mut self, alignment: u32) {
        let field_name = self
            .field_names
            .last()
            .expect("aligned compound type outside of a field context");
        self.out
            .push_str(&format!("struct {{ }} align({alignment}) {field_name}_padding;\n"));
        self.push_indent(self.indent);
    }

    fn serialize_enumeration<V: Copy + PartialEq + std::fmt::Display>(
        &mut self,
        t: &EnumerationType<V>,
    ) -> Result<(), EmitError> {
        self.out.push_str("enum : ");

        let container = FieldTypeSerializer::new(self.abi, self.indent, None)
            .serialize_type(&FieldType::Integer(t.container.clone()))?;
        self.out.push_str(&container);
        self.out.push_str(" {\n");

        let mappings_indent = self.indent + 1;
        for (i, EnumMapping { name, range }) in t.mappings.iter().enumerate() {
            if i > 0 {
                self.out.push_str(",\n");
            }
            self.push_indent(mappings_indent);
            if range.begin == range.end {
                self.out.push_str(&format!("\"{name}\" = {}", range.begin));
            } else {
                self.out
                    .push_str(&format!("\"{name}\" = {} ... {}", range.begin, range.end));
            }
        }

        self.out.push('\n');
        self.push_indent(self.indent);
        self.out.push('}');
        Ok(())
    }

    fn serialize_variant(&mut self, t: &VariantType) -> Result<(), EmitError> {
        if t.alignment != 0 {
            self.emit_alignment_padding(t.alignment);
        }

        let tag = t.tag_location.tail();
        let tag = if self.bypass_identifier_escape {
            tag.to_string()
        } else {
            escape_identifier(tag)?
        };

        self.indent += 1;
        self.out.push_str(&format!("variant <{tag}> {{\n"));

        // Established readers match variant choice names against the tag
        // enumeration's mapping names verbatim; escaping is bypassed for
        // everything nested under the variant.
        let previous_bypass = self.bypass_identifier_escape;
        self.bypass_identifier_escape = true;
        for (choice_name, choice_type) in &t.choices {
            self.push_indent(self.indent);
            choice_type.accept(self)?;
            self.out.push_str(&format!(" {choice_name};\n"));
        }
        self.bypass_identifier_escape = previous_bypass;

        self.indent -= 1;
        self.push_indent(self.indent);
        self.out.push('}');
        Ok(())
    }

    fn byte_element(&self, base: IntegerBase) -> Box<FieldType> {
        Box::new(FieldType::Integer(IntegerType::new(
            8,
            8,
            Signedness::Unsigned,
            base,
            self.abi.byte_order,
        )))
    }
}

impl FieldTypeVisitor for FieldTypeSerializer<'_> {
    type Error = EmitError;

    fn visit_integer(&mut self, t: &IntegerType) -> Result<(), EmitError> {
        self.out.push_str("integer { ");

        // Mandatory properties, no defaults.
        self.out
            .push_str(&format!("size = {}; align = {};", t.size_bits, t.alignment));

        // Defaults to unsigned.
        if t.signedness == Signedness::Signed {
            self.out.push_str(" signed = true;");
        }

        // Defaults to 10; byte-array lowerings of sized strings state the
        // base explicitly, as historical consumers received it.
        if t.base != IntegerBase::Decimal || self.encoding_override.is_some() {
            let base = match t.base {
                IntegerBase::Binary => 2,
                IntegerBase::Octal => 8,
                IntegerBase::Decimal => 10,
                IntegerBase::Hexadecimal => 16,
            };
            self.out.push_str(&format!(" base = {base};"));
        }

        // Defaults to the trace's native byte order.
        if t.byte_order != self.abi.byte_order {
            self.out
                .push_str(&format!(" byte_order = {};", t.byte_order.as_tsdl()));
        }

        if let Some(encoding) = self.encoding_override.take() {
            let encoding = match encoding {
                StringEncoding::Ascii => "ASCII",
                StringEncoding::Utf8 => "UTF8",
            };
            self.out.push_str(&format!(" encoding = {encoding};"));
        }

        if t.has_default_clock_role() {
            let clock = self
                .default_clock_class_name
                .ok_or(EmitError::MissingDefaultClock)?;
            self.out.push_str(&format!(" map = clock.{clock}.value;"));
        }

        self.out.push_str(" }");
        Ok(())
    }

    fn visit_float(&mut self, t: &FloatType) -> Result<(), EmitError> {
        self.out.push_str(&format!(
            "floating_point {{ align = {}; mant_dig = {}; exp_dig = {};",
            t.alignment, t.mantissa_digits, t.exponent_digits
        ));

        if t.byte_order != self.abi.byte_order {
            self.out
                .push_str(&format!(" byte_order = {};", t.byte_order.as_tsdl()));
        }

        self.out.push_str(" }");
        Ok(())
    }

    fn visit_signed_enum(&mut self, t: &EnumerationType<i64>) -> Result<(), EmitError> {
        self.serialize_enumeration(t)
    }

    fn visit_unsigned_enum(&mut self, t: &EnumerationType<u64>) -> Result<(), EmitError> {
        self.serialize_enumeration(t)
    }

    fn visit_static_array(&mut self, t: &StaticArrayType) -> Result<(), EmitError> {
        if t.alignment != 0 {
            self.emit_alignment_padding(t.alignment);
        }

        t.element.accept(self)?;
        self.type_suffixes.push_back(format!("[{}]", t.length));
        Ok(())
    }

    fn visit_dynamic_array(&mut self, t: &DynamicArrayType) -> Result<(), EmitError> {
        if t.alignment != 0 {
            self.emit_alignment_padding(t.alignment);
        }

        t.element.accept(self)?;
        // Only the tail component of the length field's location is
        // emitted; tracers keep it unique within the enclosing scope.
        let tail = t.length_location.tail();
        let length_field = if self.bypass_identifier_escape {
            tail.to_string()
        } else {
            escape_identifier(tail)?
        };
        self.type_suffixes.push_back(format!("[{length_field}]"));
        Ok(())
    }

    fn visit_static_blob(&mut self, t: &StaticBlobType) -> Result<(), EmitError> {
        // No blob type in CTF 1.x; expressed as a static array of
        // hexadecimal 8-bit integers.
        let array = StaticArrayType {
            element: self.byte_element(IntegerBase::Hexadecimal),
            length: t.length_bytes,
            alignment: t.alignment,
        };
        self.visit_static_array(&array)
    }

    fn visit_dynamic_blob(&mut self, t: &DynamicBlobType) -> Result<(), EmitError> {
        let array = DynamicArrayType {
            element: self.byte_element(IntegerBase::Hexadecimal),
            length_location: t.length_location.clone(),
            alignment: t.alignment,
        };
        self.visit_dynamic_array(&array)
    }

    fn visit_null_terminated_string(&mut self, t: &StringType) -> Result<(), EmitError> {
        // Defaults to UTF-8.
        match t.encoding {
            StringEncoding::Ascii => self.out.push_str("string { encoding = ASCII }"),
            StringEncoding::Utf8 => self.out.push_str("string"),
        }
        Ok(())
    }

    fn visit_static_string(&mut self, t: &StaticStringType) -> Result<(), EmitError> {
        // TSDL expresses sized strings as byte arrays with an encoding on
        // the element integer.
        self.encoding_override = Some(t.encoding);
        let array = StaticArrayType {
            element: self.byte_element(IntegerBase::Decimal),
            length: t.length,
            alignment: t.alignment,
        };
        self.visit_static_array(&array)
    }

    fn visit_dynamic_string(&mut self, t: &DynamicStringType) -> Result<(), EmitError> {
        self.encoding_override = Some(t.encoding);
        let array = DynamicArrayType {
            element: self.byte_element(IntegerBase::Decimal),
            length_location: t.length_location.clone(),
            alignment: t.alignment,
        };
        self.visit_dynamic_array(&array)
    }

    fn visit_structure(&mut self, t: &StructureType) -> Result<(), EmitError> {
        self.indent += 1;
        self.out.push_str("struct {");

        let previous_bypass = self.bypass_identifier_escape;
        self.bypass_identifier_escape = false;
        for field in &t.fields {
            self.out.push('\n');
            self.push_indent(self.indent);
            self.serialize_field(field)?;
        }
        self.bypass_identifier_escape = previous_bypass;

        self.indent -= 1;
        if !t.fields.is_empty() {
            self.out.push('\n');
            self.push_indent(self.indent);
        }
        self.out.push('}');
        Ok(())
    }

    fn visit_variant_signed(&mut self, t: &VariantType) -> Result<(), EmitError> {
        self.serialize_variant(t)
    }

    fn visit_variant_unsigned(&mut self, t: &VariantType) -> Result<(), EmitError> {
        self.serialize_variant(t)
    }
}

struct EnvSerializer {
    out: String,
}

impl crate::model::EnvironmentVisitor for EnvSerializer {
    type Error = Infallible;

    fn visit_int(&mut self, name: &str, value: i64) -> Result<(), Infallible> {
        self.out.push_str(&format!("\t{name} = {value};\n"));
        Ok(())
    }

    fn visit_str(&mut self, name: &str, value: &str) -> Result<(), Infallible> {
        self.out
            .push_str(&format!("\t{name} = \"{}\";\n", escape_env_string(value)));
        Ok(())
    }
}

/// Emits top-level TSDL fragments through a [`MetadataSink`], in metadata
/// order: trace class, environment, clock classes, stream classes, event
/// classes. Each fragment terminates itself with `;\n\n`.
pub struct TsdlEmitter<'a, S: MetadataSink> {
    abi: &'a Abi,
    sink: &'a mut S,
}

impl<'a, S: MetadataSink> TsdlEmitter<'a, S> {
    pub fn new(abi: &'a Abi, sink: &'a mut S) -> Self {
        Self { abi, sink }
    }
}

impl<S: MetadataSink> TraceClassVisitor for TsdlEmitter<'_, S> {
    type Error = EmitError;

    fn visit_trace_class(&mut self, trace_class: &TraceClass) -> Result<(), EmitError> {
        let packet_header = FieldTypeSerializer::new(&trace_class.abi, 1, None)
            .serialize_type(&trace_class.packet_header)?;

        let fragment = format!(
            "/* CTF {CTF_SPEC_MAJOR}.{CTF_SPEC_MINOR} */\n\n\
             trace {{\n\
             \tmajor = {CTF_SPEC_MAJOR};\n\
             \tminor = {CTF_SPEC_MINOR};\n\
             \tuuid = \"{uuid}\";\n\
             \tbyte_order = {byte_order};\n\
             \tpacket.header := {packet_header};\n\
             }};\n\n",
            uuid = trace_class.uuid.hyphenated(),
            byte_order = trace_class.abi.byte_order.as_tsdl(),
        );
        self.sink.append(&fragment)?;

        let mut env = EnvSerializer {
            out: String::from("env {\n"),
        };
        let Ok(()) = trace_class.accept_environment(&mut env);
        let mut fragment = env.out;
        fragment.push_str("};\n\n");
        self.sink.append(&fragment)?;
        Ok(())
    }

    fn visit_clock_class(&mut self, clock_class: &ClockClass) -> Result<(), EmitError> {
        let uuid = clock_class
            .uuid
            .map(|uuid| format!("\tuuid = \"{}\";\n", uuid.hyphenated()))
            .unwrap_or_default();

        let fragment = format!(
            "clock {{\n\
             \tname = \"{name}\";\n\
             {uuid}\
             \tdescription = \"{description}\";\n\
             \tfreq = {frequency};\n\
             \toffset = {offset};\n\
             }};\n\n",
            name = clock_class.name,
            description = clock_class.description,
            frequency = clock_class.frequency,
            offset = clock_class.offset,
        );
        self.sink.append(&fragment)?;
        Ok(())
    }

    fn visit_stream_class(&mut self, stream_class: &StreamClass) -> Result<(), EmitError> {
        let mut fragment = format!("stream {{\n\tid = {};\n", stream_class.id);
        let default_clock = stream_class.default_clock_class_name.as_deref();

        if let Some(event_header) = &stream_class.event_header {
            let description =
                FieldTypeSerializer::new(self.abi, 1, default_clock).serialize_type(event_header)?;
            fragment.push_str(&format!("\tevent.header := {description};\n"));
        }

        if let Some(packet_context) = &stream_class.packet_context {
            let description = FieldTypeSerializer::new(self.abi, 1, default_clock)
                .serialize_type(packet_context)?;
            fragment.push_str(&format!("\tpacket.context := {description};\n"));
        }

        // The event context never maps onto the default clock.
        if let Some(event_context) = &stream_class.event_context {
            let description =
                FieldTypeSerializer::new(self.abi, 1, None).serialize_type(event_context)?;
            fragment.push_str(&format!("\tevent.context := {description};\n"));
        }

        fragment.push_str("};\n\n");
        self.sink.append(&fragment)?;
        Ok(())
    }

    fn visit_event_class(&mut self, event_class: &EventClass) -> Result<(), EmitError> {
        let mut fragment = format!(
            "event {{\n\
             \tname = \"{name}\";\n\
             \tid = {id};\n\
             \tstream_id = {stream_class_id};\n\
             \tloglevel = {log_level};\n",
            name = event_class.name,
            id = event_class.id,
            stream_class_id = event_class.stream_class_id,
            log_level = event_class.log_level,
        );

        if let Some(uri) = &event_class.model_emf_uri {
            fragment.push_str(&format!("\tmodel.emf.uri = \"{uri}\";\n"));
        }

        let payload =
            FieldTypeSerializer::new(self.abi, 1, None).serialize_type(&event_class.payload)?;
        fragment.push_str(&format!("\tfields := {payload};\n}};\n\n"));

        self.sink.append(&fragment)?;
        Ok(())
    }
}
