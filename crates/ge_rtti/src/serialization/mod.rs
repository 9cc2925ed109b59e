//! The binary serializer.
//!
//! ## Menu
//!
//! - [`BinarySerializer`]: encodes object graphs into caller buffers and
//!   decodes them from any `Read + Seek` stream.
//! - [`encode_to_vec`] / [`decode_from_slice`]: the same in memory.
//! - [`BinaryCloner`]: deep and shallow copies through the encoder.
//!
//! ## Format
//!
//! All integers are little-endian. A stream is a sequence of top-level
//! objects, the root first:
//!
//! ```text
//! object   = ObjectMetaData field* (ObjectMetaData field*)* terminator
//! field    = FieldMetaData [count: u32] payload
//! ```
//!
//! - `ObjectMetaData` (8 bytes) carries the object id, a base level flag and
//!   the rtti id. Base levels of the same object follow the most derived one.
//! - `FieldMetaData` (4 bytes) carries the field id, the static value size
//!   and the category flags. A terminator closes the object.
//! - Plain values are their bytes, dynamically sized ones prefixed with a
//!   `u32` length. By-value objects are nested inline with object id `0`.
//!   References are `u32` object ids, `0` for null. Data blocks are a `u32`
//!   size followed by the bytes.

// -----------------------------------------------------------------------------
// Modules

mod cloner;
mod decoder;
mod encoder;
mod memory;
mod reader;
mod serializer;
mod wire;
mod writer;

// -----------------------------------------------------------------------------
// Exports

pub use cloner::BinaryCloner;
pub use memory::{decode_from_slice, encode_to_vec};
pub use serializer::BinarySerializer;

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use core::ops::ControlFlow;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::io::Cursor;
    use std::sync::RwLock;

    use super::{BinaryCloner, BinarySerializer, decode_from_slice, encode_to_vec};
    use crate::error::{DecodeError, EncodeError, FieldError};
    use crate::info::{PlainType, TypeDescriptorBuilder};
    use crate::{MemoryDataStream, Reflectable, SharedObject, TypeRegistry, Typed};

    // -------------------------------------------------------------------------
    // Types

    #[derive(Reflectable, Default, Debug, PartialEq)]
    #[rtti(id = 300, name = "tests::Point")]
    struct Point {
        #[rtti(id = 1)]
        x: i32,
        #[rtti(id = 2)]
        y: i32,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 301, name = "tests::Line")]
    struct Line {
        #[rtti(id = 1, ptr)]
        start: Option<Arc<RwLock<Point>>>,
        #[rtti(id = 2, ptr)]
        end: Option<Arc<RwLock<Point>>>,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 302, name = "tests::Segment")]
    struct Segment {
        #[rtti(id = 1, reflectable)]
        a: Point,
        #[rtti(id = 2, reflectable)]
        b: Point,
    }

    /// Claims two bytes but writes four.
    #[derive(Default)]
    struct Misreported(u16);

    impl PlainType for Misreported {
        const STATIC_SIZE: u32 = 2;

        fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError> {
            u32::from(self.0).write_bytes(out)
        }

        fn read_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
            u16::read_bytes(bytes).map(Misreported)
        }
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 303, name = "tests::Pair")]
    struct Pair {
        #[rtti(id = 1)]
        first: Misreported,
        #[rtti(id = 2)]
        tail: u32,
    }

    static COUNTED_CREATED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Reflectable)]
    #[rtti(id = 310, name = "tests::Counted")]
    struct Counted {
        #[rtti(id = 1)]
        value: u32,
    }

    impl Default for Counted {
        fn default() -> Self {
            COUNTED_CREATED.fetch_add(1, Ordering::SeqCst);
            Self { value: 0 }
        }
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 311, name = "tests::Holder")]
    struct Holder {
        #[rtti(id = 1, ptr)]
        first: Option<Arc<RwLock<Counted>>>,
        #[rtti(id = 2, ptr)]
        second: Option<Arc<RwLock<Counted>>>,
        #[rtti(id = 3, ptr, array)]
        more: Vec<Option<Arc<RwLock<Counted>>>>,
    }

    mod v1 {
        use crate::Reflectable;

        #[derive(Reflectable, Default)]
        #[rtti(id = 320, name = "tests::Settings")]
        pub struct Settings {
            #[rtti(id = 1)]
            pub volume: u32,
        }

        #[derive(Reflectable, Default)]
        #[rtti(id = 330, name = "tests::Record")]
        pub struct Record {
            #[rtti(id = 1)]
            pub before: u32,
            #[rtti(id = 3)]
            pub after: u16,
        }

        #[derive(Reflectable, Default)]
        #[rtti(id = 321, name = "tests::Sample")]
        pub struct Sample {
            #[rtti(id = 1)]
            pub a: i32,
            #[rtti(id = 2)]
            pub b: i32,
        }
    }

    mod v2 {
        use crate::Reflectable;

        #[derive(Reflectable)]
        #[rtti(id = 320, name = "tests::Settings")]
        pub struct Settings {
            #[rtti(id = 1)]
            pub volume: u32,
            #[rtti(id = 2)]
            pub brightness: u32,
        }

        #[derive(Reflectable)]
        #[rtti(id = 321, name = "tests::Sample")]
        pub struct Sample {
            #[rtti(id = 1)]
            pub a: i32,
            #[rtti(id = 2)]
            pub b: i32,
            #[rtti(id = 3)]
            pub c: i32,
        }

        impl Default for Sample {
            fn default() -> Self {
                Self { a: 0, b: 0, c: 42 }
            }
        }

        impl Default for Settings {
            fn default() -> Self {
                Self {
                    volume: 0,
                    brightness: 42,
                }
            }
        }

        #[derive(Reflectable, Default)]
        #[rtti(id = 330, name = "tests::Record")]
        pub struct Record {
            #[rtti(id = 1)]
            pub before: u32,
            #[rtti(id = 2)]
            pub label: String,
            #[rtti(id = 3)]
            pub after: u16,
        }

        #[derive(Reflectable, Default)]
        #[rtti(id = 330, name = "tests::Record")]
        pub struct RetypedRecord {
            #[rtti(id = 1)]
            pub before: String,
        }
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 340, name = "tests::Left")]
    struct Left {
        #[rtti(id = 1, ptr)]
        right: Option<Arc<RwLock<Right>>>,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 341, name = "tests::Right")]
    struct Right {
        #[rtti(id = 1, ptr)]
        left: Option<Arc<RwLock<Left>>>,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 342, name = "tests::Myself")]
    struct Myself {
        #[rtti(id = 1, ptr)]
        me: Option<SharedObject>,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 350, name = "tests::Node", customize = Node::hooks)]
    struct Node {
        #[rtti(id = 1)]
        name: String,
        #[rtti(id = 2, ptr, array)]
        children: Vec<Option<Arc<RwLock<Node>>>>,
        #[rtti(id = 3, ptr, weak)]
        parent: Option<Arc<RwLock<Node>>>,
        child_names: Vec<String>,
    }

    impl Node {
        fn hooks(builder: TypeDescriptorBuilder<Self>) -> TypeDescriptorBuilder<Self> {
            builder.on_deserialization_ended(|node, context| {
                node.child_names = node
                    .children
                    .iter()
                    .flatten()
                    .map(|child| child.read().unwrap().name.clone())
                    .collect();
                if let Some(order) = context.and_then(|ctx| ctx.downcast_mut::<Vec<String>>()) {
                    order.push(node.name.clone());
                }
            })
        }

        fn new(name: &str) -> Arc<RwLock<Node>> {
            Arc::new(RwLock::new(Node {
                name: name.into(),
                ..Node::default()
            }))
        }
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 360, name = "tests::Shape", abstract)]
    struct Shape {
        #[rtti(id = 1)]
        layer: u8,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 361, name = "tests::Circle", base = shape, customize = Circle::hooks)]
    struct Circle {
        shape: Shape,
        #[rtti(id = 2)]
        radius: f32,
        #[rtti(id = 3, reflectable)]
        center: Point,
    }

    impl Circle {
        fn hooks(builder: TypeDescriptorBuilder<Self>) -> TypeDescriptorBuilder<Self> {
            builder
                .on_serialization_started(|_, context| {
                    if let Some(log) = context.and_then(|ctx| ctx.downcast_mut::<Vec<&'static str>>()) {
                        log.push("started");
                    }
                })
                .on_serialization_ended(|_, context| {
                    if let Some(log) = context.and_then(|ctx| ctx.downcast_mut::<Vec<&'static str>>()) {
                        log.push("ended");
                    }
                })
        }
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 362, name = "tests::Scene")]
    struct Scene {
        #[rtti(id = 1, ptr, array)]
        shapes: Vec<Option<SharedObject>>,
        #[rtti(id = 2, reflectable, array)]
        anchors: Vec<Point>,
    }

    #[derive(Reflectable, Default)]
    #[rtti(id = 370, name = "tests::Texture")]
    struct Texture {
        #[rtti(id = 1)]
        name: String,
        #[rtti(id = 2, data_block, get = Self::pixels, set = Self::set_pixels)]
        pixels: MemoryDataStream,
    }

    impl Texture {
        fn pixels(&self) -> (MemoryDataStream, u32) {
            (self.pixels.clone(), self.pixels.len() as u32)
        }

        fn set_pixels(&mut self, stream: MemoryDataStream, _size: u32) {
            self.pixels = stream;
        }
    }

    #[derive(Reflectable)]
    #[rtti(id = 380, name = "tests::Grid")]
    struct Grid {
        #[rtti(id = 1, array, readonly)]
        cells: Vec<u8>,
        #[rtti(id = 2)]
        tail: u32,
    }

    impl Default for Grid {
        fn default() -> Self {
            Self {
                cells: vec![0; 2],
                tail: 0,
            }
        }
    }

    // -------------------------------------------------------------------------
    // Helpers

    fn registry_of<T: Typed>() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register::<T>();
        registry
    }

    fn sample_line() -> SharedObject {
        let point = Arc::new(RwLock::new(Point { x: 3, y: -4 }));
        SharedObject::new(Line {
            start: Some(point.clone()),
            end: Some(point),
        })
    }

    fn encode_chunked(root: &SharedObject, buffer_len: usize) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        let mut buffer = vec![0; buffer_len];
        BinarySerializer::new()
            .encode(
                root,
                &mut buffer,
                |chunk| {
                    chunks.push(chunk.to_vec());
                    ControlFlow::Continue(())
                },
                false,
                None,
            )
            .unwrap();
        chunks
    }

    // -------------------------------------------------------------------------
    // Tests

    #[test]
    fn point_line_round_trip() {
        let bytes = encode_to_vec(&sample_line(), false, None).unwrap();
        // Two objects of 8 + 2 * 8 + 4 bytes.
        assert_eq!(bytes.len(), 56);

        let decoded = decode_from_slice(&registry_of::<Line>(), &bytes, None).unwrap();
        let line = decoded.downcast::<Line>().unwrap();
        let line = line.read().unwrap();

        let start = line.start.as_ref().unwrap();
        assert!(Arc::ptr_eq(start, line.end.as_ref().unwrap()));
        assert_eq!(*start.read().unwrap(), Point { x: 3, y: -4 });
    }

    #[test]
    fn by_value_objects_are_inline() {
        let segment = SharedObject::new(Segment {
            a: Point { x: 3, y: 4 },
            b: Point { x: 5, y: 6 },
        });
        let bytes = encode_to_vec(&segment, false, None).unwrap();
        // Outer header, two fields each holding a 28 byte nested object,
        // and the terminator.
        assert_eq!(bytes.len(), 8 + 2 * (4 + 28) + 4);
        // Nested objects carry object id 0 and the rtti id of `Point`.
        assert_eq!(bytes[12..16], 1_u32.to_le_bytes());
        assert_eq!(bytes[16..20], 300_u32.to_le_bytes());
        assert_eq!(bytes[44..48], 1_u32.to_le_bytes());

        let decoded = decode_from_slice(&registry_of::<Segment>(), &bytes, None).unwrap();
        let segment = decoded.downcast::<Segment>().unwrap();
        let segment = segment.read().unwrap();
        assert_eq!(segment.a, Point { x: 3, y: 4 });
        assert_eq!(segment.b, Point { x: 5, y: 6 });
    }

    #[test]
    fn shared_references_are_decoded_once() {
        let counted = Arc::new(RwLock::new(Counted { value: 9 }));
        let holder = SharedObject::new(Holder {
            first: Some(counted.clone()),
            second: Some(counted.clone()),
            more: vec![Some(counted), None],
        });

        let bytes = encode_to_vec(&holder, false, None).unwrap();
        let registry = registry_of::<Holder>();

        let before = COUNTED_CREATED.load(Ordering::SeqCst);
        let decoded = decode_from_slice(&registry, &bytes, None).unwrap();
        assert_eq!(COUNTED_CREATED.load(Ordering::SeqCst) - before, 1);

        let holder = decoded.downcast::<Holder>().unwrap();
        let holder = holder.read().unwrap();
        let first = holder.first.as_ref().unwrap();
        assert!(Arc::ptr_eq(first, holder.second.as_ref().unwrap()));
        assert!(Arc::ptr_eq(first, holder.more[0].as_ref().unwrap()));
        assert!(holder.more[1].is_none());
        assert_eq!(first.read().unwrap().value, 9);
    }

    #[test]
    fn added_fields_keep_their_default() {
        let old = SharedObject::new(v1::Settings { volume: 7 });
        let bytes = encode_to_vec(&old, false, None).unwrap();

        let decoded = decode_from_slice(&registry_of::<v2::Settings>(), &bytes, None).unwrap();
        let settings = decoded.downcast::<v2::Settings>().unwrap();
        let settings = settings.read().unwrap();
        assert_eq!(settings.volume, 7);
        assert_eq!(settings.brightness, 42);
    }

    #[test]
    fn new_field_defaults_and_old_reader_skips_it() {
        let old = SharedObject::new(v1::Sample { a: 1, b: 2 });
        let bytes = encode_to_vec(&old, false, None).unwrap();
        assert_eq!(bytes.len(), 8 + 2 * 8 + 4);

        let decoded = decode_from_slice(&registry_of::<v2::Sample>(), &bytes, None).unwrap();
        let sample = decoded.downcast::<v2::Sample>().unwrap();
        let sample = sample.read().unwrap();
        assert_eq!((sample.a, sample.b, sample.c), (1, 2, 42));

        let new = SharedObject::new(v2::Sample { a: 7, b: 8, c: 9 });
        let bytes = encode_to_vec(&new, false, None).unwrap();
        assert_eq!(bytes.len(), 8 + 3 * 8 + 4);

        let decoded = decode_from_slice(&registry_of::<v1::Sample>(), &bytes, None).unwrap();
        let sample = decoded.downcast::<v1::Sample>().unwrap();
        let sample = sample.read().unwrap();
        assert_eq!((sample.a, sample.b), (7, 8));
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let new = SharedObject::new(v2::Record {
            before: 0xDEAD_BEEF,
            label: "a dynamically sized value".into(),
            after: 0x1234,
        });
        let bytes = encode_to_vec(&new, false, None).unwrap();

        let decoded = decode_from_slice(&registry_of::<v1::Record>(), &bytes, None).unwrap();
        let record = decoded.downcast::<v1::Record>().unwrap();
        let record = record.read().unwrap();
        assert_eq!(record.before, 0xDEAD_BEEF);
        assert_eq!(record.after, 0x1234);
    }

    #[test]
    fn changed_field_layout_is_rejected() {
        let bytes = encode_to_vec(&SharedObject::new(v1::Record::default()), false, None).unwrap();
        let err = decode_from_slice(&registry_of::<v2::RetypedRecord>(), &bytes, None).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::FieldMismatch {
                field: "before",
                ..
            }
        ));
    }

    #[test]
    fn strong_cycles_are_rejected() {
        let left = Arc::new(RwLock::new(Left::default()));
        let right = Arc::new(RwLock::new(Right {
            left: Some(left.clone()),
        }));
        left.write().unwrap().right = Some(right);

        let bytes = encode_to_vec(&SharedObject::from_arc(left.clone()), false, None).unwrap();
        let err = decode_from_slice(&registry_of::<Left>(), &bytes, None).unwrap_err();
        assert!(matches!(err, DecodeError::CircularReference { .. }));

        left.write().unwrap().right = None;

        let myself = SharedObject::new(Myself::default());
        myself.write().downcast_mut::<Myself>().unwrap().me = Some(myself.clone());
        let bytes = encode_to_vec(&myself, false, None).unwrap();
        let err = decode_from_slice(&registry_of::<Myself>(), &bytes, None).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::CircularReference {
                type_name: "tests::Myself",
                field: "me",
                ..
            }
        ));
        myself.write().downcast_mut::<Myself>().unwrap().me = None;
    }

    #[test]
    fn weak_back_references_decode_children_first() {
        let root = Node::new("root");
        for name in ["a", "b"] {
            let child = Node::new(name);
            child.write().unwrap().parent = Some(root.clone());
            root.write().unwrap().children.push(Some(child));
        }

        let bytes = encode_to_vec(&SharedObject::from_arc(root.clone()), false, None).unwrap();
        let mut order: Vec<String> = Vec::new();
        let decoded = decode_from_slice(&registry_of::<Node>(), &bytes, Some(&mut order)).unwrap();
        assert_eq!(order, ["a", "b", "root"]);

        let decoded = decoded.downcast::<Node>().unwrap();
        let node = decoded.read().unwrap();
        assert_eq!(node.child_names, ["a", "b"]);
        let child = node.children[1].as_ref().unwrap();
        assert!(Arc::ptr_eq(child.read().unwrap().parent.as_ref().unwrap(), &decoded));

        // Break the reference cycles.
        for node in [&root, &decoded] {
            for child in node.read().unwrap().children.iter().flatten() {
                child.write().unwrap().parent = None;
            }
        }
    }

    #[test]
    fn chunks_do_not_depend_on_buffer_size() {
        let line = sample_line();
        let whole = encode_to_vec(&line, false, None).unwrap();

        let chunks = encode_chunked(&line, 16);
        assert_eq!(chunks.len(), 4);
        assert!(chunks[..3].iter().all(|chunk| chunk.len() == 16));
        assert_eq!(chunks.concat(), whole);

        let chunks = encode_chunked(&line, 7);
        assert!(chunks.len() >= 2);
        assert_eq!(chunks.concat(), whole);
    }

    #[test]
    fn derived_objects_round_trip() {
        let circle = SharedObject::new(Circle {
            shape: Shape { layer: 4 },
            radius: 2.5,
            center: Point { x: 1, y: 2 },
        });
        let scene = SharedObject::new(Scene {
            shapes: vec![Some(circle.clone()), None, Some(circle)],
            anchors: vec![Point { x: 5, y: 6 }, Point { x: 7, y: 8 }],
        });

        let mut log: Vec<&'static str> = Vec::new();
        let bytes = encode_to_vec(&scene, false, Some(&mut log)).unwrap();
        assert_eq!(log, ["started", "ended"]);

        let mut registry = registry_of::<Scene>();
        registry.register::<Circle>();
        assert!(registry.is_derived_from(361, 360));

        let decoded = decode_from_slice(&registry, &bytes, None).unwrap();
        let scene = decoded.downcast::<Scene>().unwrap();
        let scene = scene.read().unwrap();
        assert_eq!(scene.anchors, [Point { x: 5, y: 6 }, Point { x: 7, y: 8 }]);
        assert_eq!(scene.shapes.len(), 3);
        assert!(scene.shapes[1].is_none());

        let first = scene.shapes[0].as_ref().unwrap();
        assert!(first.ptr_eq(scene.shapes[2].as_ref().unwrap()));
        let circle = first.read();
        let circle = crate::rtti_cast::<Circle>(&*circle).unwrap();
        assert_eq!(circle.shape.layer, 4);
        assert_eq!(circle.radius, 2.5);
        assert_eq!(circle.center, Point { x: 1, y: 2 });
    }

    #[test]
    fn abstract_and_unknown_types_fail() {
        let bytes = encode_to_vec(&SharedObject::new(Shape { layer: 1 }), false, None).unwrap();
        let err = decode_from_slice(&registry_of::<Shape>(), &bytes, None).unwrap_err();
        assert!(matches!(err, DecodeError::AbstractType("tests::Shape")));

        let bytes = encode_to_vec(&sample_line(), false, None).unwrap();
        let err = decode_from_slice(&TypeRegistry::new(), &bytes, None).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType(301)));
    }

    #[test]
    fn malformed_streams_fail() {
        let registry = registry_of::<Line>();
        assert!(matches!(
            decode_from_slice(&registry, &[], None),
            Err(DecodeError::EmptyStream)
        ));

        let bytes = encode_to_vec(&sample_line(), false, None).unwrap();
        assert!(matches!(
            decode_from_slice(&registry, &bytes[..bytes.len() - 2], None),
            Err(DecodeError::Truncated)
        ));
        assert!(matches!(
            decode_from_slice(&registry, &bytes[8..], None),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn dangling_object_ids_become_null() {
        let bytes = encode_to_vec(&sample_line(), false, None).unwrap();
        // Only the line, the point it references is cut off.
        let decoded = decode_from_slice(&registry_of::<Line>(), &bytes[..28], None).unwrap();
        let line = decoded.downcast::<Line>().unwrap();
        assert!(line.read().unwrap().start.is_none());
    }

    #[test]
    fn data_blocks_round_trip() {
        let texture = SharedObject::new(Texture {
            name: "noise".into(),
            pixels: MemoryDataStream::from(vec![7_u8; 300]),
        });
        let bytes = encode_to_vec(&texture, false, None).unwrap();

        let decoded = decode_from_slice(&registry_of::<Texture>(), &bytes, None).unwrap();
        let texture = decoded.downcast::<Texture>().unwrap();
        let texture = texture.read().unwrap();
        assert_eq!(texture.name, "noise");
        assert_eq!(texture.pixels.as_slice(), &[7_u8; 300][..]);
    }

    #[test]
    fn readonly_arrays_keep_their_length() {
        let grid = SharedObject::new(Grid {
            cells: vec![1, 2, 3],
            tail: 99,
        });
        let bytes = encode_to_vec(&grid, false, None).unwrap();

        let decoded = decode_from_slice(&registry_of::<Grid>(), &bytes, None).unwrap();
        let grid = decoded.downcast::<Grid>().unwrap();
        let grid = grid.read().unwrap();
        assert_eq!(grid.cells, [1, 2]);
        assert_eq!(grid.tail, 99);
    }

    #[test]
    fn shallow_encoding_skips_references() {
        let bytes = encode_to_vec(&sample_line(), true, None).unwrap();
        assert_eq!(bytes.len(), 28);

        let decoded = decode_from_slice(&registry_of::<Line>(), &bytes, None).unwrap();
        let line = decoded.downcast::<Line>().unwrap();
        let line = line.read().unwrap();
        assert!(line.start.is_none() && line.end.is_none());
    }

    #[test]
    fn static_size_is_enforced_when_encoding() {
        let pair = SharedObject::new(Pair {
            first: Misreported(7),
            tail: 0xDEAD_BEEF,
        });
        let err = encode_to_vec(&pair, false, None).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::Field {
                type_name: "tests::Pair",
                field: "first",
                source: FieldError::InvalidData { .. },
            }
        ));
    }

    #[test]
    fn flush_can_abort() {
        let line = sample_line();
        let mut calls = 0;
        let mut buffer = [0; 8];
        let result = BinarySerializer::new().encode(
            &line,
            &mut buffer,
            |_| {
                calls += 1;
                ControlFlow::Break(())
            },
            false,
            None,
        );
        assert!(matches!(result, Err(EncodeError::Aborted)));
        assert_eq!(calls, 1);

        let result = BinarySerializer::new().encode(
            &line,
            &mut [],
            |_| ControlFlow::Continue(()),
            false,
            None,
        );
        assert!(matches!(result, Err(EncodeError::EmptyBuffer)));
    }

    #[test]
    fn decode_reads_only_the_given_length() {
        let bytes = encode_to_vec(&sample_line(), false, None).unwrap();
        let mut padded = vec![0xFF; 3];
        padded.extend_from_slice(&bytes);
        padded.extend_from_slice(&[0xFF; 5]);

        let mut cursor = Cursor::new(padded);
        cursor.set_position(3);
        let decoded = BinarySerializer::new()
            .decode(&registry_of::<Line>(), &mut cursor, bytes.len() as u64, None)
            .unwrap();
        assert!(decoded.is::<Line>());
    }

    #[test]
    fn cloner_copies_by_value_objects() {
        let circle = SharedObject::new(Circle {
            shape: Shape { layer: 2 },
            radius: 1.0,
            center: Point { x: 3, y: 3 },
        });
        let registry = registry_of::<Circle>();

        let copy = BinaryCloner::clone(&registry, &circle, false).unwrap();
        assert!(!copy.ptr_eq(&circle));
        let copy = copy.downcast::<Circle>().unwrap();
        assert_eq!(copy.read().unwrap().shape.layer, 2);
        assert_eq!(copy.read().unwrap().center, Point { x: 3, y: 3 });

        let line = sample_line();
        let shallow = BinaryCloner::clone(&registry_of::<Line>(), &line, true).unwrap();
        let shallow = shallow.downcast::<Line>().unwrap();
        let original = line.downcast::<Line>().unwrap();
        assert!(Arc::ptr_eq(
            shallow.read().unwrap().start.as_ref().unwrap(),
            original.read().unwrap().start.as_ref().unwrap()
        ));
    }
}
