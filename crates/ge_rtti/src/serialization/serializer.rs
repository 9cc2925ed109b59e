use alloc::collections::VecDeque;

use ge_utils::hash::HashMap;

use crate::info::TypeDescriptor;
use crate::{ObjectIdentity, SharedObject};

// -----------------------------------------------------------------------------
// BinarySerializer

/// Encodes object graphs into the binary format and decodes them back.
///
/// The serializer only owns the bookkeeping of one call at a time, it is
/// reset when [`encode`](Self::encode) or [`decode`](Self::decode) starts.
/// Use one instance per thread.
///
/// # Examples
///
/// ```
/// use std::ops::ControlFlow;
/// use std::sync::{Arc, RwLock};
/// use ge_rtti::serialization::BinarySerializer;
/// use ge_rtti::{MemoryDataStream, Reflectable, SharedObject, TypeRegistry};
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 1000, name = "Point")]
/// struct Point {
///     #[rtti(id = 1)]
///     x: i32,
///     #[rtti(id = 2)]
///     y: i32,
/// }
///
/// #[derive(Reflectable, Default)]
/// #[rtti(id = 1001, name = "Line")]
/// struct Line {
///     #[rtti(id = 1, ptr)]
///     start: Option<Arc<RwLock<Point>>>,
///     #[rtti(id = 2, ptr)]
///     end: Option<Arc<RwLock<Point>>>,
/// }
///
/// let point = Arc::new(RwLock::new(Point { x: 3, y: 4 }));
/// let line = SharedObject::new(Line {
///     start: Some(point.clone()),
///     end: Some(point),
/// });
///
/// let mut serializer = BinarySerializer::new();
/// let mut bytes = Vec::new();
/// let mut buffer = [0; 64];
/// let written = serializer
///     .encode(&line, &mut buffer, |chunk| {
///         bytes.extend_from_slice(chunk);
///         ControlFlow::Continue(())
///     }, false, None)
///     .unwrap();
/// assert_eq!(written, bytes.len() as u64);
///
/// let mut registry = TypeRegistry::new();
/// registry.register::<Line>();
///
/// let mut stream = MemoryDataStream::from(bytes);
/// let length = stream.len() as u64;
/// let decoded = serializer.decode(&registry, &mut stream, length, None).unwrap();
///
/// let decoded = decoded.downcast::<Line>().unwrap();
/// let decoded = decoded.read().unwrap();
/// let start = decoded.start.as_ref().unwrap();
/// assert!(Arc::ptr_eq(start, decoded.end.as_ref().unwrap()));
/// assert_eq!(start.read().unwrap().y, 4);
/// ```
#[derive(Default)]
pub struct BinarySerializer {
    // Encoding
    pub(super) object_ids: HashMap<ObjectIdentity, u32>,
    pub(super) queue: VecDeque<ObjectToEncode>,
    pub(super) retained: Vec<SharedObject>,
    pub(super) next_id: u32,
    // Decoding
    pub(super) decoded: Vec<DecodedObject>,
    pub(super) decoded_ids: HashMap<u32, usize>,
    pub(super) dependencies: Vec<Dependency>,
}

/// An object waiting in the encode queue.
pub(super) struct ObjectToEncode {
    pub object_id: u32,
    pub object: SharedObject,
}

/// An object materialized by the decoder's scan pass.
pub(super) struct DecodedObject {
    pub object_id: u32,
    pub offset: u64,
    pub rtti: &'static TypeDescriptor,
    pub object: SharedObject,
}

/// `owner` strongly references `target`, so `target` ends its decoding first.
pub(super) struct Dependency {
    pub owner: usize,
    pub target: usize,
    pub type_name: &'static str,
    pub field: &'static str,
}

impl BinarySerializer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn reset(&mut self) {
        self.object_ids.clear();
        self.queue.clear();
        self.retained.clear();
        self.next_id = 0;
        self.decoded.clear();
        self.decoded_ids.clear();
        self.dependencies.clear();
    }
}

impl core::fmt::Debug for BinarySerializer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BinarySerializer").finish_non_exhaustive()
    }
}
