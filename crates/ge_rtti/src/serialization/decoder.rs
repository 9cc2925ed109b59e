use alloc::collections::VecDeque;
use core::any::Any;
use std::io::{Read, Seek};

use log::{debug, trace, warn};

use super::reader::StreamReader;
use super::serializer::{BinarySerializer, DecodedObject, Dependency};
use super::wire::{FieldMetaData, ObjectMetaData};
use crate::error::{DecodeError, FieldError};
use crate::info::{FieldCategory, FieldDescriptor, TypeDescriptor};
use crate::reflection::level_mut;
use crate::{MemoryDataStream, Reflectable, SharedObject, TypeRegistry};

// -----------------------------------------------------------------------------
// Helpers

/// Runs `hook` on every level of `object`, base first.
fn for_each_level_base_first(
    object: &mut dyn Reflectable,
    mut hook: impl FnMut(&'static TypeDescriptor, &mut dyn Reflectable),
) {
    let levels: Vec<&'static TypeDescriptor> = object.rtti().ancestors().collect();
    for (depth, rtti) in levels.into_iter().enumerate().rev() {
        if let Some(part) = level_mut(object, depth) {
            hook(rtti, part);
        }
    }
}

/// The depth of the level `type_id` in the chain of `rtti`.
fn find_level(
    rtti: &'static TypeDescriptor,
    type_id: u32,
) -> Option<(usize, &'static TypeDescriptor)> {
    rtti.ancestors()
        .enumerate()
        .find(|(_, level)| level.rtti_id() == type_id)
}

// -----------------------------------------------------------------------------
// Decode

impl BinarySerializer {
    /// Decodes the objects stored in the next `length` bytes of `reader`.
    ///
    /// Types are looked up in `registry`. Fields the current types do not
    /// know are skipped, fields missing from the stream keep their default
    /// values. Shared references are restored, objects referenced several
    /// times are decoded once.
    ///
    /// Once every object is read, `on_deserialization_ended` runs for each of
    /// them, objects before the ones strongly referencing them.
    ///
    /// Returns the first object of the stream.
    pub fn decode<R: Read + Seek + ?Sized>(
        &mut self,
        registry: &TypeRegistry,
        reader: &mut R,
        length: u64,
        context: Option<&mut dyn Any>,
    ) -> Result<SharedObject, DecodeError> {
        self.reset();
        let result = self.decode_stream(registry, reader, length, context);
        self.reset();
        result
    }

    fn decode_stream<R: Read + Seek + ?Sized>(
        &mut self,
        registry: &TypeRegistry,
        reader: &mut R,
        length: u64,
        mut context: Option<&mut dyn Any>,
    ) -> Result<SharedObject, DecodeError> {
        let mut reader = StreamReader::new(reader, length)?;

        self.scan(registry, &mut reader)?;
        let root = match self.decoded.first() {
            Some(root) => root.object.clone(),
            None => return Err(DecodeError::EmptyStream),
        };

        for current in 0..self.decoded.len() {
            self.decode_top_level(&mut reader, current, context.as_deref_mut())?;
        }

        for index in self.resolve_order()? {
            let object = self.decoded[index].object.clone();
            let mut guard = object.write();
            for_each_level_base_first(&mut *guard, |rtti, part| {
                rtti.on_deserialization_ended(part, context.as_deref_mut());
            });
        }

        debug!(
            "decoded {} objects from {length} bytes",
            self.decoded.len()
        );
        Ok(root)
    }

    /// Creates a blank instance of every top-level object.
    fn scan<R: Read + Seek + ?Sized>(
        &mut self,
        registry: &TypeRegistry,
        reader: &mut StreamReader<'_, R>,
    ) -> Result<(), DecodeError> {
        while !reader.is_at_end() {
            let offset = reader.position();
            let meta = reader.read_object_meta()?;
            if meta.is_base_class || meta.object_id == 0 {
                return Err(DecodeError::Malformed("expected a top-level object"));
            }

            let rtti = registry
                .get(meta.type_id)
                .ok_or(DecodeError::UnknownType(meta.type_id))?;
            let object = rtti
                .new_shared()
                .ok_or(DecodeError::AbstractType(rtti.name()))?;

            let index = self.decoded.len();
            if self.decoded_ids.insert(meta.object_id, index).is_some() {
                return Err(DecodeError::DuplicateObjectId(meta.object_id));
            }
            self.decoded.push(DecodedObject {
                object_id: meta.object_id,
                offset,
                rtti,
                object,
            });

            reader.skip_object_body()?;
        }
        Ok(())
    }

    fn decode_top_level<R: Read + Seek + ?Sized>(
        &mut self,
        reader: &mut StreamReader<'_, R>,
        current: usize,
        mut context: Option<&mut dyn Any>,
    ) -> Result<(), DecodeError> {
        let (offset, object) = {
            let decoded = &self.decoded[current];
            trace!(
                "decoding object {} of type `{}`",
                decoded.object_id,
                decoded.rtti.name()
            );
            (decoded.offset, decoded.object.clone())
        };

        reader.seek_to(offset)?;
        let meta = reader.read_object_meta()?;

        let mut guard = object.write();
        for_each_level_base_first(&mut *guard, |rtti, part| {
            rtti.on_deserialization_started(part, context.as_deref_mut());
        });
        self.read_body(reader, &mut *guard, meta, current, context)
    }

    /// Reads the fields of every level of `object` up to its terminator.
    fn read_body<R: Read + Seek + ?Sized>(
        &mut self,
        reader: &mut StreamReader<'_, R>,
        object: &mut dyn Reflectable,
        meta: ObjectMetaData,
        current: usize,
        mut context: Option<&mut dyn Any>,
    ) -> Result<(), DecodeError> {
        let rtti = object.rtti();
        let mut level = find_level(rtti, meta.type_id);

        loop {
            let word = reader.read_u32()?;
            if ObjectMetaData::is_object_word(word) {
                let meta = ObjectMetaData::from_words(word, reader.read_u32()?)?;
                if !meta.is_base_class {
                    return Err(DecodeError::Malformed("object starts inside another object"));
                }
                level = find_level(rtti, meta.type_id);
                if level.is_none() {
                    debug!(
                        "`{}` has no base level with rtti id {}, skipping its fields",
                        rtti.name(),
                        meta.type_id
                    );
                }
                continue;
            }

            let field_meta = FieldMetaData::from_word(word)?;
            if field_meta.is_terminator() {
                return Ok(());
            }

            let known = level.and_then(|(depth, level_rtti)| {
                let field = level_rtti.find_field_by_id(field_meta.unique_id)?;
                Some((depth, level_rtti, field))
            });
            let Some((depth, level_rtti, field)) = known else {
                trace!("skipping unknown field id {}", field_meta.unique_id);
                reader.skip_field(field_meta)?;
                continue;
            };

            if let Some(reason) = field_meta.mismatch(field) {
                return Err(DecodeError::FieldMismatch {
                    type_name: level_rtti.name(),
                    field: field.name(),
                    reason,
                });
            }

            let part = level_mut(object, depth)
                .ok_or(DecodeError::Malformed("inheritance level is not reachable"))?;
            self.read_field(
                reader,
                level_rtti,
                field,
                part,
                field_meta,
                current,
                context.as_deref_mut(),
            )?;
        }
    }

    fn read_field<R: Read + Seek + ?Sized>(
        &mut self,
        reader: &mut StreamReader<'_, R>,
        rtti: &'static TypeDescriptor,
        field: &'static FieldDescriptor,
        object: &mut dyn Reflectable,
        meta: FieldMetaData,
        current: usize,
        mut context: Option<&mut dyn Any>,
    ) -> Result<(), DecodeError> {
        let field_error = |source: FieldError| DecodeError::Field {
            type_name: rtti.name(),
            field: field.name(),
            source,
        };

        if field.category() == FieldCategory::DataBlock {
            let size = reader.read_u32()?;
            let bytes = reader.read_bytes(size)?;
            return field
                .expect_data_block()
                .and_then(|block| block.set(object, MemoryDataStream::from(bytes), size))
                .map_err(field_error);
        }

        let count = if field.is_array() {
            let count = reader.read_u32()?;
            // Every element takes at least one byte.
            if u64::from(count) > reader.remaining() {
                return Err(DecodeError::Truncated);
            }
            if field.is_resizable() {
                field.set_array_size(object, count).map_err(field_error)?;
            }
            count
        } else {
            1
        };
        let len = field.element_count(object).map_err(field_error)?;

        for index in 0..count {
            if index >= len {
                reader.skip_element(meta)?;
                continue;
            }

            match field.category() {
                FieldCategory::Plain => {
                    let size = if meta.has_dynamic_size() {
                        reader.read_u32()?
                    } else {
                        u32::from(meta.size)
                    };
                    let bytes = reader.read_bytes(size)?;
                    field
                        .expect_plain()
                        .and_then(|plain| plain.from_buffer(object, index, &bytes))
                        .map_err(field_error)?;
                }
                FieldCategory::Reflectable => {
                    self.read_nested(
                        reader,
                        rtti,
                        field,
                        object,
                        index,
                        current,
                        context.as_deref_mut(),
                    )?;
                }
                FieldCategory::ReflectablePtr => {
                    self.read_pointer(reader, rtti, field, object, index, current)?;
                }
                FieldCategory::DataBlock => {}
            }
        }

        Ok(())
    }

    fn read_nested<R: Read + Seek + ?Sized>(
        &mut self,
        reader: &mut StreamReader<'_, R>,
        rtti: &'static TypeDescriptor,
        field: &'static FieldDescriptor,
        object: &mut dyn Reflectable,
        index: u32,
        current: usize,
        mut context: Option<&mut dyn Any>,
    ) -> Result<(), DecodeError> {
        let field_error = |source: FieldError| DecodeError::Field {
            type_name: rtti.name(),
            field: field.name(),
            source,
        };

        let access = field.expect_reflectable().map_err(field_error)?;
        let meta = reader.read_object_meta()?;
        let mut value = access.new_object();

        if meta.is_base_class || meta.type_id != value.rtti_id() {
            warn!(
                "`{}::{}` stores rtti id {} but expects `{}`, value skipped",
                rtti.name(),
                field.name(),
                meta.type_id,
                value.rtti_name()
            );
            return reader.skip_object_body();
        }

        for_each_level_base_first(&mut *value, |level_rtti, part| {
            level_rtti.on_deserialization_started(part, context.as_deref_mut());
        });
        self.read_body(reader, &mut *value, meta, current, context.as_deref_mut())?;
        for_each_level_base_first(&mut *value, |level_rtti, part| {
            level_rtti.on_deserialization_ended(part, context.as_deref_mut());
        });

        access.set(object, index, value).map_err(field_error)
    }

    fn read_pointer<R: Read + Seek + ?Sized>(
        &mut self,
        reader: &mut StreamReader<'_, R>,
        rtti: &'static TypeDescriptor,
        field: &'static FieldDescriptor,
        object: &mut dyn Reflectable,
        index: u32,
        current: usize,
    ) -> Result<(), DecodeError> {
        let field_error = |source: FieldError| DecodeError::Field {
            type_name: rtti.name(),
            field: field.name(),
            source,
        };

        let access = field.expect_reflectable_ptr().map_err(field_error)?;
        let object_id = reader.read_u32()?;

        let target = match object_id {
            0 => None,
            _ => match self.decoded_ids.get(&object_id) {
                None => {
                    warn!(
                        "`{}::{}` references object {object_id} which is not in the stream, set to null",
                        rtti.name(),
                        field.name()
                    );
                    None
                }
                Some(&target) => {
                    if !field.is_weak_ref() {
                        if target == current {
                            return Err(DecodeError::CircularReference {
                                type_name: rtti.name(),
                                field: field.name(),
                                target_type: self.decoded[target].rtti.name(),
                            });
                        }
                        self.dependencies.push(Dependency {
                            owner: current,
                            target,
                            type_name: rtti.name(),
                            field: field.name(),
                        });
                    }
                    Some(self.decoded[target].object.clone())
                }
            },
        };

        access.set(object, index, target).map_err(field_error)
    }

    /// Orders the decoded objects so that strongly referenced objects come
    /// before the objects referencing them.
    fn resolve_order(&self) -> Result<Vec<usize>, DecodeError> {
        let len = self.decoded.len();
        let mut pending = vec![0_usize; len];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); len];
        for dependency in &self.dependencies {
            pending[dependency.owner] += 1;
            dependents[dependency.target].push(dependency.owner);
        }

        let mut ready: VecDeque<usize> = (0..len).filter(|&index| pending[index] == 0).collect();
        let mut order = Vec::with_capacity(len);
        while let Some(index) = ready.pop_front() {
            order.push(index);
            for &owner in &dependents[index] {
                pending[owner] -= 1;
                if pending[owner] == 0 {
                    ready.push_back(owner);
                }
            }
        }

        if order.len() == len {
            return Ok(order);
        }

        let cycle = self
            .dependencies
            .iter()
            .find(|dependency| pending[dependency.owner] > 0 && pending[dependency.target] > 0);
        Err(match cycle {
            Some(dependency) => DecodeError::CircularReference {
                type_name: dependency.type_name,
                field: dependency.field,
                target_type: self.decoded[dependency.target].rtti.name(),
            },
            None => DecodeError::Malformed("unresolved object dependencies"),
        })
    }
}
