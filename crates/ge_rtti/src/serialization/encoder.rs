use core::any::Any;
use core::ops::ControlFlow;

use log::{debug, trace};

use super::serializer::{BinarySerializer, ObjectToEncode};
use super::wire::{FieldMetaData, MAX_OBJECT_ID, ObjectMetaData};
use super::writer::ChunkWriter;
use crate::error::{EncodeError, FieldError};
use crate::info::{FieldCategory, FieldDescriptor, TypeDescriptor};
use crate::reflection::level;
use crate::{Reflectable, SharedObject};

// -----------------------------------------------------------------------------
// Encode

impl BinarySerializer {
    /// Encodes `root` and every object it references.
    ///
    /// Bytes go into `buffer`; whenever it is full, and once at the end,
    /// `flush` receives the filled part. Returning [`ControlFlow::Break`]
    /// from `flush` aborts with [`EncodeError::Aborted`].
    ///
    /// Shared objects are written once and referenced by object id, the root
    /// gets id `1`. With `shallow` set, references are written as null and
    /// only the root is encoded.
    ///
    /// `context` is handed to the serialization hooks.
    ///
    /// Returns the total number of bytes written.
    pub fn encode<F>(
        &mut self,
        root: &SharedObject,
        buffer: &mut [u8],
        flush: F,
        shallow: bool,
        context: Option<&mut dyn Any>,
    ) -> Result<u64, EncodeError>
    where
        F: FnMut(&[u8]) -> ControlFlow<()>,
    {
        self.reset();
        let mut writer = ChunkWriter::new(buffer, flush)?;

        let result = self.encode_queue(&mut writer, root, shallow, context);
        let num_objects = self.retained.len();
        self.reset();
        result?;

        let total = writer.finish()?;
        debug!("encoded {num_objects} objects into {total} bytes");
        Ok(total)
    }

    fn encode_queue<F>(
        &mut self,
        writer: &mut ChunkWriter<'_, F>,
        root: &SharedObject,
        shallow: bool,
        mut context: Option<&mut dyn Any>,
    ) -> Result<(), EncodeError>
    where
        F: FnMut(&[u8]) -> ControlFlow<()>,
    {
        self.find_or_queue(root)?;

        while let Some(ObjectToEncode { object_id, object }) = self.queue.pop_front() {
            {
                let guard = object.read();
                trace!("encoding object {object_id} of type `{}`", guard.rtti_name());
                self.encode_object(writer, &*guard, object_id, shallow, context.as_deref_mut())?;
            }
            self.retained.push(object);
        }

        Ok(())
    }

    /// The object id of `object`, queueing it when first met.
    fn find_or_queue(&mut self, object: &SharedObject) -> Result<u32, EncodeError> {
        let identity = object.identity();
        if let Some(&object_id) = self.object_ids.get(&identity) {
            return Ok(object_id);
        }

        self.next_id += 1;
        let object_id = self.next_id;
        if object_id > MAX_OBJECT_ID {
            return Err(EncodeError::ObjectIdOverflow(object_id));
        }

        self.object_ids.insert(identity, object_id);
        self.queue.push_back(ObjectToEncode {
            object_id,
            object: object.clone(),
        });
        Ok(object_id)
    }

    /// Writes every level of `object` followed by one terminator.
    ///
    /// Nested by-value objects use this too, with an object id of `0`.
    fn encode_object<F>(
        &mut self,
        writer: &mut ChunkWriter<'_, F>,
        object: &dyn Reflectable,
        object_id: u32,
        shallow: bool,
        mut context: Option<&mut dyn Any>,
    ) -> Result<(), EncodeError>
    where
        F: FnMut(&[u8]) -> ControlFlow<()>,
    {
        let levels: Vec<(&'static TypeDescriptor, &dyn Reflectable)> = object
            .rtti()
            .ancestors()
            .enumerate()
            .map_while(|(depth, rtti)| Some((rtti, level(object, depth)?)))
            .collect();

        let mut result = Ok(());
        for (depth, &(rtti, part)) in levels.iter().enumerate() {
            rtti.on_serialization_started(part, context.as_deref_mut());

            result = self.encode_level(
                writer,
                rtti,
                part,
                ObjectMetaData {
                    object_id,
                    is_base_class: depth > 0,
                    type_id: rtti.rtti_id(),
                },
                shallow,
                context.as_deref_mut(),
            );
            if result.is_err() {
                break;
            }
        }

        if result.is_ok() {
            result = writer.write_u32(FieldMetaData::TERMINATOR.to_word());
        }

        for &(rtti, part) in levels.iter().rev() {
            rtti.on_serialization_ended(part, context.as_deref_mut());
        }

        result
    }

    fn encode_level<F>(
        &mut self,
        writer: &mut ChunkWriter<'_, F>,
        rtti: &'static TypeDescriptor,
        object: &dyn Reflectable,
        meta: ObjectMetaData,
        shallow: bool,
        mut context: Option<&mut dyn Any>,
    ) -> Result<(), EncodeError>
    where
        F: FnMut(&[u8]) -> ControlFlow<()>,
    {
        let [word, type_id] = meta.to_words();
        writer.write_u32(word)?;
        writer.write_u32(type_id)?;

        for field in rtti.fields() {
            self.encode_field(writer, rtti, field, object, shallow, context.as_deref_mut())?;
        }
        Ok(())
    }

    fn encode_field<F>(
        &mut self,
        writer: &mut ChunkWriter<'_, F>,
        rtti: &'static TypeDescriptor,
        field: &FieldDescriptor,
        object: &dyn Reflectable,
        shallow: bool,
        mut context: Option<&mut dyn Any>,
    ) -> Result<(), EncodeError>
    where
        F: FnMut(&[u8]) -> ControlFlow<()>,
    {
        let field_error = |source: FieldError| EncodeError::Field {
            type_name: rtti.name(),
            field: field.name(),
            source,
        };

        writer.write_u32(FieldMetaData::of_field(field).to_word())?;

        if field.category() == FieldCategory::DataBlock {
            let (stream, size) = field
                .expect_data_block()
                .and_then(|block| block.get(object))
                .map_err(field_error)?;
            let bytes = stream.block(size);
            writer.write_len(bytes.len(), rtti.name(), field.name())?;
            return writer.write(bytes);
        }

        let count = field.element_count(object).map_err(field_error)?;
        if field.is_array() {
            writer.write_u32(count)?;
        }

        match field.category() {
            FieldCategory::Plain => {
                let plain = field.expect_plain().map_err(field_error)?;
                let mut scratch = Vec::new();
                for index in 0..count {
                    scratch.clear();
                    plain
                        .to_buffer(object, index, &mut scratch)
                        .map_err(field_error)?;
                    if field.has_dynamic_size() {
                        writer.write_len(scratch.len(), rtti.name(), field.name())?;
                    } else if scratch.len() != field.type_size() as usize {
                        // The decoder reads exactly `type_size` bytes.
                        return Err(field_error(FieldError::InvalidData {
                            reason: "encoded size differs from the static type size",
                        }));
                    }
                    writer.write(&scratch)?;
                }
            }
            FieldCategory::Reflectable => {
                let access = field.expect_reflectable().map_err(field_error)?;
                for index in 0..count {
                    let value = access.get(object, index).map_err(field_error)?;
                    self.encode_object(writer, value, 0, shallow, context.as_deref_mut())?;
                }
            }
            FieldCategory::ReflectablePtr => {
                let access = field.expect_reflectable_ptr().map_err(field_error)?;
                for index in 0..count {
                    let target = if shallow {
                        None
                    } else {
                        access.get(object, index).map_err(field_error)?
                    };
                    let object_id = match target {
                        Some(target) => self.find_or_queue(&target)?,
                        None => 0,
                    };
                    writer.write_u32(object_id)?;
                }
            }
            FieldCategory::DataBlock => {}
        }

        Ok(())
    }
}
