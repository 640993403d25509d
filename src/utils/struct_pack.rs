use crate::gmk::project::GmString;
use crate::gmk::stream::GmkStream;
use crate::types::GmkVersion;
use anyhow::Result;
use gmk_tool_macro::struct_unpack_impl_for_num;

/// A fixed-shape record that can be read from a project stream.
pub trait StructUnpack: Sized {
    fn unpack(reader: &mut GmkStream, version: GmkVersion) -> Result<Self>;
}

/// A fixed-shape record that can be written to a project stream.
pub trait StructPack {
    fn pack(&self, writer: &mut GmkStream, version: GmkVersion) -> Result<()>;
}

impl<T: StructPack> StructPack for Vec<T> {
    fn pack(&self, writer: &mut GmkStream, version: GmkVersion) -> Result<()> {
        for item in self {
            item.pack(writer, version)?;
        }
        Ok(())
    }
}

struct_unpack_impl_for_num!(u32);
struct_unpack_impl_for_num!(i32);
struct_unpack_impl_for_num!(f64);

impl StructUnpack for bool {
    fn unpack(reader: &mut GmkStream, _version: GmkVersion) -> Result<Self> {
        reader.read_bool()
    }
}

impl StructPack for bool {
    fn pack(&self, writer: &mut GmkStream, _version: GmkVersion) -> Result<()> {
        writer.write_bool(*self);
        Ok(())
    }
}

impl StructUnpack for GmString {
    fn unpack(reader: &mut GmkStream, _version: GmkVersion) -> Result<Self> {
        reader.read_string()
    }
}

impl StructPack for GmString {
    fn pack(&self, writer: &mut GmkStream, _version: GmkVersion) -> Result<()> {
        writer.write_string(self);
        Ok(())
    }
}

/// Reads a dword count followed by that many records.
pub fn unpack_counted<T: StructUnpack>(
    reader: &mut GmkStream,
    version: GmkVersion,
) -> Result<Vec<T>> {
    let count = reader.read_u32()? as usize;
    let mut items = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        items.push(T::unpack(reader, version)?);
    }
    Ok(items)
}

/// Writes a dword count followed by every record.
pub fn pack_counted<T: StructPack>(
    items: &[T],
    writer: &mut GmkStream,
    version: GmkVersion,
) -> Result<()> {
    writer.write_u32(items.len() as u32);
    for item in items {
        item.pack(writer, version)?;
    }
    Ok(())
}
