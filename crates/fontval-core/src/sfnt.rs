// this_file: crates/fontval-core/src/sfnt.rs

//! Thin helpers over the sfnt container
//!
//! The core never validates table contents itself. It only needs to know
//! how many faces a file holds, which tables a face carries, and where
//! their bytes live.

use read_fonts::{FileRef, FontRef};

use crate::error::FaceOpenError;
use crate::types::Tag;

/// Number of faces in a font file (1 for a plain sfnt, N for a collection)
pub fn face_count(data: &[u8]) -> Result<u32, FaceOpenError> {
    match FileRef::new(data).map_err(|_| FaceOpenError::InvalidData)? {
        FileRef::Font(_) => Ok(1),
        FileRef::Collection(collection) => Ok(collection.len()),
    }
}

/// Parse one face, checking the index against the file first
pub fn open_face(data: &[u8], face_index: u32) -> Result<FontRef<'_>, FaceOpenError> {
    let count = face_count(data)?;
    if face_index >= count {
        return Err(FaceOpenError::IndexOutOfRange {
            index: face_index,
            count,
        });
    }
    FontRef::from_index(data, face_index).map_err(|_| FaceOpenError::InvalidData)
}

/// Table tags of a face, in table directory order
pub fn table_tags(data: &[u8], face_index: u32) -> Result<Vec<Tag>, FaceOpenError> {
    let font = open_face(data, face_index)?;
    Ok(font
        .table_directory
        .table_records()
        .iter()
        .map(|record| record.tag())
        .collect())
}

/// Raw bytes of one table, if the face has it
pub fn table_bytes(data: &[u8], face_index: u32, tag: Tag) -> Option<&[u8]> {
    let font = FontRef::from_index(data, face_index).ok()?;
    font.table_data(tag).map(|table| table.as_bytes())
}

/// Parse a user-supplied table name, padding short names with spaces
/// (`"cvt"` becomes `'cvt '`)
pub fn parse_tag(name: &str) -> Option<Tag> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > 4 || !bytes.iter().all(|b| (0x20..=0x7E).contains(b)) {
        return None;
    }
    let mut raw = [b' '; 4];
    raw[..bytes.len()].copy_from_slice(bytes);
    Some(Tag::new(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SfntBuilder;

    #[test]
    fn counts_a_single_face() {
        let data = SfntBuilder::new().table(*b"head", vec![0; 54]).build();
        assert_eq!(face_count(&data).unwrap(), 1);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            face_count(&[0u8; 100]),
            Err(FaceOpenError::InvalidData)
        ));
    }

    #[test]
    fn index_out_of_range() {
        let data = SfntBuilder::new().table(*b"head", vec![0; 54]).build();
        assert!(matches!(
            open_face(&data, 1),
            Err(FaceOpenError::IndexOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn lists_tables_sorted() {
        let data = SfntBuilder::new()
            .table(*b"maxp", vec![0; 6])
            .table(*b"OS/2", vec![0; 78])
            .table(*b"head", vec![0; 54])
            .build();
        let tags = table_tags(&data, 0).unwrap();
        assert_eq!(
            tags,
            vec![Tag::new(b"OS/2"), Tag::new(b"head"), Tag::new(b"maxp")]
        );
        assert_eq!(table_bytes(&data, 0, Tag::new(b"maxp")).map(<[u8]>::len), Some(6));
        assert!(table_bytes(&data, 0, Tag::new(b"hdmx")).is_none());
    }

    #[test]
    fn pads_short_tags() {
        assert_eq!(parse_tag("cvt"), Some(Tag::new(b"cvt ")));
        assert_eq!(parse_tag("OS/2"), Some(Tag::new(b"OS/2")));
        assert_eq!(parse_tag(""), None);
        assert_eq!(parse_tag("glyph"), None);
    }
}
