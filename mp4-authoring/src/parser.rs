/*
    REFERENCES
    ----------

    1. https://github.com/shaka-project/shaka-player/blob/7098f43f70119226bca2e5583833aaf27b498e33/lib/util/mp4_box_parsers.js
    2. https://github.com/shaka-project/shaka-player/blob/7098f43f70119226bca2e5583833aaf27b498e33/externs/shaka/mp4_parser.js

*/

use crate::{Error, Reader, boxes::FourCc};
use bytes::Bytes;
use std::{collections::HashMap, sync::Arc};

/// `Result` type returned when parsing an mp4 file.
pub type HandlerResult = Result<(), Error>;
/// Callback type for parsing an mp4 file.
pub type CallbackType = Arc<dyn Fn(ParsedBox) -> HandlerResult>;

/// Mp4 box parser.
#[derive(Clone, Default)]
pub struct Mp4Parser {
    headers: HashMap<FourCc, HeaderKind>,
    box_definitions: HashMap<FourCc, CallbackType>,
    fallback: Option<CallbackType>,
}

impl Mp4Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a box type as a Basic Box.
    pub fn base_box(mut self, type_code: FourCc, definition: CallbackType) -> Self {
        self.headers.insert(type_code, HeaderKind::BasicBox);
        self.box_definitions.insert(type_code, definition);
        self
    }

    /// Declare a box type as a Full Box.
    pub fn full_box(mut self, type_code: FourCc, definition: CallbackType) -> Self {
        self.headers.insert(type_code, HeaderKind::FullBox);
        self.box_definitions.insert(type_code, definition);
        self
    }

    /// Treat every undeclared box as a Basic Box handled by `definition`.
    pub fn any_box(mut self, definition: CallbackType) -> Self {
        self.fallback = Some(definition);
        self
    }

    /// Parse the given data using the added callbacks.
    pub fn parse(&self, data: &[u8]) -> HandlerResult {
        let mut reader = Reader::new(Bytes::copy_from_slice(data));

        while reader.has_more_data() {
            self.parse_next(0, &mut reader)?;
        }

        Ok(())
    }

    /// Parse the next box on the current level.
    ///
    /// `abs_start` is the absolute start position in the original byte array.
    fn parse_next(&self, abs_start: u64, reader: &mut Reader) -> HandlerResult {
        let start = reader.get_position();
        let (box_type, size, has_64_bit_size) = read_header(reader)?;

        let definition = self
            .box_definitions
            .get(&box_type)
            .map(|x| (x, self.headers.get(&box_type) == Some(&HeaderKind::FullBox)))
            .or_else(|| self.fallback.as_ref().map(|x| (x, false)));

        if let Some((definition, full_box)) = definition {
            let mut version = None;
            let mut flags = None;

            if full_box {
                let version_and_flags = reader.read_u32()?;
                version = Some(version_and_flags >> 24);
                flags = Some(version_and_flags & 0xFFFFFF);
            }

            // Read the whole payload so that the current level can be safely read
            // regardless of how the payload is parsed.
            let payload_size = (start + size)
                .checked_sub(reader.get_position())
                .ok_or_else(|| Error::parse(format!("{box_type} box (size {size} too small)")))?;
            let payload = reader.read_bytes(payload_size as usize).map_err(|_| {
                Error::parse(format!("{box_type} box (payload exceeds parent bounds)"))
            })?;

            definition(ParsedBox {
                box_type,
                parser: self.clone(),
                version,
                flags,
                reader: Reader::new(payload),
                size: size as usize,
                start: start + abs_start,
                has_64_bit_size,
            })?;
        } else {
            // Move the read head to be at the end of the box.
            let skip_length = (start + size)
                .saturating_sub(reader.get_position())
                .min(reader.remaining());
            reader.skip(skip_length)?;
        }

        Ok(())
    }
}

// CALLBACKS

/// A callback that tells the Mp4 parser to treat the body of a box as a series
/// of boxes. The number of boxes is limited by the size of the parent box.
pub fn children(mut box_: ParsedBox) -> HandlerResult {
    // The "reader" starts at the payload, so we need to add the header to the
    // start position.  The header size varies.
    let header_size = box_.header_size();

    while box_.reader.has_more_data() {
        box_.parser
            .parse_next(box_.start + header_size, &mut box_.reader)?;
    }

    Ok(())
}

/// A callback that tells the Mp4 parser to treat the body of a box as a sample
/// description. A sample description box has a fixed number of children. The
/// number of children is represented by a 4 byte unsigned integer. Each child
/// is a box.
pub fn sample_description(mut box_: ParsedBox) -> HandlerResult {
    let header_size = box_.header_size();
    let count = box_.reader.read_u32()?;

    for _ in 0..count {
        box_.parser
            .parse_next(box_.start + header_size, &mut box_.reader)?;
    }

    Ok(())
}

// UTILS

/// Split the rest of `reader` into `(type, payload)` pairs of sibling boxes.
pub fn child_boxes(reader: &mut Reader) -> Result<Vec<(FourCc, Bytes)>, Error> {
    let mut boxes = Vec::new();

    while reader.has_more_data() {
        let start = reader.get_position();
        let (box_type, size, _) = read_header(reader)?;
        let payload_size = (start + size)
            .checked_sub(reader.get_position())
            .ok_or_else(|| Error::parse(format!("{box_type} box (size {size} too small)")))?;
        let payload = reader.read_bytes(payload_size as usize).map_err(|_| {
            Error::parse(format!("{box_type} box (payload exceeds parent bounds)"))
        })?;
        boxes.push((box_type, payload));
    }

    Ok(boxes)
}

/// Read a box header, returning its type, total size and whether the size
/// was stored in 64 bits.
fn read_header(reader: &mut Reader) -> Result<(FourCc, u64, bool), Error> {
    let start = reader.get_position();
    let mut size = reader.read_u32()? as u64;
    let box_type = FourCc::from(reader.read_u32()?);
    let mut has_64_bit_size = false;

    match size {
        0 => size = reader.get_length() - start,
        1 => {
            size = reader.read_u64()?;
            has_64_bit_size = true;
        }
        _ => (),
    }

    Ok((box_type, size, has_64_bit_size))
}

/// Tracks the type of box so that the correct values can be read from the
/// header.
#[derive(Clone, Copy, PartialEq)]
enum HeaderKind {
    BasicBox,
    FullBox,
}

/// Parsed mp4 box.
pub struct ParsedBox {
    /// The box type (fourcc).
    pub box_type: FourCc,
    /// The parser that parsed this box. It can be used to parse child boxes
    /// with the configuration of the current parser.
    pub parser: Mp4Parser,
    /// The start of this box (before the header) in the original buffer.
    pub start: u64,
    /// The size of this box (including the header).
    pub size: usize,
    /// The version for a full box, `None` for basic boxes.
    pub version: Option<u32>,
    /// The flags for a full box, `None` for basic boxes.
    pub flags: Option<u32>,
    /// The reader for this box is only for this box. Reading or not reading to
    /// the end will have no affect on the parser reading other sibling boxes.
    pub reader: Reader,
    /// If true, the box header had a 64-bit size field.
    pub has_64_bit_size: bool,
}

impl ParsedBox {
    /// Find the header size of the box.
    pub fn header_size(&self) -> u64 {
        let basic_header_size = 8;
        let _64_bit_field_size = if self.has_64_bit_size { 8 } else { 0 };
        let version_and_flags_size = if self.flags.is_some() { 4 } else { 0 };
        basic_header_size + _64_bit_field_size + version_and_flags_size
    }
}
