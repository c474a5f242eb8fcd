//! Apache Avro primitive decoder (no schema).

/// Avro decoding error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvroDecodeError {
    #[error("unexpected end of input")]
    EndOfInput,
    #[error("variable-length integer is too long")]
    VarIntTooLong,
    #[error("variable-length long is too long")]
    VarLongTooLong,
    #[error("int out of range: {0}")]
    IntOutOfRange(i64),
    #[error("invalid UTF-8")]
    InvalidUtf8,
    #[error("negative length: {0}")]
    NegativeLength(i64),
    #[error("invalid enum index: {0}")]
    InvalidEnumIndex(i64),
    #[error("union index out of range: {0}")]
    UnionIndexOutOfRange(i64),
    #[error("unresolved schema reference: {0}")]
    UnresolvedRef(String),
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("more than {0} zero-width collection items")]
    TooManyEmptyItems(usize),
    #[error("value nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Collection items that consume no input (`null`, empty records) are only
/// bounded by their block counts, so their total per decode is capped.
pub const MAX_EMPTY_ITEMS: usize = 1 << 20;

/// Apache Avro primitive decoder (schema-free) over a borrowed buffer.
pub struct AvroDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    empty_items: usize,
}

impl<'a> AvroDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            empty_items: 0,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    // ---------------------------------------------------------------- helpers

    fn read_byte(&mut self) -> Result<u8, AvroDecodeError> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(AvroDecodeError::EndOfInput)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes_raw(&mut self, n: usize) -> Result<&'a [u8], AvroDecodeError> {
        if n > self.remaining() {
            return Err(AvroDecodeError::EndOfInput);
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    // ---------------------------------------------------------------- varint

    /// Reads a variable-length unsigned integer (max 10 bytes for 64-bit long).
    pub fn read_varint_u64(&mut self) -> Result<u64, AvroDecodeError> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        for _ in 0..10 {
            let b = self.read_byte()? as u64;
            result |= (b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
        Err(AvroDecodeError::VarLongTooLong)
    }

    /// Reads a zigzag-decoded signed long (Avro long).
    pub fn read_long(&mut self) -> Result<i64, AvroDecodeError> {
        let encoded = self.read_varint_u64()?;
        Ok(((encoded >> 1) as i64) ^ -((encoded & 1) as i64))
    }

    /// Reads a zigzag-decoded signed integer (Avro int, max 5 bytes).
    pub fn read_int(&mut self) -> Result<i32, AvroDecodeError> {
        let start = self.pos;
        let n = self.read_long()?;
        if self.pos - start > 5 {
            return Err(AvroDecodeError::VarIntTooLong);
        }
        i32::try_from(n).map_err(|_| AvroDecodeError::IntOutOfRange(n))
    }

    // ---------------------------------------------------------------- primitives

    pub fn read_boolean(&mut self) -> Result<bool, AvroDecodeError> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_float(&mut self) -> Result<f32, AvroDecodeError> {
        let bytes = self.read_bytes_raw(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_double(&mut self) -> Result<f64, AvroDecodeError> {
        let bytes: [u8; 8] = self
            .read_bytes_raw(8)?
            .try_into()
            .map_err(|_| AvroDecodeError::EndOfInput)?;
        Ok(f64::from_le_bytes(bytes))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, AvroDecodeError> {
        let len = self.read_long()?;
        let len = usize::try_from(len).map_err(|_| AvroDecodeError::NegativeLength(len))?;
        Ok(self.read_bytes_raw(len)?.to_vec())
    }

    pub fn read_str(&mut self) -> Result<String, AvroDecodeError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| AvroDecodeError::InvalidUtf8)
    }

    pub fn read_fixed(&mut self, size: usize) -> Result<Vec<u8>, AvroDecodeError> {
        Ok(self.read_bytes_raw(size)?.to_vec())
    }

    /// Reads block item counts until the zero terminator.
    ///
    /// A negative count is followed by the block's byte size, which is skipped
    /// over since items are decoded one by one anyway.
    fn read_block_count(&mut self) -> Result<usize, AvroDecodeError> {
        let count = self.read_long()?;
        if count < 0 {
            let _byte_size = self.read_long()?;
            return Ok(count.unsigned_abs() as usize);
        }
        Ok(count as usize)
    }

    /// Counts an item that started at `start` if it consumed no input.
    fn check_item_width(&mut self, start: usize) -> Result<(), AvroDecodeError> {
        if self.pos == start {
            self.empty_items += 1;
            if self.empty_items > MAX_EMPTY_ITEMS {
                return Err(AvroDecodeError::TooManyEmptyItems(MAX_EMPTY_ITEMS));
            }
        }
        Ok(())
    }

    /// Reads array blocks, calling `item_reader` for every item.
    pub fn read_array<T, F>(&mut self, mut item_reader: F) -> Result<Vec<T>, AvroDecodeError>
    where
        F: FnMut(&mut Self) -> Result<T, AvroDecodeError>,
    {
        let mut result = Vec::new();
        loop {
            let count = self.read_block_count()?;
            if count == 0 {
                break;
            }
            for _ in 0..count {
                let start = self.pos;
                result.push(item_reader(self)?);
                self.check_item_width(start)?;
            }
        }
        Ok(result)
    }

    /// Reads map blocks, calling `value_reader` after every key.
    pub fn read_map<T, F>(
        &mut self,
        mut value_reader: F,
    ) -> Result<Vec<(String, T)>, AvroDecodeError>
    where
        F: FnMut(&mut Self) -> Result<T, AvroDecodeError>,
    {
        let mut result = Vec::new();
        loop {
            let count = self.read_block_count()?;
            if count == 0 {
                break;
            }
            for _ in 0..count {
                let key = self.read_str()?;
                let val = value_reader(self)?;
                result.push((key, val));
            }
        }
        Ok(result)
    }

    /// Reads a union branch index.
    pub fn read_union_index(&mut self, branches: usize) -> Result<usize, AvroDecodeError> {
        let idx = self.read_long()?;
        match usize::try_from(idx) {
            Ok(i) if i < branches => Ok(i),
            _ => Err(AvroDecodeError::UnionIndexOutOfRange(idx)),
        }
    }

    /// Reads an enum symbol index.
    pub fn read_enum_index(&mut self, symbols: usize) -> Result<usize, AvroDecodeError> {
        let idx = self.read_long()?;
        match usize::try_from(idx) {
            Ok(i) if i < symbols => Ok(i),
            _ => Err(AvroDecodeError::InvalidEnumIndex(idx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_zigzag() {
        let mut decoder = AvroDecoder::new(&[0x01, 0x80, 0x01]);
        assert_eq!(decoder.read_int().unwrap(), -1);
        assert_eq!(decoder.read_long().unwrap(), 64);
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn overlong_varints() {
        let mut decoder = AvroDecoder::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert_eq!(decoder.read_int().unwrap_err(), AvroDecodeError::VarIntTooLong);

        let mut decoder = AvroDecoder::new(&[0x80; 10]);
        assert_eq!(decoder.read_long().unwrap_err(), AvroDecodeError::VarLongTooLong);
    }

    #[test]
    fn truncated_string() {
        let mut decoder = AvroDecoder::new(&[0x0a, b'h', b'i']);
        assert_eq!(decoder.read_str().unwrap_err(), AvroDecodeError::EndOfInput);
    }

    #[test]
    fn negative_block_count_skips_size() {
        // count -2 (zigzag 3), byte size 2 (zigzag 4), items 1 and 2, end.
        let mut decoder = AvroDecoder::new(&[0x03, 0x04, 0x02, 0x04, 0x00]);
        assert_eq!(decoder.read_array(|dec| dec.read_int()).unwrap(), vec![1, 2]);
    }

    #[test]
    fn huge_block_of_empty_items_is_refused() {
        // count 2^40, then nothing: every `null` item is zero bytes wide.
        let mut encoded = crate::avro::AvroEncoder::new();
        encoded.write_long(1 << 40);
        let bytes = encoded.flush();
        let mut decoder = AvroDecoder::new(&bytes);
        assert_eq!(
            decoder.read_array(|_| Ok(())).unwrap_err(),
            AvroDecodeError::TooManyEmptyItems(MAX_EMPTY_ITEMS)
        );
    }

    #[test]
    fn huge_block_of_sized_items_hits_end_of_input() {
        let mut encoded = crate::avro::AvroEncoder::new();
        encoded.write_long(1 << 40);
        encoded.write_int(7);
        let bytes = encoded.flush();
        let mut decoder = AvroDecoder::new(&bytes);
        assert_eq!(
            decoder.read_array(|dec| dec.read_int()).unwrap_err(),
            AvroDecodeError::EndOfInput
        );
    }

    #[test]
    fn union_index_bounds() {
        let mut decoder = AvroDecoder::new(&[0x04]);
        assert_eq!(
            decoder.read_union_index(2).unwrap_err(),
            AvroDecodeError::UnionIndexOutOfRange(2)
        );
    }
}
