//! Apache Avro primitive encoder (no schema).
//!
//! Encoding rules:
//! - null: 0 bytes
//! - boolean: 1 byte (0 or 1)
//! - int/long: zigzag + varint
//! - float: 4 bytes IEEE 754 little-endian
//! - double: 8 bytes IEEE 754 little-endian
//! - bytes/string: varint(length) + raw bytes
//! - array/map: long(count) + items + long(0)

/// Apache Avro encoder (schema-free).
#[derive(Debug, Default)]
pub struct AvroEncoder {
    buf: Vec<u8>,
}

impl AvroEncoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Returns the bytes written since the last flush.
    pub fn flush(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    // ---------------------------------------------------------------- varint

    /// Writes a zigzag-encoded signed integer as a varint.
    pub fn write_int(&mut self, n: i32) {
        let encoded = ((n << 1) ^ (n >> 31)) as u32;
        self.write_varint_u64(encoded as u64);
    }

    /// Writes a zigzag-encoded signed long as a varint.
    pub fn write_long(&mut self, n: i64) {
        let encoded = ((n << 1) ^ (n >> 63)) as u64;
        self.write_varint_u64(encoded);
    }

    /// Writes a variable-length unsigned integer (no zigzag).
    pub fn write_varint_u64(&mut self, mut n: u64) {
        loop {
            let low7 = (n & 0x7f) as u8;
            n >>= 7;
            if n == 0 {
                self.buf.push(low7);
                return;
            }
            self.buf.push(low7 | 0x80);
        }
    }

    // ---------------------------------------------------------------- primitives

    pub fn write_null(&mut self) {}

    pub fn write_boolean(&mut self, b: bool) {
        self.buf.push(u8::from(b));
    }

    pub fn write_float(&mut self, f: f32) {
        self.buf.extend_from_slice(&f.to_le_bytes());
    }

    pub fn write_double(&mut self, f: f64) {
        self.buf.extend_from_slice(&f.to_le_bytes());
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_long(data.len() as i64);
        self.buf.extend_from_slice(data);
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Writes fixed-size data verbatim.
    pub fn write_fixed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Starts a block of `count` array items or map entries.
    ///
    /// Empty collections are written as the end marker alone.
    pub fn write_block_start(&mut self, count: usize) {
        if count > 0 {
            self.write_long(count as i64);
        }
    }

    pub fn write_block_end(&mut self) {
        self.write_long(0);
    }

    pub fn write_union_index(&mut self, index: usize) {
        self.write_long(index as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_zero_bytes() {
        let mut encoder = AvroEncoder::new();
        encoder.write_null();
        assert!(encoder.flush().is_empty());
    }

    #[test]
    fn zigzag_small_values() {
        let mut encoder = AvroEncoder::new();
        for (n, expected) in [(0, 0u8), (-1, 1), (1, 2), (-2, 3), (42, 84)] {
            encoder.write_int(n);
            assert_eq!(encoder.flush(), vec![expected], "int {n}");
        }
    }

    #[test]
    fn long_multi_byte() {
        let mut encoder = AvroEncoder::new();
        encoder.write_long(64);
        assert_eq!(encoder.flush(), vec![0x80, 0x01]);
        encoder.write_long(i64::MIN);
        assert_eq!(encoder.flush().len(), 10);
    }

    #[test]
    fn empty_block_is_single_terminator() {
        let mut encoder = AvroEncoder::new();
        encoder.write_block_start(0);
        encoder.write_block_end();
        assert_eq!(encoder.flush(), vec![0]);
    }
}
