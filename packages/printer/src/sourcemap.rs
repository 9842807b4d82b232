//! Sourcemap support: a line index for lazy line/column derivation and a
//! base64 VLQ `mappings` encoder fed by the printer.

const BASE64_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Precomputed line starts for a source buffer; positions derive lazily from
/// byte offsets.
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        Self { line_starts }
    }

    /// 0-indexed (line, column) for a byte offset; columns count characters.
    pub fn position(&self, source: &str, offset: usize) -> (u32, u32) {
        let offset = offset.min(source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert - 1,
        };
        let col = source[self.line_starts[line]..offset].chars().count();
        (line as u32, col as u32)
    }
}

fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq: u64 = if value < 0 {
        (((-value) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (vlq & 0x1f) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0x20;
        }
        out.push(BASE64_CHARS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Builder for the raw `mappings` chunk emitted alongside the module.
///
/// The printer calls [`advance`](Self::advance) for every piece of output it
/// writes and [`add_mapping`](Self::add_mapping) at node and expression
/// boundaries. Segments are `(outputColumn, sourceIndex, sourceLine,
/// sourceColumn)` quadruples, relative to the previous segment on the same
/// output line; duplicate mappings at one output position are suppressed so
/// the chunk stays monotone.
pub struct SourcemapBuilder {
    chunk: String,
    out_line: u32,
    out_col: u32,
    emitted_line: u32,
    last_out_col: i64,
    last_src_line: i64,
    last_src_col: i64,
    line_has_segment: bool,
    last_mapping: Option<(u32, u32)>,
}

impl SourcemapBuilder {
    pub fn new() -> Self {
        Self {
            chunk: String::new(),
            out_line: 0,
            out_col: 0,
            emitted_line: 0,
            last_out_col: 0,
            last_src_line: 0,
            last_src_col: 0,
            line_has_segment: false,
            last_mapping: None,
        }
    }

    /// Track position advancement as generated text is appended.
    pub fn advance(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.out_line += 1;
                self.out_col = 0;
            } else {
                self.out_col += 1;
            }
        }
    }

    /// Current position in the generated output.
    pub fn current_position(&self) -> (u32, u32) {
        (self.out_line, self.out_col)
    }

    /// Record that the current output position maps to `(src_line, src_col)`.
    pub fn add_mapping(&mut self, src_line: u32, src_col: u32) {
        if self.last_mapping == Some((self.out_line, self.out_col)) {
            return;
        }
        while self.emitted_line < self.out_line {
            self.chunk.push(';');
            self.emitted_line += 1;
            self.last_out_col = 0;
            self.line_has_segment = false;
        }
        if self.line_has_segment {
            self.chunk.push(',');
        }
        encode_vlq(i64::from(self.out_col) - self.last_out_col, &mut self.chunk);
        encode_vlq(0, &mut self.chunk);
        encode_vlq(i64::from(src_line) - self.last_src_line, &mut self.chunk);
        encode_vlq(i64::from(src_col) - self.last_src_col, &mut self.chunk);
        self.last_out_col = i64::from(self.out_col);
        self.last_src_line = i64::from(src_line);
        self.last_src_col = i64::from(src_col);
        self.line_has_segment = true;
        self.last_mapping = Some((self.out_line, self.out_col));
    }

    pub fn into_chunk(self) -> String {
        self.chunk
    }
}

impl Default for SourcemapBuilder {
    fn default() -> Self {
        Self::new()
    }
}
