use bstr::{BStr, ByteSlice};

/// The `FromStr` analog for `&[u8]`.
pub trait FromBytes: Sized {
    type Err;

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Err>;
}

/// A simple extension trait that adds some methods to byte slices.
///
/// `bstr` already gives us most of what we need.
pub trait BytesExt {
    // This would be more naturally named `as_bytes()`, but that creates
    // conflicts with other `as_bytes()` methods.
    fn as_byte_slice(&self) -> &[u8];

    fn parse<T: FromBytes>(&self) -> Result<T, <T as FromBytes>::Err> {
        FromBytes::from_bytes(self.as_byte_slice())
    }
}

impl BytesExt for [u8] {
    fn as_byte_slice(&self) -> &[u8] {
        self
    }
}

/// One physical line of an iCalendar stream, before unfolding.
#[derive(Clone, Copy, Debug)]
pub struct PhysicalLine<'a> {
    /// 1-indexed.
    number: usize,
    /// Everything but the `\n` or `\r\n` that ended the line.
    content: &'a BStr,
}

impl<'a> PhysicalLine<'a> {
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn content(&self) -> &'a BStr {
        self.content
    }

    /// A line starting with a space or a horizontal tab is folded onto the
    /// line before it.
    pub fn is_continuation(&self) -> bool {
        self.content.first().is_some_and(|&b| b == b' ' || b == b'\t')
    }
}

/// Splits `bytes` into physical lines. Producers disagree on terminators,
/// so both `\r\n` and a bare `\n` end a line.
///
/// A final line without a terminator is still returned. An empty input has
/// no lines.
pub fn physical_lines(bytes: &[u8]) -> impl Iterator<Item = PhysicalLine<'_>> {
    bytes.lines_with_terminator().enumerate().map(|(i, full)| {
        let content = strip_terminator(full);
        PhysicalLine { number: i + 1, content: content.as_bstr() }
    })
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let Some(line) = line.strip_suffix(b"\n") else { return line };
    line.strip_suffix(b"\r").unwrap_or(line)
}
