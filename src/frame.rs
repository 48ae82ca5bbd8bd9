//! Recognition of stack frame lines referencing a library and an
//! offset within it.

use std::ops::Range;


/// The number of hex characters making up an address field.
const ADDR_HEX_LEN: usize = 8;


/// A successfully recognized stack frame reference within a line.
///
/// All ranges index into the line the match was produced from. Bytes
/// outside of `span` are prefix and suffix and must be preserved
/// verbatim by any rewrite.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct FrameMatch {
    /// The full matched span, from the leading `#` through the last
    /// offset digit.
    pub span: Range<usize>,
    /// The decimal frame number digits.
    pub num: Range<usize>,
    /// The eight hex digits of the program counter field.
    pub pc: Range<usize>,
    /// The library path preceding the `+0x`.
    pub lib: Range<usize>,
    /// The parsed offset into the library.
    pub offset: u64,
}


/// Find the first stack frame reference at or after `start`.
///
/// The recognized syntax is
/// `#<digits> 0x<8 hex> <libpath>+0x<8 hex>`
/// with exactly one space between tokens and no whitespace around the
/// `+`. Any deviation, down to a single character, makes a candidate
/// non-matching; scanning then resumes at the next `#`.
pub(crate) fn find_frame(line: &[u8], start: usize) -> Option<FrameMatch> {
    let mut pos = start;
    while pos < line.len() {
        let hash = pos + line[pos..].iter().position(|b| *b == b'#')?;
        if let Some(found) = match_at(line, hash) {
            return Some(found)
        }
        pos = hash + 1;
    }
    None
}

/// Attempt to match the full frame syntax with the `#` at `start`.
fn match_at(line: &[u8], start: usize) -> Option<FrameMatch> {
    let mut pos = start + 1;

    // One or more decimal digits. Hex-looking frame numbers are
    // rejected by virtue of the following byte having to be a space.
    let num_start = pos;
    while line.get(pos).is_some_and(u8::is_ascii_digit) {
        pos += 1;
    }
    if pos == num_start {
        return None
    }
    let num = num_start..pos;

    let pc_start = eat(line, pos, b" 0x")?;
    let pc = hex_field(line, pc_start)?;

    // Exactly eight hex digits: a ninth one in place of the expected
    // space invalidates the candidate.
    let tok_start = eat(line, pc.end, b" ")?;
    let tok_end = tok_start
        + line[tok_start..]
            .iter()
            .position(|b| b.is_ascii_whitespace())
            .unwrap_or(line.len() - tok_start);
    let token = &line[tok_start..tok_end];

    // The library path is everything of the token up to a `+0x` that
    // is followed by a well-formed offset. A `+` embedded in the path
    // itself simply moves the search along.
    let mut search = 0;
    while let Some(found) = token[search..].iter().position(|b| *b == b'+') {
        let plus = search + found;
        search = plus + 1;

        // An empty library path does not constitute a frame.
        if plus == 0 {
            continue
        }
        if !token[plus + 1..].starts_with(b"0x") {
            continue
        }
        let offset = match hex_field(line, tok_start + plus + 3) {
            Some(range) if range.end <= tok_end => range,
            _ => continue,
        };

        let value = parse_hex(&line[offset.clone()])?;
        return Some(FrameMatch {
            span: start..offset.end,
            num,
            pc,
            lib: tok_start..tok_start + plus,
            offset: value,
        })
    }
    None
}

/// Consume the literal `expected` at `pos`, returning the position
/// right after it.
fn eat(line: &[u8], pos: usize, expected: &[u8]) -> Option<usize> {
    if line[pos.min(line.len())..].starts_with(expected) {
        Some(pos + expected.len())
    } else {
        None
    }
}

/// Recognize exactly eight hex digits at `pos`, not followed by a
/// ninth one.
fn hex_field(line: &[u8], pos: usize) -> Option<Range<usize>> {
    let digits = line.get(pos..pos + ADDR_HEX_LEN)?;
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return None
    }
    if line
        .get(pos + ADDR_HEX_LEN)
        .is_some_and(u8::is_ascii_hexdigit)
    {
        return None
    }
    Some(pos..pos + ADDR_HEX_LEN)
}

/// Parse a run of hex digit bytes into a value.
fn parse_hex(digits: &[u8]) -> Option<u64> {
    let digits = std::str::from_utf8(digits).ok()?;
    u64::from_str_radix(digits, 16).ok()
}


#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;


    const LIB: &str = "/system/lib/liba.so";

    fn frame(line: &str) -> Option<FrameMatch> {
        find_frame(line.as_bytes(), 0)
    }

    /// Check that a canonical frame line is recognized and captured
    /// field by field.
    #[test]
    fn canonical_match() {
        let line = format!("#00 0x00000000 {LIB}+0x00000254\n");
        let found = frame(&line).unwrap();
        assert_eq!(&line[found.span.clone()], &line[..line.len() - 1]);
        assert_eq!(&line[found.num.clone()], "00");
        assert_eq!(&line[found.pc.clone()], "00000000");
        assert_eq!(&line[found.lib.clone()], LIB);
        assert_eq!(found.offset, 0x254);
    }

    /// Check that surrounding text does not disturb recognition.
    #[test]
    fn embedded_match() {
        let line = format!("LEFT #07 0xdeadbeef {LIB}+0x00000234 RIGHT\n");
        let found = frame(&line).unwrap();
        assert_eq!(found.span.start, 5);
        assert_eq!(&line[found.num.clone()], "07");
        assert_eq!(&line[found.pc.clone()], "deadbeef");
        assert_eq!(&line[found.lib.clone()], LIB);
        assert_eq!(found.offset, 0x234);
    }

    /// Check that uppercase hex digits are accepted in address fields.
    #[test]
    fn uppercase_hex() {
        let line = format!("#00 0x0000BEEF {LIB}+0x00000A54\n");
        let found = frame(&line).unwrap();
        assert_eq!(found.offset, 0xa54);
    }

    /// Check every single-character deviation that must invalidate a
    /// candidate.
    #[test]
    fn strictness() {
        // Leading '#' is required.
        assert_eq!(frame(&format!("00 0x00000000 {LIB}+0x00000254\n")), None);
        // Whitespace must be exactly one space.
        assert_eq!(frame(&format!("#00  0x00000000 {LIB}+0x00000254\n")), None);
        assert_eq!(frame(&format!("#00 0x00000000  {LIB}+0x00000254\n")), None);
        // Decimal stack frame numbers are required.
        assert_eq!(frame(&format!("#0a 0x00000000 {LIB}+0x00000254\n")), None);
        // Hexadecimal addresses are required.
        assert_eq!(frame(&format!("#00 0xghijklmn {LIB}+0x00000254\n")), None);
        assert_eq!(frame(&format!("#00 0x00000000 {LIB}+0xghijklmn\n")), None);
        // Addresses must be exactly 8 characters.
        assert_eq!(frame(&format!("#00 0x0000000 {LIB}+0x00000254\n")), None);
        assert_eq!(frame(&format!("#00 0x000000000 {LIB}+0x00000254\n")), None);
        assert_eq!(frame(&format!("#00 0x00000000 {LIB}+0x0000254\n")), None);
        assert_eq!(frame(&format!("#00 0x00000000 {LIB}+0x000000254\n")), None);
        // Addresses must be prefixed with '0x'.
        assert_eq!(frame(&format!("#00 00000000 {LIB}+0x00000254\n")), None);
        assert_eq!(frame(&format!("#00 0x00000000 {LIB}+00000254\n")), None);
        // Library name is required.
        assert_eq!(frame("#00 0x00000000\n"), None);
        assert_eq!(frame("#00 0x00000000 +0x00000254\n"), None);
        // No whitespace is allowed around the '+'.
        assert_eq!(frame(&format!("#00 0x00000000 {LIB} +0x00000254\n")), None);
        assert_eq!(frame(&format!("#00 0x00000000 {LIB}+ 0x00000254\n")), None);
        assert_eq!(frame(&format!("#00 0x00000000 {LIB} 0x00000254\n")), None);
        assert_eq!(frame(&format!("#00 0x00000000 {LIB}+\n")), None);
    }

    /// Check that a library path containing a `+` is matched against
    /// the offset marker further right.
    #[test]
    fn plus_in_library_path() {
        let line = "#00 0x00000000 /lib/c++/libx.so+0x00000254\n";
        let found = frame(line).unwrap();
        assert_eq!(&line[found.lib.clone()], "/lib/c++/libx.so");
        assert_eq!(found.offset, 0x254);
    }

    /// Check that a failed candidate does not shadow a later valid
    /// one on the same line.
    #[test]
    fn resume_after_failed_candidate() {
        let line = format!("#xx garbage #03 0x00000000 {LIB}+0x00000254\n");
        let found = frame(&line).unwrap();
        assert_eq!(&line[found.num.clone()], "03");

        // A '#' directly preceding a valid frame is mere prefix.
        let line = format!("##03 0x00000000 {LIB}+0x00000254\n");
        let found = frame(&line).unwrap();
        assert_eq!(found.span.start, 1);
    }

    /// Check that scanning can be resumed past a previous match.
    #[test]
    fn successive_matches() {
        let line = format!("#00 0x00000000 {LIB}+0x00000254 #01 0x00000004 {LIB}+0x00000234\n");
        let first = frame(&line).unwrap();
        assert_eq!(first.offset, 0x254);

        let second = find_frame(line.as_bytes(), first.span.end).unwrap();
        assert_eq!(second.offset, 0x234);
        assert_eq!(&line[second.num.clone()], "01");

        assert_eq!(find_frame(line.as_bytes(), second.span.end), None);
    }
}
