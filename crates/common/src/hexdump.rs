use std::fmt::Write;

const BYTES_PER_LINE: usize = 16;
/// Width of the hex column: sixteen `"xx "` cells.
const HEX_COLUMN_WIDTH: usize = BYTES_PER_LINE * 3;

pub const EMPTY_MARKER: &str = "(empty data)";
const HEADER: &str = "Hexadecimal preview:\n";

/// Render `data` as 16-byte `offset: hex |ascii|` lines.
///
/// With `max_bytes` set only that many leading bytes are dumped and a
/// trailing `... N more bytes` line reports the rest.
pub fn dump(data: &[u8], max_bytes: Option<usize>) -> String {
    if data.is_empty() {
        return EMPTY_MARKER.to_string();
    }

    let shown = max_bytes.map_or(data.len(), |max| max.min(data.len()));
    let mut out = String::with_capacity(HEADER.len() + (shown / BYTES_PER_LINE + 2) * 76);
    out.push_str(HEADER);

    for (line, chunk) in data[..shown].chunks(BYTES_PER_LINE).enumerate() {
        let mut hex = String::with_capacity(HEX_COLUMN_WIDTH);
        for byte in chunk {
            let _ = write!(hex, "{:02x} ", byte);
        }
        let ascii: String = chunk.iter().map(|&b| printable(b)).collect();
        let _ = writeln!(
            out,
            "{:04x}: {:<width$} |{}|",
            line * BYTES_PER_LINE,
            hex,
            ascii,
            width = HEX_COLUMN_WIDTH
        );
    }

    if data.len() > shown {
        let _ = write!(out, "... {} more bytes", data.len() - shown);
    }
    out
}

fn printable(byte: u8) -> char {
    if (0x20..=0x7e).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_marker() {
        assert_eq!(dump(&[], None), "(empty data)");
        assert_eq!(dump(&[], Some(256)), "(empty data)");
    }

    #[test]
    fn test_single_short_line() {
        let out = dump(b"AB\x00", None);
        let expected = format!("Hexadecimal preview:\n0000: {:<48} |AB.|\n", "41 42 00 ");
        assert_eq!(out, expected);
    }

    #[test]
    fn test_full_line_layout() {
        let data: Vec<u8> = (0x30..0x40).collect();
        let out = dump(&data, None);
        let line = out.lines().nth(1).unwrap();
        assert_eq!(
            line,
            "0000: 30 31 32 33 34 35 36 37 38 39 3a 3b 3c 3d 3e 3f  |0123456789:;<=>?|"
        );
    }

    #[test]
    fn test_bounded_dump_reports_remainder() {
        let data = vec![0xabu8; 300];
        let out = dump(&data, Some(256));
        let lines: Vec<&str> = out.lines().skip(1).collect();
        assert_eq!(lines.len(), 17);
        assert!(lines[..16].iter().all(|l| l.ends_with('|')));
        assert!(lines[15].starts_with("00f0: "));
        assert_eq!(lines[16], "... 44 more bytes");
    }

    #[test]
    fn test_unbounded_dump_has_no_marker() {
        let data = vec![0x01u8; 300];
        let out = dump(&data, None);
        let lines: Vec<&str> = out.lines().skip(1).collect();
        assert_eq!(lines.len(), 19);
        assert!(lines[18].starts_with("0120: "));
        assert!(lines[18].ends_with("|............|"));
        assert!(!out.contains("more bytes"));
    }

    #[test]
    fn test_cap_larger_than_input() {
        assert_eq!(dump(b"hi", Some(256)), dump(b"hi", None));
    }

    #[test]
    fn test_printable_range() {
        assert_eq!(printable(0x1f), '.');
        assert_eq!(printable(b' '), ' ');
        assert_eq!(printable(b'~'), '~');
        assert_eq!(printable(0x7f), '.');
    }
}
