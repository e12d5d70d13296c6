/// Bytes shown per dump row.
const BYTES_PER_ROW: usize = 10;

fn printable(byte: u8) -> char {
    if byte.is_ascii_graphic() || byte == b' ' {
        char::from(byte)
    } else {
        '.'
    }
}

/// Multi-line hex dump with a decimal offset column and an ASCII gutter.
///
/// ```text
/// 000|03 00 00 66 05 f0 0d c0 01 0c '...f......'
/// 010|af fe                         '..        '
/// ```
pub fn dump(bytes: &[u8]) -> String {
    let offset_width = bytes.len().max(1).to_string().len().max(3);
    bytes
        .chunks(BYTES_PER_ROW)
        .enumerate()
        .map(|(row, chunk)| {
            let hex: String = chunk.iter().map(|byte| format!("{byte:02x} ")).collect();
            let ascii: String = chunk.iter().copied().map(printable).collect();
            format!(
                "{:0offset_width$}|{hex:<hex_width$}'{ascii:<ascii_width$}'",
                row * BYTES_PER_ROW,
                hex_width = BYTES_PER_ROW * 3,
                ascii_width = BYTES_PER_ROW,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_and_partial_rows() {
        let bytes = [
            0x03, 0x00, 0x00, 0x66, 0x05, 0xf0, 0x0d, 0xc0, 0x01, 0x0c, 0xaf, 0xfe,
        ];
        assert_eq!(
            dump(&bytes),
            "000|03 00 00 66 05 f0 0d c0 01 0c '...f......'\n\
             010|af fe                         '..        '"
        );
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(dump(&[]), "");
    }

    #[test]
    fn offsets_widen_for_long_input() {
        let bytes = vec![b'A'; 1005];
        let rendered = dump(&bytes);
        assert!(rendered.starts_with("0000|41 "));
        assert!(rendered.ends_with("1000|41 41 41 41 41                'AAAAA     '"));
    }
}
