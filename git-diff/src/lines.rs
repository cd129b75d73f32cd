use bstr::BStr;

/// Split `data` into lines the way blame and textual merge need: `\n`, `\r\n` and a lone
/// `\r` all terminate a line, and a missing trailing newline still yields a final line.
pub fn split_lines(data: &[u8]) -> Vec<&BStr> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'\n' => {
                lines.push(BStr::new(&data[start..=i]));
                i += 1;
                start = i;
            }
            b'\r' => {
                let end = if data.get(i + 1) == Some(&b'\n') { i + 2 } else { i + 1 };
                lines.push(BStr::new(&data[start..end]));
                i = end;
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < data.len() {
        lines.push(BStr::new(&data[start..]));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_lf_crlf_and_lone_cr() {
        let lines = split_lines(b"a\nb\r\nc\rd");
        assert_eq!(lines, vec![BStr::new(b"a\n"), BStr::new(b"b\r\n"), BStr::new(b"c\r"), BStr::new(b"d")]);
    }

    #[test]
    fn missing_trailing_newline_still_yields_last_line() {
        let lines = split_lines(b"only line");
        assert_eq!(lines, vec![BStr::new(b"only line")]);
    }

    #[test]
    fn empty_input_has_no_lines() {
        assert!(split_lines(b"").is_empty());
    }

    #[test]
    fn trailing_newline_does_not_produce_an_empty_final_line() {
        let lines = split_lines(b"a\nb\n");
        assert_eq!(lines, vec![BStr::new(b"a\n"), BStr::new(b"b\n")]);
    }
}
