use std::str::Utf8Error;

use percent_encoding::percent_decode_str;

/// Decodes a raw `Location` header value the way a form decoder would: `+`
/// becomes a space, then `%XX` escapes are decoded.
pub fn decode_location(raw: &str) -> Result<String, Utf8Error> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8().map(|decoded| decoded.into_owned())
}

/// Rebuilds `text` line by line, terminating every line (the last one
/// included) with a single `\n`. `\n`, `\r\n` and a lone `\r` all count as
/// line breaks.
pub fn terminate_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 1);
    let mut rest = text;
    while !rest.is_empty() {
        let Some(end) = rest.find(&['\r', '\n'][..]) else {
            out.push_str(rest);
            out.push('\n');
            break;
        };
        out.push_str(&rest[..end]);
        out.push('\n');
        let break_len = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[end + break_len..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_escapes_and_plus() {
        assert_eq!(decode_location("/caf%C3%A9?q=a+b").unwrap(), "/café?q=a b");
        assert_eq!(decode_location("/sum?q=1%2B1").unwrap(), "/sum?q=1+1");
        assert_eq!(decode_location("/plain").unwrap(), "/plain");
    }

    #[test]
    fn rejects_escapes_that_are_not_utf8() {
        assert!(decode_location("/bad%FF").is_err());
    }

    #[test]
    fn every_line_ends_with_newline() {
        assert_eq!(terminate_lines("a\r\nb\nc"), "a\nb\nc\n");
        assert_eq!(terminate_lines("a\n"), "a\n");
        assert_eq!(terminate_lines("a\n\nb\n"), "a\n\nb\n");
        assert_eq!(terminate_lines(""), "");
    }

    #[test]
    fn lone_carriage_return_breaks_line() {
        assert_eq!(terminate_lines("a\rb"), "a\nb\n");
        assert_eq!(terminate_lines("a\r\rb\r"), "a\n\nb\n");
    }
}
