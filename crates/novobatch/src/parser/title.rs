use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Decodes a spectrum title as written by the engines: form-style percent
/// encoding where `+` stands for a space. Invalid escapes are kept verbatim.
pub fn decode_title(raw: &str) -> String {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reserved_characters() {
        assert_eq!(decode_title("scan%3D12%2C%20rt%3D3.5"), "scan=12, rt=3.5");
        assert_eq!(decode_title("a+b"), "a b");
        assert_eq!(decode_title("caf%C3%A9"), "café");
    }

    #[test]
    fn test_decode_is_identity_without_reserved_characters() {
        let plain = "spectrum_001.mgf 1";
        assert_eq!(decode_title(plain), plain);
        assert_eq!(decode_title(&decode_title(plain)), plain);
    }

    #[test]
    fn test_invalid_escape_kept() {
        assert_eq!(decode_title("100%"), "100%");
        assert_eq!(decode_title("%zz"), "%zz");
    }
}
