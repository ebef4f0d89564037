use oem_cp::code_table::DECODING_TABLE_CP850;

/// How raw process output is turned into text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Decoding {
    /// IBM code page 850 (DOS Latin-1).
    ///
    /// NAPS2.Console writes to the console in the OEM code page no matter what
    /// the host locale is, so decoding as UTF-8 silently mangles device names
    /// containing accented characters.
    #[default]
    Cp850,
    /// UTF-8, with invalid sequences replaced by U+FFFD.
    Utf8Lossy,
}

impl Decoding {
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            // Every byte has a mapping in CP850, so this can never fail.
            Self::Cp850 => oem_cp::decode_string_complete_table(bytes, &DECODING_TABLE_CP850),
            Self::Utf8Lossy => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"Canon LiDE 300", "Canon LiDE 300")]
    #[case(b"Esc\xa0ner de red", "Escáner de red")]
    #[case(b"Se\xa4al", "Señal")]
    #[case(b"\x90pson", "Épson")]
    #[case(b"M\x81ller", "Müller")]
    fn test_cp850(#[case] bytes: &[u8], #[case] expected: &str) {
        assert_eq!(Decoding::Cp850.decode(bytes), expected);
    }

    #[test]
    fn test_utf8_is_not_cp850() {
        // The same bytes mean something completely different as UTF-8.
        let bytes = "Escáner".as_bytes();
        assert_eq!(Decoding::Utf8Lossy.decode(bytes), "Escáner");
        assert_ne!(Decoding::Cp850.decode(bytes), "Escáner");
    }

    #[test]
    fn test_utf8_lossy_replaces_invalid_sequences() {
        assert_eq!(Decoding::Utf8Lossy.decode(b"ok\xff"), "ok\u{fffd}");
    }

    #[test]
    fn test_default_is_cp850() {
        assert_eq!(Decoding::default(), Decoding::Cp850);
    }
}
