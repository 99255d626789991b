use crate::error::{FlashError, FlashResult};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Parse a partition-table size or offset token.
///
/// Accepts `2M`, `20K`, `0x9000` and plain decimal. Suffixes and the hex
/// prefix are case-sensitive.
pub fn parse_size(input: &str) -> FlashResult<u64> {
    let s = input.trim();

    if let Some(num) = s.strip_suffix('M') {
        return scaled(input, num, MIB);
    }
    if let Some(num) = s.strip_suffix('K') {
        return scaled(input, num, KIB);
    }
    if let Some(hex) = s.strip_prefix("0x") {
        return u64::from_str_radix(hex, 16).map_err(|e| FlashError::parse(input, e.to_string()));
    }
    s.parse::<u64>()
        .map_err(|e| FlashError::parse(input, e.to_string()))
}

fn scaled(input: &str, num: &str, multiplier: u64) -> FlashResult<u64> {
    let value: u64 = num
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| FlashError::parse(input, e.to_string()))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| FlashError::parse(input, "value too large"))
}

/// Offset literal as handed to the flasher, e.g. `0x210000`.
pub fn format_hex(value: u64) -> String {
    format!("{value:#x}")
}

pub fn format_size(bytes: u64) -> String {
    if bytes >= MIB && bytes.is_multiple_of(MIB) {
        format!("{} MiB", bytes / MIB)
    } else if bytes >= KIB && bytes.is_multiple_of(KIB) {
        format!("{} KiB", bytes / KIB)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_token_forms() {
        assert_eq!(parse_size("2M").unwrap(), 2_097_152);
        assert_eq!(parse_size("4096K").unwrap(), 4_194_304);
        assert_eq!(parse_size("0x9000").unwrap(), 36_864);
        assert_eq!(parse_size("100").unwrap(), 100);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(parse_size("  20K \t").unwrap(), 20 * 1024);
        assert_eq!(parse_size(" 0x10 ").unwrap(), 16);
    }

    #[test]
    fn allows_space_before_unit_suffix() {
        assert_eq!(parse_size("2 M").unwrap(), 2_097_152);
        assert_eq!(parse_size("20 K").unwrap(), 20 * 1024);
        assert_eq!(parse_size(" 4\tK ").unwrap(), 4096);
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["", "M", "abc", "-1", "1.5M", "0xzz", "2m", "0X10", "1G"] {
            let err = parse_size(bad).unwrap_err();
            assert!(
                matches!(err, FlashError::Parse { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_overflowing_suffix() {
        assert!(parse_size("18446744073709551615M").is_err());
    }

    #[test]
    fn formats_offsets_like_the_flasher_expects() {
        assert_eq!(format_hex(0x210000), "0x210000");
        assert_eq!(format_hex(0xE000), "0xe000");
        assert_eq!(format_hex(0), "0x0");
    }

    #[test]
    fn formats_human_sizes() {
        assert_eq!(format_size(2 * MIB), "2 MiB");
        assert_eq!(format_size(20 * KIB), "20 KiB");
        assert_eq!(format_size(100), "100 B");
        assert_eq!(format_size(MIB + 512), "1.0 MiB");
    }
}
