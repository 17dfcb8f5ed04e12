use chrono::{DateTime, Local};

const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

/// Format a byte count with binary units. Larger units get more decimals:
/// none for KiB, one for MiB, two for GiB and three for TiB.
pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.unit$} {}", UNITS[unit])
}

/// Format a Unix timestamp as local time, `None` if it is out of range.
pub fn format_timestamp(secs: i64) -> Option<String> {
    let utc = DateTime::from_timestamp(secs, 0)?;
    Some(
        utc.with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size_bytes() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
    }

    #[test]
    fn test_human_size_precision_grows_with_unit() {
        assert_eq!(human_size(1024), "1 KiB");
        assert_eq!(human_size(16 * 1024), "16 KiB");
        assert_eq!(human_size(3 * 1024 * 1024 / 2), "1.5 MiB");
        assert_eq!(human_size(5 * 1024 * 1024 * 1024), "5.00 GiB");
        assert_eq!(human_size(1 << 40), "1.000 TiB");
        assert_eq!(human_size(1 << 50), "1024.000 TiB");
    }

    #[test]
    fn test_human_size_rounds_kib() {
        assert_eq!(human_size(256 * 1024), "256 KiB");
        assert_eq!(human_size(1600), "2 KiB");
    }

    #[test]
    fn test_format_timestamp() {
        let formatted = format_timestamp(1_700_000_000).unwrap();
        assert_eq!(formatted.len(), "2023-11-14 22:13:20".len());
        assert!(format_timestamp(i64::MAX).is_none());
    }
}
