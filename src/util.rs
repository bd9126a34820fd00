use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;

/// Parse a user-entered money amount.
///
/// Accepts plain decimals with optional thousands separators ("1,250.50").
/// Returns `None` for anything non-numeric, negative, or non-finite.
pub fn parse_money(input: &str) -> Option<f64> {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value)
}

/// Parse a recovery date in `YYYY-MM-DD` form.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

/// Today's date in the local timezone.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Treat `None`, empty and whitespace-only strings alike.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Sanitize a file name for use in a blob key.
/// Keeps alphanumeric, dots and hyphens; replaces everything else with underscore.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "evidence".to_string()
    } else {
        cleaned
    }
}

/// Write a file atomically: write to a sibling temp file, then rename over
/// the target so readers never observe a half-written file.
pub fn atomic_write_str(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money_plain() {
        assert_eq!(parse_money("1000.00"), Some(1000.0));
        assert_eq!(parse_money(" 950 "), Some(950.0));
    }

    #[test]
    fn test_parse_money_thousands_separator() {
        assert_eq!(parse_money("1,250.50"), Some(1250.5));
    }

    #[test]
    fn test_parse_money_rejects_garbage() {
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("abc"), None);
        assert_eq!(parse_money("12abc"), None);
        assert_eq!(parse_money("-5"), None);
        assert_eq!(parse_money("NaN"), None);
        assert_eq!(parse_money("inf"), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-01-01"),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(parse_date("01/01/2024"), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(Some(" short-paid ")), Some("short-paid"));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("pay slip (1).png"), "pay_slip__1_.png");
        assert_eq!(sanitize_file_name(".."), "evidence");
    }

    #[test]
    fn test_atomic_write_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        atomic_write_str(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
