//! Decimal parsing for feeds that use a comma as the decimal separator.

/// Parse a number written either as `23,5` / `1.234,5` or as `12.5`.
///
/// When a comma is present it is the decimal separator and any dots are
/// thousands separators. Blank, non-numeric and non-finite input is `None`.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let value = if text.contains(',') {
        text.replace('.', "").replace(',', ".").parse::<f64>()
    } else {
        text.parse::<f64>()
    };
    value.ok().filter(|v| v.is_finite())
}

/// [`parse_decimal`], also mapping the feed's missing-value sentinel to `None`.
pub fn parse_reading(raw: &str, missing_sentinel: f64) -> Option<f64> {
    parse_decimal(raw).filter(|v| *v != missing_sentinel)
}
