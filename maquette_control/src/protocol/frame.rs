//! Parsed command frame.

use maquette_common::consts::MAX_FRAME_PARAMS;

/// One complete, checksum-valid command line.
///
/// Parameters are positional: empty fields between commas are kept so
/// that `MOVE:1,,3` still places `3` at index 2. Indexing past the end
/// yields an empty string, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// Command name, trimmed.
    pub name: String,
    /// Positional parameters, at most `MAX_FRAME_PARAMS`.
    pub params: Vec<String>,
    /// The line carried a `;` checksum section.
    pub checksum_present: bool,
}

impl Frame {
    /// Build a frame, capping the parameter list.
    pub fn new(name: impl Into<String>, params: Vec<String>, checksum_present: bool) -> Self {
        let mut params = params;
        params.truncate(MAX_FRAME_PARAMS);
        Self {
            name: name.into(),
            params,
            checksum_present,
        }
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Parameter text at `index`, or `""` when out of range.
    pub fn param(&self, index: usize) -> &str {
        self.params.get(index).map_or("", String::as_str)
    }

    /// Parameter as a float. Parses the longest numeric prefix and falls
    /// back to `0.0`, so `"12.5mm"` reads as `12.5` and `"abc"` as `0.0`.
    pub fn param_f32(&self, index: usize) -> f32 {
        self.param_f64(index) as f32
    }

    /// Double-precision `param_f32`, for values that must keep every
    /// encoder count.
    pub fn param_f64(&self, index: usize) -> f64 {
        let text = self.param(index).trim_start();
        let prefix = numeric_prefix(text, true);
        prefix.parse().unwrap_or(0.0)
    }

    /// Parameter as an integer, with the same prefix rule as `param_f32`.
    pub fn param_i32(&self, index: usize) -> i32 {
        let text = self.param(index).trim_start();
        let prefix = numeric_prefix(text, false);
        prefix.parse().unwrap_or(0)
    }
}

/// Longest prefix of `text` that looks like a decimal number.
fn numeric_prefix(text: &str, allow_fraction: bool) -> &str {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if allow_fraction && !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if allow_fraction && seen_digit && !seen_exp => {
                // Only take the exponent if digits follow it.
                let mut look = end + 1;
                if matches!(bytes.get(look), Some(b'+' | b'-')) {
                    look += 1;
                }
                if !matches!(bytes.get(look), Some(b'0'..=b'9')) {
                    break;
                }
                seen_exp = true;
                end = look;
            }
            _ => break,
        }
        end += 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(params: &[&str]) -> Frame {
        Frame::new("T", params.iter().map(|p| p.to_string()).collect(), false)
    }

    #[test]
    fn out_of_range_param_is_empty() {
        let f = frame(&["1"]);
        assert_eq!(f.param(0), "1");
        assert_eq!(f.param(5), "");
        assert_eq!(f.param_f32(5), 0.0);
        assert_eq!(f.param_i32(5), 0);
    }

    #[test]
    fn numeric_params_parse_leading_number() {
        let f = frame(&["12.5mm", " -7", "abc", "3.9", "1e3", "2e"]);
        assert_eq!(f.param_f32(0), 12.5);
        assert_eq!(f.param_f32(1), -7.0);
        assert_eq!(f.param_f32(2), 0.0);
        assert_eq!(f.param_i32(3), 3);
        assert_eq!(f.param_f32(4), 1000.0);
        assert_eq!(f.param_f32(5), 2.0);
    }

    #[test]
    fn large_counts_keep_full_precision() {
        let f = frame(&["16777217"]);
        assert_eq!(f.param_f64(0), 16_777_217.0);
        assert_eq!(f.param_f32(0), 16_777_216.0);
    }

    #[test]
    fn params_are_capped() {
        let many: Vec<String> = (0..15).map(|i| i.to_string()).collect();
        let f = Frame::new("X", many, false);
        assert_eq!(f.param_count(), MAX_FRAME_PARAMS);
        assert_eq!(f.param(MAX_FRAME_PARAMS), "");
    }
}
