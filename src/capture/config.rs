use crate::{CaptureError, Result};

/// One gibibyte, the capture ceiling used by default
pub const ONE_GIB: u64 = 1024 * 1024 * 1024;

/// Default limit for the request line plus headers
pub const DEFAULT_MAX_HEAD_SIZE: usize = 64 * 1024;

/// Limits applied while capturing a request
///
/// # Examples
///
/// ```
/// use capturesrv::capture::{CaptureConfig, ONE_GIB};
///
/// let config = CaptureConfig::default();
/// assert_eq!(config.max_body_size, Some(ONE_GIB));
///
/// let unbounded = CaptureConfig {
///     max_body_size: None,
///     ..Default::default()
/// };
/// assert!(unbounded.max_body_size.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Maximum size of the request line and headers
    pub max_head_size: usize,
    /// Capture ceiling for request bodies (`None` for unbounded)
    pub max_body_size: Option<u64>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
            max_body_size: Some(ONE_GIB),
        }
    }
}

/// Parses a capture ceiling from the command line.
///
/// Accepts a plain byte count, a `KiB`/`MiB`/`GiB` suffixed count, or
/// `unbounded` to disable the ceiling.
pub fn parse_body_limit(value: &str) -> Result<Option<u64>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("unbounded") || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    let (digits, multiplier) = [("GiB", ONE_GIB), ("MiB", 1024 * 1024), ("KiB", 1024)]
        .into_iter()
        .find_map(|(suffix, multiplier)| {
            value
                .strip_suffix(suffix)
                .map(|digits| (digits.trim(), multiplier))
        })
        .unwrap_or((value, 1));

    digits
        .parse::<u64>()
        .ok()
        .and_then(|count| count.checked_mul(multiplier))
        .map(Some)
        .ok_or_else(|| CaptureError::Config(format!("invalid body size limit: {value}")))
}
