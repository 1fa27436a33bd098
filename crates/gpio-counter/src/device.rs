//! Read/write surface of a counter.
//!
//! Mirrors a character device: a read returns the count as decimal text
//! followed by a newline, once, at offset zero; a write parses an unsigned
//! integer (decimal, `0x` hex or leading-zero octal) and replaces the count.

use std::sync::Arc;

use tracing::debug;

use crate::error::{CounterError, CounterResult};
use crate::store::CounterStore;

/// Handle to one counter's read/write surface. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CounterDevice {
    name: String,
    store: Arc<CounterStore>,
}

impl CounterDevice {
    pub(crate) fn new(name: impl Into<String>, store: Arc<CounterStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Returns the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current count.
    pub fn count(&self) -> u64 {
        self.store.read()
    }

    /// Copies `"<count>\n"` into `buf`.
    ///
    /// Returns the number of bytes written, or 0 when `offset` is non-zero.
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> CounterResult<usize> {
        let text = format!("{}\n", self.store.read());
        if text.len() > buf.len() {
            return Err(CounterError::BufferTooSmall {
                needed: text.len(),
                available: buf.len(),
            });
        }
        if offset != 0 {
            return Ok(0);
        }
        buf[..text.len()].copy_from_slice(text.as_bytes());
        Ok(text.len())
    }

    /// Parses `input` and replaces the count. Returns the bytes consumed.
    ///
    /// On error the stored count is unchanged.
    pub fn write(&self, input: &[u8]) -> CounterResult<usize> {
        let text = std::str::from_utf8(input)
            .map_err(|_| CounterError::invalid_input("not valid UTF-8"))?;
        let value = parse_count(text)?;
        self.store.overwrite(value);
        debug!("{} count set to {}", self.name, value);
        Ok(input.len())
    }
}

/// Parses an unsigned count with automatic radix detection.
///
/// Accepts an optional leading `+`, then `0x`/`0X` for hex, a leading `0`
/// for octal, or plain decimal. A single trailing newline is allowed.
///
/// # Examples
///
/// ```
/// use gpio_counter::parse_count;
///
/// assert_eq!(parse_count("7").unwrap(), 7);
/// assert_eq!(parse_count("0x7\n").unwrap(), 7);
/// assert_eq!(parse_count("07").unwrap(), 7);
/// assert!(parse_count("seven").is_err());
/// ```
pub fn parse_count(text: &str) -> CounterResult<u64> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    let body = body.strip_prefix('+').unwrap_or(body);

    let (digits, radix) = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        (hex, 16)
    } else if body.len() > 1 && body.starts_with('0') {
        (&body[1..], 8)
    } else {
        (body, 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(CounterError::invalid_input(format!(
            "'{}' is not an unsigned integer",
            text.trim_end()
        )));
    }

    u64::from_str_radix(digits, radix).map_err(|_| {
        CounterError::invalid_input(format!("'{}' is out of range", text.trim_end()))
    })
}
