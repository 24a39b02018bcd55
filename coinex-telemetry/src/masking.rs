//! Sensitive data masking for logs.
//!
//! Masks API secrets, access ids and request signatures in formatted log
//! output so a stray `debug!` never leaks credentials.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

struct SensitivePattern {
    regex: Regex,
    group: usize,
}

fn pattern(source: &str, group: usize) -> Option<SensitivePattern> {
    Regex::new(source)
        .ok()
        .map(|regex| SensitivePattern { regex, group })
}

static PATTERNS: LazyLock<Vec<SensitivePattern>> = LazyLock::new(|| {
    [
        // secret_key / secretKey / api_secret
        pattern(
            r#"(?i)(secret[_-]?key|api[_-]?secret)["\s:=]+["']?([^\s"',}]{6,})["']?"#,
            2,
        ),
        // access_id / api_key / X-COINEX-KEY
        pattern(
            r#"(?i)(access[_-]?id|api[_-]?key|x-coinex-key)["\s:=]+["']?([a-zA-Z0-9]{16,64})["']?"#,
            2,
        ),
        // signed_str / X-COINEX-SIGN (HMAC-SHA256 hex)
        pattern(
            r#"(?i)(signed[_-]?str|x-coinex-sign|signature)["\s:=]+["']?([a-fA-F0-9]{64})["']?"#,
            2,
        ),
        // Bearer tokens
        pattern(r"(?i)bearer\s+([a-zA-Z0-9._-]{20,})", 1),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// Masks sensitive data in strings.
#[derive(Debug, Clone)]
pub struct SensitiveDataMasker {
    /// Values shorter than this are fully masked.
    min_length: usize,
    /// Characters to show at the start of a masked value.
    show_start: usize,
    /// Characters to show at the end of a masked value.
    show_end: usize,
}

impl Default for SensitiveDataMasker {
    fn default() -> Self {
        Self::new()
    }
}

impl SensitiveDataMasker {
    /// Create a new masker with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_length: 8,
            show_start: 3,
            show_end: 3,
        }
    }

    /// Create a masker with custom settings.
    #[must_use]
    pub fn with_settings(min_length: usize, show_start: usize, show_end: usize) -> Self {
        Self {
            min_length,
            show_start,
            show_end,
        }
    }

    /// Mask a known sensitive value.
    ///
    /// ```
    /// use coinex_telemetry::masking::SensitiveDataMasker;
    ///
    /// let masker = SensitiveDataMasker::new();
    /// assert_eq!(masker.mask_value("abcdefghijklmnop"), "abc***nop");
    /// assert_eq!(masker.mask_value("short"), "*****");
    /// ```
    #[must_use]
    pub fn mask_value(&self, value: &str) -> String {
        let chars: Vec<char> = value.chars().collect();
        if chars.len() < self.min_length {
            return "*".repeat(chars.len().max(3));
        }

        let start: String = chars[..self.show_start.min(chars.len())].iter().collect();
        let end: String = chars[chars.len().saturating_sub(self.show_end)..]
            .iter()
            .collect();
        format!("{start}***{end}")
    }

    /// Mask every sensitive value found in `input`.
    ///
    /// ```
    /// use coinex_telemetry::masking::SensitiveDataMasker;
    ///
    /// let masker = SensitiveDataMasker::new();
    /// let input = r#"{"secret_key": "abcdefghijklmnop1234567890"}"#;
    /// let masked = masker.mask_string(input);
    /// assert!(!masked.contains("abcdefghijklmnop1234567890"));
    /// ```
    #[must_use]
    pub fn mask_string<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut result = Cow::Borrowed(input);

        for pattern in PATTERNS.iter() {
            let replaced = match pattern.regex.replace_all(&result, |caps: &Captures<'_>| {
                let (Some(all), Some(secret)) = (caps.get(0), caps.get(pattern.group)) else {
                    return caps
                        .get(0)
                        .map_or_else(String::new, |m| m.as_str().to_string());
                };
                let whole = all.as_str();
                let start = secret.start() - all.start();
                let end = secret.end() - all.start();
                format!(
                    "{}{}{}",
                    &whole[..start],
                    self.mask_value(secret.as_str()),
                    &whole[end..]
                )
            }) {
                Cow::Owned(owned) => Some(owned),
                Cow::Borrowed(_) => None,
            };
            if let Some(owned) = replaced {
                result = Cow::Owned(owned);
            }
        }

        result
    }

    /// Check if a string contains sensitive patterns.
    #[must_use]
    pub fn contains_sensitive(&self, input: &str) -> bool {
        PATTERNS.iter().any(|p| p.regex.is_match(input))
    }
}

/// A wrapper type for sensitive values that masks them in Display/Debug.
///
/// ```
/// use coinex_telemetry::masking::Sensitive;
///
/// let signature = Sensitive::new("c35bb25e4b7bfa76");
/// assert_eq!(signature.to_string(), "[REDACTED]");
/// ```
#[derive(Clone)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a value as sensitive.
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Get the inner value.
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume and return the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T> std::fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: serde::Serialize> serde::Serialize for Sensitive<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNATURE: &str = "c35bb25e4b7bfa7602b36de3f5294367e15d2401cc4cdebc9720b9b531a37e66";

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(PATTERNS.len(), 4);
    }

    #[test]
    fn test_mask_value() {
        let masker = SensitiveDataMasker::new();
        assert_eq!(masker.mask_value("abcdefghijklmnop"), "abc***nop");
        assert_eq!(masker.mask_value("short"), "*****");
        assert_eq!(masker.mask_value("ab"), "***");
    }

    #[test]
    fn test_mask_signed_str_in_json_log_line() {
        let masker = SensitiveDataMasker::new();
        let input = format!(r#"{{"method":"server.sign","signed_str":"{SIGNATURE}"}}"#);
        let result = masker.mask_string(&input);

        assert!(!result.contains(SIGNATURE));
        assert!(result.contains("c35***e66"));
        assert!(result.contains("server.sign"));
    }

    #[test]
    fn test_mask_every_occurrence() {
        let masker = SensitiveDataMasker::new();
        let input = "secret_key=firstsecret1 secret_key=secondsecret2";
        let result = masker.mask_string(input);

        assert!(!result.contains("firstsecret1"));
        assert!(!result.contains("secondsecret2"));
    }

    #[test]
    fn test_mask_rest_headers() {
        let masker = SensitiveDataMasker::new();
        let input = format!("X-COINEX-KEY: ABCDEF0123456789ABCD X-COINEX-SIGN: {SIGNATURE}");
        let result = masker.mask_string(&input);

        assert!(!result.contains("ABCDEF0123456789ABCD"));
        assert!(!result.contains(SIGNATURE));
    }

    #[test]
    fn test_no_sensitive_data() {
        let masker = SensitiveDataMasker::new();
        let input = "session ready segment=spot";
        assert!(matches!(masker.mask_string(input), Cow::Borrowed(_)));
        assert!(!masker.contains_sensitive(input));
    }

    #[test]
    fn test_sensitive_wrapper() {
        let secret = Sensitive::new("my_api_key");
        assert_eq!(format!("{secret}"), "[REDACTED]");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(*secret.expose(), "my_api_key");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"[REDACTED]\"");
    }
}
