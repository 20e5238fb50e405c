/*!
 * Object Names
 * Bounded, inline-optimized names for registry records
 */

use super::errors::{OsalError, OsalResult};
use smartstring::alias::String as SmartString;
use std::fmt;

/// Name attached to a registry record
///
/// # Performance
///
/// Names up to 23 bytes are stored inline without heap allocation, which
/// covers every name accepted under the default length limit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjectName {
    inner: SmartString,
}

impl ObjectName {
    /// Validate against the configured maximum length in bytes, excluding
    /// the terminator a C name buffer would need
    pub fn checked(name: &str, max_len: usize) -> OsalResult<Self> {
        if name.len() > max_len {
            return Err(OsalError::NameTooLong);
        }
        Ok(Self {
            inner: SmartString::from(name),
        })
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        self.inner.is_inline()
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ObjectName {
    #[inline(always)]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for ObjectName {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for ObjectName {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_limit() {
        let name = ObjectName::checked("Sem1", 19).unwrap();
        assert_eq!(name, "Sem1");
        assert!(name.is_inline());
    }

    #[test]
    fn test_at_limit_accepted() {
        let name = "a".repeat(19);
        assert!(ObjectName::checked(&name, 19).is_ok());
    }

    #[test]
    fn test_over_limit_rejected() {
        let name = "a".repeat(20);
        assert_eq!(
            ObjectName::checked(&name, 19),
            Err(OsalError::NameTooLong)
        );
    }

    #[test]
    fn test_limit_counts_bytes() {
        // 19 characters, 38 bytes
        let name = "é".repeat(19);
        assert_eq!(
            ObjectName::checked(&name, 19),
            Err(OsalError::NameTooLong)
        );
        assert!(ObjectName::checked(&"é".repeat(9), 19).is_ok());
    }
}
