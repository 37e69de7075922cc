//! Load outcome classification.

use std::fmt;

/// Outcome of opening or scanning a wallet store.
///
/// Several records in one scan can each produce a different outcome; the
/// scan reports the most severe one. Severity, lowest first:
///
/// | outcome            | rank |
/// |--------------------|------|
/// | `LoadOk`           | 0    |
/// | `NoncriticalError` | 1    |
/// | `NeedRewrite`      | 2    |
/// | `TooNew`           | 3    |
/// | `Corrupt`          | 4    |
/// | `LoadFail`         | 5    |
///
/// `LoadFail` means the store could not be opened or read at all and ends
/// a scan immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DbStatus {
    #[default]
    LoadOk,
    Corrupt,
    NoncriticalError,
    TooNew,
    LoadFail,
    NeedRewrite,
}

impl DbStatus {
    pub fn severity(self) -> u8 {
        match self {
            DbStatus::LoadOk => 0,
            DbStatus::NoncriticalError => 1,
            DbStatus::NeedRewrite => 2,
            DbStatus::TooNew => 3,
            DbStatus::Corrupt => 4,
            DbStatus::LoadFail => 5,
        }
    }

    /// The more severe of two outcomes.
    #[must_use]
    pub fn worst(self, other: DbStatus) -> DbStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn is_ok(self) -> bool {
        self == DbStatus::LoadOk
    }

    /// Whether a scan must stop on this outcome.
    pub fn is_fatal(self) -> bool {
        self == DbStatus::LoadFail
    }
}

impl fmt::Display for DbStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DbStatus::LoadOk => "ok",
            DbStatus::Corrupt => "corrupt",
            DbStatus::NoncriticalError => "non-critical errors",
            DbStatus::TooNew => "written by a newer version",
            DbStatus::LoadFail => "load failed",
            DbStatus::NeedRewrite => "needs rewrite",
        };
        f.write_str(text)
    }
}
