use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete exposure to the spread.
///
/// Long buys the spread (long A, short hedge_ratio × B); Short sells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    /// Signed unit exposure: -1, 0 or +1
    pub fn as_i8(self) -> i8 {
        match self {
            Position::Short => -1,
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.as_i8())
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Short => write!(f, "Short"),
            Position::Flat => write!(f, "Flat"),
            Position::Long => write!(f, "Long"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_values() {
        assert_eq!(Position::Short.as_i8(), -1);
        assert_eq!(Position::Flat.as_i8(), 0);
        assert_eq!(Position::Long.as_f64(), 1.0);
    }

    #[test]
    fn test_default_is_flat() {
        assert!(Position::default().is_flat());
        assert_eq!(Position::Long.to_string(), "Long");
    }
}
