//! Exit code constants, per spec.md 6.1 and 7.
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | final validation failure |
//! | 2 | usage error (bad recipe/CLI args, cycle, unknown parameter) |
//! | 101 | crash (module process disappeared without a terminal state) |

use crate::error::CoreError;

/// Type-safe wrapper around the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Operation completed successfully.
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// Final validation gate reported one or more errors.
    pub const VALIDATION_FAILURE: ExitCode = ExitCode(1);
    /// Usage error: bad recipe, bad CLI args, cycle, unknown parameter.
    pub const USAGE_ERROR: ExitCode = ExitCode(2);
    /// A module process crashed without reaching a terminal state.
    pub const CRASH: ExitCode = ExitCode(101);

    /// The raw numeric value suitable for `std::process::exit`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Map a `CoreError` to its exit code per the table above.
    #[must_use]
    pub fn from_error(err: &CoreError) -> Self {
        match err {
            CoreError::Crashed { .. } => Self::CRASH,
            CoreError::FinalValidation(_) => Self::VALIDATION_FAILURE,
            e if e.is_usage_error() => Self::USAGE_ERROR,
            _ => Self::USAGE_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crash_maps_to_101() {
        let err = CoreError::Crashed {
            stage: "x".to_string(),
        };
        assert_eq!(ExitCode::from_error(&err).as_i32(), 101);
    }

    #[test]
    fn final_validation_maps_to_1() {
        let err = CoreError::FinalValidation(3);
        assert_eq!(ExitCode::from_error(&err).as_i32(), 1);
    }

    #[test]
    fn configuration_maps_to_2() {
        let err = CoreError::Configuration("bad recipe".to_string());
        assert_eq!(ExitCode::from_error(&err).as_i32(), 2);
    }
}
