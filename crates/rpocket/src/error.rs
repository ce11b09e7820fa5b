//! Error types for pocket generation and material simulation.

use thiserror::Error;

/// Errors rejected at the edge of the curve model, simulator and pocketing engine.
///
/// Degenerate geometry (empty curves, zero-radius arcs, empty toolpaths) is not
/// an error; those cases produce well-defined default results instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PocketError {
    /// The tool radius was negative or not a finite number.
    #[error("tool radius must be a non-negative finite number, got {0}")]
    NegativeToolRadius(f64),

    /// The simulation grid resolution was zero, negative or not finite.
    #[error("grid resolution must be a positive finite number, got {0}")]
    InvalidResolution(f64),

    /// The pocket stepover was zero, negative or not finite.
    #[error("stepover must be a positive finite number, got {0}")]
    InvalidStepover(f64),

    /// Some other numeric parameter was out of range.
    #[error("invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A curve could not be built from its serialized vertices.
    #[error("malformed curve: {0}")]
    MalformedCurve(String),

    /// The pocketing engine refused an operation.
    #[error("pocketing engine failed: {0}")]
    Engine(String),
}

/// Validate a tool radius supplied by a caller.
pub(crate) fn check_tool_radius(tool_radius: f64) -> Result<(), PocketError> {
    if !tool_radius.is_finite() || tool_radius < 0.0 {
        return Err(PocketError::NegativeToolRadius(tool_radius));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_radius_validation() {
        assert!(check_tool_radius(0.0).is_ok());
        assert!(check_tool_radius(3.0).is_ok());
        assert_eq!(
            check_tool_radius(-1.0),
            Err(PocketError::NegativeToolRadius(-1.0))
        );
        assert!(check_tool_radius(f64::NAN).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = PocketError::InvalidResolution(0.0);
        assert_eq!(
            err.to_string(),
            "grid resolution must be a positive finite number, got 0"
        );
        let err = PocketError::InvalidParameter {
            name: "zig_angle",
            reason: "must be finite".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for 'zig_angle': must be finite");
    }
}
