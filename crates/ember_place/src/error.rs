//! Error types for the placement engine.
//!
//! Recoverable conditions (move aborts) are tallied, not raised; everything
//! here is fatal to the placement run.

/// Errors that abort a placement run.
#[derive(Debug, thiserror::Error)]
pub enum PlaceError {
    /// A placer option failed validation at construction time.
    #[error("invalid placer configuration: {0}")]
    InvalidConfig(String),

    /// The initial placement handed to the placer is not legal.
    #[error("illegal initial placement: {0}")]
    InitialPlacement(String),

    /// The delay oracle returned a negative point-to-point delay.
    #[error(
        "bad connection delay {delay} from {source_name} (at {source_x},{source_y}) \
         to {sink} (at {sink_x},{sink_y}): delay is less than 0"
    )]
    NegativeDelay {
        /// The offending delay value.
        delay: f32,
        /// Source block-type pin name.
        source_name: String,
        /// Source block x coordinate.
        source_x: usize,
        /// Source block y coordinate.
        source_y: usize,
        /// Sink block-type pin name.
        sink: String,
        /// Sink block x coordinate.
        sink_x: usize,
        /// Sink block y coordinate.
        sink_y: usize,
    },

    /// The incrementally maintained cost drifted more than the tolerance
    /// from a from-scratch recomputation, indicating a bug in the
    /// incremental update code.
    #[error("in recompute_costs_from_scratch: new_{kind}_cost = {new_cost}, old {kind}_cost = {old_cost}")]
    CostDrift {
        /// Which cost drifted ("bb" or "timing").
        kind: &'static str,
        /// The freshly recomputed cost.
        new_cost: f64,
        /// The incrementally maintained cost.
        old_cost: f64,
    },

    /// The final (or initial) placement consistency check found errors.
    /// Each individual error is reported through the diagnostic sink.
    #[error("completed placement consistency check, {errors} errors found")]
    ConsistencyCheck {
        /// Number of consistency errors found.
        errors: usize,
    },

    /// Writing a placement snapshot or the move-stats log failed.
    #[error("placement i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_config() {
        let err = PlaceError::InvalidConfig("inner_num must be positive".into());
        assert_eq!(
            format!("{err}"),
            "invalid placer configuration: inner_num must be positive"
        );
    }

    #[test]
    fn display_negative_delay() {
        let err = PlaceError::NegativeDelay {
            delay: -0.5,
            source_name: "clb.2".into(),
            source_x: 1,
            source_y: 2,
            sink: "clb.0".into(),
            sink_x: 3,
            sink_y: 4,
        };
        let msg = format!("{err}");
        assert!(msg.contains("-0.5"));
        assert!(msg.contains("clb.2"));
        assert!(msg.contains("at 3,4"));
    }

    #[test]
    fn display_cost_drift() {
        let err = PlaceError::CostDrift {
            kind: "bb",
            new_cost: 10.0,
            old_cost: 12.0,
        };
        assert_eq!(
            format!("{err}"),
            "in recompute_costs_from_scratch: new_bb_cost = 10, old bb_cost = 12"
        );
    }

    #[test]
    fn display_consistency() {
        let err = PlaceError::ConsistencyCheck { errors: 3 };
        assert!(format!("{err}").contains("3 errors"));
    }

    #[test]
    fn io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PlaceError = io.into();
        assert!(matches!(err, PlaceError::Io(_)));
    }
}
