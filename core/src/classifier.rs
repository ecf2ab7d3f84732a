//! Failure classification
//!
//! A pipeline hands every non-retryable error to a [`FailureClassifier`]
//! before feeding the breaker. Returning `false` keeps the error away from
//! the failure window, e.g. for card declines that say nothing about the
//! health of the processor.

use std::any::Any;

/// Context provided to failure classifiers for error evaluation
#[derive(Debug)]
pub struct FailureContext<'a> {
    pub circuit_name: &'a str,
    /// The error that occurred (can be downcast to specific types)
    pub error: &'a dyn Any,
    /// Duration of the failed attempt in seconds
    pub duration: f64,
}

/// Decides whether an error should count toward opening the circuit
///
/// # Examples
///
/// ```rust
/// use gateway_guard::{FailureClassifier, FailureContext};
///
/// #[derive(Debug)]
/// struct SlowOnly;
///
/// impl FailureClassifier for SlowOnly {
///     fn should_trip(&self, ctx: &FailureContext<'_>) -> bool {
///         ctx.duration > 1.0
///     }
/// }
/// ```
pub trait FailureClassifier: Send + Sync + std::fmt::Debug {
    /// Returns `true` if the error should trip the circuit, `false` to ignore it.
    fn should_trip(&self, ctx: &FailureContext<'_>) -> bool;
}

/// Classifier that trips on all errors
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl FailureClassifier for DefaultClassifier {
    fn should_trip(&self, _ctx: &FailureContext<'_>) -> bool {
        true
    }
}

/// Predicate-based classifier using a closure
pub struct PredicateClassifier<F>
where
    F: Fn(&FailureContext<'_>) -> bool + Send + Sync,
{
    predicate: F,
}

impl<F> PredicateClassifier<F>
where
    F: Fn(&FailureContext<'_>) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> FailureClassifier for PredicateClassifier<F>
where
    F: Fn(&FailureContext<'_>) -> bool + Send + Sync,
{
    fn should_trip(&self, ctx: &FailureContext<'_>) -> bool {
        (self.predicate)(ctx)
    }
}

impl<F> std::fmt::Debug for PredicateClassifier<F>
where
    F: Fn(&FailureContext<'_>) -> bool + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateClassifier")
            .field("predicate", &"<closure>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum ProcessorError {
        Declined,
        Unavailable,
    }

    #[test]
    fn test_default_classifier_trips_all() {
        let ctx = FailureContext {
            circuit_name: "primary",
            error: &ProcessorError::Declined as &dyn Any,
            duration: 0.1,
        };

        assert!(DefaultClassifier.should_trip(&ctx));
    }

    #[test]
    fn test_predicate_downcasts_error() {
        let classifier = PredicateClassifier::new(|ctx| {
            ctx.error
                .downcast_ref::<ProcessorError>()
                .map(|e| !matches!(e, ProcessorError::Declined))
                .unwrap_or(true)
        });

        let declined = FailureContext {
            circuit_name: "primary",
            error: &ProcessorError::Declined as &dyn Any,
            duration: 0.1,
        };
        let unavailable = FailureContext {
            circuit_name: "primary",
            error: &ProcessorError::Unavailable as &dyn Any,
            duration: 0.1,
        };
        let unknown = FailureContext {
            circuit_name: "primary",
            error: &"boom" as &dyn Any,
            duration: 0.1,
        };

        assert!(!classifier.should_trip(&declined));
        assert!(classifier.should_trip(&unavailable));
        assert!(classifier.should_trip(&unknown));
    }
}
