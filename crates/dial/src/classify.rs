use crate::code::Classification;

/// Maps a failed session's daemon log to an error classification.
///
/// Implementations must be total: unknown or empty input yields a default
/// classification, never a panic.
pub trait LogClassifier: Send + Sync {
    fn classify(&self, log: &str) -> Classification;
}

impl<F> LogClassifier for F
where
    F: Fn(&str) -> Classification + Send + Sync,
{
    fn classify(&self, log: &str) -> Classification {
        self(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::ErrorCode;

    #[test]
    fn closures_are_classifiers() {
        let classifier: Box<dyn LogClassifier> = Box::new(|log: &str| {
            if log.contains("hangup") {
                Classification::of(ErrorCode::ConnectionClosed)
            } else {
                Classification::of(ErrorCode::NoIpObtained)
            }
        });
        assert_eq!(
            classifier.classify("Modem hangup").code,
            ErrorCode::ConnectionClosed
        );
        assert_eq!(classifier.classify("").code, ErrorCode::NoIpObtained);
    }
}
