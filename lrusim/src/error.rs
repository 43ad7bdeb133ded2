/// Error returned by [`LruCache::try_new`](crate::LruCache::try_new) when the
/// requested capacity cannot back a cache.
///
/// No cache is produced when this error is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapacityError {
    /// The requested capacity was zero.
    Zero,
    /// The requested capacity was negative or does not fit in a `usize`.
    OutOfRange,
}

impl std::fmt::Display for CapacityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapacityError::Zero => write!(f, "cache capacity must be at least 1, got 0"),
            CapacityError::OutOfRange => write!(
                f,
                "cache capacity must be a positive integer no larger than {}",
                usize::MAX
            ),
        }
    }
}

impl std::error::Error for CapacityError {}

#[cfg(test)]
mod tests {
    use super::CapacityError;

    #[test]
    fn test_display() {
        assert_eq!(
            CapacityError::Zero.to_string(),
            "cache capacity must be at least 1, got 0"
        );
        assert!(
            CapacityError::OutOfRange
                .to_string()
                .starts_with("cache capacity must be a positive integer")
        );
    }

    #[test]
    fn test_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(CapacityError::Zero);
        assert!(err.source().is_none());
    }
}
