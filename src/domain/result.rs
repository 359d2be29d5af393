//! Result type alias for FactSync

use super::errors::FactSyncError;

/// Result type alias for FactSync operations
///
/// # Examples
///
/// ```
/// use factsync::domain::result::Result;
/// use factsync::domain::errors::FactSyncError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(FactSyncError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, FactSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(FactSyncError::Validation("test error".to_string()));
        assert!(result.is_err());
    }
}
