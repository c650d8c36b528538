use crate::error::ApiError;

/// Maximum LaTeX summary length for speech requests
const MAX_SUMMARY_LENGTH: usize = 20_000;

/// Validate a speech request payload before the pipeline runs
pub fn validate_speak_request(latex_summary: &str) -> Result<(), ApiError> {
    if latex_summary.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "latex_summary cannot be empty".to_string(),
        ));
    }
    if latex_summary.len() > MAX_SUMMARY_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "latex_summary too long (max {} characters)",
            MAX_SUMMARY_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_speak_request_valid() {
        assert!(validate_speak_request("The key idea is \\frac{a}{b}.").is_ok());
    }

    #[test]
    fn test_validate_speak_request_empty() {
        let result = validate_speak_request("   ");
        assert!(result.is_err());
        if let Err(ApiError::InvalidInput(msg)) = result {
            assert!(msg.contains("empty"));
        }
    }

    #[test]
    fn test_validate_speak_request_too_long() {
        let long_text = "a".repeat(MAX_SUMMARY_LENGTH + 1);
        let result = validate_speak_request(&long_text);
        assert!(result.is_err());
        if let Err(ApiError::InvalidInput(msg)) = result {
            assert!(msg.contains("too long"));
        }
    }
}
