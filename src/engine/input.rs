//! Prompt validation for sampling calls.
//!
//! All inputs are validated before reaching the model. Invalid inputs are
//! rejected, not truncated.

use super::error::SamplerError;

/// Maximum prompt size in bytes (64KB).
pub const MAX_TEXT_BYTES: usize = 65_536;

/// Maximum number of prompts per call.
pub const MAX_BATCH_SIZE: usize = 32;

/// Maximum token count per encoded prompt.
pub const MAX_INPUT_TOKENS: usize = 4096;

/// Validate the prompt batch of one call.
///
/// Empty strings are allowed; they encode to a lone beginning-of-sequence id.
pub fn validate_prompts<S: AsRef<str>>(prompts: &[S]) -> Result<(), SamplerError> {
    if prompts.is_empty() {
        return Err(SamplerError::InputValidation("prompt batch cannot be empty".into()));
    }
    if prompts.len() > MAX_BATCH_SIZE {
        return Err(SamplerError::InputValidation(format!(
            "batch exceeds maximum size: {} > {}",
            prompts.len(),
            MAX_BATCH_SIZE
        )));
    }
    for (i, prompt) in prompts.iter().enumerate() {
        let len = prompt.as_ref().len();
        if len > MAX_TEXT_BYTES {
            return Err(SamplerError::InputValidation(format!(
                "prompt {}: text exceeds maximum size: {} > {} bytes",
                i, len, MAX_TEXT_BYTES
            )));
        }
    }
    Ok(())
}

/// Validate one encoded prompt.
pub fn validate_encoded(index: usize, ids: &[u32]) -> Result<(), SamplerError> {
    if ids.len() > MAX_INPUT_TOKENS {
        return Err(SamplerError::InputValidation(format!(
            "prompt {}: {} tokens exceeds maximum of {}",
            index,
            ids.len(),
            MAX_INPUT_TOKENS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_is_rejected() {
        let prompts: Vec<String> = Vec::new();
        assert!(validate_prompts(&prompts).is_err());
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let prompts = vec!["hi"; MAX_BATCH_SIZE + 1];
        assert!(validate_prompts(&prompts).is_err());
    }

    #[test]
    fn oversized_prompt_is_rejected() {
        let big = "a".repeat(MAX_TEXT_BYTES + 1);
        let err = validate_prompts(&[big.as_str()]).unwrap_err();
        assert!(err.to_string().contains("prompt 0"));
    }

    #[test]
    fn empty_prompt_string_is_allowed() {
        assert!(validate_prompts(&["", "Hello"]).is_ok());
    }

    #[test]
    fn too_many_tokens_is_rejected() {
        let ids = vec![7u32; MAX_INPUT_TOKENS + 1];
        assert!(validate_encoded(0, &ids).is_err());
        assert!(validate_encoded(0, &ids[..MAX_INPUT_TOKENS]).is_ok());
    }
}
