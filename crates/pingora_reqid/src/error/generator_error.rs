use thiserror::Error;

/// Failures while setting up a request id generator.
///
/// Producing identifiers never fails; only construction can.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("could not draw a {len}-character prefix token after {attempts} attempts")]
    TokenExhausted { len: usize, attempts: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_length_and_attempts() {
        let err = GeneratorError::TokenExhausted {
            len: 10,
            attempts: 16,
        };
        assert_eq!(
            err.to_string(),
            "could not draw a 10-character prefix token after 16 attempts"
        );
    }
}
