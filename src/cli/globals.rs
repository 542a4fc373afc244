use secrecy::SecretString;

/// Process-wide secrets, loaded once at startup and injected explicitly.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    token_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(token_secret: SecretString) -> Self {
        Self { token_secret }
    }

    #[must_use]
    pub fn token_secret(&self) -> &SecretString {
        &self.token_secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(SecretString::from("signing-key".to_string()));
        assert_eq!(args.token_secret().expose_secret(), "signing-key");
    }

    #[test]
    fn debug_output_does_not_leak_the_secret() {
        let args = GlobalArgs::new(SecretString::from("signing-key".to_string()));
        assert!(!format!("{args:?}").contains("signing-key"));
    }
}
