use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file is not well-formed YAML.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),

    /// A configuration value has the wrong type, is out of range, or is not
    /// recognised by the schema.
    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn io_errors_convert() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "server.yaml").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "io error: server.yaml");
    }

    #[test]
    fn display_includes_category() {
        let err = Error::Validation("server.port must be between 1 and 65535".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: server.port must be between 1 and 65535"
        );
    }
}
