/// A `Result` alias where the `Err` case is `tunnel_xds::Error`.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid upstream reference in cluster {cluster}: {source}")]
    InvalidReference {
        cluster: String,
        source: tunnel_api::Error,
    },

    #[error("no upstream for cluster {cluster}: {source}")]
    UpstreamNotFound {
        cluster: String,
        source: tunnel_api::Error,
    },

    #[error("invalid tunnel ssl config for upstream {upstream}: {source}")]
    TlsConfig {
        upstream: tunnel_api::ResourceRef,
        source: tunnel_api::Error,
    },

    #[error("failed to encode {type_url}: {message}")]
    Encode { type_url: String, message: String },
}

impl Error {
    /// Soft errors come from bad or stale user data. A translation pass that
    /// hits one stops early but still publishes what it already generated.
    ///
    /// Anything else is an internal error and fails the pass.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Error::InvalidReference { .. }
                | Error::UpstreamNotFound { .. }
                | Error::TlsConfig { .. }
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_classes() {
        let err = Error::InvalidReference {
            cluster: "a_b_c".to_string(),
            source: tunnel_api::Error::new_static("too many segments"),
        };
        assert!(err.is_soft());
        assert_eq!(
            err.to_string(),
            "invalid upstream reference in cluster a_b_c: too many segments"
        );

        let err = Error::Encode {
            type_url: "type.googleapis.com/foo.Bar".to_string(),
            message: "buffer too small".to_string(),
        };
        assert!(!err.is_soft());
    }
}
