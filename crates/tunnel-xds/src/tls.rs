//! Resolving declarative SSL settings into Envoy TLS contexts.

use tunnel_api::{
    Error, ErrorContext, ResourceRef, SecretKind, SecretList, SslFiles, UpstreamSslConfig,
};
use xds_api::pb::envoy::{config::core::v3 as xds_core, r#type::matcher::v3 as xds_matcher};

use crate::encode::ConfigEncoder;
use crate::xds::tls::{
    common_tls_context::ValidationContextType, CertificateValidationContext, CommonTlsContext,
    TlsCertificate, UpstreamTlsContext, TRANSPORT_SOCKET_TLS,
};

/// Turns an [UpstreamSslConfig] into a concrete TLS context, pulling key
/// material out of `secrets` as needed.
pub trait TlsResolver {
    fn resolve(
        &self,
        secrets: &SecretList,
        ssl: &UpstreamSslConfig,
    ) -> Result<UpstreamTlsContext, Error>;
}

/// The default [TlsResolver].
///
/// Secret material is inlined into the generated context. File material is
/// referenced by path and read by the proxy.
#[derive(Clone, Copy, Debug, Default)]
pub struct SslConfigResolver;

impl TlsResolver for SslConfigResolver {
    fn resolve(
        &self,
        secrets: &SecretList,
        ssl: &UpstreamSslConfig,
    ) -> Result<UpstreamTlsContext, Error> {
        let material = match (&ssl.secret_ref, &ssl.ssl_files) {
            (Some(_), Some(_)) => {
                return Err(Error::new_static(
                    "only one of secret_ref and ssl_files may be set",
                ))
            }
            (Some(secret_ref), None) => {
                secret_material(secrets, secret_ref).with_field("secret_ref")?
            }
            (None, Some(files)) => file_material(files).with_field("ssl_files")?,
            (None, None) => TlsMaterial::default(),
        };

        check_non_empty("verify_subject_alt_name", &ssl.verify_subject_alt_name)?;
        check_non_empty("alpn_protocols", &ssl.alpn_protocols)?;

        if !ssl.verify_subject_alt_name.is_empty() && material.root_ca.is_none() {
            return Err(Error::new_static(
                "a root CA is required to verify subject alt names",
            ))
            .with_field("verify_subject_alt_name");
        }

        let tls_certificates = match (material.cert_chain, material.private_key) {
            (Some(certificate_chain), Some(private_key)) => vec![TlsCertificate {
                certificate_chain: Some(certificate_chain),
                private_key: Some(private_key),
            }],
            _ => Vec::new(),
        };

        let validation_context_type = material.root_ca.map(|trusted_ca| {
            ValidationContextType::ValidationContext(CertificateValidationContext {
                trusted_ca: Some(trusted_ca),
                match_subject_alt_names: ssl
                    .verify_subject_alt_name
                    .iter()
                    .map(|san| exact_matcher(san))
                    .collect(),
            })
        });

        Ok(UpstreamTlsContext {
            common_tls_context: Some(CommonTlsContext {
                tls_certificates,
                validation_context_type,
                alpn_protocols: ssl.alpn_protocols.clone(),
            }),
            sni: ssl.sni.clone().unwrap_or_default(),
            allow_renegotiation: ssl.allow_renegotiation,
        })
    }
}

/// Wrap a resolved TLS context in the transport socket a cluster expects.
pub(crate) fn tls_transport_socket<E: ConfigEncoder>(
    encoder: &E,
    context: &UpstreamTlsContext,
) -> crate::Result<xds_core::TransportSocket> {
    let typed_config = encoder.encode(context)?;

    Ok(xds_core::TransportSocket {
        name: TRANSPORT_SOCKET_TLS.to_string(),
        config_type: Some(xds_core::transport_socket::ConfigType::TypedConfig(
            typed_config,
        )),
    })
}

#[derive(Debug, Default)]
struct TlsMaterial {
    cert_chain: Option<xds_core::DataSource>,
    private_key: Option<xds_core::DataSource>,
    root_ca: Option<xds_core::DataSource>,
}

fn secret_material(secrets: &SecretList, secret_ref: &ResourceRef) -> Result<TlsMaterial, Error> {
    let secret = secrets.find(&secret_ref.namespace, &secret_ref.name)?;

    let SecretKind::Tls(tls) = &secret.kind else {
        return Err(Error::new(format!("secret {secret_ref} is not a TLS secret")));
    };

    check_key_pair(&tls.cert_chain, &tls.private_key).with_field("private_key")?;

    Ok(TlsMaterial {
        cert_chain: non_empty(&tls.cert_chain).map(inline_string),
        private_key: non_empty(&tls.private_key).map(inline_string),
        root_ca: non_empty(&tls.root_ca).map(inline_string),
    })
}

fn file_material(files: &SslFiles) -> Result<TlsMaterial, Error> {
    check_key_pair(&files.tls_cert, &files.tls_key).with_field("tls_key")?;

    Ok(TlsMaterial {
        cert_chain: non_empty(&files.tls_cert).map(filename),
        private_key: non_empty(&files.tls_key).map(filename),
        root_ca: non_empty(&files.root_ca).map(filename),
    })
}

fn check_key_pair(cert_chain: &str, private_key: &str) -> Result<(), Error> {
    if cert_chain.is_empty() != private_key.is_empty() {
        return Err(Error::new_static(
            "a certificate chain and private key must be set together",
        ));
    }
    Ok(())
}

fn check_non_empty(field: &'static str, values: &[String]) -> Result<(), Error> {
    for (i, value) in values.iter().enumerate() {
        if value.is_empty() {
            return Err(Error::new_static("must not be empty")).with_field_index(field, i);
        }
    }
    Ok(())
}

#[inline]
fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

fn inline_string(s: &str) -> xds_core::DataSource {
    xds_core::DataSource {
        specifier: Some(xds_core::data_source::Specifier::InlineString(
            s.to_string(),
        )),
        ..Default::default()
    }
}

fn filename(s: &str) -> xds_core::DataSource {
    xds_core::DataSource {
        specifier: Some(xds_core::data_source::Specifier::Filename(s.to_string())),
        ..Default::default()
    }
}

fn exact_matcher(s: &str) -> xds_matcher::StringMatcher {
    xds_matcher::StringMatcher {
        match_pattern: Some(xds_matcher::string_matcher::MatchPattern::Exact(
            s.to_string(),
        )),
        ..Default::default()
    }
}

#[cfg(test)]
mod test {
    use tunnel_api::{Secret, TlsSecret};

    use super::*;
    use crate::encode::AnyEncoder;

    fn tls_secrets() -> SecretList {
        vec![
            Secret {
                metadata: ResourceRef::new("default", "proxy-tls"),
                kind: SecretKind::Tls(TlsSecret {
                    cert_chain: "CERT".to_string(),
                    private_key: "KEY".to_string(),
                    root_ca: "CA".to_string(),
                }),
            },
            Secret {
                metadata: ResourceRef::new("default", "api-key"),
                kind: SecretKind::default(),
            },
        ]
        .into()
    }

    #[test]
    fn test_resolve_secret_ref() {
        let ssl = UpstreamSslConfig {
            secret_ref: Some(ResourceRef::new("default", "proxy-tls")),
            sni: Some("proxy.example.com".to_string()),
            verify_subject_alt_name: vec!["proxy.example.com".to_string()],
            alpn_protocols: vec!["h2".to_string()],
            ..Default::default()
        };

        let ctx = SslConfigResolver.resolve(&tls_secrets(), &ssl).unwrap();
        assert_eq!(ctx.sni, "proxy.example.com");
        assert!(!ctx.allow_renegotiation);

        let common = ctx.common_tls_context.unwrap();
        assert_eq!(common.alpn_protocols, vec!["h2".to_string()]);
        assert_eq!(
            common.tls_certificates,
            vec![TlsCertificate {
                certificate_chain: Some(inline_string("CERT")),
                private_key: Some(inline_string("KEY")),
            }]
        );
        assert_eq!(
            common.validation_context_type,
            Some(ValidationContextType::ValidationContext(
                CertificateValidationContext {
                    trusted_ca: Some(inline_string("CA")),
                    match_subject_alt_names: vec![exact_matcher("proxy.example.com")],
                }
            ))
        );
    }

    #[test]
    fn test_resolve_ssl_files() {
        let ssl = UpstreamSslConfig {
            ssl_files: Some(SslFiles {
                root_ca: "/etc/ssl/ca.pem".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };

        let ctx = SslConfigResolver.resolve(&tls_secrets(), &ssl).unwrap();
        let common = ctx.common_tls_context.unwrap();
        assert!(common.tls_certificates.is_empty());
        assert_eq!(
            common.validation_context_type,
            Some(ValidationContextType::ValidationContext(
                CertificateValidationContext {
                    trusted_ca: Some(filename("/etc/ssl/ca.pem")),
                    match_subject_alt_names: vec![],
                }
            ))
        );
    }

    #[test]
    fn test_resolve_sni_only() {
        let ssl = UpstreamSslConfig {
            sni: Some("proxy.example.com".to_string()),
            allow_renegotiation: true,
            ..Default::default()
        };

        let ctx = SslConfigResolver.resolve(&SecretList::default(), &ssl).unwrap();
        assert_eq!(ctx.sni, "proxy.example.com");
        assert!(ctx.allow_renegotiation);
        assert_eq!(ctx.common_tls_context, Some(CommonTlsContext::default()));
    }

    #[test]
    fn test_resolve_errors() {
        let secrets = tls_secrets();

        let cases = [
            (
                UpstreamSslConfig {
                    secret_ref: Some(ResourceRef::new("default", "missing")),
                    ..Default::default()
                },
                "secret_ref: secret default/missing not found",
            ),
            (
                UpstreamSslConfig {
                    secret_ref: Some(ResourceRef::new("default", "api-key")),
                    ..Default::default()
                },
                "secret_ref: secret default/api-key is not a TLS secret",
            ),
            (
                UpstreamSslConfig {
                    secret_ref: Some(ResourceRef::new("default", "proxy-tls")),
                    ssl_files: Some(SslFiles::default()),
                    ..Default::default()
                },
                "only one of secret_ref and ssl_files may be set",
            ),
            (
                UpstreamSslConfig {
                    ssl_files: Some(SslFiles {
                        tls_cert: "/etc/ssl/cert.pem".to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                "ssl_files.tls_key: a certificate chain and private key must be set together",
            ),
            (
                UpstreamSslConfig {
                    verify_subject_alt_name: vec!["proxy.example.com".to_string()],
                    ..Default::default()
                },
                "verify_subject_alt_name: a root CA is required to verify subject alt names",
            ),
            (
                UpstreamSslConfig {
                    secret_ref: Some(ResourceRef::new("default", "proxy-tls")),
                    verify_subject_alt_name: vec!["proxy.example.com".to_string(), String::new()],
                    ..Default::default()
                },
                "verify_subject_alt_name[1]: must not be empty",
            ),
            (
                UpstreamSslConfig {
                    alpn_protocols: vec![String::new()],
                    ..Default::default()
                },
                "alpn_protocols[0]: must not be empty",
            ),
        ];

        for (ssl, message) in cases {
            let err = SslConfigResolver.resolve(&secrets, &ssl).unwrap_err();
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn test_tls_transport_socket() {
        let ctx = UpstreamTlsContext {
            sni: "proxy.example.com".to_string(),
            ..Default::default()
        };

        let socket = tls_transport_socket(&AnyEncoder, &ctx).unwrap();
        assert_eq!(socket.name, "envoy.transport_sockets.tls");

        let Some(xds_core::transport_socket::ConfigType::TypedConfig(any)) = socket.config_type
        else {
            panic!("transport socket has no typed config");
        };
        assert_eq!(any.to_msg::<UpstreamTlsContext>().unwrap(), ctx);
    }
}
