//! Connection port and its `ldap3` implementation.

use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings, Mod, SearchEntry};
use ldap_core::{DirectoryConfig, Error};
use native_tls::{Certificate, TlsConnector};
use secrecy::ExposeSecret;
use std::collections::HashSet;
use std::fs;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::request::{
    AddRequest, DirectoryRequest, DirectoryResponse, LdapEntry, ModifyRequest, SearchRequest,
};
use crate::state::AttributeOperation;
use crate::Result;

/// Sends one logical request to the directory and returns its response or a failure.
///
/// Implementations own bind state, transport security and any timeout policy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Sends `request` and waits for the answer.
    async fn send_request(&mut self, request: DirectoryRequest) -> Result<DirectoryResponse>;
}

/// [`DirectoryConnection`] backed by an `ldap3` async connection.
pub struct Ldap3Connection {
    inner: ldap3::Ldap,
    operation_timeout: Duration,
}

impl Ldap3Connection {
    /// Opens a connection and, when credentials are configured, performs a simple bind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for unusable TLS material, [`Error::ConnectionError`] when
    /// the server cannot be reached and [`Error::InvalidCredentials`] when the bind is rejected.
    pub async fn connect(config: &DirectoryConfig) -> Result<Self> {
        let settings = build_ldap_settings(config)?;
        let (conn, ldap) = LdapConnAsync::with_settings(settings, config.url()).await?;
        ldap3::drive!(conn);

        let mut connection = Self {
            inner: ldap,
            operation_timeout: config.operation_timeout(),
        };
        if config.has_bind_credentials() {
            connection
                .simple_bind(config.bind_dn(), config.bind_password().expose_secret())
                .await?;
        }
        Ok(connection)
    }

    /// Binds the connection as `dn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] when the server rejects the bind.
    pub async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = with_timeout(
            self.operation_timeout,
            "bind",
            self.inner.simple_bind(dn, password),
        )
        .await?;
        result.success()?;
        Ok(())
    }

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the unbind request cannot be sent.
    pub async fn unbind(&mut self) -> Result<()> {
        with_timeout(self.operation_timeout, "unbind", self.inner.unbind()).await
    }

    async fn add(&mut self, request: AddRequest) -> Result<()> {
        let attributes = group_attribute_values(&request);
        let result = with_timeout(
            self.operation_timeout,
            "add",
            self.inner.add(&request.dn, attributes),
        )
        .await?;
        result.success()?;
        Ok(())
    }

    async fn delete(&mut self, dn: &str) -> Result<()> {
        let result = with_timeout(self.operation_timeout, "delete", self.inner.delete(dn)).await?;
        result.success()?;
        Ok(())
    }

    async fn modify(&mut self, request: ModifyRequest) -> Result<()> {
        let values = request.values.into_iter().collect::<HashSet<_>>();
        let modification = match request.operation {
            AttributeOperation::Add => Mod::Add(request.attribute, values),
            AttributeOperation::Delete => Mod::Delete(request.attribute, values),
            AttributeOperation::Replace => Mod::Replace(request.attribute, values),
        };
        let result = with_timeout(
            self.operation_timeout,
            "modify",
            self.inner.modify(&request.dn, vec![modification]),
        )
        .await?;
        result.success()?;
        Ok(())
    }

    async fn search(&mut self, request: SearchRequest) -> Result<Vec<LdapEntry>> {
        let result = with_timeout(
            self.operation_timeout,
            "search",
            self.inner.search(
                &request.base_dn,
                request.scope.into(),
                &request.filter,
                request.attributes,
            ),
        )
        .await?;
        let (entries, _) = result.success()?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(entry_from_search)
            .collect())
    }
}

#[async_trait]
impl DirectoryConnection for Ldap3Connection {
    async fn send_request(&mut self, request: DirectoryRequest) -> Result<DirectoryResponse> {
        debug!(kind = request.kind(), "sending directory request");
        match request {
            DirectoryRequest::Add(add) => self.add(add).await.map(|()| DirectoryResponse::Done),
            DirectoryRequest::Delete(delete) => self
                .delete(&delete.dn)
                .await
                .map(|()| DirectoryResponse::Done),
            DirectoryRequest::Modify(modify) => self
                .modify(modify)
                .await
                .map(|()| DirectoryResponse::Done),
            DirectoryRequest::Search(search) => {
                self.search(search).await.map(DirectoryResponse::Entries)
            }
        }
    }
}

async fn with_timeout<F, T>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = ldap3::result::Result<T>>,
{
    timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(format!("directory {operation} timed out")))?
        .map_err(Error::from)
}

/// Collapses repeated pairs into one value set per attribute, keeping first-seen name order.
fn group_attribute_values(request: &AddRequest) -> Vec<(String, HashSet<String>)> {
    let mut grouped: Vec<(String, HashSet<String>)> = Vec::new();
    for attribute in &request.attributes {
        match grouped.iter_mut().find(|(name, _)| *name == attribute.name) {
            Some((_, values)) => {
                values.insert(attribute.value.clone());
            }
            None => grouped.push((
                attribute.name.clone(),
                HashSet::from([attribute.value.clone()]),
            )),
        }
    }
    grouped
}

/// Converts an `ldap3` entry, decoding binary values as lossy UTF-8 text.
///
/// `ldap3` hands attributes back in a hash map, so names are sorted to keep results stable.
fn entry_from_search(entry: SearchEntry) -> LdapEntry {
    let mut attributes: Vec<(String, Vec<String>)> = entry.attrs.into_iter().collect();
    attributes.extend(entry.bin_attrs.into_iter().map(|(name, values)| {
        let values = values
            .iter()
            .map(|value| String::from_utf8_lossy(value).into_owned())
            .collect();
        (name, values)
    }));
    attributes.sort_by(|(left, _), (right, _)| left.cmp(right));

    LdapEntry {
        dn: entry.dn,
        attributes,
    }
}

fn build_ldap_settings(config: &DirectoryConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new()
        .set_conn_timeout(config.connection_timeout())
        .set_starttls(config.starttls());

    if !config.tls_verify() {
        warn!("TLS verification disabled for directory connection");
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert() {
        debug!("loading directory CA certificate from {}", cert_path.display());
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read directory CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem).map_err(|err| {
            Error::ConfigError(format!("invalid directory CA certificate: {err}"))
        })?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to load directory CA certificate: {err}"))
            })?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}
