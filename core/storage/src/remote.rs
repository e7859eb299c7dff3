//! Remote storage adapter backed by OpenDAL.
//!
//! One [`RemoteAdapter`] serves every network backend. The disk options are
//! translated into the OpenDAL service options for the selected
//! [`RemoteService`]; everything after construction goes through the same
//! `opendal::Operator` calls.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use opendal::{ErrorKind, Metadata, Operator, Scheme};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;
use url::Url;

use crate::adapter::{
    Adapter, AdapterKind, ByteStream, EntryKind, StorageAttributes, WriteOptions,
};
use stowage_common::{DiskConfig, Error, Result, StoragePath, Visibility};

/// Characters left as-is inside one URL path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const DEFAULT_S3_REGION: &str = "us-east-1";
const DEFAULT_QINIU_REGION: &str = "cn-east-1";

/// Network backends reachable through OpenDAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteService {
    Ftp,
    S3,
    Gcs,
    Oss,
    Cos,
    Obs,
    /// Qiniu Kodo through its S3-compatible endpoint.
    Qiniu,
}

impl RemoteService {
    /// Map a disk `type` (including aliases) to a service.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "ftp" => Some(Self::Ftp),
            "s3" | "aws" => Some(Self::S3),
            "gcs" | "google" => Some(Self::Gcs),
            "oss" => Some(Self::Oss),
            "cos" => Some(Self::Cos),
            "obs" => Some(Self::Obs),
            "qiniu" => Some(Self::Qiniu),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ftp => "ftp",
            Self::S3 => "s3",
            Self::Gcs => "gcs",
            Self::Oss => "oss",
            Self::Cos => "cos",
            Self::Obs => "obs",
            Self::Qiniu => "qiniu",
        }
    }

    fn scheme(&self) -> Scheme {
        match self {
            Self::Ftp => Scheme::Ftp,
            Self::S3 | Self::Qiniu => Scheme::S3,
            Self::Gcs => Scheme::Gcs,
            Self::Oss => Scheme::Oss,
            Self::Cos => Scheme::Cos,
            Self::Obs => Scheme::Obs,
        }
    }
}

/// Options handed to OpenDAL plus what we need to build URLs ourselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOptions {
    pub service: RemoteService,
    /// Key/value pairs for `Operator::via_iter`.
    pub options: Vec<(String, String)>,
    /// Object key prefix inside the bucket, without surrounding slashes.
    pub root: String,
    /// Base for public URLs, when one can be derived.
    pub public_base: Option<String>,
}

impl RemoteOptions {
    /// Translate disk options for `service`.
    ///
    /// # Errors
    /// - `Configuration` if a required option (bucket, host...) is missing
    pub fn from_config(service: RemoteService, config: &DiskConfig) -> Result<Self> {
        let root = config.root().trim_matches('/').to_string();
        let mut options = vec![("root".to_string(), operator_root(&root))];
        let mut push = |key: &str, value: Option<&str>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                options.push((key.to_string(), value.to_string()));
            }
        };

        let derived_base = match service {
            RemoteService::Ftp => {
                let host = config.require_str("host")?;
                let port = config.get_u64("port").unwrap_or(21);
                push("endpoint", Some(format!("ftp://{host}:{port}").as_str()));
                push("user", config.first_str(&["username", "user"]));
                push("password", config.get_str("password"));
                None
            }
            RemoteService::S3 => {
                let bucket = config.require_str("bucket")?;
                let region = config.get_str("region").unwrap_or(DEFAULT_S3_REGION);
                let endpoint = config.get_str("endpoint").filter(|e| !e.is_empty());
                let path_style = config.get_bool("use_path_style_endpoint").unwrap_or(false);
                push("bucket", Some(bucket));
                push("region", Some(region));
                push("endpoint", endpoint);
                push("access_key_id", config.first_str(&["key", "access_key_id"]));
                push(
                    "secret_access_key",
                    config.first_str(&["secret", "secret_access_key"]),
                );
                push("session_token", config.first_str(&["token", "session_token"]));
                if !path_style {
                    push("enable_virtual_host_style", Some("true"));
                }
                Some(match endpoint {
                    Some(endpoint) if path_style => {
                        format!("{}/{}", endpoint.trim_end_matches('/'), bucket)
                    }
                    Some(endpoint) => bucket_host_url(bucket, endpoint)?,
                    None => format!("https://{bucket}.s3.{region}.amazonaws.com"),
                })
            }
            RemoteService::Gcs => {
                let bucket = config.require_str("bucket")?;
                push("bucket", Some(bucket));
                push("endpoint", config.get_str("endpoint"));
                push(
                    "credential_path",
                    config.first_str(&["key_file_path", "key_file", "credential_path"]),
                );
                push("credential", config.get_str("credential"));
                Some(format!("https://storage.googleapis.com/{bucket}"))
            }
            RemoteService::Oss => {
                let bucket = config.require_str("bucket")?;
                let endpoint = config.require_str("endpoint")?;
                let endpoint = with_scheme(endpoint);
                push("bucket", Some(bucket));
                push("endpoint", Some(endpoint.as_str()));
                push(
                    "access_key_id",
                    config.first_str(&["access_key_id", "access_id", "key"]),
                );
                push(
                    "access_key_secret",
                    config.first_str(&["access_key_secret", "access_secret", "secret"]),
                );
                Some(bucket_host_url(bucket, &endpoint)?)
            }
            RemoteService::Cos => {
                let region = config.require_str("region")?;
                let bucket = config.require_str("bucket")?;
                let bucket = match config.get_str("app_id").filter(|a| !a.is_empty()) {
                    Some(app_id) if !bucket.ends_with(&format!("-{app_id}")) => {
                        format!("{bucket}-{app_id}")
                    }
                    _ => bucket.to_string(),
                };
                let endpoint = format!("https://cos.{region}.myqcloud.com");
                push("bucket", Some(bucket.as_str()));
                push("endpoint", Some(endpoint.as_str()));
                push("secret_id", config.first_str(&["secret_id", "key"]));
                push("secret_key", config.first_str(&["secret_key", "secret"]));
                Some(bucket_host_url(&bucket, &endpoint)?)
            }
            RemoteService::Obs => {
                let bucket = config.require_str("bucket")?;
                let endpoint = with_scheme(config.require_str("endpoint")?);
                push("bucket", Some(bucket));
                push("endpoint", Some(endpoint.as_str()));
                push("access_key_id", config.first_str(&["key", "access_key_id"]));
                push(
                    "secret_access_key",
                    config.first_str(&["secret", "secret_access_key"]),
                );
                Some(bucket_host_url(bucket, &endpoint)?)
            }
            RemoteService::Qiniu => {
                let bucket = config.require_str("bucket")?;
                let region = config.get_str("region").unwrap_or(DEFAULT_QINIU_REGION);
                push("bucket", Some(bucket));
                push("region", Some(region));
                push(
                    "endpoint",
                    Some(format!("https://s3.{region}.qiniucs.com").as_str()),
                );
                push("access_key_id", config.first_str(&["access_key", "key"]));
                push("secret_access_key", config.first_str(&["secret_key", "secret"]));
                config.get_str("domain").map(with_scheme)
            }
        };

        // FTP links are the configured `url` joined with the disk path, which
        // the operator builds without the server root.
        let public_base = match service {
            RemoteService::Ftp => None,
            _ => config
                .url()
                .or_else(|| config.get_str("domain").filter(|d| !d.is_empty()))
                .map(with_scheme)
                .or(derived_base),
        };

        Ok(Self {
            service,
            options,
            root,
            public_base,
        })
    }
}

/// Adapter that forwards every call to an `opendal::Operator`.
pub struct RemoteAdapter {
    service: RemoteService,
    operator: Operator,
    root: String,
    public_base: Option<String>,
}

impl RemoteAdapter {
    /// Build the operator for `service` from disk options.
    ///
    /// No network traffic happens here; credentials are checked on first use.
    pub fn from_config(service: RemoteService, config: &DiskConfig) -> Result<Self> {
        let RemoteOptions {
            service,
            options,
            root,
            public_base,
        } = RemoteOptions::from_config(service, config)?;

        debug!(service = service.name(), root = %root, "Building remote operator");
        let operator = Operator::via_iter(service.scheme(), options).map_err(|e| {
            Error::Configuration(format!("Invalid {} configuration: {e}", service.name()))
        })?;

        Ok(Self {
            service,
            operator,
            root,
            public_base,
        })
    }

    pub fn service(&self) -> RemoteService {
        self.service
    }

    /// The underlying OpenDAL operator.
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    fn object_key(&self, path: &StoragePath) -> String {
        let path = path.to_string_path();
        match (self.root.is_empty(), path.is_empty()) {
            (true, _) => path,
            (false, true) => self.root.clone(),
            (false, false) => format!("{}/{}", self.root, path),
        }
    }

    async fn stat_file(&self, path: &StoragePath) -> Result<Metadata> {
        let meta = self
            .operator
            .stat(&path.to_string_path())
            .await
            .map_err(map_error)?;
        if meta.is_dir() {
            return Err(Error::NotFound(format!("{path} is a directory")));
        }
        Ok(meta)
    }
}

/// OpenDAL wants an absolute root with a trailing slash.
fn operator_root(root: &str) -> String {
    if root.is_empty() {
        "/".to_string()
    } else {
        format!("/{root}/")
    }
}

fn with_scheme(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

/// `https://{bucket}.{endpoint host}`, keeping the endpoint scheme.
fn bucket_host_url(bucket: &str, endpoint: &str) -> Result<String> {
    let url = Url::parse(&with_scheme(endpoint))
        .map_err(|e| Error::Configuration(format!("Invalid endpoint '{endpoint}': {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::Configuration(format!("Endpoint '{endpoint}' has no host")))?;
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    Ok(format!("{}://{bucket}.{host}{port}", url.scheme()))
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Translate an OpenDAL error into the workspace error type.
pub fn map_error(err: opendal::Error) -> Error {
    match err.kind() {
        ErrorKind::NotFound => Error::NotFound(err.to_string()),
        ErrorKind::AlreadyExists => Error::AlreadyExists(err.to_string()),
        ErrorKind::PermissionDenied => Error::NotPermitted(err.to_string()),
        ErrorKind::Unsupported => Error::Unsupported(err.to_string()),
        ErrorKind::ConfigInvalid => Error::Configuration(err.to_string()),
        _ => Error::Storage(err.to_string()),
    }
}

fn attributes_from(path: StoragePath, meta: &Metadata) -> StorageAttributes {
    let kind = if meta.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    StorageAttributes {
        path,
        kind,
        size: (kind == EntryKind::File).then(|| meta.content_length()),
        last_modified: meta.last_modified(),
        visibility: None,
        mime_type: meta.content_type().map(str::to_string),
    }
}

#[async_trait]
impl Adapter for RemoteAdapter {
    fn name(&self) -> &str {
        self.service.name()
    }

    fn kind(&self) -> AdapterKind {
        match self.service {
            RemoteService::Ftp => AdapterKind::Ftp,
            _ => AdapterKind::ObjectStore,
        }
    }

    async fn file_exists(&self, path: &StoragePath) -> Result<bool> {
        if path.is_root() {
            return Ok(false);
        }
        match self.operator.stat(&path.to_string_path()).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_error(e)),
        }
    }

    async fn directory_exists(&self, path: &StoragePath) -> Result<bool> {
        if path.is_root() {
            return Ok(true);
        }
        let dir = path.to_dir_path();
        match self.operator.stat(&dir).await {
            Ok(meta) if meta.is_dir() => return Ok(true),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(map_error(e)),
        }
        // Object stores only have implicit directories.
        let entries = self.operator.list(&dir).await.map_err(map_error)?;
        Ok(entries.iter().any(|entry| entry.path() != dir))
    }

    async fn write(&self, path: &StoragePath, contents: Bytes, options: &WriteOptions) -> Result<()> {
        let mut write = self.operator.write_with(&path.to_string_path(), contents);
        if let Some(mime) = &options.mime_type {
            write = write.content_type(mime);
        }
        write.await.map_err(map_error)?;
        Ok(())
    }

    async fn write_stream(
        &self,
        path: &StoragePath,
        mut stream: ByteStream,
        options: &WriteOptions,
    ) -> Result<()> {
        let mut builder = self.operator.writer_with(&path.to_string_path());
        if let Some(mime) = &options.mime_type {
            builder = builder.content_type(mime);
        }
        let mut writer = builder.await.map_err(map_error)?;

        while let Some(chunk) = stream.next().await {
            let written = match chunk {
                Ok(chunk) => writer.write(chunk).await.map_err(map_error),
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                if let Err(abort) = writer.abort().await {
                    debug!(path = %path, error = %abort, "Failed to abort remote upload");
                }
                return Err(e);
            }
        }
        writer.close().await.map_err(map_error)?;
        Ok(())
    }

    async fn read(&self, path: &StoragePath) -> Result<Bytes> {
        let buffer = self
            .operator
            .read(&path.to_string_path())
            .await
            .map_err(map_error)?;
        Ok(buffer.to_bytes())
    }

    async fn read_stream(&self, path: &StoragePath) -> Result<ByteStream> {
        self.stat_file(path).await?;
        let reader = self
            .operator
            .reader(&path.to_string_path())
            .await
            .map_err(map_error)?;
        let stream = reader.into_bytes_stream(..).await.map_err(map_error)?;
        Ok(Box::pin(stream.map(|chunk| chunk.map_err(Error::from))))
    }

    async fn delete(&self, path: &StoragePath) -> Result<()> {
        // Object stores treat deleting a missing key as success.
        self.stat_file(path).await?;
        self.operator
            .delete(&path.to_string_path())
            .await
            .map_err(map_error)
    }

    async fn delete_directory(&self, path: &StoragePath) -> Result<()> {
        if path.is_root() {
            return Err(Error::InvalidInput(
                "Refusing to delete the disk root".to_string(),
            ));
        }
        self.operator
            .remove_all(&path.to_dir_path())
            .await
            .map_err(map_error)
    }

    async fn create_directory(&self, path: &StoragePath, _options: &WriteOptions) -> Result<()> {
        if path.is_root() {
            return Ok(());
        }
        self.operator
            .create_dir(&path.to_dir_path())
            .await
            .map_err(map_error)
    }

    async fn set_visibility(&self, path: &StoragePath, _visibility: Visibility) -> Result<()> {
        Err(Error::Unsupported(format!(
            "{} adapter cannot change visibility of {path}",
            self.name()
        )))
    }

    async fn visibility(&self, path: &StoragePath) -> Result<Visibility> {
        Err(Error::Unsupported(format!(
            "{} adapter cannot report visibility of {path}",
            self.name()
        )))
    }

    async fn metadata(&self, path: &StoragePath) -> Result<StorageAttributes> {
        let meta = self.stat_file(path).await?;
        Ok(attributes_from(path.clone(), &meta))
    }

    async fn list_contents(&self, path: &StoragePath, deep: bool) -> Result<Vec<StorageAttributes>> {
        let dir = path.to_dir_path();
        let entries = self
            .operator
            .list_with(&dir)
            .recursive(deep)
            .await
            .map_err(map_error)?;

        let mut listed = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.path() == dir {
                continue;
            }
            let entry_path = StoragePath::parse(entry.path().trim_end_matches('/'))?;
            if entry_path.is_root() {
                continue;
            }
            listed.push(attributes_from(entry_path, entry.metadata()));
        }
        Ok(listed)
    }

    async fn move_file(
        &self,
        from: &StoragePath,
        to: &StoragePath,
        options: &WriteOptions,
    ) -> Result<()> {
        if self.operator.info().full_capability().rename {
            return self
                .operator
                .rename(&from.to_string_path(), &to.to_string_path())
                .await
                .map_err(map_error);
        }
        self.copy(from, to, options).await?;
        self.delete(from).await
    }

    async fn copy(&self, from: &StoragePath, to: &StoragePath, options: &WriteOptions) -> Result<()> {
        if self.operator.info().full_capability().copy {
            return self
                .operator
                .copy(&from.to_string_path(), &to.to_string_path())
                .await
                .map_err(map_error);
        }
        let contents = self.read(from).await?;
        self.write(to, contents, options).await
    }

    fn public_url(&self, path: &StoragePath) -> Option<String> {
        let base = self.public_base.as_deref()?;
        Some(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            encode_key(&self.object_key(path))
        ))
    }

    async fn temporary_url(&self, path: &StoragePath, expires_in: Duration) -> Result<String> {
        if !self.operator.info().full_capability().presign_read {
            return Err(Error::Unsupported(format!(
                "{} adapter cannot create temporary URLs for {path}",
                self.name()
            )));
        }
        let request = self
            .operator
            .presign_read(&path.to_string_path(), expires_in)
            .await
            .map_err(map_error)?;
        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option<'a>(options: &'a RemoteOptions, key: &str) -> Option<&'a str> {
        options
            .options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_service_aliases() {
        assert_eq!(RemoteService::from_kind("aws"), Some(RemoteService::S3));
        assert_eq!(RemoteService::from_kind("google"), Some(RemoteService::Gcs));
        assert_eq!(RemoteService::from_kind("Qiniu"), Some(RemoteService::Qiniu));
        assert_eq!(RemoteService::from_kind("local"), None);
    }

    #[test]
    fn test_s3_options() {
        let config = DiskConfig::new()
            .with("bucket", "media")
            .with("key", "AKID")
            .with("secret", "shh")
            .with("root", "/uploads/");
        let opts = RemoteOptions::from_config(RemoteService::S3, &config).unwrap();

        assert_eq!(option(&opts, "root"), Some("/uploads/"));
        assert_eq!(option(&opts, "region"), Some("us-east-1"));
        assert_eq!(option(&opts, "access_key_id"), Some("AKID"));
        assert_eq!(option(&opts, "secret_access_key"), Some("shh"));
        assert_eq!(option(&opts, "enable_virtual_host_style"), Some("true"));
        assert_eq!(option(&opts, "session_token"), None);
        assert_eq!(
            opts.public_base.as_deref(),
            Some("https://media.s3.us-east-1.amazonaws.com")
        );
    }

    #[test]
    fn test_s3_path_style_endpoint() {
        let config = DiskConfig::new()
            .with("bucket", "media")
            .with("endpoint", "http://localhost:9000/")
            .with("use_path_style_endpoint", true);
        let opts = RemoteOptions::from_config(RemoteService::S3, &config).unwrap();
        assert_eq!(option(&opts, "enable_virtual_host_style"), None);
        assert_eq!(opts.public_base.as_deref(), Some("http://localhost:9000/media"));
    }

    #[test]
    fn test_missing_bucket_is_configuration_error() {
        let err = RemoteOptions::from_config(RemoteService::Oss, &DiskConfig::new()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_ftp_options() {
        let config = DiskConfig::new()
            .with("host", "ftp.example.com")
            .with("username", "bob")
            .with("password", "pw");
        let opts = RemoteOptions::from_config(RemoteService::Ftp, &config).unwrap();
        assert_eq!(option(&opts, "endpoint"), Some("ftp://ftp.example.com:21"));
        assert_eq!(option(&opts, "user"), Some("bob"));
        assert_eq!(option(&opts, "root"), Some("/"));
        assert!(opts.public_base.is_none());
    }

    #[test]
    fn test_ftp_url_joins_configured_base() {
        let config = DiskConfig::new()
            .with("host", "ftp.example.com")
            .with("root", "/pub")
            .with("url", "http://files.example.com");
        let opts = RemoteOptions::from_config(RemoteService::Ftp, &config).unwrap();
        assert_eq!(option(&opts, "root"), Some("/pub/"));
        assert!(opts.public_base.is_none());

        let adapter = RemoteAdapter::from_config(RemoteService::Ftp, &config).unwrap();
        let operator = crate::operator::Operator::new(
            std::sync::Arc::new(adapter),
            crate::operator::OperatorConfig::from_disk_config(&config).unwrap(),
        );
        assert_eq!(
            operator.public_url("a b.txt").unwrap(),
            "http://files.example.com/a b.txt"
        );
        assert_eq!(
            operator.public_url("/docs/x.pdf").unwrap(),
            "http://files.example.com/docs/x.pdf"
        );
    }

    #[test]
    fn test_cos_bucket_and_endpoint() {
        let config = DiskConfig::new()
            .with("region", "ap-guangzhou")
            .with("bucket", "assets")
            .with("app_id", "1250000000");
        let opts = RemoteOptions::from_config(RemoteService::Cos, &config).unwrap();
        assert_eq!(option(&opts, "bucket"), Some("assets-1250000000"));
        assert_eq!(
            option(&opts, "endpoint"),
            Some("https://cos.ap-guangzhou.myqcloud.com")
        );
        assert_eq!(
            opts.public_base.as_deref(),
            Some("https://assets-1250000000.cos.ap-guangzhou.myqcloud.com")
        );
    }

    #[test]
    fn test_qiniu_uses_domain() {
        let config = DiskConfig::new()
            .with("bucket", "kodo")
            .with("access_key", "ak")
            .with("secret_key", "sk")
            .with("domain", "cdn.example.com");
        let opts = RemoteOptions::from_config(RemoteService::Qiniu, &config).unwrap();
        assert_eq!(
            option(&opts, "endpoint"),
            Some("https://s3.cn-east-1.qiniucs.com")
        );
        assert_eq!(opts.public_base.as_deref(), Some("https://cdn.example.com"));
    }

    #[test]
    fn test_public_url_encodes_segments() {
        let config = DiskConfig::new()
            .with("bucket", "media")
            .with("root", "site")
            .with("url", "https://cdn.example.com/");
        let adapter = RemoteAdapter::from_config(RemoteService::S3, &config).unwrap();
        let path = StoragePath::parse("photos/summer day.jpg").unwrap();
        assert_eq!(
            adapter.public_url(&path).as_deref(),
            Some("https://cdn.example.com/site/photos/summer%20day.jpg")
        );
        assert_eq!(adapter.kind(), AdapterKind::ObjectStore);
    }

    #[test]
    fn test_gcs_public_url() {
        let config = DiskConfig::new().with("bucket", "b");
        let adapter = RemoteAdapter::from_config(RemoteService::Gcs, &config).unwrap();
        let path = StoragePath::parse("a.txt").unwrap();
        assert_eq!(
            adapter.public_url(&path).as_deref(),
            Some("https://storage.googleapis.com/b/a.txt")
        );
    }

    #[test]
    fn test_error_mapping() {
        let err = map_error(opendal::Error::new(ErrorKind::NotFound, "gone"));
        assert!(err.is_not_found());
        let err = map_error(opendal::Error::new(ErrorKind::PermissionDenied, "no"));
        assert!(matches!(err, Error::NotPermitted(_)));
        let err = map_error(opendal::Error::new(ErrorKind::Unexpected, "boom"));
        assert!(matches!(err, Error::Storage(_)));
    }
}
