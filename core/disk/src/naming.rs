//! Generated names for stored uploads.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use blake2::{Blake2s256, Digest};
use chrono::Utc;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use stowage_common::Result;

/// How [`Disk::put_file`](crate::Disk::put_file) names the stored file.
///
/// The rule produces the name without extension; the source file's
/// extension is appended afterwards.
#[derive(Clone, Default)]
pub enum NameRule {
    /// `YYYYMMDD/<32 hex chars>`
    #[default]
    Date,
    /// BLAKE2s-256 of the file contents, hex encoded.
    Hash,
    /// Caller-supplied name from the source path.
    Custom(Arc<dyn Fn(&Path) -> String + Send + Sync>),
}

impl fmt::Debug for NameRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameRule::Date => f.write_str("Date"),
            NameRule::Hash => f.write_str("Hash"),
            NameRule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl NameRule {
    pub fn custom(rule: impl Fn(&Path) -> String + Send + Sync + 'static) -> Self {
        NameRule::Custom(Arc::new(rule))
    }

    /// Build the stored name for `source`, extension included.
    pub async fn hash_name(&self, source: &Path) -> Result<String> {
        let stem = match self {
            NameRule::Date => format!(
                "{}/{}",
                Utc::now().format("%Y%m%d"),
                Uuid::new_v4().simple()
            ),
            NameRule::Hash => hash_file(source).await?,
            NameRule::Custom(rule) => rule(source),
        };
        Ok(match source.extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!("{stem}.{ext}"),
            _ => stem,
        })
    }
}

async fn hash_file(source: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(source).await?;
    let mut hasher = Blake2s256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_date_rule() {
        let name = NameRule::Date.hash_name(Path::new("/tmp/photo.JPG")).await.unwrap();
        let (day, file) = name.split_once('/').unwrap();
        assert_eq!(day.len(), 8);
        assert!(day.chars().all(|c| c.is_ascii_digit()));
        let (stem, ext) = file.split_once('.').unwrap();
        assert_eq!(stem.len(), 32);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ext, "JPG");
    }

    #[tokio::test]
    async fn test_hash_rule_is_content_addressed() {
        let mut a = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let mut b = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        a.write_all(b"same bytes").unwrap();
        b.write_all(b"same bytes").unwrap();

        let first = NameRule::Hash.hash_name(a.path()).await.unwrap();
        let second = NameRule::Hash.hash_name(b.path()).await.unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with(".txt"));
        assert_eq!(first.len(), 64 + 4);
    }

    #[tokio::test]
    async fn test_custom_rule() {
        let rule = NameRule::custom(|_| "avatar".to_string());
        assert_eq!(
            rule.hash_name(Path::new("upload.png")).await.unwrap(),
            "avatar.png"
        );
        assert_eq!(rule.hash_name(Path::new("noext")).await.unwrap(), "avatar");
    }
}
