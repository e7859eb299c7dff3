//! Streamed HTTP responses for stored files.

use axum::body::Body;
use http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Response};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::disk::Disk;
use stowage_common::{Error, Result};

/// RFC 5987 `attr-char`s are left unencoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Whether the browser should display the file or save it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    #[default]
    Inline,
    Attachment,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// ASCII stand-in for a file name: the name itself when it is printable
/// ASCII, otherwise the decimal values of its bytes.
pub fn fallback_name(name: &str) -> String {
    if name.bytes().all(|b| (0x20..0x7f).contains(&b) && b != b'%') {
        return name.to_string();
    }
    name.bytes().map(|b| b.to_string()).collect()
}

/// `Content-Disposition` value for `filename`.
pub fn content_disposition(disposition: Disposition, filename: &str) -> String {
    let fallback = fallback_name(filename);
    let quoted = fallback.replace('\\', "\\\\").replace('"', "\\\"");
    let mut value = format!("{}; filename=\"{}\"", disposition.as_str(), quoted);
    if fallback != filename {
        value.push_str("; filename*=utf-8''");
        value.extend(utf8_percent_encode(filename, ATTR_CHAR));
    }
    value
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::InvalidInput(format!("Invalid header value {value:?}: {e}")))
}

impl Disk {
    /// Serve `path` as a streamed HTTP response.
    ///
    /// `Content-Type`, `Content-Length` and `Content-Disposition` are
    /// filled in unless `headers` already carries them. The body reads
    /// from the disk as the client consumes it.
    pub async fn response(
        &self,
        path: &str,
        name: Option<&str>,
        mut headers: HeaderMap,
        disposition: Disposition,
    ) -> Result<Response<Body>> {
        if !headers.contains_key(CONTENT_TYPE) {
            let mime = self.operator().mime_type(path).await?;
            headers.insert(CONTENT_TYPE, header_value(&mime)?);
        }
        if !headers.contains_key(CONTENT_LENGTH) {
            let size = self.size(path).await?;
            headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
        }
        if !headers.contains_key(CONTENT_DISPOSITION) {
            let filename = match name {
                Some(name) => name.to_string(),
                None => path
                    .rsplit(['/', '\\'])
                    .find(|segment| !segment.is_empty())
                    .unwrap_or(path)
                    .to_string(),
            };
            headers.insert(
                CONTENT_DISPOSITION,
                header_value(&content_disposition(disposition, &filename))?,
            );
        }

        debug!(disk = %self.name(), path, disposition = disposition.as_str(), "Streaming file");
        let stream = self.operator().read_stream(path).await?;
        let mut response = Response::new(Body::from_stream(stream));
        *response.headers_mut() = headers;
        Ok(response)
    }

    /// Serve `path` as an attachment download.
    pub async fn download(
        &self,
        path: &str,
        name: Option<&str>,
        headers: HeaderMap,
    ) -> Result<Response<Body>> {
        self.response(path, name, headers, Disposition::Attachment)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use stowage_common::DiskConfig;
    use stowage_storage::MemoryAdapter;

    fn disk() -> Disk {
        Disk::new("web", DiskConfig::new(), Arc::new(MemoryAdapter::new()), false).unwrap()
    }

    #[test]
    fn test_fallback_name() {
        assert_eq!(fallback_name("report.pdf"), "report.pdf");
        assert_eq!(fallback_name("é"), "195169");
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition(Disposition::Inline, "a.txt"),
            "inline; filename=\"a.txt\""
        );
        assert_eq!(
            content_disposition(Disposition::Attachment, "résumé.pdf"),
            "attachment; filename=\"11419516911511710919516946112100102\"; \
             filename*=utf-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    #[tokio::test]
    async fn test_response_headers_and_body() {
        let disk = disk();
        disk.put("docs/page.html", "<h1>hi</h1>").await.unwrap();

        let response = disk
            .response("docs/page.html", None, HeaderMap::new(), Disposition::Inline)
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], "text/html");
        assert_eq!(headers[CONTENT_LENGTH], "11");
        assert_eq!(headers[CONTENT_DISPOSITION], "inline; filename=\"page.html\"");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "<h1>hi</h1>");
    }

    #[tokio::test]
    async fn test_download_respects_caller_headers() {
        let disk = disk();
        disk.put("data.bin", vec![1u8, 2, 3]).await.unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-custom"));
        let response = disk
            .download("data.bin", Some("export.bin"), headers)
            .await
            .unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "application/x-custom");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"export.bin\""
        );
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let err = disk()
            .response("nope.txt", None, HeaderMap::new(), Disposition::Inline)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
