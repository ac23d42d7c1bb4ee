use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::stream::{ByteStream, DownloadStream, FormDataStream};
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::config::ProviderConfig;
use crate::error::{ErrorKind, ProviderError, Result};

/// Page size requested from folder listings
const PAGE_SIZE: usize = 1000;

/// Thin wrapper over the Box REST endpoints.
///
/// Every call is checked against an allow-list of statuses; a mismatch
/// becomes the error named by [`ErrorKind`], annotated with the virtual
/// path the caller asked for.
pub struct BoxClient {
    transport: Arc<dyn Transport>,
    config: Arc<ProviderConfig>,
}

impl BoxClient {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<ProviderConfig>) -> Self {
        BoxClient { transport, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// API url for the given path segments
    pub fn build_url(&self, segments: &[&str]) -> String {
        join_url(&self.config.settings.api_url, segments)
    }

    /// Upload url for the given path segments
    pub fn build_upload_url(&self, segments: &[&str]) -> String {
        join_url(&self.config.settings.upload_url, segments)
    }

    /// Send a request with the default headers and check its status
    pub async fn make_request(
        &self,
        request: ApiRequest,
        expects: &[u16],
        throws: ErrorKind,
        path: &str,
    ) -> Result<ApiResponse> {
        let request = request.header("Authorization", format!("Bearer {}", self.config.token()));
        let method = request.method.clone();
        let url = request.url.clone();

        let response = self
            .transport
            .send(request)
            .await
            .map_err(ProviderError::Transport)?;
        debug!(%method, %url, status = response.status, "box request");

        if !expects.contains(&response.status) {
            let code = response.status;
            let body = response.text().await;
            warn!(%method, %url, code, ?expects, "unexpected status");
            return Err(throws.into_error(path, code, body));
        }

        Ok(response)
    }

    /// Every entry of a folder, following pagination
    pub async fn list_folder(&self, folder_id: &str, path: &str) -> Result<Vec<Value>> {
        let url = self.build_url(&["folders", folder_id, "items"]);
        let mut entries: Vec<Value> = Vec::new();

        loop {
            let request = ApiRequest::new(Method::GET, url.as_str())
                .query("limit", PAGE_SIZE)
                .query("offset", entries.len());
            let data = self
                .make_request(request, &[200], ErrorKind::Metadata, path)
                .await?
                .json()
                .await?;

            let page = data
                .get("entries")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ProviderError::MalformedRecord(format!("folder {folder_id} listing without entries"))
                })?;
            let fetched = page.len();
            entries.extend(page.iter().cloned());

            match data.get("total_count").and_then(Value::as_u64) {
                Some(total) if fetched > 0 && (entries.len() as u64) < total => continue,
                _ => break,
            }
        }

        Ok(entries)
    }

    /// Full record of a single file
    pub async fn get_file(&self, file_id: &str, path: &str) -> Result<Value> {
        let url = self.build_url(&["files", file_id]);
        let data = self
            .make_request(ApiRequest::new(Method::GET, url), &[200], ErrorKind::Metadata, path)
            .await?
            .json()
            .await?;

        match &data {
            Value::Null => Err(ProviderError::not_found(path, "Unable to find file.")),
            Value::Object(map) if map.is_empty() => {
                Err(ProviderError::not_found(path, "Unable to find file."))
            }
            _ => Ok(data),
        }
    }

    /// Stream a file's content, optionally at a specific version
    pub async fn download(
        &self,
        file_id: &str,
        version: Option<&str>,
        path: &str,
    ) -> Result<DownloadStream> {
        let mut request = ApiRequest::new(Method::GET, self.build_url(&["files", file_id, "content"]));
        if let Some(version) = version {
            request = request.query("version", version);
        }

        let response = self
            .make_request(request, &[200], ErrorKind::Download, path)
            .await?;
        Ok(DownloadStream::new(response.body, response.content_length))
    }

    /// Create a file in `parent_id`, or upload a new version of `file_id`.
    /// Returns the response's `entries[0]`.
    pub async fn upload(
        &self,
        name: &str,
        parent_id: &str,
        file_id: Option<&str>,
        content: ByteStream,
        path: &str,
    ) -> Result<Value> {
        let url = match file_id {
            Some(id) => self.build_upload_url(&["files", id, "content"]),
            None => self.build_upload_url(&["files", "content"]),
        };
        let form = FormDataStream::new(name, parent_id, content);
        let request = ApiRequest::new(Method::POST, url).multipart(form);

        let data = self
            .make_request(request, &[200, 201], ErrorKind::Upload, path)
            .await?
            .json()
            .await?;

        data.get("entries")
            .and_then(Value::as_array)
            .and_then(|entries| entries.first())
            .cloned()
            .ok_or_else(|| ProviderError::MalformedRecord("upload response without entries".into()))
    }

    pub async fn delete_file(&self, file_id: &str, path: &str) -> Result<()> {
        let url = self.build_url(&["files", file_id]);
        self.make_request(ApiRequest::new(Method::DELETE, url), &[204], ErrorKind::Delete, path)
            .await?;
        Ok(())
    }

    /// Historical versions of a file (excludes the current content)
    pub async fn list_versions(&self, file_id: &str, path: &str) -> Result<Vec<Value>> {
        let url = self.build_url(&["files", file_id, "versions"]);
        let data = self
            .make_request(ApiRequest::new(Method::GET, url), &[200], ErrorKind::Revisions, path)
            .await?
            .json()
            .await?;

        Ok(data
            .get("entries")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(segment.trim_matches('/'));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stream;
    use crate::api::transport::mock::MockTransport;
    use crate::config::{Credentials, Settings};
    use serde_json::json;

    fn client(transport: Arc<MockTransport>) -> BoxClient {
        let config = ProviderConfig::new(
            Credentials {
                token: "t0k3n".into(),
            },
            Settings::new("0"),
        );
        BoxClient::new(transport, Arc::new(config))
    }

    #[test]
    fn test_build_urls() {
        let client = client(Arc::new(MockTransport::new()));
        assert_eq!(
            client.build_url(&["folders", "0", "items"]),
            "https://api.box.com/2.0/folders/0/items"
        );
        assert_eq!(
            client.build_upload_url(&["files", "42", "content"]),
            "https://upload.box.com/api/2.0/files/42/content"
        );
    }

    #[tokio::test]
    async fn test_sends_bearer_token() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, json!({"entries": []}));

        let entries = client(transport.clone()).list_folder("0", "/").await.unwrap();
        assert!(entries.is_empty());

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(
            requests[0]
                .headers
                .contains(&("Authorization".to_string(), "Bearer t0k3n".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unexpected_status_maps_to_kind() {
        let transport = Arc::new(MockTransport::new());
        transport.push_raw(403, b"forbidden".to_vec());

        let err = client(transport).delete_file("42", "/docs/a.txt").await.unwrap_err();
        match err {
            ProviderError::Delete { path, code, body } => {
                assert_eq!(path, "/docs/a.txt");
                assert_eq!(code, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_listing_follows_pages() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            200,
            json!({"total_count": 3, "entries": [{"id": "1"}, {"id": "2"}]}),
        );
        transport.push_json(200, json!({"total_count": 3, "entries": [{"id": "3"}]}));

        let entries = client(transport.clone()).list_folder("0", "/").await.unwrap();
        assert_eq!(entries.len(), 3);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].query.contains(&("offset".to_string(), "2".to_string())));
    }

    #[tokio::test]
    async fn test_empty_file_record_is_not_found() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, json!({}));

        let err = client(transport).get_file("42", "/a.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_download_with_version() {
        let transport = Arc::new(MockTransport::new());
        transport.push_raw(200, b"old content".to_vec());

        let body = client(transport.clone())
            .download("42", Some("9"), "/a.txt")
            .await
            .unwrap();
        assert_eq!(&body.collect_bytes().await.unwrap()[..], b"old content");
        assert_eq!(
            transport.requests()[0].query,
            vec![("version".to_string(), "9".to_string())]
        );
    }

    #[tokio::test]
    async fn test_upload_returns_first_entry() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(201, json!({"entries": [{"type": "file", "id": "42", "name": "a.txt"}]}));

        let entry = client(transport.clone())
            .upload("a.txt", "0", None, stream::once("hi"), "/a.txt")
            .await
            .unwrap();
        assert_eq!(entry["id"], "42");

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://upload.box.com/api/2.0/files/content");
        assert!(request.attributes.as_deref().unwrap().contains("\"a.txt\""));
    }
}
