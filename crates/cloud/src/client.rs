//! HTTP implementation of [`CloudApi`].

use std::io::SeekFrom;
use std::time::Duration;

use reqwest::header::COOKIE;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use camvault_protocol::constants::{
    CREATE_PATH, ERRNO_OK, PIECE_FIELD_NAME, PRECREATE_PATH, QUOTA_PATH, SUPERFILE_PATH,
};
use camvault_protocol::{
    CreateRequest, CreateResponse, Credentials, PieceUploadQuery, PieceUploadResponse,
    PrecreateRequest, PrecreateResponse, QuotaResponse,
};

use crate::api::{ApiFuture, CloudApi, PieceUpload};
use crate::error::ApiError;

const DEFAULT_API_BASE: &str = "https://pan.baidu.com";
const DEFAULT_UPLOAD_BASE: &str = "https://d.pcs.baidu.com";
const DEFAULT_LANDING_URL: &str = "https://pan.baidu.com/disk/home";

/// Base URLs of the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Host serving precreate, create and quota.
    pub api_base: String,
    /// Host serving piece transfers.
    pub upload_base: String,
    /// Page scraped for fresh tokens.
    pub landing_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            landing_url: DEFAULT_LANDING_URL.to_string(),
        }
    }
}

impl Endpoints {
    fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    fn upload(&self, path: &str) -> String {
        format!("{}{}", self.upload_base.trim_end_matches('/'), path)
    }
}

/// Storage service client over `reqwest`.
pub struct HttpCloudClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpCloudClient {
    /// Creates a client with a per-request timeout.
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, endpoints))
    }

    /// Wraps an existing `reqwest` client.
    pub fn with_client(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// Attaches tokens and the session cookie to a request.
    fn authed(&self, builder: reqwest::RequestBuilder, creds: &Credentials) -> reqwest::RequestBuilder {
        builder
            .query(&creds.query_params())
            .header(COOKIE, creds.session_cookie.as_str())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        decode_body(status, &body)
    }

    async fn quota_impl(&self, creds: &Credentials) -> Result<QuotaResponse, ApiError> {
        let req = self.authed(self.http.get(self.endpoints.api(QUOTA_PATH)), creds);
        self.send_json(req).await
    }

    async fn precreate_impl(
        &self,
        creds: &Credentials,
        body: &PrecreateRequest,
    ) -> Result<PrecreateResponse, ApiError> {
        let req = self
            .authed(self.http.post(self.endpoints.api(PRECREATE_PATH)), creds)
            .form(body);
        self.send_json(req).await
    }

    async fn upload_piece_impl(
        &self,
        creds: &Credentials,
        piece: &PieceUpload,
    ) -> Result<PieceUploadResponse, ApiError> {
        let mut file = tokio::fs::File::open(&piece.source).await?;
        file.seek(SeekFrom::Start(piece.offset)).await?;
        let stream = ReaderStream::new(file.take(piece.len));

        let file_name = piece
            .remote_path
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), piece.len)
            .file_name(file_name);
        let form = Form::new().part(PIECE_FIELD_NAME, part);

        tracing::debug!(
            partseq = piece.partseq,
            offset = piece.offset,
            len = piece.len,
            "transferring piece"
        );
        let query = PieceUploadQuery::new(&piece.upload_id, &piece.remote_path, piece.partseq);
        let req = self
            .authed(self.http.post(self.endpoints.upload(SUPERFILE_PATH)), creds)
            .query(&query)
            .multipart(form);

        let resp: PieceUploadResponse = self.send_json(req).await?;
        if resp.error_code != 0 {
            return Err(ApiError::Remote {
                errno: resp.error_code,
                message: resp.error_msg,
            });
        }
        Ok(resp)
    }

    async fn create_impl(
        &self,
        creds: &Credentials,
        body: &CreateRequest,
    ) -> Result<CreateResponse, ApiError> {
        let req = self
            .authed(self.http.post(self.endpoints.api(CREATE_PATH)), creds)
            .form(body);
        self.send_json(req).await
    }

    async fn landing_page_impl(&self, creds: &Credentials) -> Result<String, ApiError> {
        let resp = self
            .http
            .get(&self.endpoints.landing_url)
            .header(COOKIE, creds.session_cookie.as_str())
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl CloudApi for HttpCloudClient {
    fn quota<'a>(&'a self, creds: &'a Credentials) -> ApiFuture<'a, QuotaResponse> {
        Box::pin(self.quota_impl(creds))
    }

    fn precreate<'a>(
        &'a self,
        creds: &'a Credentials,
        req: &'a PrecreateRequest,
    ) -> ApiFuture<'a, PrecreateResponse> {
        Box::pin(self.precreate_impl(creds, req))
    }

    fn upload_piece<'a>(
        &'a self,
        creds: &'a Credentials,
        piece: &'a PieceUpload,
    ) -> ApiFuture<'a, PieceUploadResponse> {
        Box::pin(self.upload_piece_impl(creds, piece))
    }

    fn create<'a>(
        &'a self,
        creds: &'a Credentials,
        req: &'a CreateRequest,
    ) -> ApiFuture<'a, CreateResponse> {
        Box::pin(self.create_impl(creds, req))
    }

    fn landing_page<'a>(&'a self, creds: &'a Credentials) -> ApiFuture<'a, String> {
        Box::pin(self.landing_page_impl(creds))
    }
}

/// Classifies a response body.
///
/// A non-2xx status whose body carries a non-zero `errno` or `error_code`
/// becomes [`ApiError::Remote`], so the code decides retryability. Any
/// other non-2xx status becomes [`ApiError::Status`]; a 2xx body that does
/// not parse as `T` becomes [`ApiError::Decode`].
pub(crate) fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    if !(200..300).contains(&status) {
        return Err(remote_error(body).unwrap_or_else(|| ApiError::Status {
            status,
            body: body.to_string(),
        }));
    }
    serde_json::from_str(body).map_err(|e| ApiError::Decode(format!("{e}: {body}")))
}

fn remote_error(body: &str) -> Option<ApiError> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let errno = ["errno", "error_code"]
        .iter()
        .find_map(|key| value.get(key)?.as_i64())?;
    if errno == ERRNO_OK {
        return None;
    }
    let message = ["errmsg", "show_msg", "error_msg"]
        .iter()
        .find_map(|key| value.get(key)?.as_str())
        .unwrap_or_default()
        .to_string();
    Some(ApiError::Remote { errno, message })
}
