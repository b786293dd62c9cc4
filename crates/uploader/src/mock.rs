//! Scriptable [`CloudApi`] double shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use camvault_cloud::{ApiError, ApiFuture, CloudApi, PieceUpload};
use camvault_protocol::{
    CreateRequest, CreateResponse, Credentials, PieceUploadResponse, PrecreateRequest,
    PrecreateResponse, QuotaResponse,
};

/// A recorded remote call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Quota,
    Precreate(PrecreateRequest),
    Piece { upload_id: String, partseq: usize, offset: u64, len: u64 },
    Create(CreateRequest),
    Landing,
}

/// Scripted reply: a decoded body, or a remote code carried by an error
/// response.
pub(crate) enum Reply<T> {
    Body(T),
    Remote(i64, String),
}

impl<T> Reply<T> {
    fn into_result(self) -> Result<T, ApiError> {
        match self {
            Reply::Body(body) => Ok(body),
            Reply::Remote(errno, message) => Err(ApiError::Remote { errno, message }),
        }
    }
}

/// Records every call and replies from scripted queues, falling back to
/// a successful default when a queue is empty.
pub(crate) struct MockCloud {
    quota: Mutex<Option<QuotaResponse>>,
    precreate: Mutex<VecDeque<Reply<PrecreateResponse>>>,
    create: Mutex<VecDeque<Reply<CreateResponse>>>,
    /// partseq -> number of empty-hash replies before a good one.
    flaky_pieces: Mutex<HashMap<usize, u32>>,
    landing_page: Mutex<Option<String>>,
    calls: Mutex<Vec<Call>>,
    credentials_seen: Mutex<Vec<Credentials>>,
}

impl MockCloud {
    pub fn new() -> Self {
        Self {
            quota: Mutex::new(Some(QuotaResponse {
                errno: 0,
                total: Some(u64::MAX / 2),
                used: Some(0),
                vip_type: Some(1),
            })),
            precreate: Mutex::new(VecDeque::new()),
            create: Mutex::new(VecDeque::new()),
            flaky_pieces: Mutex::new(HashMap::new()),
            landing_page: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            credentials_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn set_quota(&self, total: u64, used: u64, vip_type: Option<i32>) {
        *self.quota.lock().unwrap() = Some(QuotaResponse {
            errno: 0,
            total: Some(total),
            used: Some(used),
            vip_type,
        });
    }

    pub fn fail_quota(&self) {
        *self.quota.lock().unwrap() = None;
    }

    pub fn push_precreate(&self, resp: PrecreateResponse) {
        self.precreate.lock().unwrap().push_back(Reply::Body(resp));
    }

    /// Precreate answers with a non-2xx response carrying `errno`.
    pub fn push_precreate_remote(&self, errno: i64, msg: &str) {
        self.precreate
            .lock()
            .unwrap()
            .push_back(Reply::Remote(errno, msg.into()));
    }

    pub fn push_precreate_errno(&self, errno: i64, msg: &str) {
        self.push_precreate(PrecreateResponse {
            errno,
            errmsg: msg.into(),
            ..Default::default()
        });
    }

    pub fn push_rapid_upload(&self) {
        self.push_precreate(PrecreateResponse {
            errno: 0,
            return_type: 2,
            ..Default::default()
        });
    }

    pub fn push_create_errno(&self, errno: i64, msg: &str) {
        self.create.lock().unwrap().push_back(Reply::Body(CreateResponse {
            errno,
            errmsg: msg.into(),
            ..Default::default()
        }));
    }

    /// Create answers with a non-2xx response carrying `errno`.
    pub fn push_create_remote(&self, errno: i64, msg: &str) {
        self.create
            .lock()
            .unwrap()
            .push_back(Reply::Remote(errno, msg.into()));
    }

    /// Piece `partseq` answers with an empty hash `times` times.
    pub fn flaky_piece(&self, partseq: usize, times: u32) {
        self.flaky_pieces.lock().unwrap().insert(partseq, times);
    }

    pub fn set_landing_page(&self, page: &str) {
        *self.landing_page.lock().unwrap() = Some(page.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn credentials_seen(&self) -> Vec<Credentials> {
        self.credentials_seen.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn quota_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Quota))
    }

    pub fn precreate_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Precreate(_)))
    }

    pub fn piece_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Piece { .. }))
    }

    pub fn create_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Create(_)))
    }

    pub fn landing_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Landing))
    }

    /// Partseqs in the order they were sent, including retries.
    pub fn piece_order(&self) -> Vec<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Piece { partseq, .. } => Some(*partseq),
                _ => None,
            })
            .collect()
    }

    pub fn last_create(&self) -> Option<CreateRequest> {
        self.calls.lock().unwrap().iter().rev().find_map(|c| match c {
            Call::Create(req) => Some(req.clone()),
            _ => None,
        })
    }

    fn record(&self, call: Call, creds: &Credentials) {
        self.calls.lock().unwrap().push(call);
        self.credentials_seen.lock().unwrap().push(creds.clone());
    }
}

/// Hash the mock echoes for a piece.
pub(crate) fn remote_md5(partseq: usize) -> String {
    format!("{partseq:032x}")
}

impl CloudApi for MockCloud {
    fn quota<'a>(&'a self, creds: &'a Credentials) -> ApiFuture<'a, QuotaResponse> {
        self.record(Call::Quota, creds);
        let resp = self.quota.lock().unwrap().clone();
        Box::pin(async move {
            resp.ok_or(ApiError::Status {
                status: 500,
                body: String::new(),
            })
        })
    }

    fn precreate<'a>(
        &'a self,
        creds: &'a Credentials,
        req: &'a PrecreateRequest,
    ) -> ApiFuture<'a, PrecreateResponse> {
        self.record(Call::Precreate(req.clone()), creds);
        let resp = self
            .precreate
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Reply::Body(PrecreateResponse {
                    errno: 0,
                    uploadid: "upload-1".into(),
                    return_type: 1,
                    ..Default::default()
                })
            });
        Box::pin(async move { resp.into_result() })
    }

    fn upload_piece<'a>(
        &'a self,
        creds: &'a Credentials,
        piece: &'a PieceUpload,
    ) -> ApiFuture<'a, PieceUploadResponse> {
        self.record(
            Call::Piece {
                upload_id: piece.upload_id.clone(),
                partseq: piece.partseq,
                offset: piece.offset,
                len: piece.len,
            },
            creds,
        );
        let md5 = {
            let mut flaky = self.flaky_pieces.lock().unwrap();
            match flaky.get_mut(&piece.partseq) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    String::new()
                }
                _ => remote_md5(piece.partseq),
            }
        };
        Box::pin(async move {
            Ok(PieceUploadResponse {
                md5,
                ..Default::default()
            })
        })
    }

    fn create<'a>(
        &'a self,
        creds: &'a Credentials,
        req: &'a CreateRequest,
    ) -> ApiFuture<'a, CreateResponse> {
        self.record(Call::Create(req.clone()), creds);
        let resp = self
            .create
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Reply::Body(CreateResponse {
                    errno: 0,
                    path: req.path.clone(),
                    fs_id: 777,
                    ..Default::default()
                })
            });
        Box::pin(async move { resp.into_result() })
    }

    fn landing_page<'a>(&'a self, creds: &'a Credentials) -> ApiFuture<'a, String> {
        self.record(Call::Landing, creds);
        let page = self.landing_page.lock().unwrap().clone();
        Box::pin(async move {
            page.ok_or(ApiError::Status {
                status: 302,
                body: String::new(),
            })
        })
    }
}
