fn main() {
    println!("Run `cargo test -p scenarios` to execute the end-to-end upload scenarios.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{Read, Seek, SeekFrom};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use camvault_cloud::{ApiError, ApiFuture, CloudApi, PieceUpload};
    use camvault_notifier::{Notification, NotificationSink, NotifyFuture};
    use camvault_protocol::{
        CreateRequest, CreateResponse, Credentials, PieceUploadResponse, PrecreateRequest,
        PrecreateResponse, QuotaResponse,
    };
    use camvault_transfer::{PlanConfig, checksum_bytes};
    use camvault_uploader::{
        RetryPolicy, SegmentUploader, StaticCredentials, UploaderConfig,
    };
    use camvault_watcher::{SegmentFilter, UploadQueueWatcher, UploadSummary};
    use tokio_util::sync::CancellationToken;

    const SEGMENT: &str = "cam_20260101_120000.mp4";

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Decodes a recorded service response.
    fn load_fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Remote service double answering from fixtures.
    ///
    /// Piece transfers read the real byte range and echo its MD5, like the
    /// service does.
    struct ScriptedCloud {
        quota: &'static str,
        precreate: &'static str,
        fail_piece_once: Mutex<Option<usize>>,
        precreates: Mutex<Vec<PrecreateRequest>>,
        pieces: Mutex<Vec<(usize, String)>>,
        creates: Mutex<Vec<CreateRequest>>,
    }

    impl ScriptedCloud {
        fn new(quota: &'static str, precreate: &'static str) -> Self {
            Self {
                quota,
                precreate,
                fail_piece_once: Mutex::new(None),
                precreates: Mutex::new(Vec::new()),
                pieces: Mutex::new(Vec::new()),
                creates: Mutex::new(Vec::new()),
            }
        }

        fn remote_calls(&self) -> usize {
            self.precreates.lock().unwrap().len()
                + self.pieces.lock().unwrap().len()
                + self.creates.lock().unwrap().len()
        }
    }

    fn read_range(path: &Path, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
        let mut file = fs::File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    impl CloudApi for ScriptedCloud {
        fn quota<'a>(&'a self, _creds: &'a Credentials) -> ApiFuture<'a, QuotaResponse> {
            let resp: QuotaResponse = load_fixture(self.quota);
            Box::pin(async move { Ok(resp) })
        }

        fn precreate<'a>(
            &'a self,
            _creds: &'a Credentials,
            req: &'a PrecreateRequest,
        ) -> ApiFuture<'a, PrecreateResponse> {
            self.precreates.lock().unwrap().push(req.clone());
            let resp: PrecreateResponse = load_fixture(self.precreate);
            Box::pin(async move { Ok(resp) })
        }

        fn upload_piece<'a>(
            &'a self,
            _creds: &'a Credentials,
            piece: &'a PieceUpload,
        ) -> ApiFuture<'a, PieceUploadResponse> {
            let fail = {
                let mut once = self.fail_piece_once.lock().unwrap();
                if *once == Some(piece.partseq) {
                    *once = None;
                    true
                } else {
                    false
                }
            };
            let result = if fail {
                Err(ApiError::Status {
                    status: 503,
                    body: String::new(),
                })
            } else {
                read_range(&piece.source, piece.offset, piece.len)
                    .map(|bytes| {
                        let md5 = checksum_bytes(&bytes);
                        self.pieces.lock().unwrap().push((piece.partseq, md5.clone()));
                        PieceUploadResponse {
                            md5,
                            ..Default::default()
                        }
                    })
                    .map_err(ApiError::from)
            };
            Box::pin(async move { result })
        }

        fn create<'a>(
            &'a self,
            _creds: &'a Credentials,
            req: &'a CreateRequest,
        ) -> ApiFuture<'a, CreateResponse> {
            self.creates.lock().unwrap().push(req.clone());
            let resp: CreateResponse = load_fixture("create_ok.json");
            Box::pin(async move { Ok(resp) })
        }

        fn landing_page<'a>(&'a self, _creds: &'a Credentials) -> ApiFuture<'a, String> {
            Box::pin(async { Ok(String::new()) })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<Notification>>,
    }

    impl NotificationSink for RecordingSink {
        fn notify<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a> {
            self.sent.lock().unwrap().push(notification.clone());
            Box::pin(async { Ok(()) })
        }
    }

    struct Harness {
        _tmp: tempfile::TempDir,
        dir: PathBuf,
        cloud: Arc<ScriptedCloud>,
        sink: Arc<RecordingSink>,
        watcher: UploadQueueWatcher,
    }

    /// Scaled-down thresholds keep fixtures small; the split arithmetic is
    /// the same as with the 2 GiB / 120 MiB defaults.
    fn harness(cloud: ScriptedCloud, plan: PlanConfig) -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let cloud = Arc::new(cloud);
        let sink = Arc::new(RecordingSink::default());

        let uploader = SegmentUploader::new(
            cloud.clone(),
            Arc::new(StaticCredentials::new(
                Credentials::new("js-token", "BDUSS=session").with_secondary("bds-token"),
            )),
            UploaderConfig::new("/recordings").with_plan(plan),
        )
        .with_retry_policy(RetryPolicy::new(
            3,
            Duration::from_millis(10),
            Duration::from_millis(5),
        ));

        let watcher = UploadQueueWatcher::new(
            dir.clone(),
            SegmentFilter::new(Some("mp4")),
            Arc::new(uploader),
            sink.clone(),
        );
        Harness {
            _tmp: tmp,
            dir,
            cloud,
            sink,
            watcher,
        }
    }

    fn segment_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn scenario_a_single_piece_upload_removes_file() {
        let h = harness(
            ScriptedCloud::new("quota_ok.json", "precreate_ok.json"),
            PlanConfig::new(2048, 120),
        );
        let data = segment_bytes(500);
        fs::write(h.dir.join(SEGMENT), &data).unwrap();

        let summary = h.watcher.run_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary, UploadSummary { succeeded: 1, failed: 0 });
        assert!(!h.dir.join(SEGMENT).exists());

        let precreates = h.cloud.precreates.lock().unwrap();
        assert_eq!(precreates.len(), 1);
        assert_eq!(precreates[0].block_list, vec![checksum_bytes(&data)]);
        assert_eq!(precreates[0].path, format!("/recordings/{SEGMENT}"));

        let pieces = h.cloud.pieces.lock().unwrap();
        assert_eq!(pieces.len(), 1);
        let creates = h.cloud.creates.lock().unwrap();
        assert_eq!(creates.len(), 1);
        assert_eq!(
            creates[0].uploadid,
            "N1-MTI3LjAuMC4xOjE3MzU3MzI4MDA6ODg5MjE3NjU0MTIzNDU2Nzg5"
        );
        assert!(h.sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn scenario_b_split_upload_sends_43_pieces_in_order() {
        let h = harness(
            ScriptedCloud::new("quota_ok.json", "precreate_ok.json"),
            PlanConfig::new(2048, 120),
        );
        // 5 * 1024 / 120 = 42.67 -> 43 pieces, the last one 80 bytes.
        let data = segment_bytes(5 * 1024);
        fs::write(h.dir.join(SEGMENT), &data).unwrap();

        let summary = h.watcher.run_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(summary, UploadSummary { succeeded: 1, failed: 0 });

        let pieces = h.cloud.pieces.lock().unwrap();
        let order: Vec<usize> = pieces.iter().map(|(seq, _)| *seq).collect();
        assert_eq!(order, (0..43).collect::<Vec<_>>());

        let creates = h.cloud.creates.lock().unwrap();
        let echoed: Vec<String> = pieces.iter().map(|(_, md5)| md5.clone()).collect();
        assert_eq!(creates[0].block_list.len(), 43);
        assert_eq!(creates[0].block_list, echoed);
        assert_eq!(creates[0].size, 5 * 1024);

        let last = &data[42 * 120..];
        assert_eq!(last.len(), 80);
        assert_eq!(creates[0].block_list[42], checksum_bytes(last));
        assert!(!h.dir.join(SEGMENT).exists());
    }

    #[tokio::test]
    async fn scenario_c_rejected_precreate_notifies_once_and_keeps_file() {
        let h = harness(
            ScriptedCloud::new("quota_ok.json", "precreate_need_verify.json"),
            PlanConfig::new(2048, 120),
        );
        fs::write(h.dir.join(SEGMENT), segment_bytes(500)).unwrap();

        let summary = h.watcher.run_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary, UploadSummary { succeeded: 0, failed: 1 });
        assert!(h.dir.join(SEGMENT).exists());
        assert!(h.cloud.pieces.lock().unwrap().is_empty());
        assert!(h.cloud.creates.lock().unwrap().is_empty());

        let sent = h.sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("4000023"));
        assert!(sent[0].body.contains("500 bytes"));
        assert!(sent[0].body.contains("/recordings"));
    }

    #[tokio::test]
    async fn scenario_d_insufficient_quota_makes_no_upload_calls() {
        let h = harness(
            ScriptedCloud::new("quota_full.json", "precreate_ok.json"),
            PlanConfig::new(2048, 120),
        );
        fs::write(h.dir.join(SEGMENT), segment_bytes(500)).unwrap();

        let summary = h.watcher.run_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary, UploadSummary { succeeded: 0, failed: 1 });
        assert_eq!(h.cloud.remote_calls(), 0);
        assert!(h.dir.join(SEGMENT).exists());

        let sent = h.sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("quota_denied"));
    }

    #[tokio::test]
    async fn rapid_upload_removes_file_without_transfer() {
        let h = harness(
            ScriptedCloud::new("quota_ok.json", "precreate_rapid.json"),
            PlanConfig::new(2048, 120),
        );
        fs::write(h.dir.join(SEGMENT), segment_bytes(500)).unwrap();

        let summary = h.watcher.run_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary, UploadSummary { succeeded: 1, failed: 0 });
        assert!(!h.dir.join(SEGMENT).exists());
        assert!(h.cloud.pieces.lock().unwrap().is_empty());
        assert!(h.cloud.creates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transient_piece_failure_is_retried_transparently() {
        let cloud = ScriptedCloud::new("quota_ok.json", "precreate_ok.json");
        *cloud.fail_piece_once.lock().unwrap() = Some(2);
        let h = harness(cloud, PlanConfig::new(256, 100));
        fs::write(h.dir.join(SEGMENT), segment_bytes(450)).unwrap();

        let summary = h.watcher.run_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary, UploadSummary { succeeded: 1, failed: 0 });
        let order: Vec<usize> = h.cloud.pieces.lock().unwrap().iter().map(|(s, _)| *s).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert!(h.sink.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn fixtures_decode_to_expected_outcomes() {
        let ok: PrecreateResponse = load_fixture("precreate_ok.json");
        assert!(!ok.uploadid.is_empty());
        assert!(!ok.is_rapid_upload());

        let rapid: PrecreateResponse = load_fixture("precreate_rapid.json");
        assert!(rapid.is_rapid_upload());

        let rejected: PrecreateResponse = load_fixture("precreate_need_verify.json");
        assert_eq!(rejected.errno, 4000023);
        assert_eq!(rejected.errmsg, "need verify");

        let create: CreateResponse = load_fixture("create_ok.json");
        assert!(create.is_success());

        let quota: QuotaResponse = load_fixture("quota_full.json");
        assert_eq!(quota.total.unwrap() - quota.used.unwrap(), 100);
    }
}
