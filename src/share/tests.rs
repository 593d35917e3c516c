use super::*;
use crate::error::ShareError;
use crate::frame::CapturedImage;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

const JPEG: [u8; 8] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

fn test_image() -> CapturedImage {
    CapturedImage::from_jpeg(&JPEG, 2, 2, Utc::now())
}

/// Share target recording what it was handed
struct RecordingTarget {
    accepts: bool,
    fails: bool,
    shared: Mutex<Vec<SharedFile>>,
}

impl RecordingTarget {
    fn new(accepts: bool, fails: bool) -> Arc<Self> {
        Arc::new(Self {
            accepts,
            fails,
            shared: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ShareTarget for RecordingTarget {
    fn name(&self) -> &str {
        "recording"
    }

    fn can_share(&self, _file: &SharedFile) -> bool {
        self.accepts
    }

    async fn share(&self, file: &SharedFile) -> Result<(), ShareError> {
        if self.fails {
            return Err(ShareError::Command {
                details: "share sheet dismissed".to_string(),
            });
        }
        self.shared.lock().push(file.clone());
        Ok(())
    }
}

#[test]
fn test_photo_filename_is_iso_timestamped() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).unwrap();
    assert_eq!(photo_filename(at), "photo-2024-05-01T10:20:30.000Z.jpg");
}

#[tokio::test]
async fn test_download_when_no_share_target() {
    let dir = tempfile::tempdir().unwrap();
    let sharer = PhotoSharer::new(dir.path().join("photos"), None);
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).unwrap();

    let outcome = sharer.share_at(&test_image(), at).await.unwrap();

    let expected = dir.path().join("photos").join("photo-2024-05-01T10:20:30.000Z.jpg");
    assert_eq!(
        outcome,
        ShareOutcome::Downloaded {
            path: expected.clone()
        }
    );
    assert_eq!(std::fs::read(expected).unwrap(), JPEG.to_vec());
}

#[tokio::test]
async fn test_native_share_preferred_when_supported() {
    let dir = tempfile::tempdir().unwrap();
    let target = RecordingTarget::new(true, false);
    let sharer = PhotoSharer::new(dir.path(), Some(target.clone() as Arc<dyn ShareTarget>));

    let outcome = sharer.share(&test_image()).await.unwrap();

    match outcome {
        ShareOutcome::Shared { target: name, filename } => {
            assert_eq!(name, "recording");
            assert!(filename.starts_with("photo-"));
            assert!(filename.ends_with(".jpg"));
        }
        other => panic!("Expected native share, got {:?}", other),
    }

    let shared = target.shared.lock();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].mime_type, "image/jpeg");
    assert_eq!(shared[0].bytes, JPEG.to_vec());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_falls_back_to_download_when_target_declines() {
    let dir = tempfile::tempdir().unwrap();
    let target = RecordingTarget::new(false, false);
    let sharer = PhotoSharer::new(dir.path(), Some(target.clone() as Arc<dyn ShareTarget>));

    let outcome = sharer.share(&test_image()).await.unwrap();

    assert!(matches!(outcome, ShareOutcome::Downloaded { .. }));
    assert!(target.shared.lock().is_empty());
}

#[tokio::test]
async fn test_share_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let target = RecordingTarget::new(true, true);
    let sharer = PhotoSharer::new(dir.path(), Some(target as Arc<dyn ShareTarget>));

    let result = sharer.share(&test_image()).await;
    assert!(matches!(result, Err(ShareError::Command { .. })));
}

#[test]
fn test_empty_share_command_is_ignored() {
    assert!(CommandShareTarget::new("   ", "/tmp").is_none());
    assert!(CommandShareTarget::new("xdg-open", "/tmp").is_some());
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_share_target() {
    let dir = tempfile::tempdir().unwrap();
    let file = SharedFile {
        filename: "photo-test.jpg".to_string(),
        mime_type: "image/jpeg",
        bytes: JPEG.to_vec(),
    };

    let ok = CommandShareTarget::new("true", dir.path()).unwrap();
    assert!(ok.can_share(&file));
    ok.share(&file).await.unwrap();
    assert!(dir.path().join("photo-test.jpg").exists());

    let failing = CommandShareTarget::new("false", dir.path()).unwrap();
    assert!(matches!(
        failing.share(&file).await,
        Err(ShareError::Command { .. })
    ));
}
