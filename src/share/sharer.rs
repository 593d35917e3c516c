use crate::config::ShareConfig;
use crate::error::ShareError;
use crate::frame::CapturedImage;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

/// A photo ready to leave the application
#[derive(Debug, Clone)]
pub struct SharedFile {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Platform share facility
#[async_trait]
pub trait ShareTarget: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this target accepts the file at all
    fn can_share(&self, file: &SharedFile) -> bool;

    async fn share(&self, file: &SharedFile) -> Result<(), ShareError>;
}

/// Hands the staged photo to an external command (`xdg-open`, a messenger CLI, ...)
pub struct CommandShareTarget {
    program: String,
    args: Vec<String>,
    staging_dir: PathBuf,
}

impl CommandShareTarget {
    /// `command` is split on whitespace; the photo path is appended as the last argument
    pub fn new(command: &str, staging_dir: impl Into<PathBuf>) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;

        Some(Self {
            program,
            args: parts.collect(),
            staging_dir: staging_dir.into(),
        })
    }
}

#[async_trait]
impl ShareTarget for CommandShareTarget {
    fn name(&self) -> &str {
        &self.program
    }

    fn can_share(&self, file: &SharedFile) -> bool {
        file.mime_type.starts_with("image/")
    }

    async fn share(&self, file: &SharedFile) -> Result<(), ShareError> {
        let path = write_file(&self.staging_dir, file).await?;

        debug!("Running share command {} {:?} {}", self.program, self.args, path.display());
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .status()
            .await
            .map_err(|e| ShareError::Command {
                details: format!("failed to run {}: {}", self.program, e),
            })?;

        if !status.success() {
            return Err(ShareError::Command {
                details: format!("{} exited with {}", self.program, status),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShareOutcome {
    Shared { target: String, filename: String },
    Downloaded { path: PathBuf },
}

impl ShareOutcome {
    pub fn destination(&self) -> String {
        match self {
            ShareOutcome::Shared { target, filename } => format!("{} ({})", target, filename),
            ShareOutcome::Downloaded { path } => path.display().to_string(),
        }
    }
}

/// Shares a captured photo, falling back to a plain download when no share
/// target is available or it does not accept the file
pub struct PhotoSharer {
    target: Option<Arc<dyn ShareTarget>>,
    download_dir: PathBuf,
}

impl PhotoSharer {
    pub fn new(download_dir: impl Into<PathBuf>, target: Option<Arc<dyn ShareTarget>>) -> Self {
        Self {
            target,
            download_dir: download_dir.into(),
        }
    }

    pub fn from_config(config: &ShareConfig) -> Self {
        let target = config
            .share_command
            .as_deref()
            .and_then(|command| {
                CommandShareTarget::new(command, std::env::temp_dir().join("plantcam-share"))
            })
            .map(|target| Arc::new(target) as Arc<dyn ShareTarget>);

        Self::new(&config.download_dir, target)
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub async fn share(&self, image: &CapturedImage) -> Result<ShareOutcome, ShareError> {
        self.share_at(image, Utc::now()).await
    }

    /// Share with an explicit timestamp for the filename
    pub async fn share_at(
        &self,
        image: &CapturedImage,
        at: DateTime<Utc>,
    ) -> Result<ShareOutcome, ShareError> {
        let bytes = image.jpeg_bytes().map_err(|e| ShareError::Decode {
            details: e.to_string(),
        })?;
        let file = SharedFile {
            filename: photo_filename(at),
            mime_type: image.mime_type(),
            bytes,
        };

        if let Some(target) = self.target.as_ref().filter(|t| t.can_share(&file)) {
            target.share(&file).await?;
            info!("Shared {} via {}", file.filename, target.name());
            return Ok(ShareOutcome::Shared {
                target: target.name().to_string(),
                filename: file.filename,
            });
        }

        let path = write_file(&self.download_dir, &file).await?;
        info!("Downloaded photo to {}", path.display());
        Ok(ShareOutcome::Downloaded { path })
    }
}

/// `photo-<ISO-8601>.jpg` with millisecond precision in UTC
pub fn photo_filename(at: DateTime<Utc>) -> String {
    format!(
        "photo-{}.jpg",
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

async fn write_file(dir: &Path, file: &SharedFile) -> Result<PathBuf, ShareError> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(&file.filename);
    fs::write(&path, &file.bytes).await?;
    debug!("Wrote {} bytes to {}", file.bytes.len(), path.display());
    Ok(path)
}
