//! Image upload orchestration.
//!
//! # Responsibility
//! - Enforce per-plan upload size ceilings before bytes leave the process.
//! - Track in-flight uploads so one logical edit never uploads twice.
//!
//! # Invariants
//! - A key is in flight from [`MediaService::begin_upload`] until
//!   [`MediaService::complete_upload`], success or failure; a second upload
//!   for an in-flight key is rejected.
//! - Failures surface to the caller; nothing is retried automatically.

use log::{error, info};
use std::cell::RefCell;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MIB: u64 = 1024 * 1024;

/// Upload destination. Implementations wrap whatever bucket or CDN the
/// application ships with.
pub trait ObjectStorage {
    /// Stores `bytes` under `key` and returns the public url.
    fn upload(&mut self, key: &str, bytes: &[u8]) -> Result<String, MediaError>;
}

/// Subscription tier, which caps upload size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTier {
    Basic,
    Pro,
}

impl PlanTier {
    pub fn max_upload_bytes(self) -> u64 {
        match self {
            Self::Basic => 5 * MIB,
            Self::Pro => 20 * MIB,
        }
    }
}

#[derive(Debug)]
pub enum MediaError {
    FileTooLarge { size: u64, limit: u64 },
    UploadInFlight(String),
    Upload(String),
}

impl Display for MediaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileTooLarge { size, limit } => {
                write!(f, "file of {size} bytes exceeds the {limit} byte limit")
            }
            Self::UploadInFlight(key) => write!(f, "upload already in flight for `{key}`"),
            Self::Upload(message) => write!(f, "upload failed: {message}"),
        }
    }
}

impl Error for MediaError {}

/// Upload front door used by the image-paste flow.
pub struct MediaService<O: ObjectStorage> {
    storage: O,
    tier: PlanTier,
    in_flight: HashSet<String>,
}

impl<O: ObjectStorage> MediaService<O> {
    pub fn new(storage: O, tier: PlanTier) -> Self {
        Self {
            storage,
            tier,
            in_flight: HashSet::new(),
        }
    }

    pub fn tier(&self) -> PlanTier {
        self.tier
    }

    /// Registers `key` as in flight, enforcing the plan ceiling and the
    /// one-upload-per-key rule. Callers driving an upload across an await
    /// point hold the registration until [`Self::complete_upload`].
    pub fn begin_upload(&mut self, key: &str, size: u64) -> Result<(), MediaError> {
        let limit = self.tier.max_upload_bytes();
        if size > limit {
            return Err(MediaError::FileTooLarge { size, limit });
        }
        if !self.in_flight.insert(key.to_string()) {
            return Err(MediaError::UploadInFlight(key.to_string()));
        }
        Ok(())
    }

    /// Releases `key`, making it eligible for a fresh upload.
    pub fn complete_upload(&mut self, key: &str) {
        self.in_flight.remove(key);
    }

    /// Uploads one image synchronously: registers the key, hands the bytes
    /// to storage, releases the key. Returns the stored object's url.
    pub fn upload_image(&mut self, key: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let size = bytes.len() as u64;
        self.begin_upload(key, size)?;

        let result = self.storage.upload(key, bytes);
        self.complete_upload(key);
        match &result {
            Ok(url) => info!(
                "event=media_upload module=service status=ok key={key} size={size} url={url}"
            ),
            Err(err) => error!(
                "event=media_upload module=service status=error key={key} size={size} error={err}"
            ),
        }
        result
    }
}

/// Upload seam handed to the editor so dropped image files route through
/// the plan-tier and in-flight checks without the editor owning storage.
pub trait ImageUploader {
    fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, MediaError>;
}

impl<O: ObjectStorage> ImageUploader for RefCell<MediaService<O>> {
    fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, MediaError> {
        self.borrow_mut().upload_image(name, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::{MediaError, MediaService, ObjectStorage, PlanTier};

    struct FakeStorage {
        uploads: usize,
        fail: bool,
    }

    impl ObjectStorage for FakeStorage {
        fn upload(&mut self, key: &str, _bytes: &[u8]) -> Result<String, MediaError> {
            self.uploads += 1;
            if self.fail {
                Err(MediaError::Upload("bucket unavailable".into()))
            } else {
                Ok(format!("https://cdn.test/{key}"))
            }
        }
    }

    #[test]
    fn upload_within_limit_returns_url() {
        let mut service = MediaService::new(
            FakeStorage {
                uploads: 0,
                fail: false,
            },
            PlanTier::Basic,
        );
        let url = service.upload_image("img-1", &[0u8; 64]).expect("upload");
        assert_eq!(url, "https://cdn.test/img-1");
    }

    #[test]
    fn oversized_upload_is_rejected_before_storage() {
        let mut service = MediaService::new(
            FakeStorage {
                uploads: 0,
                fail: false,
            },
            PlanTier::Basic,
        );
        let bytes = vec![0u8; (PlanTier::Basic.max_upload_bytes() + 1) as usize];
        assert!(matches!(
            service.upload_image("img-1", &bytes),
            Err(MediaError::FileTooLarge { .. })
        ));
        assert_eq!(service.storage.uploads, 0);
    }

    #[test]
    fn pro_tier_accepts_what_basic_rejects() {
        let bytes = vec![0u8; (10 * super::MIB) as usize];
        let mut basic = MediaService::new(
            FakeStorage {
                uploads: 0,
                fail: false,
            },
            PlanTier::Basic,
        );
        assert!(basic.upload_image("img-1", &bytes).is_err());

        let mut pro = MediaService::new(
            FakeStorage {
                uploads: 0,
                fail: false,
            },
            PlanTier::Pro,
        );
        assert!(pro.upload_image("img-1", &bytes).is_ok());
    }

    #[test]
    fn second_upload_for_outstanding_key_is_rejected() {
        let mut service = MediaService::new(
            FakeStorage {
                uploads: 0,
                fail: false,
            },
            PlanTier::Basic,
        );
        service.begin_upload("img-1", 8).expect("register");
        assert!(matches!(
            service.upload_image("img-1", &[0u8; 8]),
            Err(MediaError::UploadInFlight(_))
        ));
        // Storage never saw the duplicate.
        assert_eq!(service.storage.uploads, 0);

        service.complete_upload("img-1");
        assert!(service.upload_image("img-1", &[0u8; 8]).is_ok());
    }

    #[test]
    fn failed_upload_clears_the_in_flight_key() {
        let mut service = MediaService::new(
            FakeStorage {
                uploads: 0,
                fail: true,
            },
            PlanTier::Basic,
        );
        assert!(matches!(
            service.upload_image("img-1", &[0u8; 8]),
            Err(MediaError::Upload(_))
        ));
        // The key is free again for a retry initiated by the user.
        service.storage.fail = false;
        assert!(service.upload_image("img-1", &[0u8; 8]).is_ok());
    }
}
