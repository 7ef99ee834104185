//! Export dispatcher.
//!
//! Encodes a composed strip as a JPEG and hands it to a [`Delivery`], the
//! platform's share/download collaborator. Two actions exist:
//!
//! - **Download** ([`ExportDispatcher::download_strip`]): share the file
//!   natively when the platform can, otherwise (or when sharing fails) save it.
//! - **Share** ([`ExportDispatcher::share_strip`]): walk the tiers
//!   file share → link share → clipboard → manual copy, stopping at the first
//!   that works. The last tier cannot fail, so the share action always ends
//!   with something the user can act on.
//!
//! [`DirectoryDelivery`] is the filesystem-backed delivery used by the CLI.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::compose::ComposedStrip;
use crate::config::PhotoStripConfig;
use crate::imaging::{BackendError, ImageBackend, Quality};
use crate::types::FilterMode;

pub const JPEG_MIME: &str = "image/jpeg";

pub const MSG_LINK_COPIED: &str = "Link copied to clipboard! Share it with your friends.";
pub const MSG_SHARE_FAILED_LINK_COPIED: &str = "Sharing failed, but link copied to clipboard!";
pub const MSG_MANUAL_SHARE: &str =
    "Sharing not available on this device. You can manually share this page URL.";

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Not supported by this platform")]
    Unsupported,
    #[error("Cancelled")]
    Cancelled,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Encoding the strip failed: {0}")]
    Encode(#[from] BackendError),
    #[error("Could not deliver {file_name}: {source}")]
    ShareDeliveryFailed {
        file_name: String,
        #[source]
        source: DeliveryError,
    },
}

/// A named blob handed to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFile {
    pub name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Title and text shown by the share sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Platform share/download collaborator.
pub trait Delivery {
    /// Whether the share sheet accepts these files.
    fn can_share_files(&self, files: &[SharedFile]) -> bool;

    fn share_files(&mut self, request: &ShareRequest, files: &[SharedFile])
    -> Result<(), DeliveryError>;

    /// Whether a share sheet exists at all.
    fn can_share(&self) -> bool;

    fn share_link(&mut self, request: &ShareRequest) -> Result<(), DeliveryError>;

    /// Save the file; returns where it ended up.
    fn download(&mut self, file: &SharedFile) -> Result<PathBuf, DeliveryError>;

    fn write_clipboard(&mut self, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "via", rename_all = "kebab-case")]
pub enum DownloadOutcome {
    Shared { file_name: String },
    Downloaded { file_name: String, path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "via", rename_all = "kebab-case")]
pub enum ShareOutcome {
    SharedFile { file_name: String },
    SharedLink { url: String },
    CopiedLink { url: String, after_failure: bool },
    ManualCopy { url: String },
}

impl ShareOutcome {
    /// Alert text for the user, if this tier shows one.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ShareOutcome::SharedFile { .. } | ShareOutcome::SharedLink { .. } => None,
            ShareOutcome::CopiedLink {
                after_failure: false,
                ..
            } => Some(MSG_LINK_COPIED),
            ShareOutcome::CopiedLink {
                after_failure: true,
                ..
            } => Some(MSG_SHARE_FAILED_LINK_COPIED),
            ShareOutcome::ManualCopy { .. } => Some(MSG_MANUAL_SHARE),
        }
    }
}

/// `photo-strip-<filter>-<unix-millis>.jpg`
pub fn download_file_name(filter: FilterMode, timestamp_millis: i64) -> String {
    format!("photo-strip-{filter}-{timestamp_millis}.jpg")
}

/// Encode quality and share texts, from `[export]`.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub quality: Quality,
    pub share_title: String,
    pub share_text: String,
    pub share_file_name: String,
    pub page_url: String,
}

impl ExportSettings {
    pub fn from_config(config: &PhotoStripConfig) -> Self {
        let export = &config.export;
        Self {
            quality: Quality::new(export.quality),
            share_title: export.share_title.clone(),
            share_text: export.share_text.clone(),
            share_file_name: export.share_file_name.clone(),
            page_url: export.page_url.clone(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from_config(&PhotoStripConfig::default())
    }
}

pub struct ExportDispatcher<'a, B: ImageBackend, D: Delivery> {
    backend: &'a B,
    delivery: D,
    settings: ExportSettings,
}

impl<'a, B: ImageBackend, D: Delivery> ExportDispatcher<'a, B, D> {
    pub fn new(backend: &'a B, delivery: D, settings: ExportSettings) -> Self {
        Self {
            backend,
            delivery,
            settings,
        }
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    /// Encode the strip as a JPEG file named `name`.
    pub fn encode(&self, strip: &ComposedStrip, name: String) -> Result<SharedFile, ExportError> {
        let bytes = self.backend.encode_jpeg(&strip.image, self.settings.quality)?;
        debug!(file = %name, bytes = bytes.len(), "strip encoded");
        Ok(SharedFile {
            name,
            mime: JPEG_MIME,
            bytes,
        })
    }

    /// Share the strip as a file if possible, download it otherwise.
    pub fn download_strip(
        &mut self,
        strip: &ComposedStrip,
        timestamp_millis: i64,
    ) -> Result<DownloadOutcome, ExportError> {
        let file = self.encode(strip, download_file_name(strip.filter, timestamp_millis))?;
        let files = std::slice::from_ref(&file);

        if self.delivery.can_share_files(files) {
            let request = ShareRequest {
                title: self.settings.share_title.clone(),
                text: None,
                url: None,
            };
            match self.delivery.share_files(&request, files) {
                Ok(()) => {
                    info!(file = %file.name, "strip shared");
                    return Ok(DownloadOutcome::Shared {
                        file_name: file.name,
                    });
                }
                Err(e) => warn!(error = %e, "sharing failed, falling back to download"),
            }
        }

        match self.delivery.download(&file) {
            Ok(path) => {
                info!(path = %path.display(), "strip downloaded");
                Ok(DownloadOutcome::Downloaded {
                    file_name: file.name,
                    path,
                })
            }
            Err(source) => Err(ExportError::ShareDeliveryFailed {
                file_name: file.name,
                source,
            }),
        }
    }

    /// Share the strip, or failing that a link to the page.
    pub fn share_strip(&mut self, strip: &ComposedStrip) -> Result<ShareOutcome, ExportError> {
        let file = self.encode(strip, self.settings.share_file_name.clone())?;
        let files = std::slice::from_ref(&file);
        let url = self.settings.page_url.clone();
        let mut failed = false;

        if self.delivery.can_share_files(files) {
            let request = self.share_request(None);
            match self.delivery.share_files(&request, files) {
                Ok(()) => {
                    info!(file = %file.name, "strip shared");
                    return Ok(ShareOutcome::SharedFile {
                        file_name: file.name,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "file share failed");
                    failed = true;
                }
            }
        }

        if !failed && self.delivery.can_share() {
            let request = self.share_request(Some(url.clone()));
            match self.delivery.share_link(&request) {
                Ok(()) => {
                    info!(%url, "link shared");
                    return Ok(ShareOutcome::SharedLink { url });
                }
                Err(e) => {
                    warn!(error = %e, "link share failed");
                    failed = true;
                }
            }
        }

        match self.delivery.write_clipboard(&url) {
            Ok(()) => {
                info!(%url, "link copied to clipboard");
                Ok(ShareOutcome::CopiedLink {
                    url,
                    after_failure: failed,
                })
            }
            Err(e) => {
                warn!(error = %e, "clipboard unavailable, leaving link for manual copy");
                Ok(ShareOutcome::ManualCopy { url })
            }
        }
    }

    fn share_request(&self, url: Option<String>) -> ShareRequest {
        ShareRequest {
            title: self.settings.share_title.clone(),
            text: Some(self.settings.share_text.clone()),
            url,
        }
    }
}

// =============================================================================
// Filesystem delivery
// =============================================================================

/// Name of the manifest written next to shared files.
pub const SHARE_MANIFEST: &str = "share.json";

/// Delivery into a local directory.
///
/// Downloads are written straight into the directory. With sharing enabled,
/// shares go to `<dir>/shared/` with a `share.json` describing the request,
/// so another tool can pick them up. There is no clipboard.
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    dir: PathBuf,
    sharing: bool,
}

#[derive(Serialize)]
struct ShareManifest<'a> {
    #[serde(flatten)]
    request: &'a ShareRequest,
    files: Vec<&'a str>,
}

impl DirectoryDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sharing: false,
        }
    }

    pub fn with_sharing(mut self, sharing: bool) -> Self {
        self.sharing = sharing;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn share_dir(&self) -> PathBuf {
        self.dir.join("shared")
    }

    fn write_manifest(&self, request: &ShareRequest, files: &[SharedFile]) -> Result<(), DeliveryError> {
        let dir = self.share_dir();
        fs::create_dir_all(&dir)?;
        let manifest = ShareManifest {
            request,
            files: files.iter().map(|f| f.name.as_str()).collect(),
        };
        fs::write(dir.join(SHARE_MANIFEST), serde_json::to_string_pretty(&manifest)?)?;
        Ok(())
    }
}

impl Delivery for DirectoryDelivery {
    fn can_share_files(&self, files: &[SharedFile]) -> bool {
        self.sharing && files.iter().all(|f| f.mime == JPEG_MIME)
    }

    fn share_files(
        &mut self,
        request: &ShareRequest,
        files: &[SharedFile],
    ) -> Result<(), DeliveryError> {
        if !self.sharing {
            return Err(DeliveryError::Unsupported);
        }
        self.write_manifest(request, files)?;
        let dir = self.share_dir();
        for file in files {
            fs::write(dir.join(&file.name), &file.bytes)?;
        }
        Ok(())
    }

    fn can_share(&self) -> bool {
        self.sharing
    }

    fn share_link(&mut self, request: &ShareRequest) -> Result<(), DeliveryError> {
        if !self.sharing {
            return Err(DeliveryError::Unsupported);
        }
        self.write_manifest(request, &[])
    }

    fn download(&mut self, file: &SharedFile) -> Result<PathBuf, DeliveryError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&file.name);
        fs::write(&path, &file.bytes)?;
        Ok(path)
    }

    fn write_clipboard(&mut self, _text: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::Caption;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use chrono::NaiveDate;
    use image::RgbaImage;
    use tempfile::TempDir;

    /// Scripted platform: each capability can be on, off, or failing.
    #[derive(Default)]
    struct MockDelivery {
        file_share: Capability,
        link_share: Capability,
        clipboard: Capability,
        download_fails: bool,
        calls: Vec<String>,
    }

    #[derive(Default, Clone, Copy, PartialEq)]
    enum Capability {
        #[default]
        Missing,
        Works,
        Fails,
    }

    fn attempt(cap: Capability) -> Result<(), DeliveryError> {
        match cap {
            Capability::Works => Ok(()),
            Capability::Fails => Err(DeliveryError::Cancelled),
            Capability::Missing => Err(DeliveryError::Unsupported),
        }
    }

    impl Delivery for MockDelivery {
        fn can_share_files(&self, _files: &[SharedFile]) -> bool {
            self.file_share != Capability::Missing
        }

        fn share_files(
            &mut self,
            request: &ShareRequest,
            files: &[SharedFile],
        ) -> Result<(), DeliveryError> {
            self.calls
                .push(format!("share_files:{}:{}", request.title, files[0].name));
            attempt(self.file_share)
        }

        fn can_share(&self) -> bool {
            self.link_share != Capability::Missing
        }

        fn share_link(&mut self, request: &ShareRequest) -> Result<(), DeliveryError> {
            self.calls
                .push(format!("share_link:{}", request.url.as_deref().unwrap_or("")));
            attempt(self.link_share)
        }

        fn download(&mut self, file: &SharedFile) -> Result<PathBuf, DeliveryError> {
            self.calls.push(format!("download:{}", file.name));
            if self.download_fails {
                Err(DeliveryError::Io(std::io::Error::other("disk full")))
            } else {
                Ok(PathBuf::from("/downloads").join(&file.name))
            }
        }

        fn write_clipboard(&mut self, text: &str) -> Result<(), DeliveryError> {
            self.calls.push(format!("clipboard:{text}"));
            attempt(self.clipboard)
        }
    }

    fn strip(filter: FilterMode) -> ComposedStrip {
        ComposedStrip {
            image: RgbaImage::new(72, 231),
            caption: Caption::new("PHOTO COLLECTION", NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            filter,
        }
    }

    fn dispatcher(
        backend: &MockBackend,
        delivery: MockDelivery,
    ) -> ExportDispatcher<'_, MockBackend, MockDelivery> {
        ExportDispatcher::new(backend, delivery, ExportSettings::default())
    }

    #[test]
    fn download_file_name_format() {
        assert_eq!(
            download_file_name(FilterMode::Monochrome, 1_700_000_000_123),
            "photo-strip-monochrome-1700000000123.jpg"
        );
    }

    #[test]
    fn export_encodes_at_quality_98() {
        let backend = MockBackend::new();
        let mut d = dispatcher(&backend, MockDelivery::default());
        d.download_strip(&strip(FilterMode::Natural), 1).unwrap();
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Encode {
                width: 72,
                height: 231,
                quality: 98
            }]
        );
    }

    // =========================================================================
    // Download action
    // =========================================================================

    #[test]
    fn download_prefers_native_share() {
        let backend = MockBackend::new();
        let mut d = dispatcher(
            &backend,
            MockDelivery {
                file_share: Capability::Works,
                ..Default::default()
            },
        );
        let outcome = d.download_strip(&strip(FilterMode::Natural), 42).unwrap();
        assert_eq!(
            outcome,
            DownloadOutcome::Shared {
                file_name: "photo-strip-natural-42.jpg".into()
            }
        );
        assert_eq!(
            d.delivery().calls,
            vec!["share_files:Photo Collection:photo-strip-natural-42.jpg"]
        );
    }

    #[test]
    fn download_falls_back_when_share_fails() {
        let backend = MockBackend::new();
        let mut d = dispatcher(
            &backend,
            MockDelivery {
                file_share: Capability::Fails,
                ..Default::default()
            },
        );
        let outcome = d.download_strip(&strip(FilterMode::Monochrome), 7).unwrap();
        assert!(matches!(outcome, DownloadOutcome::Downloaded { .. }));
        assert_eq!(d.delivery().calls.len(), 2);
        assert_eq!(d.delivery().calls[1], "download:photo-strip-monochrome-7.jpg");
    }

    #[test]
    fn download_without_share_goes_straight_to_file() {
        let backend = MockBackend::new();
        let mut d = dispatcher(&backend, MockDelivery::default());
        d.download_strip(&strip(FilterMode::Natural), 1).unwrap();
        assert_eq!(d.delivery().calls, vec!["download:photo-strip-natural-1.jpg"]);
    }

    #[test]
    fn download_fails_only_when_every_tier_fails() {
        let backend = MockBackend::new();
        let mut d = dispatcher(
            &backend,
            MockDelivery {
                file_share: Capability::Fails,
                download_fails: true,
                ..Default::default()
            },
        );
        let err = d.download_strip(&strip(FilterMode::Natural), 1).unwrap_err();
        assert!(matches!(err, ExportError::ShareDeliveryFailed { .. }));
        assert_eq!(d.delivery().calls.len(), 2);
    }

    // =========================================================================
    // Share action
    // =========================================================================

    #[test]
    fn share_uses_collection_file_name() {
        let backend = MockBackend::new();
        let mut d = dispatcher(
            &backend,
            MockDelivery {
                file_share: Capability::Works,
                ..Default::default()
            },
        );
        let outcome = d.share_strip(&strip(FilterMode::Natural)).unwrap();
        assert_eq!(
            outcome,
            ShareOutcome::SharedFile {
                file_name: "photo-collection.jpg".into()
            }
        );
        assert_eq!(outcome.message(), None);
    }

    #[test]
    fn share_falls_back_to_link_when_files_unsupported() {
        let backend = MockBackend::new();
        let mut d = dispatcher(
            &backend,
            MockDelivery {
                link_share: Capability::Works,
                ..Default::default()
            },
        );
        let outcome = d.share_strip(&strip(FilterMode::Natural)).unwrap();
        assert!(matches!(outcome, ShareOutcome::SharedLink { .. }));
        assert_eq!(
            d.delivery().calls,
            vec!["share_link:https://example.com/photo-strip"]
        );
    }

    #[test]
    fn share_without_share_sheet_copies_link() {
        let backend = MockBackend::new();
        let mut d = dispatcher(
            &backend,
            MockDelivery {
                clipboard: Capability::Works,
                ..Default::default()
            },
        );
        let outcome = d.share_strip(&strip(FilterMode::Natural)).unwrap();
        assert_eq!(outcome.message(), Some(MSG_LINK_COPIED));
    }

    #[test]
    fn failed_share_copies_link_with_failure_message() {
        let backend = MockBackend::new();
        let mut d = dispatcher(
            &backend,
            MockDelivery {
                file_share: Capability::Fails,
                link_share: Capability::Works,
                clipboard: Capability::Works,
                ..Default::default()
            },
        );
        let outcome = d.share_strip(&strip(FilterMode::Natural)).unwrap();
        assert_eq!(outcome.message(), Some(MSG_SHARE_FAILED_LINK_COPIED));
        // A failed file share goes straight to the clipboard.
        assert_eq!(d.delivery().calls.len(), 2);
        assert!(d.delivery().calls[1].starts_with("clipboard:"));
    }

    #[test]
    fn share_ends_in_manual_copy_when_everything_fails() {
        let backend = MockBackend::new();
        let mut d = dispatcher(
            &backend,
            MockDelivery {
                link_share: Capability::Fails,
                clipboard: Capability::Fails,
                ..Default::default()
            },
        );
        let outcome = d.share_strip(&strip(FilterMode::Natural)).unwrap();
        assert_eq!(
            outcome,
            ShareOutcome::ManualCopy {
                url: "https://example.com/photo-strip".into()
            }
        );
        assert_eq!(outcome.message(), Some(MSG_MANUAL_SHARE));
        assert_eq!(d.delivery().calls.len(), 2);
    }

    // =========================================================================
    // DirectoryDelivery
    // =========================================================================

    #[test]
    fn directory_delivery_downloads_into_dir() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let mut d = ExportDispatcher::new(
            &backend,
            DirectoryDelivery::new(tmp.path().join("out")),
            ExportSettings::default(),
        );
        let outcome = d.download_strip(&strip(FilterMode::Natural), 5).unwrap();
        let expected = tmp.path().join("out/photo-strip-natural-5.jpg");
        assert_eq!(
            outcome,
            DownloadOutcome::Downloaded {
                file_name: "photo-strip-natural-5.jpg".into(),
                path: expected.clone()
            }
        );
        assert!(expected.is_file());
    }

    #[test]
    fn directory_delivery_shares_with_manifest() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let mut d = ExportDispatcher::new(
            &backend,
            DirectoryDelivery::new(tmp.path()).with_sharing(true),
            ExportSettings::default(),
        );
        d.share_strip(&strip(FilterMode::Natural)).unwrap();

        let shared = tmp.path().join("shared");
        assert!(shared.join("photo-collection.jpg").is_file());
        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(shared.join(SHARE_MANIFEST)).unwrap()).unwrap();
        assert_eq!(manifest["title"], "Photo Collection");
        assert_eq!(manifest["text"], "Check out my photo collection!");
        assert_eq!(manifest["files"][0], "photo-collection.jpg");
    }

    #[test]
    fn directory_delivery_without_sharing_ends_in_manual_copy() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let mut d = ExportDispatcher::new(
            &backend,
            DirectoryDelivery::new(tmp.path()),
            ExportSettings::default(),
        );
        let outcome = d.share_strip(&strip(FilterMode::Natural)).unwrap();
        assert!(matches!(outcome, ShareOutcome::ManualCopy { .. }));
    }
}
