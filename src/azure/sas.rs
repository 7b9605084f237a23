//! Shared-access-signature windows and blob URL derivation.
//!
//! The package URL handed to the Web App is a service SAS scoped to the
//! package container: read-only, HTTPS-only, valid for a fixed window
//! computed when the SAS node evaluates (i.e. at deploy time, once the
//! archive blob exists).

use chrono::{DateTime, Duration, Utc};

/// Timestamp format required by the SAS signature fields.
const SAS_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Permission string for a read-only SAS.
pub const SAS_PERMISSION_READ: &str = "r";

/// A validity window for a shared access signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SasWindow {
    /// When the signature becomes valid.
    pub start: DateTime<Utc>,
    /// When the signature expires.
    pub expiry: DateTime<Utc>,
}

impl SasWindow {
    /// Creates a window starting now and lasting `validity`.
    #[must_use]
    pub fn starting_now(validity: Duration) -> Self {
        Self::from_start(Utc::now(), validity)
    }

    /// Creates a window with an explicit start time.
    #[must_use]
    pub fn from_start(start: DateTime<Utc>, validity: Duration) -> Self {
        Self {
            start,
            expiry: start + validity,
        }
    }

    /// Returns the `signedStart` field value.
    #[must_use]
    pub fn signed_start(&self) -> String {
        format_sas_time(self.start)
    }

    /// Returns the `signedExpiry` field value.
    #[must_use]
    pub fn signed_expiry(&self) -> String {
        format_sas_time(self.expiry)
    }
}

/// Formats a timestamp as `YYYY-MM-DDTHH:MM:SSZ` (UTC).
#[must_use]
pub fn format_sas_time(time: DateTime<Utc>) -> String {
    time.format(SAS_TIME_FORMAT).to_string()
}

/// Returns the canonicalized resource string for a container-scoped SAS.
#[must_use]
pub fn canonicalized_container(account: &str, container: &str) -> String {
    format!("/blob/{account}/{container}")
}

/// Returns the blob service endpoint for a storage account.
#[must_use]
pub fn blob_service_endpoint(account: &str) -> String {
    format!("https://{account}.blob.core.windows.net")
}

/// Derives the URL of a blob, optionally carrying a SAS token.
#[must_use]
pub fn blob_url(account: &str, container: &str, blob: &str, token: Option<&str>) -> String {
    let base = format!("{}/{container}/{blob}", blob_service_endpoint(account));
    match token {
        Some(token) => format!("{base}?{token}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_expiry_is_exactly_validity_after_start() {
        let window = SasWindow::starting_now(Duration::hours(2));
        assert_eq!(window.expiry - window.start, Duration::hours(2));
    }

    #[test]
    fn test_signed_time_format() {
        let start = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 30).unwrap();
        let window = SasWindow::from_start(start, Duration::hours(2));

        assert_eq!(window.signed_start(), "2024-03-09T14:05:30Z");
        assert_eq!(window.signed_expiry(), "2024-03-09T16:05:30Z");
    }

    #[test]
    fn test_window_crosses_midnight() {
        let start = Utc.with_ymd_and_hms(2024, 12, 31, 23, 30, 0).unwrap();
        let window = SasWindow::from_start(start, Duration::hours(2));

        assert_eq!(window.signed_expiry(), "2025-01-01T01:30:00Z");
    }

    #[test]
    fn test_canonicalized_container() {
        assert_eq!(
            canonicalized_container("sa123", "webcontainer"),
            "/blob/sa123/webcontainer"
        );
    }

    #[test]
    fn test_blob_url_without_token() {
        assert_eq!(
            blob_url("sa123", "webcontainer", "website.zip", None),
            "https://sa123.blob.core.windows.net/webcontainer/website.zip"
        );
    }

    #[test]
    fn test_blob_url_with_token() {
        assert_eq!(
            blob_url("sa123", "webcontainer", "website.zip", Some("abc")),
            "https://sa123.blob.core.windows.net/webcontainer/website.zip?abc"
        );
    }
}
