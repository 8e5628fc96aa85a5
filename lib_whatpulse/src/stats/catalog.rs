//! # Metric Catalog
//!
//! Declares every supported metric once. A metric may be answerable by the
//! public API (top-level field named like the metric id, rank under
//! `Ranks[rank_key]`), by the local client API (`client_path` into the
//! `/v1/all-stats` document), or both.

use serde::Serialize;

use crate::error::WhatPulseError;

/// One catalog entry. Constructed at compile time and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricDescriptor {
    /// Unique key; also the public API field name for raw counters.
    pub id: &'static str,
    /// Human readable name, without the "WhatPulse" prefix.
    pub display_name: &'static str,
    /// Material Design icon name.
    pub icon: &'static str,
    /// Unit of measurement; empty when the value is unitless or preformatted.
    pub unit: &'static str,
    /// Field name in the public API's `Ranks` and `Team.Ranks` tables.
    pub rank_key: Option<&'static str>,
    /// Location of the value inside the client API's nested response.
    pub client_path: Option<&'static [&'static str]>,
    /// The metric is itself a leaderboard position.
    pub is_rank: bool,
}

impl MetricDescriptor {
    /// Instantaneous client-local rate with no public counterpart.
    pub fn is_realtime(&self) -> bool {
        self.first_segment() == Some("realtime")
    }

    /// Only the local client can answer this metric.
    pub fn is_client_only(&self) -> bool {
        matches!(self.first_segment(), Some("realtime") | Some("unpulsed"))
    }

    /// Only the public API can answer this metric. Rank metrics count as
    /// public-only: ranks are never read from the client document.
    pub fn is_public_only(&self) -> bool {
        self.is_rank || self.client_path.is_none()
    }

    fn first_segment(&self) -> Option<&'static str> {
        self.client_path.and_then(|p| p.first().copied())
    }
}

const fn counter(
    id: &'static str,
    display_name: &'static str,
    icon: &'static str,
    unit: &'static str,
    rank_key: Option<&'static str>,
    client_path: Option<&'static [&'static str]>,
) -> MetricDescriptor {
    MetricDescriptor {
        id,
        display_name,
        icon,
        unit,
        rank_key,
        client_path,
        is_rank: false,
    }
}

const fn rank(
    id: &'static str,
    display_name: &'static str,
    rank_key: &'static str,
    client_path: &'static [&'static str],
) -> MetricDescriptor {
    MetricDescriptor {
        id,
        display_name,
        icon: "mdi:trophy",
        unit: "",
        rank_key: Some(rank_key),
        client_path: Some(client_path),
        is_rank: true,
    }
}

/// Every supported metric, in presentation order.
pub static CATALOG: &[MetricDescriptor] = &[
    // Available from both APIs
    counter("Keys", "Keys", "mdi:keyboard", "keys", Some("Keys"), Some(&["account-totals", "keys"])),
    counter("Clicks", "Clicks", "mdi:mouse", "clicks", Some("Clicks"), Some(&["account-totals", "clicks"])),
    counter("Scrolls", "Scrolls", "mdi:mouse-scroll-wheel", "scrolls", Some("Scrolls"), Some(&["account-totals", "scrolls"])),
    counter("Download", "Download", "mdi:download", "", Some("Download"), None),
    counter("DownloadMB", "Download", "mdi:download", "MB", Some("Download"), Some(&["account-totals", "download"])),
    counter("Upload", "Upload", "mdi:upload", "", Some("Upload"), None),
    counter("UploadMB", "Upload", "mdi:upload", "MB", Some("Upload"), Some(&["account-totals", "upload"])),
    counter("UptimeSeconds", "Uptime", "mdi:clock-outline", "seconds", Some("Uptime"), Some(&["account-totals", "uptime"])),
    counter("UptimeShort", "Uptime", "mdi:clock-outline", "", Some("Uptime"), None),
    counter("UptimeLong", "Uptime", "mdi:clock-outline", "", Some("Uptime"), None),
    counter("DistanceInMiles", "Distance", "mdi:map-marker-distance", "miles", Some("Distance"), Some(&["account-totals", "distance_miles"])),
    // Public only, derived by the service
    counter("Pulses", "Pulses", "mdi:pulse", "pulses", None, None),
    counter("AvKeysPerPulse", "Average Keys Per Pulse", "mdi:keyboard-settings-outline", "keys/pulse", None, None),
    counter("AvClicksPerPulse", "Average Clicks Per Pulse", "mdi:gesture-tap", "clicks/pulse", None, None),
    counter("AvKPS", "Average Keys Per Second", "mdi:keyboard", "keys/sec", None, None),
    counter("AvCPS", "Average Clicks Per Second", "mdi:mouse", "clicks/sec", None, None),
    // Leaderboard positions
    rank("RankKeys", "Rank Keys", "Keys", &["account-totals", "ranks", "rank_keys"]),
    rank("RankClicks", "Rank Clicks", "Clicks", &["account-totals", "ranks", "rank_clicks"]),
    rank("RankDownload", "Rank Download", "Download", &["account-totals", "ranks", "rank_download"]),
    rank("RankUpload", "Rank Upload", "Upload", &["account-totals", "ranks", "rank_upload"]),
    rank("RankUptime", "Rank Uptime", "Uptime", &["account-totals", "ranks", "rank_uptime"]),
    rank("RankScrolls", "Rank Scrolls", "Scrolls", &["account-totals", "ranks", "rank_scrolls"]),
    rank("RankDistance", "Rank Distance", "Distance", &["account-totals", "ranks", "rank_distance"]),
    // Client only
    counter("UnpulsedKeys", "Unpulsed Keys", "mdi:keyboard", "keys", None, Some(&["unpulsed", "keys"])),
    counter("UnpulsedClicks", "Unpulsed Clicks", "mdi:mouse", "clicks", None, Some(&["unpulsed", "clicks"])),
    counter("UnpulsedScrolls", "Unpulsed Scrolls", "mdi:mouse-scroll-wheel", "scrolls", None, Some(&["unpulsed", "scrolls"])),
    counter("UnpulsedDownload", "Unpulsed Download", "mdi:download", "bytes", None, Some(&["unpulsed", "download"])),
    counter("UnpulsedUpload", "Unpulsed Upload", "mdi:upload", "bytes", None, Some(&["unpulsed", "upload"])),
    counter("UnpulsedUptime", "Unpulsed Uptime", "mdi:clock-outline", "seconds", None, Some(&["unpulsed", "uptime"])),
    counter("RealtimeKeys", "Realtime Keys", "mdi:keyboard", "keys/s", None, Some(&["realtime", "keys"])),
    counter("RealtimeClicks", "Realtime Clicks", "mdi:mouse", "clicks/s", None, Some(&["realtime", "clicks"])),
    counter("RealtimeDownload", "Realtime Download", "mdi:download", "", None, Some(&["realtime", "download"])),
    counter("RealtimeUpload", "Realtime Upload", "mdi:upload", "", None, Some(&["realtime", "upload"])),
];

/// Sensors created when the configuration does not name any.
pub const DEFAULT_METRICS: [&str; 7] = [
    "Keys",
    "Clicks",
    "Download",
    "Upload",
    "UptimeShort",
    "RealtimeDownload",
    "RealtimeUpload",
];

/// Finds a metric by id.
///
/// # Errors
/// `WhatPulseError::UnknownMetric` if the id is not in the catalog.
pub fn lookup(id: &str) -> Result<&'static MetricDescriptor, WhatPulseError> {
    CATALOG
        .iter()
        .find(|m| m.id == id)
        .ok_or_else(|| WhatPulseError::UnknownMetric(id.to_string()))
}
