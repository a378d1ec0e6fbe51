//! Data model for the Wikimedia Commons query API.
//!
//! Wire types mirror the upstream JSON shape (`query.pages.*.imageinfo[]`,
//! `query.random[]`); [`MediaItem`] is the flattened per-file view the rest of
//! the relay works with.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

/// Upstream classification of a media file.
///
/// The upstream API reports more types than the relay routes expose (e.g.
/// `DRAWING`); those arrive as [`MediaType::Other`] and only match when the
/// caller passed the same raw value through the `:type` path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    /// Still image (`BITMAP`)
    Bitmap,
    /// Audio file (`AUDIO`)
    Audio,
    /// Video file (`VIDEO`)
    Video,
    /// Any other upstream classification, kept verbatim
    Other(String),
}

impl MediaType {
    /// Map a `:type` route segment to a media type.
    ///
    /// Matching is case-sensitive and exact; unknown segments pass through
    /// unmapped and will not match any of the well-known upstream types.
    pub fn from_route_segment(segment: &str) -> Self {
        match segment {
            "image" => MediaType::Bitmap,
            "audio" => MediaType::Audio,
            "video" => MediaType::Video,
            other => MediaType::Other(other.to_string()),
        }
    }

    /// Map an upstream `mediatype` field to a media type.
    pub fn from_upstream(raw: &str) -> Self {
        match raw {
            "BITMAP" => MediaType::Bitmap,
            "AUDIO" => MediaType::Audio,
            "VIDEO" => MediaType::Video,
            other => MediaType::Other(other.to_string()),
        }
    }

    /// The upstream spelling of this media type.
    pub fn upstream_name(&self) -> &str {
        match self {
            MediaType::Bitmap => "BITMAP",
            MediaType::Audio => "AUDIO",
            MediaType::Video => "VIDEO",
            MediaType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.upstream_name())
    }
}

/// One media file associated with an upstream page.
///
/// Transient: constructed per-request from API responses and discarded after
/// the response is sent.
#[derive(Debug, Clone)]
pub struct MediaItem {
    /// Direct URL of the file on the upload server
    pub url: String,
    /// Upstream media classification
    pub media_type: MediaType,
    /// File size in bytes (present when the query requested `size`)
    pub size_bytes: Option<u64>,
    /// Original capture timestamp, parsed from extended metadata
    pub original_timestamp: Option<DateTime<Utc>>,
}

impl MediaItem {
    /// Build a [`MediaItem`] from one upstream `imageinfo` entry.
    ///
    /// Entries without a URL or media type can never be selected and are
    /// dropped here. A capture date that fails to parse is carried as `None`
    /// so timestamp selection skips the item instead of failing the request.
    pub(crate) fn from_imageinfo(info: ImageInfo) -> Option<Self> {
        let url = info.url?;
        let media_type = MediaType::from_upstream(info.mediatype.as_deref()?);
        let original_timestamp = info
            .extmetadata
            .and_then(|meta| meta.date_time_original)
            .and_then(|field| field.value.as_str().and_then(parse_capture_date));
        Some(MediaItem {
            url,
            media_type,
            size_bytes: info.size,
            original_timestamp,
        })
    }
}

/// Parse an upstream capture date.
///
/// `DateTimeOriginal` values are free-form EXIF-derived strings; the common
/// shapes are RFC 3339, `YYYY-MM-DD HH:MM:SS`, and a bare date. Anything else
/// yields `None`.
pub fn parse_capture_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y:%m:%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ----------------------------------------------------------------------------
// Wire types
// ----------------------------------------------------------------------------

/// Top-level response envelope of the query API.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    pub query: Option<QueryBody>,
}

/// `query` object: generator results land in `pages`, random lookups in
/// `random`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueryBody {
    // BTreeMap keyed by page id keeps iteration deterministic, matching the
    // id-ordered object the upstream serializes.
    #[serde(default)]
    pub pages: BTreeMap<String, Page>,
    #[serde(default)]
    pub random: Vec<RandomPage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Page {
    #[serde(default)]
    pub imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageInfo {
    pub url: Option<String>,
    pub mediatype: Option<String>,
    pub size: Option<u64>,
    pub extmetadata: Option<ExtMetadata>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExtMetadata {
    #[serde(rename = "DateTimeOriginal")]
    pub date_time_original: Option<ExtMetadataField>,
}

/// A single extended-metadata field. Values are usually strings but the API
/// occasionally emits other scalars, so keep the raw JSON value.
#[derive(Debug, Deserialize)]
pub(crate) struct ExtMetadataField {
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RandomPage {
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn route_segments_map_to_known_types() {
        assert_eq!(MediaType::from_route_segment("image"), MediaType::Bitmap);
        assert_eq!(MediaType::from_route_segment("audio"), MediaType::Audio);
        assert_eq!(MediaType::from_route_segment("video"), MediaType::Video);
    }

    #[test]
    fn unknown_route_segment_passes_through() {
        assert_eq!(
            MediaType::from_route_segment("gif"),
            MediaType::Other("gif".to_string())
        );
        // Case-sensitive: "Image" is not "image"
        assert_eq!(
            MediaType::from_route_segment("Image"),
            MediaType::Other("Image".to_string())
        );
    }

    #[test]
    fn upstream_names_round_trip() {
        for raw in ["BITMAP", "AUDIO", "VIDEO", "DRAWING"] {
            assert_eq!(MediaType::from_upstream(raw).upstream_name(), raw);
        }
    }

    #[test]
    fn capture_date_accepts_common_shapes() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
            .and_utc();
        assert_eq!(parse_capture_date("2020-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_capture_date("2020-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_capture_date("2020:01:02 03:04:05"), Some(expected));

        let midnight = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(parse_capture_date("2020-01-02"), Some(midnight));
    }

    #[test]
    fn capture_date_rejects_garbage() {
        assert_eq!(parse_capture_date(""), None);
        assert_eq!(parse_capture_date("yesterday"), None);
        assert_eq!(parse_capture_date("<time>2020</time>"), None);
    }

    #[test]
    fn imageinfo_without_url_or_type_is_dropped() {
        let no_url = ImageInfo {
            url: None,
            mediatype: Some("BITMAP".to_string()),
            size: None,
            extmetadata: None,
        };
        assert!(MediaItem::from_imageinfo(no_url).is_none());

        let no_type = ImageInfo {
            url: Some("https://upload.example/a.jpg".to_string()),
            mediatype: None,
            size: None,
            extmetadata: None,
        };
        assert!(MediaItem::from_imageinfo(no_type).is_none());
    }

    #[test]
    fn query_response_deserializes_generator_shape() {
        let raw = json!({
            "query": {
                "pages": {
                    "101": {
                        "pageid": 101,
                        "title": "File:Cat.jpg",
                        "imageinfo": [{
                            "url": "https://upload.example/Cat.jpg",
                            "mediatype": "BITMAP",
                            "size": 2048,
                            "extmetadata": {
                                "DateTimeOriginal": { "value": "2019-05-01 12:00:00" }
                            }
                        }]
                    },
                    "102": { "pageid": 102, "title": "File:Empty.jpg" }
                }
            }
        });

        let parsed: QueryResponse = serde_json::from_value(raw).unwrap();
        let body = parsed.query.unwrap();
        assert_eq!(body.pages.len(), 2);

        let items: Vec<MediaItem> = body
            .pages
            .into_values()
            .flat_map(|page| page.imageinfo)
            .filter_map(MediaItem::from_imageinfo)
            .collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].media_type, MediaType::Bitmap);
        assert_eq!(items[0].size_bytes, Some(2048));
        assert!(items[0].original_timestamp.is_some());
    }

    #[test]
    fn non_string_extmetadata_value_is_tolerated() {
        let raw = json!({
            "url": "https://upload.example/a.jpg",
            "mediatype": "BITMAP",
            "extmetadata": { "DateTimeOriginal": { "value": 2020 } }
        });
        let info: ImageInfo = serde_json::from_value(raw).unwrap();
        let item = MediaItem::from_imageinfo(info).unwrap();
        assert_eq!(item.original_timestamp, None);
    }

    #[test]
    fn query_response_deserializes_random_shape() {
        let raw = json!({
            "query": {
                "random": [{ "id": 42, "ns": 0, "title": "Some page" }]
            }
        });
        let parsed: QueryResponse = serde_json::from_value(raw).unwrap();
        let body = parsed.query.unwrap();
        assert_eq!(body.random.len(), 1);
        assert_eq!(body.random[0].title, "Some page");
    }
}
