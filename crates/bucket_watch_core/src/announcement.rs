use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contract::BucketObject;
use crate::download_url::DownloadUrlBuilder;

pub const ANNOUNCEMENT_COLOR: u32 = 0x00ff99;
pub const BYTES_PER_MEGABYTE: u64 = 1 << 20;

/// Chat embeds reject longer titles and field values outright.
pub const MAX_TITLE_CHARS: usize = 256;
pub const MAX_FIELD_VALUE_CHARS: usize = 1024;

const TITLE_PREFIX: &str = "🆕 New File Uploaded: `";
const TITLE_SUFFIX: &str = "`";
const ELLIPSIS: char = '…';

/// Size and creation time as shown in an announcement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectMetadata {
    pub size_mb: f64,
    pub created_epoch_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Channel-agnostic content of a "new object" message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub key: String,
    pub title: String,
    pub color: u32,
    pub timestamp: DateTime<Utc>,
    pub fields: Vec<AnnouncementField>,
}

pub fn object_metadata(object: &BucketObject) -> ObjectMetadata {
    ObjectMetadata {
        size_mb: size_in_megabytes(object.size_bytes),
        created_epoch_secs: epoch_seconds(&object.last_modified),
    }
}

/// Megabytes (2^20 bytes) rounded to two decimal places.
///
/// Rounds the exact quotient half to even, so `0.125` becomes `0.12`.
pub fn size_in_megabytes(size_bytes: u64) -> f64 {
    let unit = u128::from(BYTES_PER_MEGABYTE);
    let scaled = u128::from(size_bytes) * 100;
    let (mut hundredths, remainder) = (scaled / unit, scaled % unit);
    let doubled = remainder * 2;
    if doubled > unit || (doubled == unit && hundredths % 2 == 1) {
        hundredths += 1;
    }
    hundredths as f64 / 100.0
}

/// Whole Unix seconds in UTC; sub-second precision is dropped.
pub fn epoch_seconds(instant: &DateTime<Utc>) -> i64 {
    instant.timestamp()
}

/// Renders `3.0`, `2.5` or `1.23`: at most two decimals, never fewer than one.
pub fn format_megabytes(megabytes: f64) -> String {
    let text = format!("{megabytes:.2}");
    let trimmed = text.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    truncated.push(ELLIPSIS);
    truncated
}

/// Title quoting the key. Long keys are shortened inside the backticks.
pub fn announcement_title(key: &str) -> String {
    let budget = MAX_TITLE_CHARS
        - TITLE_PREFIX.chars().count()
        - TITLE_SUFFIX.chars().count();
    format!("{TITLE_PREFIX}{}{TITLE_SUFFIX}", truncate_chars(key, budget))
}

fn field(name: &str, value: String, inline: bool) -> AnnouncementField {
    AnnouncementField {
        name: name.to_string(),
        value: truncate_chars(&value, MAX_FIELD_VALUE_CHARS),
        inline,
    }
}

pub fn build_announcement(
    object: &BucketObject,
    urls: &DownloadUrlBuilder,
    now: DateTime<Utc>,
) -> Announcement {
    let metadata = object_metadata(object);
    let download_url = urls.object_url(&object.key);

    Announcement {
        key: object.key.clone(),
        title: announcement_title(&object.key),
        color: ANNOUNCEMENT_COLOR,
        timestamp: now,
        fields: vec![
            field(
                "File Size",
                format!("{} MB", format_megabytes(metadata.size_mb)),
                true,
            ),
            field(
                "Created At",
                format!("<t:{}:F>", metadata.created_epoch_secs),
                true,
            ),
            field("Download", format!("[Click here]({download_url})"), false),
        ],
    }
}

#[cfg(test)]
mod tests {
    use chrono::{SubsecRound, TimeZone};

    use super::*;

    fn sample_object(size_bytes: u64) -> BucketObject {
        BucketObject {
            key: "builds/a.zip".to_string(),
            size_bytes,
            last_modified: Utc
                .with_ymd_and_hms(2025, 3, 1, 12, 30, 45)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn three_mebibytes_is_three_megabytes() {
        assert_eq!(size_in_megabytes(3_145_728), 3.0);
        assert_eq!(format_megabytes(size_in_megabytes(3_145_728)), "3.0");
    }

    #[test]
    fn sizes_round_to_two_decimals() {
        assert_eq!(size_in_megabytes(1_289_748), 1.23);
        assert_eq!(format_megabytes(1.23), "1.23");
        assert_eq!(format_megabytes(2.5), "2.5");
        assert_eq!(format_megabytes(0.0), "0.0");
    }

    #[test]
    fn exact_halves_round_to_even_hundredth() {
        assert_eq!(size_in_megabytes(131_072), 0.12);
        assert_eq!(size_in_megabytes(393_216), 0.38);
        assert_eq!(size_in_megabytes(131_073), 0.13);
        assert_eq!(size_in_megabytes(0), 0.0);
    }

    #[test]
    fn long_keys_fit_embed_limits() {
        let urls = DownloadUrlBuilder::new("https://s3.example.com", None, "drops")
            .expect("builder should accept endpoint");
        let now = Utc
            .with_ymd_and_hms(2025, 3, 2, 0, 0, 0)
            .single()
            .expect("valid timestamp");
        let mut object = sample_object(1);
        object.key = format!("a/{}.zip", "x".repeat(1_020));

        let announcement = build_announcement(&object, &urls, now);

        assert_eq!(announcement.key, object.key);
        assert_eq!(announcement.title.chars().count(), MAX_TITLE_CHARS);
        assert!(announcement.title.starts_with("🆕 New File Uploaded: `a/xxx"));
        assert!(announcement.title.ends_with("x…`"));
        for field in &announcement.fields {
            assert!(field.value.chars().count() <= MAX_FIELD_VALUE_CHARS);
        }
        assert!(announcement.fields[2].value.ends_with('…'));
    }

    #[test]
    fn truncation_leaves_short_text_alone() {
        assert_eq!(truncate_chars("a.zip", 5), "a.zip");
        assert_eq!(truncate_chars("abcdef", 4), "abc…");
        assert_eq!(truncate_chars("ééééé", 3), "éé…");
    }

    #[test]
    fn epoch_seconds_round_trip_discards_subseconds() {
        let instant = Utc
            .with_ymd_and_hms(2024, 11, 5, 8, 15, 30)
            .single()
            .expect("valid timestamp")
            + chrono::Duration::milliseconds(750);

        let epoch = epoch_seconds(&instant);
        let restored = DateTime::<Utc>::from_timestamp(epoch, 0).expect("epoch in range");
        assert_eq!(restored, instant.trunc_subsecs(0));
    }

    #[test]
    fn announcement_carries_size_time_and_download_fields() {
        let urls = DownloadUrlBuilder::new("https://s3.example.com", None, "drops")
            .expect("builder should accept endpoint");
        let now = Utc
            .with_ymd_and_hms(2025, 3, 2, 0, 0, 0)
            .single()
            .expect("valid timestamp");
        let object = sample_object(3_145_728);

        let announcement = build_announcement(&object, &urls, now);

        assert_eq!(announcement.title, "🆕 New File Uploaded: `builds/a.zip`");
        assert_eq!(announcement.color, ANNOUNCEMENT_COLOR);
        assert_eq!(announcement.timestamp, now);
        let values = announcement
            .fields
            .iter()
            .map(|field| (field.name.as_str(), field.value.as_str(), field.inline))
            .collect::<Vec<_>>();
        assert_eq!(
            values,
            vec![
                ("File Size", "3.0 MB", true),
                (
                    "Created At",
                    format!("<t:{}:F>", object.last_modified.timestamp()).as_str(),
                    true
                ),
                (
                    "Download",
                    "[Click here](https://s3.example.com/drops/builds/a.zip)",
                    false
                ),
            ]
        );
    }
}
