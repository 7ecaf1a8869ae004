use serde_json::Value;
use sha1::{Digest, Sha1};

const VIDEO_EXTENSIONS: [&str; 4] = [".mp4", ".mov", ".webm", ".m4v"];

/// Turns client-supplied media entries into stored URLs.
///
/// Non-strings and blank strings are dropped, absolute URLs pass through, and
/// bare storage keys are expanded against the configured cloud. Without a cloud
/// name, keys are kept as given.
pub fn normalize_media(entries: &[Value], cloud_name: Option<&str>) -> Vec<String> {
    entries
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| expand_media_key(entry, cloud_name))
        .collect()
}

fn expand_media_key(entry: &str, cloud_name: Option<&str>) -> String {
    if entry.starts_with("http") {
        return entry.to_string();
    }

    let Some(cloud_name) = cloud_name else {
        return entry.to_string();
    };

    let kind = if is_video(entry) { "video" } else { "image" };
    format!("https://res.cloudinary.com/{cloud_name}/{kind}/upload/{entry}")
}

fn is_video(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.contains("/video/") || VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Cloudinary upload signature: SHA-1 over the `name=value` pairs sorted by
/// name and joined with `&`, followed directly by the API secret.
pub fn sign_upload(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by_key(|(name, _)| *name);

    let to_sign = sorted
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
