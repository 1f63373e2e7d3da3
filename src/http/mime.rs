//! Content-Type classification module
//!
//! Maps an object key's file extension to the `Content-Type` of the response.

use std::path::Path;

/// Content type for an object key, `None` when the extension is unknown
///
/// # Examples
/// ```
/// use s3relay::http::mime::content_type_for;
/// assert_eq!(content_type_for("movies/nosferatu.MP4"), Some("video/mp4"));
/// assert_eq!(content_type_for("stream/index.m3u8"), Some("application/vnd.apple.mpegurl"));
/// assert_eq!(content_type_for("README"), None);
/// ```
pub fn content_type_for(key: &str) -> Option<&'static str> {
    let extension = Path::new(key).extension()?.to_str()?.to_ascii_lowercase();

    let content_type = match extension.as_str() {
        // Video
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "ts" => "video/mp2t",
        "m4s" => "video/iso.segment",

        // Streaming manifests
        "m3u8" => "application/vnd.apple.mpegurl",
        "mpd" => "application/dash+xml",

        // Audio
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "ogg" | "oga" => "audio/ogg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",

        // Text and scripts
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "vtt" => "text/vtt",
        "srt" => "application/x-subrip",
        "txt" => "text/plain; charset=utf-8",

        // Archives and documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",

        _ => return None,
    };

    Some(content_type)
}
