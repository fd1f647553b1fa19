//! `data:` URL encoding and generated object names.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;

use super::MediaError;

/// Length of the random part of generated names.
const RANDOM_SUFFIX_LEN: usize = 6;

/// Decodes `data:<mime>;base64,<payload>` into its content type and bytes.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>), MediaError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| MediaError::InvalidDataUrl("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| MediaError::InvalidDataUrl("missing payload separator".to_string()))?;

    let mut parts = header.split(';');
    let mime = parts.next().unwrap_or_default().to_string();
    if !parts.any(|p| p == "base64") {
        return Err(MediaError::InvalidDataUrl(
            "only base64 payloads are supported".to_string(),
        ));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| MediaError::InvalidDataUrl(e.to_string()))?;
    Ok((mime, bytes))
}

/// Encodes bytes as a base64 `data:` URL.
pub fn encode_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

/// Content type guessed from a file name's extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// `<stem>_<unix-millis>_<random>.<ext>`, or without the extension when the
/// original name has none.
pub fn unique_file_name(original: &str) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect::<String>()
        .to_ascii_lowercase();

    match original.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            format!("{}_{}_{}.{}", stem, timestamp, random, ext)
        }
        _ => format!("{}_{}_{}", original, timestamp, random),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url() {
        let (mime, bytes) = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode_data_url("image/png;base64,aGVsbG8=").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("data:text/plain,hello").is_err());
        assert!(decode_data_url("data:image/png;base64,***").is_err());
    }

    #[test]
    fn test_encode_matches_decode() {
        let url = encode_data_url("application/pdf", b"%PDF");
        assert!(url.starts_with("data:application/pdf;base64,"));
        let (mime, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(mime, "application/pdf");
        assert_eq!(bytes, b"%PDF");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("clip.mp4"), "video/mp4");
        assert_eq!(content_type_for("notes"), "application/octet-stream");
    }

    #[test]
    fn test_unique_file_name_keeps_stem_and_extension() {
        let name = unique_file_name("feria.escolar.png");
        assert!(name.starts_with("feria.escolar_"));
        assert!(name.ends_with(".png"));

        let parts: Vec<&str> = name.trim_end_matches(".png").rsplit('_').collect();
        assert_eq!(parts[0].len(), RANDOM_SUFFIX_LEN);
        assert!(parts[1].parse::<i64>().is_ok());
    }

    #[test]
    fn test_unique_file_name_without_extension() {
        let name = unique_file_name("README");
        assert!(name.starts_with("README_"));
        assert!(!name.contains('.'));
    }

    #[test]
    fn test_unique_file_names_differ() {
        assert_ne!(unique_file_name("a.png"), unique_file_name("a.png"));
    }
}
