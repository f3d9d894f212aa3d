//! Attachment media types.

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Uniform type identifiers seen in test attachments.
const UTI_TABLE: &[(&str, &str)] = &[
    ("public.png", "image/png"),
    ("public.jpeg", "image/jpeg"),
    ("public.heic", "image/heic"),
    ("public.tiff", "image/tiff"),
    ("com.compuserve.gif", "image/gif"),
    ("public.svg-image", "image/svg+xml"),
    ("public.plain-text", "text/plain"),
    ("public.utf8-plain-text", "text/plain"),
    ("public.html", "text/html"),
    ("public.xml", "application/xml"),
    ("public.json", "application/json"),
    ("public.comma-separated-values-text", "text/csv"),
    ("public.log", "text/plain"),
    ("com.adobe.pdf", "application/pdf"),
    ("public.mpeg-4", "video/mp4"),
    ("com.apple.quicktime-movie", "video/quicktime"),
    ("public.zip-archive", "application/zip"),
    ("public.data", OCTET_STREAM),
];

const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("heic", "image/heic"),
    ("tiff", "image/tiff"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain"),
    ("log", "text/plain"),
    ("html", "text/html"),
    ("xml", "application/xml"),
    ("json", "application/json"),
    ("csv", "text/csv"),
    ("pdf", "application/pdf"),
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("zip", "application/zip"),
];

/// Media type from the declared UTI, falling back to the filename extension.
///
/// A generic `public.data` UTI defers to the extension.
#[must_use]
pub fn media_type(uti: Option<&str>, filename: &str) -> &'static str {
    uti.and_then(from_uti)
        .filter(|media| *media != OCTET_STREAM)
        .or_else(|| extension(filename).and_then(from_extension))
        .unwrap_or(OCTET_STREAM)
}

#[must_use]
pub fn from_uti(uti: &str) -> Option<&'static str> {
    UTI_TABLE
        .iter()
        .find(|(known, _)| *known == uti)
        .map(|(_, media)| *media)
}

#[must_use]
pub fn from_extension(ext: &str) -> Option<&'static str> {
    EXTENSION_TABLE
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, media)| *media)
}

/// Lowercase extension of `filename`, if it has one.
#[must_use]
pub fn extension(filename: &str) -> Option<&str> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.contains('/') {
        return None;
    }
    Some(ext)
}

/// Preferred extension for a media type, used when the filename has none.
#[must_use]
pub fn extension_for(media_type: &str) -> Option<&'static str> {
    EXTENSION_TABLE
        .iter()
        .find(|(_, media)| *media == media_type)
        .map(|(ext, _)| *ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uti_wins_over_extension() {
        assert_eq!(media_type(Some("public.png"), "shot.jpeg"), "image/png");
        assert_eq!(media_type(Some("public.jpeg"), "Screenshot"), "image/jpeg");
    }

    #[test]
    fn falls_back_to_extension() {
        assert_eq!(media_type(None, "log.TXT"), "text/plain");
        assert_eq!(media_type(Some("com.example.custom"), "a.json"), "application/json");
        assert_eq!(media_type(Some("public.data"), "trace.pdf"), "application/pdf");
    }

    #[test]
    fn unknown_is_octet_stream() {
        assert_eq!(media_type(None, "blob"), OCTET_STREAM);
        assert_eq!(media_type(Some("public.data"), "blob.bin"), OCTET_STREAM);
    }

    #[test]
    fn extension_rules() {
        assert_eq!(extension("a.png"), Some("png"));
        assert_eq!(extension("archive.tar.gz"), Some("gz"));
        assert_eq!(extension(".hidden"), None);
        assert_eq!(extension("noext"), None);
        assert_eq!(extension("trailing."), None);
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("application/x-unknown"), None);
    }
}
