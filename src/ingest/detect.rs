//! Content sniffing and filename hygiene for uploaded files.

use std::fmt;
use std::path::Path;

const OCTET_STREAM: &str = "application/octet-stream";

/// Content family detected from magic bytes and the filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentKind {
    /// PDF document.
    Pdf,
    /// Spreadsheet workbook (OOXML, legacy OLE, or OpenDocument).
    Excel,
    /// Raster image.
    Image,
    /// ZIP, TAR, or gzip container.
    Archive,
    /// Anything else, carried as a MIME string.
    Other(String),
}

impl ContentKind {
    /// Label recorded in job metadata.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "excel",
            Self::Image => "image",
            Self::Archive => "archive",
            Self::Other(mime) => mime,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the content family of `bytes`, using `filename` to refine container formats.
pub fn detect_content(bytes: &[u8], filename: &str) -> ContentKind {
    let guessed = mime_guess::from_path(filename).first_raw();

    if bytes.starts_with(b"%PDF") {
        return ContentKind::Pdf;
    }
    if is_image(bytes) {
        return ContentKind::Image;
    }
    // OOXML and OpenDocument workbooks are ZIP containers.
    if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06") {
        return match guessed {
            Some(mime) if is_spreadsheet_mime(mime) => ContentKind::Excel,
            _ => ContentKind::Archive,
        };
    }
    if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
        return match guessed {
            Some(mime) if is_spreadsheet_mime(mime) => ContentKind::Excel,
            _ => ContentKind::Other("application/x-ole-storage".into()),
        };
    }
    if bytes.starts_with(&[0x1F, 0x8B]) || is_tar(bytes) {
        return ContentKind::Archive;
    }

    match guessed {
        Some("application/pdf") => ContentKind::Pdf,
        Some(mime) if mime.starts_with("image/") => ContentKind::Image,
        Some(mime) if is_spreadsheet_mime(mime) => ContentKind::Excel,
        Some(mime) if is_archive_mime(mime) => ContentKind::Archive,
        Some(mime) => ContentKind::Other(mime.to_string()),
        None => ContentKind::Other(OCTET_STREAM.into()),
    }
}

/// Reduce a client-supplied filename to its final path component.
///
/// Both `/` and `\` count as separators; an empty or dot-only result becomes `upload.bin`.
pub fn sanitize_filename(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .replace('\0', "");
    let trimmed = last.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return "upload.bin".to_string();
    }
    Path::new(trimmed)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.bin")
        .to_string()
}

fn is_image(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFF, 0xD8, 0xFF])
        || bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47])
        || bytes.starts_with(b"GIF8")
        || bytes.starts_with(b"II*\0")
        || bytes.starts_with(b"MM\0*")
        || (bytes.len() >= 12 && bytes[..4] == *b"RIFF" && bytes[8..12] == *b"WEBP")
}

fn is_tar(bytes: &[u8]) -> bool {
    bytes.len() >= 262 && &bytes[257..262] == b"ustar"
}

fn is_spreadsheet_mime(mime: &str) -> bool {
    mime.contains("spreadsheet") || mime.contains("ms-excel")
}

fn is_archive_mime(mime: &str) -> bool {
    mime.contains("zip") || mime.contains("tar") || mime.contains("gzip")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_magic_bytes() {
        assert_eq!(detect_content(b"%PDF-1.7 body", "doc.bin"), ContentKind::Pdf);
        assert_eq!(
            detect_content(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A], "scan"),
            ContentKind::Image
        );
        assert_eq!(
            detect_content(&[0xFF, 0xD8, 0xFF, 0xE0], "photo"),
            ContentKind::Image
        );
        assert_eq!(
            detect_content(&[0x1F, 0x8B, 0x08, 0x00], "bundle"),
            ContentKind::Archive
        );
    }

    #[test]
    fn zip_container_is_refined_by_filename() {
        let zip = b"PK\x03\x04rest-of-entry";
        assert_eq!(detect_content(zip, "orders.xlsx"), ContentKind::Excel);
        assert_eq!(detect_content(zip, "bundle.zip"), ContentKind::Archive);
    }

    #[test]
    fn tar_header_is_detected() {
        let mut block = vec![0_u8; 512];
        block[257..262].copy_from_slice(b"ustar");
        assert_eq!(detect_content(&block, "bundle"), ContentKind::Archive);
    }

    #[test]
    fn falls_back_to_filename_then_octet_stream() {
        assert_eq!(detect_content(b"hello", "notes.pdf"), ContentKind::Pdf);
        assert_eq!(
            detect_content(b"hello", "notes.txt"),
            ContentKind::Other("text/plain".into())
        );
        assert_eq!(
            detect_content(b"hello", "noextension"),
            ContentKind::Other(OCTET_STREAM.into())
        );
    }

    #[test]
    fn sanitize_keeps_only_the_final_component() {
        assert_eq!(sanitize_filename("invoice.pdf"), "invoice.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\tmp\\scan.png"), "scan.png");
        assert_eq!(sanitize_filename("dir/"), "upload.bin");
        assert_eq!(sanitize_filename(".."), "upload.bin");
        assert_eq!(sanitize_filename(""), "upload.bin");
    }
}
