//! File-name rules shared by the server and the client.
//!
//! Uploaded names come straight from the multipart `filename` parameter and
//! are attacker-controlled. [`sanitize_upload_name`] reduces them to a single
//! path component before anything touches the disk. [`pdf_file_name`] applies
//! the one canonical output rule: drop the last extension, append `.pdf`.

/// Name used when the upload carries no usable file name.
pub const FALLBACK_UPLOAD_NAME: &str = "document.docx";

/// Extensions the client accepts for conversion.
pub const WORD_EXTENSIONS: &[&str] = &["doc", "docx"];

/// Reduce an uploaded file name to a safe final path component.
///
/// Both `/` and `\` are treated as separators so Windows-style names from
/// old browsers are handled the same way on every platform.
pub fn sanitize_upload_name(raw: &str) -> String {
    let last = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();

    match cleaned.as_str() {
        "" | "." | ".." => FALLBACK_UPLOAD_NAME.to_string(),
        _ => cleaned,
    }
}

/// `report.docx` → `report.pdf`.
///
/// Only the last extension is removed. A name that is nothing but an
/// extension (`.docx`) becomes `document.pdf`.
pub fn pdf_file_name(original: &str) -> String {
    let stem = strip_extension(original);
    if stem.is_empty() {
        "document.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}

/// Strip a trailing `.ext` if the extension is non-empty.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[..idx],
        _ => name,
    }
}

/// Whether `name` ends in `.doc` or `.docx` (case-insensitive).
pub fn is_word_document(name: &str) -> bool {
    match name.rfind('.') {
        Some(idx) => {
            let ext = name[idx + 1..].to_ascii_lowercase();
            WORD_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Return `name`, or `stem (n).ext` for the smallest `n` not rejected by
/// `taken`. Used for download targets and archive members.
pub fn unique_name(name: &str, mut taken: impl FnMut(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }
    let stem = strip_extension(name);
    let ext = &name[stem.len()..];
    let mut n = 1;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_name_strips_extension() {
        assert_eq!(pdf_file_name("report.docx"), "report.pdf");
        assert_eq!(pdf_file_name("old.DOC"), "old.pdf");
        assert_eq!(pdf_file_name("v1.2.final.docx"), "v1.2.final.pdf");
        assert_eq!(pdf_file_name("README"), "README.pdf");
        assert_eq!(pdf_file_name(".docx"), "document.pdf");
        assert_eq!(pdf_file_name("trailing."), "trailing..pdf");
    }

    #[test]
    fn sanitize_drops_directories() {
        assert_eq!(sanitize_upload_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_upload_name(r"C:\Users\me\report.docx"), "report.docx");
        assert_eq!(sanitize_upload_name("  notes.docx "), "notes.docx");
    }

    #[test]
    fn sanitize_falls_back_on_empty_names() {
        assert_eq!(sanitize_upload_name(""), FALLBACK_UPLOAD_NAME);
        assert_eq!(sanitize_upload_name(".."), FALLBACK_UPLOAD_NAME);
        assert_eq!(sanitize_upload_name("dir/"), FALLBACK_UPLOAD_NAME);
        assert_eq!(sanitize_upload_name("\u{0}\u{7}"), FALLBACK_UPLOAD_NAME);
    }

    #[test]
    fn word_document_detection() {
        assert!(is_word_document("a.docx"));
        assert!(is_word_document("a.DOC"));
        assert!(!is_word_document("a.pdf"));
        assert!(!is_word_document("docx"));
    }

    #[test]
    fn unique_name_appends_counter() {
        let existing = ["report.pdf", "report (1).pdf"];
        let name = unique_name("report.pdf", |n| existing.contains(&n));
        assert_eq!(name, "report (2).pdf");
        assert_eq!(unique_name("fresh.pdf", |_| false), "fresh.pdf");
    }
}
