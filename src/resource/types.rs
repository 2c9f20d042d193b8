/// One row of the extension table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentType {
    /// Extension without the leading dot
    pub extension: &'static str,
    pub mime_type: &'static str,
    pub file_type: &'static str,
    /// Archive and media rows are only used when the classifier enables them
    pub optional: bool,
}

/// Label used when a content type maps to nothing in the table
pub const UNKNOWN_FILE_TYPE: &str = "未知文档";

/// Known document types, longest extensions first within each family so that
/// substring checks see `.docx` before `.doc`
pub const DOCUMENT_TYPES: &[DocumentType] = &[
    DocumentType {
        extension: "pdf",
        mime_type: "application/pdf",
        file_type: "PDF文档",
        optional: false,
    },
    DocumentType {
        extension: "docx",
        mime_type: "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        file_type: "Word文档",
        optional: false,
    },
    DocumentType {
        extension: "doc",
        mime_type: "application/msword",
        file_type: "Word文档",
        optional: false,
    },
    DocumentType {
        extension: "xlsx",
        mime_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        file_type: "Excel表格",
        optional: false,
    },
    DocumentType {
        extension: "xls",
        mime_type: "application/vnd.ms-excel",
        file_type: "Excel表格",
        optional: false,
    },
    DocumentType {
        extension: "pptx",
        mime_type: "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        file_type: "PowerPoint演示文稿",
        optional: false,
    },
    DocumentType {
        extension: "ppt",
        mime_type: "application/vnd.ms-powerpoint",
        file_type: "PowerPoint演示文稿",
        optional: false,
    },
    DocumentType {
        extension: "zip",
        mime_type: "application/zip",
        file_type: "压缩文件",
        optional: true,
    },
    DocumentType {
        extension: "rar",
        mime_type: "application/vnd.rar",
        file_type: "压缩文件",
        optional: true,
    },
    DocumentType {
        extension: "7z",
        mime_type: "application/x-7z-compressed",
        file_type: "压缩文件",
        optional: true,
    },
    DocumentType {
        extension: "mp4",
        mime_type: "video/mp4",
        file_type: "视频文件",
        optional: true,
    },
    DocumentType {
        extension: "mp3",
        mime_type: "audio/mpeg",
        file_type: "音频文件",
        optional: true,
    },
];

/// Looks up a table row by extension (with or without the leading dot)
pub fn document_type_for_extension(extension: &str) -> Option<&'static DocumentType> {
    let ext = extension.trim().trim_start_matches('.').to_lowercase();
    DOCUMENT_TYPES.iter().find(|t| t.extension == ext)
}

/// Looks up a table row by MIME type, ignoring parameters such as `charset`
pub fn document_type_for_mime(content_type: &str) -> Option<&'static DocumentType> {
    let mime = essence(content_type);
    if mime.is_empty() {
        return None;
    }

    DOCUMENT_TYPES
        .iter()
        .find(|t| t.mime_type == mime)
        .or_else(|| match mime.as_str() {
            // Aliases seen in the wild
            "application/x-pdf" => document_type_for_extension("pdf"),
            "application/vnd.ms-word" => document_type_for_extension("doc"),
            "application/x-xls" | "application/excel" => document_type_for_extension("xls"),
            "application/x-zip-compressed" => document_type_for_extension("zip"),
            "application/x-rar-compressed" => document_type_for_extension("rar"),
            _ => None,
        })
}

/// Maps a content type to a human file-type label
///
/// Unknown or empty content types map to [`UNKNOWN_FILE_TYPE`].
pub fn file_type_for_mime(content_type: &str) -> &'static str {
    document_type_for_mime(content_type)
        .map(|t| t.file_type)
        .unwrap_or(UNKNOWN_FILE_TYPE)
}

/// Best-guess extension (without dot) for a content type
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    document_type_for_mime(content_type).map(|t| t.extension)
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}
