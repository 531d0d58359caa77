//! Structured validation errors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of validation error types.
///
/// The serialized names are consumed by the upload UI and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    HeaderMissing,
    HeaderConflict,
    FieldMissing,
    DuplicateId,
    InvalidLocation,
    FolderMissing,
    ImageMissing,
    ImageTooLarge,
    ImageTooSmall,
    ZipMissing,
}

impl ErrorKind {
    /// Serialized name of the error type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HeaderMissing => "header_missing",
            Self::HeaderConflict => "header_conflict",
            Self::FieldMissing => "field_missing",
            Self::DuplicateId => "duplicate_id",
            Self::InvalidLocation => "invalid_location",
            Self::FolderMissing => "folder_missing",
            Self::ImageMissing => "image_missing",
            Self::ImageTooLarge => "image_too_large",
            Self::ImageTooSmall => "image_too_small",
            Self::ZipMissing => "zip_missing",
        }
    }

    /// Check if the error concerns the header row rather than a product.
    pub fn is_header_level(self) -> bool {
        matches!(self, Self::HeaderMissing | Self::HeaderConflict)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which image column a file name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    Thumbnail,
    Vton,
    Other,
}

impl ImageType {
    fn label(self) -> &'static str {
        match self {
            Self::Thumbnail => "Thumbnail image",
            Self::Vton => "VTON image",
            Self::Other => "Additional image",
        }
    }
}

/// One violated rule, with enough context to locate and fix it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub detail: String,
    pub fix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<ImageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ValidationError {
    fn new(kind: ErrorKind, message: String, detail: String, fix: String) -> Self {
        Self {
            kind,
            message,
            detail,
            fix,
            line: None,
            product_id: None,
            image_type: None,
            filename: None,
        }
    }

    fn at(mut self, line: usize, product_id: &str) -> Self {
        self.line = Some(line);
        if !product_id.is_empty() {
            self.product_id = Some(product_id.to_string());
        }
        self
    }

    fn image(mut self, image_type: ImageType, filename: &str) -> Self {
        self.image_type = Some(image_type);
        self.filename = Some(filename.to_string());
        self
    }

    pub(crate) fn header_missing(header: &str) -> Self {
        Self::new(
            ErrorKind::HeaderMissing,
            format!("Missing required column \"{header}\""),
            format!("The header row does not contain a \"{header}\" column."),
            format!("Add a \"{header}\" column to the first row of the CSV."),
        )
    }

    pub(crate) fn header_conflict() -> Self {
        Self::new(
            ErrorKind::HeaderConflict,
            "Unexpected \"locations\" column".to_string(),
            "The CSV contains a \"locations\" column but custom location mode is off.".to_string(),
            "Enable custom location mode, or remove the \"locations\" column.".to_string(),
        )
    }

    pub(crate) fn field_missing(line: usize, product_id: &str, field: &str) -> Self {
        Self::new(
            ErrorKind::FieldMissing,
            format!("Line {line}: \"{field}\" is empty"),
            format!("\"{field}\" is required for every product but is blank or null."),
            format!("Fill in \"{field}\" on line {line}."),
        )
        .at(line, product_id)
    }

    pub(crate) fn duplicate_id(line: usize, product_id: &str, first_line: usize) -> Self {
        Self::new(
            ErrorKind::DuplicateId,
            format!("Line {line}: duplicate id \"{product_id}\""),
            format!("Product id \"{product_id}\" was already used on line {first_line}."),
            "Give every product a unique id, or remove the duplicate row.".to_string(),
        )
        .at(line, product_id)
    }

    pub(crate) fn invalid_location(line: usize, product_id: &str, location: &str) -> Self {
        Self::new(
            ErrorKind::InvalidLocation,
            format!("Line {line}: unknown location \"{location}\""),
            format!("\"{location}\" is not one of the client's locations."),
            "Use location names exactly as listed for the client, separated by commas."
                .to_string(),
        )
        .at(line, product_id)
    }

    pub(crate) fn folder_missing(line: usize, product_id: &str) -> Self {
        Self::new(
            ErrorKind::FolderMissing,
            format!("Line {line}: no image folder for product \"{product_id}\""),
            format!("The ZIP has no \"garments/{product_id}/\" folder."),
            format!("Put this product's images in \"garments/{product_id}/\" inside the ZIP."),
        )
        .at(line, product_id)
    }

    pub(crate) fn image_missing(
        line: usize,
        product_id: &str,
        image_type: ImageType,
        filename: &str,
    ) -> Self {
        Self::new(
            ErrorKind::ImageMissing,
            format!("Line {line}: {} \"{filename}\" not found", image_type.label()),
            format!("\"garments/{product_id}/{filename}\" does not exist in the ZIP."),
            "Add the file to the product folder or correct the file name in the CSV.".to_string(),
        )
        .at(line, product_id)
        .image(image_type, filename)
    }

    pub(crate) fn image_too_large(
        line: usize,
        product_id: &str,
        image_type: ImageType,
        filename: &str,
        size: u64,
        max: u64,
    ) -> Self {
        Self::new(
            ErrorKind::ImageTooLarge,
            format!("Line {line}: {} \"{filename}\" is too large", image_type.label()),
            format!(
                "The file is {}; the maximum is {}.",
                format_size(size),
                format_size(max)
            ),
            format!("Compress or resize the image below {}.", format_size(max)),
        )
        .at(line, product_id)
        .image(image_type, filename)
    }

    pub(crate) fn image_too_small(
        line: usize,
        product_id: &str,
        image_type: ImageType,
        filename: &str,
        size: u64,
        min: u64,
    ) -> Self {
        Self::new(
            ErrorKind::ImageTooSmall,
            format!("Line {line}: {} \"{filename}\" is too small", image_type.label()),
            format!(
                "The file is {}; the minimum is {}.",
                format_size(size),
                format_size(min)
            ),
            format!("Use a higher quality image of at least {}.", format_size(min)),
        )
        .at(line, product_id)
        .image(image_type, filename)
    }

    pub(crate) fn zip_missing() -> Self {
        Self::new(
            ErrorKind::ZipMissing,
            "No image ZIP selected".to_string(),
            "Product images are checked against the ZIP archive, which has not been provided."
                .to_string(),
            "Select the ZIP file containing the garments/ folder.".to_string(),
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let value = bytes as f64;
    if value >= MB {
        format!("{:.1} MB", value / MB)
    } else if value >= KB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{bytes} bytes")
    }
}
