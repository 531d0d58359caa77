//! The fixed catalogue column schema.

/// Product id column.
pub const ID: &str = "id";
/// Discount column; also accepted under the name `Discount`.
pub const DISCOUNT: &str = "Discount %";
/// Alias accepted for [`DISCOUNT`].
pub const DISCOUNT_ALIAS: &str = "Discount";
/// Thumbnail image file name.
pub const THUMBNAIL: &str = "Thumbnail Image Filename";
/// Virtual try-on image file name.
pub const VTON: &str = "Vton Ready Image Filename";
/// Semicolon-separated list of further image file names.
pub const OTHER_IMAGES: &str = "Other images filename";
/// Per-product locations, only present in custom-location mode.
pub const LOCATIONS: &str = "locations";

/// Columns in output order.
pub const EXPECTED_HEADERS: [&str; 15] = [
    ID,
    "Name",
    "Brand",
    "MRP",
    DISCOUNT,
    "Category",
    "Sub_Category",
    "Gender",
    "Color",
    "Description",
    "Material Care",
    "sizes",
    THUMBNAIL,
    VTON,
    OTHER_IMAGES,
];

/// Columns that must be present and filled in for every product.
pub const REQUIRED_HEADERS: [&str; 11] = [
    ID,
    "Name",
    "Brand",
    "MRP",
    "Category",
    "Gender",
    "Color",
    "sizes",
    THUMBNAIL,
    VTON,
    OTHER_IMAGES,
];

/// Check if an input header names a schema column.
///
/// Comparison ignores surrounding whitespace and ASCII case.
pub fn header_matches(input: &str, expected: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case(expected)
        || (expected == DISCOUNT && input.eq_ignore_ascii_case(DISCOUNT_ALIAS))
}

/// The column layout for one validation mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    expected: Vec<&'static str>,
    required: Vec<&'static str>,
}

impl Schema {
    /// Build the schema, appending `locations` in custom-location mode.
    pub fn new(custom_locations: bool) -> Self {
        let mut expected = EXPECTED_HEADERS.to_vec();
        let mut required = REQUIRED_HEADERS.to_vec();
        if custom_locations {
            expected.push(LOCATIONS);
            required.push(LOCATIONS);
        }
        Self { expected, required }
    }

    /// Columns in output order.
    #[inline]
    pub fn expected(&self) -> &[&'static str] {
        &self.expected
    }

    /// Columns that must be present and non-blank.
    #[inline]
    pub fn required(&self) -> &[&'static str] {
        &self.required
    }

    /// Map each expected column to the first matching input header.
    pub fn resolve(&self, headers: &[String]) -> ColumnMap {
        let columns = self
            .expected
            .iter()
            .map(|&name| {
                let index = headers.iter().position(|h| header_matches(h, name));
                (name, index)
            })
            .collect();

        ColumnMap { columns }
    }
}

/// Resolved input column index for every expected column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    columns: Vec<(&'static str, Option<usize>)>,
}

impl ColumnMap {
    /// Input column index of an expected column.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|(expected, _)| *expected == name)
            .and_then(|(_, index)| *index)
    }

    /// Iterate `(expected name, input index)` in output order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<usize>)> + '_ {
        self.columns.iter().copied()
    }

    /// Check if an input column was claimed by the schema.
    pub fn is_mapped(&self, input_index: usize) -> bool {
        self.columns.iter().any(|(_, index)| *index == Some(input_index))
    }
}
