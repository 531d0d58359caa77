//! Catalogue validation.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use nexus_zip::ArchiveIndex;

use crate::config::ValidatorConfig;
use crate::normalize::NormalizedCatalogue;
use crate::report::{ImageType, ValidationError};
use crate::schema::{self, ColumnMap, Schema, ID, LOCATIONS, OTHER_IMAGES, THUMBNAIL, VTON};
use crate::table::{parse_csv, ParsedTable, Row};

/// Result of a validation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// Every row passed; the catalogue is ready for upload.
    Valid(NormalizedCatalogue),
    /// At least one rule was violated. Always non-empty.
    Invalid(Vec<ValidationError>),
}

impl ValidationOutcome {
    /// Check if the catalogue passed validation.
    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// All validation errors, in the order they were found.
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            Self::Valid(_) => &[],
            Self::Invalid(errors) => errors,
        }
    }

    /// The first `limit` errors, for display.
    pub fn display_errors(&self, limit: usize) -> &[ValidationError] {
        let errors = self.errors();
        &errors[..errors.len().min(limit)]
    }

    /// The normalized catalogue, if validation passed.
    pub fn catalogue(&self) -> Option<&NormalizedCatalogue> {
        match self {
            Self::Valid(catalogue) => Some(catalogue),
            Self::Invalid(_) => None,
        }
    }

    /// One-line summary carrying the complete error count.
    pub fn summary(&self) -> String {
        match self {
            Self::Valid(catalogue) => format!("{} products ready for upload", catalogue.rows.len()),
            Self::Invalid(errors) if errors.iter().any(|e| e.kind.is_header_level()) => {
                format!("{} header errors; rows were not checked", errors.len())
            }
            Self::Invalid(errors) if errors.len() == 1 => "1 error".to_string(),
            Self::Invalid(errors) => format!("{} errors", errors.len()),
        }
    }
}

/// Parse and validate CSV text.
pub fn validate_csv(
    text: &str,
    index: Option<&ArchiveIndex>,
    config: &ValidatorConfig,
) -> ValidationOutcome {
    validate(&parse_csv(text), index, config)
}

/// Validate a parsed catalogue against the schema and the image archive.
///
/// Header problems stop validation before any row is inspected. Passing
/// `None` for `index` means no archive was selected, which is itself an
/// error; an empty index skips the image checks.
pub fn validate(
    table: &ParsedTable,
    index: Option<&ArchiveIndex>,
    config: &ValidatorConfig,
) -> ValidationOutcome {
    let schema = Schema::new(config.custom_locations);
    let columns = schema.resolve(&table.headers);

    let header_errors = check_headers(table, &schema, &columns, config);
    if !header_errors.is_empty() {
        debug!(errors = header_errors.len(), "header check failed");
        return ValidationOutcome::Invalid(header_errors);
    }

    let mut scanner = RowScanner::new(&schema, &columns, index, config);
    for row in table.rows.iter().filter(|row| !row.is_blank()) {
        scanner.scan(row);
    }

    let mut errors = scanner.errors;
    if index.is_none() {
        errors.push(ValidationError::zip_missing());
    }

    if !errors.is_empty() {
        debug!(errors = errors.len(), "row validation failed");
        return ValidationOutcome::Invalid(errors);
    }

    ValidationOutcome::Valid(NormalizedCatalogue::build(table, &schema, &columns))
}

fn check_headers(
    table: &ParsedTable,
    schema: &Schema,
    columns: &ColumnMap,
    config: &ValidatorConfig,
) -> Vec<ValidationError> {
    let mut errors: Vec<ValidationError> = schema
        .required()
        .iter()
        .filter(|&&name| columns.index_of(name).is_none())
        .map(|&name| ValidationError::header_missing(name))
        .collect();

    if !config.custom_locations
        && table.headers.iter().any(|h| schema::header_matches(h, LOCATIONS))
    {
        errors.push(ValidationError::header_conflict());
    }

    errors
}

/// Blank, or the literal `null` placeholder.
fn is_absent(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("null")
}

struct RowScanner<'a> {
    schema: &'a Schema,
    columns: &'a ColumnMap,
    config: &'a ValidatorConfig,
    index: Option<&'a ArchiveIndex>,
    folders: FxHashSet<&'a str>,
    locations: FxHashSet<String>,
    seen_ids: FxHashMap<&'a str, usize>,
    errors: Vec<ValidationError>,
}

impl<'a> RowScanner<'a> {
    fn new(
        schema: &'a Schema,
        columns: &'a ColumnMap,
        index: Option<&'a ArchiveIndex>,
        config: &'a ValidatorConfig,
    ) -> Self {
        let index = index.filter(|index| !index.is_empty());
        let folders = index.map(ArchiveIndex::folder_prefixes).unwrap_or_default();
        let locations = config
            .valid_locations
            .iter()
            .map(|name| name.trim().to_lowercase())
            .collect();

        Self {
            schema,
            columns,
            config,
            index,
            folders,
            locations,
            seen_ids: FxHashMap::default(),
            errors: Vec::new(),
        }
    }

    fn value(&self, row: &'a Row, name: &str) -> &'a str {
        self.columns.index_of(name).map(|i| row.get(i)).unwrap_or("")
    }

    fn scan(&mut self, row: &'a Row) {
        let id = self.value(row, ID);

        for &field in self.schema.required() {
            if is_absent(self.value(row, field)) {
                self.errors.push(ValidationError::field_missing(row.line, id, field));
            }
        }

        if !is_absent(id) {
            if let Some(&first_line) = self.seen_ids.get(id) {
                self.errors.push(ValidationError::duplicate_id(row.line, id, first_line));
            } else {
                self.seen_ids.insert(id, row.line);
            }
        }

        if self.config.custom_locations {
            self.check_locations(row, id);
        }

        if self.index.is_some() && !is_absent(id) {
            self.check_images(row, id);
        }
    }

    fn check_locations(&mut self, row: &'a Row, id: &str) {
        let field = self.value(row, LOCATIONS);
        if is_absent(field) {
            return;
        }

        for location in field.split(',').map(str::trim).filter(|l| !l.is_empty()) {
            if !self.locations.contains(&location.to_lowercase()) {
                self.errors
                    .push(ValidationError::invalid_location(row.line, id, location));
            }
        }
    }

    fn check_images(&mut self, row: &'a Row, id: &str) {
        if !self.folders.contains(format!("garments/{id}/").as_str()) {
            self.errors.push(ValidationError::folder_missing(row.line, id));
            return;
        }

        self.check_image(row.line, id, ImageType::Thumbnail, self.value(row, THUMBNAIL));
        self.check_image(row.line, id, ImageType::Vton, self.value(row, VTON));

        let others = self.value(row, OTHER_IMAGES);
        for filename in others.split(';').map(str::trim) {
            self.check_image(row.line, id, ImageType::Other, filename);
        }
    }

    fn check_image(&mut self, line: usize, id: &str, image_type: ImageType, filename: &str) {
        if is_absent(filename) {
            return;
        }
        let Some(index) = self.index else {
            return;
        };

        let error = match index.get(&format!("garments/{id}/{filename}")) {
            None => Some(ValidationError::image_missing(line, id, image_type, filename)),
            Some(size) if size > self.config.max_image_size => {
                Some(ValidationError::image_too_large(
                    line,
                    id,
                    image_type,
                    filename,
                    size,
                    self.config.max_image_size,
                ))
            }
            Some(size) if size < self.config.min_image_size => {
                Some(ValidationError::image_too_small(
                    line,
                    id,
                    image_type,
                    filename,
                    size,
                    self.config.min_image_size,
                ))
            }
            Some(_) => None,
        };

        self.errors.extend(error);
    }
}
