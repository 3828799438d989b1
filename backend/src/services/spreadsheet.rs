//! XLSX rendering of a [`ReportDocument`].
//!
//! One worksheet: a bold header row, one worksheet row per body row, column
//! widths sized to the longest text in each column and the document's outline
//! groups applied as Excel row groups with the summary rows above their
//! detail.

use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet, XlsxError};

use super::report_builder::{Cell, OutlineGroup, ReportDocument, RowKind};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to create Excel: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("Report has {rows} rows, more than a worksheet holds")]
    TooManyRows { rows: usize },
}

/// Maximum number of rows of an XLSX worksheet.
const MAX_SHEET_ROWS: usize = 1_048_576;

/// Spreadsheet renderer for daily reports.
#[derive(Clone, Debug)]
pub struct SpreadsheetRenderer {
    /// Worksheet name.
    pub sheet_name: String,
    /// Characters added to the longest text of each column.
    pub column_padding: usize,
}

impl Default for SpreadsheetRenderer {
    fn default() -> Self {
        Self {
            sheet_name: "Отчёт".to_string(),
            column_padding: 2,
        }
    }
}

struct SheetFormats {
    header: Format,
    branch: Format,
    direction: Format,
}

impl SheetFormats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold().set_align(FormatAlign::Center),
            branch: Format::new().set_bold(),
            direction: Format::new().set_italic(),
        }
    }

    fn for_row(&self, kind: RowKind) -> Option<&Format> {
        match kind {
            RowKind::BranchHeader => Some(&self.branch),
            RowKind::DirectionHeader => Some(&self.direction),
            RowKind::Detail => None,
        }
    }
}

impl SpreadsheetRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Render the document to XLSX bytes.
    pub fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, RenderError> {
        if document.rows.len() + 1 > MAX_SHEET_ROWS {
            return Err(RenderError::TooManyRows {
                rows: document.rows.len(),
            });
        }

        let mut workbook = Workbook::new();
        let formats = SheetFormats::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name)?;

        self.write_header(sheet, document, &formats)?;
        self.write_rows(sheet, document, &formats)?;
        self.apply_groups(sheet, document)?;

        for (col, width) in self.column_widths(document).into_iter().enumerate() {
            sheet.set_column_width(col as u16, width as f64)?;
        }

        let buffer = workbook.save_to_buffer()?;
        log::debug!(
            "Rendered report sheet '{}': {} rows, {} bytes",
            self.sheet_name,
            document.rows.len(),
            buffer.len()
        );
        Ok(buffer)
    }

    fn write_header(
        &self,
        sheet: &mut Worksheet,
        document: &ReportDocument,
        formats: &SheetFormats,
    ) -> Result<(), RenderError> {
        for (col, label) in document.header.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, label, &formats.header)?;
        }
        Ok(())
    }

    fn write_rows(
        &self,
        sheet: &mut Worksheet,
        document: &ReportDocument,
        formats: &SheetFormats,
    ) -> Result<(), RenderError> {
        for (index, row) in document.rows.iter().enumerate() {
            let sheet_row = ReportDocument::sheet_row(index);
            let format = formats.for_row(row.kind);

            for (col, cell) in row.cells().iter().enumerate() {
                let col = col as u16;
                match (cell, format) {
                    (Cell::Blank, _) => {}
                    (Cell::Text(text), Some(f)) => {
                        sheet.write_string_with_format(sheet_row, col, text, f)?;
                    }
                    (Cell::Text(text), None) => {
                        sheet.write_string(sheet_row, col, text)?;
                    }
                    (Cell::Number(n), Some(f)) => {
                        sheet.write_number_with_format(sheet_row, col, *n, f)?;
                    }
                    (Cell::Number(n), None) => {
                        sheet.write_number(sheet_row, col, *n)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_groups(
        &self,
        sheet: &mut Worksheet,
        document: &ReportDocument,
    ) -> Result<(), RenderError> {
        sheet.group_symbols_above(true);
        for group in ordered_groups(&document.groups) {
            if group.collapsed {
                sheet.group_rows_collapsed(group.first_row, group.last_row)?;
            } else {
                sheet.group_rows(group.first_row, group.last_row)?;
            }
        }
        Ok(())
    }

    /// Width of each column: longest text in the column (header included)
    /// plus the padding.
    pub fn column_widths(&self, document: &ReportDocument) -> Vec<usize> {
        let mut widths: Vec<usize> = document
            .header
            .iter()
            .map(|label| label.chars().count())
            .collect();

        for row in &document.rows {
            for (col, cell) in row.cells().iter().enumerate() {
                let len = cell.display_text().chars().count();
                match widths.get_mut(col) {
                    Some(width) => *width = (*width).max(len),
                    None => widths.push(len),
                }
            }
        }

        widths
            .into_iter()
            .map(|w| w + self.column_padding)
            .collect()
    }
}

/// Groups in application order: outer levels first, document order within a
/// level.
pub fn ordered_groups(groups: &[OutlineGroup]) -> Vec<&OutlineGroup> {
    let mut ordered: Vec<&OutlineGroup> = groups.iter().collect();
    ordered.sort_by_key(|g| g.level);
    ordered
}
