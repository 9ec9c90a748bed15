//! services/api/src/adapters/render.rs
//!
//! `ExportRenderer` implementations: a styled spreadsheet and a CSV file.
//! Both lay out the same twelve columns in the same order.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};
use testcase_core::domain::{ExportFormat, TestCase};
use testcase_core::ports::{ExportRenderer, PortError, PortResult, RenderedExport};

pub const COLUMN_HEADERS: [&str; 12] = [
    "Test ID",
    "Module",
    "Test Scenario",
    "Preconditions",
    "Steps",
    "Test Data",
    "Expected Result",
    "Actual Result",
    "Status",
    "Priority",
    "Severity",
    "Edge Cases",
];

const COLUMN_WIDTHS: [f64; 12] = [
    12.0, 20.0, 35.0, 25.0, 40.0, 20.0, 35.0, 20.0, 12.0, 12.0, 12.0, 30.0,
];

const HEADER_COLOR: u32 = 0x4472C4;

fn columns(case: &TestCase) -> [&str; 12] {
    [
        &case.test_id,
        &case.module,
        &case.test_scenario,
        &case.preconditions,
        &case.steps,
        &case.test_data,
        &case.expected_result,
        &case.actual_result,
        case.status.as_str(),
        case.priority.as_str(),
        case.severity.as_str(),
        &case.edge_cases,
    ]
}

//=========================================================================================
// Spreadsheet
//=========================================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetRenderer;

impl SpreadsheetRenderer {
    fn workbook(cases: &[TestCase]) -> Result<Vec<u8>, XlsxError> {
        let header_format = Format::new()
            .set_bold()
            .set_font_size(11)
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(HEADER_COLOR))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin);
        let cell_format = Format::new()
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::Top)
            .set_text_wrap()
            .set_border(FormatBorder::Thin);

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Test Cases")?;

        for (col, header) in (0u16..).zip(COLUMN_HEADERS) {
            sheet.write_string_with_format(0, col, header, &header_format)?;
        }
        for (row, case) in (1u32..).zip(cases) {
            for (col, value) in (0u16..).zip(columns(case)) {
                sheet.write_string_with_format(row, col, value, &cell_format)?;
            }
        }
        for (col, width) in (0u16..).zip(COLUMN_WIDTHS) {
            sheet.set_column_width(col, width)?;
        }
        sheet.set_freeze_panes(1, 0)?;

        workbook.save_to_buffer()
    }
}

impl ExportRenderer for SpreadsheetRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Spreadsheet
    }

    fn render(&self, cases: &[TestCase]) -> PortResult<RenderedExport> {
        let bytes = Self::workbook(cases).map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(RenderedExport {
            bytes,
            filename: None,
        })
    }
}

//=========================================================================================
// CSV
//=========================================================================================

/// Multi-line steps are flattened to a single line joined with " | ".
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRenderer;

impl ExportRenderer for CsvRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::DelimitedText
    }

    fn render(&self, cases: &[TestCase]) -> PortResult<RenderedExport> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(COLUMN_HEADERS)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        for case in cases {
            let steps = case.steps.replace("\r\n", "\n").replace('\n', " | ");
            let mut record = columns(case);
            record[4] = &steps;
            writer
                .write_record(record)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(RenderedExport {
            bytes,
            filename: None,
        })
    }
}
