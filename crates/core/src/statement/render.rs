//! Printable statement documents.
//!
//! The renderer lays rows out with a vertical cursor in page units: the first
//! row of a page sits at `first_row_y` and every row advances the cursor by
//! `row_advance`. Before a row is written, a cursor past `page_limit_y`
//! starts a new page (form feed) and repeats the column header.

use std::fmt::Write as _;

use chrono::NaiveDate;
use ledgerbank_shared::types::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

use super::reconstructor::PeriodStatement;

/// Page break marker in the text output.
pub const FORM_FEED: char = '\u{0C}';

const DESCRIPTION_WIDTH: usize = 28;

/// Errors raised while rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing into the output buffer failed.
    #[error("failed to format statement: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Metadata printed above the rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementHeader {
    /// Account holder's full name.
    pub customer_name: String,
    /// Account holder's postal address.
    pub address: String,
    /// Account the statement is for.
    pub account_id: AccountId,
    /// `M/YYYY`.
    pub period_label: String,
    /// Balance before the period.
    pub opening_balance: Decimal,
    /// Balance after the period.
    pub closing_balance: Decimal,
}

/// One printed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRow {
    /// Booking date.
    pub date: NaiveDate,
    /// Entry id.
    pub entry_id: String,
    /// Entry description.
    pub description: String,
    /// Debit column.
    pub debit: Decimal,
    /// Credit column.
    pub credit: Decimal,
    /// Running balance column.
    pub balance: Decimal,
}

/// Everything a renderer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementDocument {
    /// Header block.
    pub header: StatementHeader,
    /// Rows, oldest first.
    pub rows: Vec<StatementRow>,
}

impl StatementDocument {
    /// Builds a document from a reconstructed statement.
    #[must_use]
    pub fn from_statement(
        statement: &PeriodStatement,
        customer_name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            header: StatementHeader {
                customer_name: customer_name.into(),
                address: address.into(),
                account_id: statement.account_id.clone(),
                period_label: statement.period.label(),
                opening_balance: statement.opening_balance,
                closing_balance: statement.closing_balance,
            },
            rows: statement
                .lines
                .iter()
                .map(|line| StatementRow {
                    date: line.entry.recorded_at.date_naive(),
                    entry_id: line.entry.id.to_string(),
                    description: line.entry.description.clone(),
                    debit: line.debit,
                    credit: line.credit,
                    balance: line.balance,
                })
                .collect(),
        }
    }
}

/// Turns a statement document into bytes.
pub trait StatementRenderer: Send + Sync {
    /// MIME type of the output.
    fn content_type(&self) -> &'static str;

    /// File extension for downloads, without the dot.
    fn file_extension(&self) -> &'static str;

    /// Renders the document.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the output cannot be produced.
    fn render(&self, document: &StatementDocument) -> Result<Vec<u8>, RenderError>;
}

/// Vertical layout of a page, in page units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    /// Cursor position of the first row on each page.
    pub first_row_y: u32,
    /// Cursor advance per row.
    pub row_advance: u32,
    /// Cursor position past which a new page starts.
    pub page_limit_y: u32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            first_row_y: 220,
            row_advance: 40,
            page_limit_y: 720,
        }
    }
}

impl PageLayout {
    /// Rows that fit on one page.
    #[must_use]
    pub fn rows_per_page(&self) -> usize {
        let span = self.page_limit_y.saturating_sub(self.first_row_y);
        usize::try_from(span / self.row_advance.max(1)).map_or(1, |rows| rows + 1)
    }
}

/// Plain-text, UTF-8, form-feed paginated renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextStatementRenderer {
    layout: PageLayout,
}

impl TextStatementRenderer {
    /// Creates a renderer with a custom layout.
    #[must_use]
    pub fn with_layout(layout: PageLayout) -> Self {
        Self { layout }
    }

    fn write_title(out: &mut String, header: &StatementHeader) -> std::fmt::Result {
        writeln!(out, "ACCOUNT STATEMENT")?;
        writeln!(out, "Customer: {}", printable(&header.customer_name).collect::<String>())?;
        writeln!(out, "Address:  {}", printable(&header.address).collect::<String>())?;
        writeln!(out, "Account:  {}", header.account_id)?;
        writeln!(out, "Period:   {}", header.period_label)?;
        writeln!(out, "Opening balance: {}", format_amount(header.opening_balance))?;
        writeln!(out)
    }

    fn write_column_header(out: &mut String) -> std::fmt::Result {
        let header = format!(
            "{:<10}  {:<13}  {:<DESCRIPTION_WIDTH$}  {:>12}  {:>12}  {:>12}",
            "Date", "Entry", "Description", "Debits", "Credits", "Balance"
        );
        writeln!(out, "{header}")?;
        writeln!(out, "{}", "-".repeat(header.chars().count()))
    }

    fn write_row(out: &mut String, row: &StatementRow) -> std::fmt::Result {
        let description: String = printable(&row.description).take(DESCRIPTION_WIDTH).collect();
        writeln!(
            out,
            "{:<10}  {:<13}  {:<DESCRIPTION_WIDTH$}  {:>12}  {:>12}  {:>12}",
            row.date.format("%Y-%m-%d"),
            row.entry_id,
            description,
            format_amount(row.debit),
            format_amount(row.credit),
            format_amount(row.balance),
        )
    }
}

impl StatementRenderer for TextStatementRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, document: &StatementDocument) -> Result<Vec<u8>, RenderError> {
        let mut out = String::new();
        Self::write_title(&mut out, &document.header)?;
        Self::write_column_header(&mut out)?;

        let mut cursor = self.layout.first_row_y;
        for row in &document.rows {
            if cursor > self.layout.page_limit_y {
                out.push(FORM_FEED);
                Self::write_column_header(&mut out)?;
                cursor = self.layout.first_row_y;
            }
            Self::write_row(&mut out, row)?;
            cursor += self.layout.row_advance;
        }

        writeln!(out)?;
        writeln!(
            out,
            "Closing balance: {}",
            format_amount(document.header.closing_balance)
        )?;

        Ok(out.into_bytes())
    }
}

/// Control characters become spaces so stored text cannot break lines or pages.
fn printable(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().map(|c| if c.is_control() { ' ' } else { c })
}

/// Two decimals, or a bare `0` for zero.
fn format_amount(amount: Decimal) -> String {
    if amount.is_zero() {
        "0".to_string()
    } else {
        format!("{:.2}", amount.round_dp(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn document(rows: usize) -> StatementDocument {
        StatementDocument {
            header: StatementHeader {
                customer_name: "Ada Lovelace".into(),
                address: "12 Analytical St".into(),
                account_id: AccountId::generate(),
                period_label: "3/2024".into(),
                opening_balance: dec!(1200),
                closing_balance: dec!(1150),
            },
            rows: (0..rows)
                .map(|i| StatementRow {
                    date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                    entry_id: format!("{:013}", 1_000_000_000_000_u64 + i as u64),
                    description: "Rent".into(),
                    debit: dec!(50),
                    credit: Decimal::ZERO,
                    balance: dec!(1150),
                })
                .collect(),
        }
    }

    fn render(rows: usize) -> String {
        let bytes = TextStatementRenderer::default().render(&document(rows)).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_default_layout_fits_thirteen_rows() {
        assert_eq!(PageLayout::default().rows_per_page(), 13);
    }

    #[test]
    fn test_page_breaks() {
        assert_eq!(render(0).matches(FORM_FEED).count(), 0);
        assert_eq!(render(13).matches(FORM_FEED).count(), 0);
        assert_eq!(render(14).matches(FORM_FEED).count(), 1);
        assert_eq!(render(26).matches(FORM_FEED).count(), 1);
        assert_eq!(render(27).matches(FORM_FEED).count(), 2);
    }

    #[test]
    fn test_header_repeats_on_every_page() {
        let text = render(30);
        let pages: Vec<&str> = text.split(FORM_FEED).collect();
        assert_eq!(pages.len(), 3);
        for page in pages {
            assert!(page.contains("Description"));
            assert!(page.contains("----------"));
        }
    }

    #[test]
    fn test_amount_columns() {
        let text = render(1);
        let row = text.lines().find(|l| l.contains("Rent")).unwrap();
        assert!(row.contains("50.00"));
        assert!(row.split_whitespace().any(|cell| cell == "0"));
        assert!(text.contains("Opening balance: 1200.00"));
        assert!(text.trim_end().ends_with("Closing balance: 1150.00"));
    }

    #[test]
    fn test_long_descriptions_are_truncated() {
        let mut doc = document(1);
        doc.rows[0].description = "x".repeat(100);
        let text = String::from_utf8(TextStatementRenderer::default().render(&doc).unwrap()).unwrap();
        assert!(!text.contains(&"x".repeat(DESCRIPTION_WIDTH + 1)));
    }

    #[test]
    fn test_control_characters_cannot_forge_rows() {
        let mut doc = document(1);
        doc.rows[0].description = format!("Rent\n2024-03-11  0000000000000{FORM_FEED}x\r\t");
        let text = String::from_utf8(TextStatementRenderer::default().render(&doc).unwrap()).unwrap();

        assert_eq!(text.matches(FORM_FEED).count(), 0);
        assert!(!text.contains('\r'));
        assert!(!text.contains('\t'));
        let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("2024-03-")).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].starts_with("2024-03-10"));
        assert!(rows[0].contains("Rent 2024-03-11"));
    }

    #[test]
    fn test_renderer_metadata() {
        let renderer = TextStatementRenderer::default();
        assert_eq!(renderer.content_type(), "text/plain; charset=utf-8");
        assert_eq!(renderer.file_extension(), "txt");
    }
}
