use bandi_core::Money;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementColumns {
    pub date_column: Option<usize>,
    pub description_column: Option<usize>,
    pub amount_column: Option<usize>,
    /// Money leaving the account ("Addebiti", "Dare").
    pub debit_column: Option<usize>,
    /// Money entering the account ("Accrediti", "Avere").
    pub credit_column: Option<usize>,
    pub counterpart_column: Option<usize>,
    pub category_column: Option<usize>,
    pub date_format: String,
}

impl Default for StatementColumns {
    fn default() -> Self {
        Self {
            date_column: None,
            description_column: None,
            amount_column: None,
            debit_column: None,
            credit_column: None,
            counterpart_column: None,
            category_column: None,
            date_format: "%d/%m/%Y".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementProfile {
    pub name: String,
    pub columns: StatementColumns,
    pub has_header: bool,
    pub delimiter: String,
    /// Comma is the decimal separator, so `1.234` means one thousand two
    /// hundred thirty-four.
    pub decimal_comma: bool,
}

impl Default for StatementProfile {
    fn default() -> Self {
        Self {
            name: "Unnamed Profile".to_string(),
            columns: StatementColumns::default(),
            has_header: true,
            delimiter: ";".to_string(),
            decimal_comma: true,
        }
    }
}

impl StatementProfile {
    pub fn from_toml(toml_content: &str) -> Result<Self, CsvError> {
        toml::from_str(toml_content).map_err(|e| CsvError::Profile(e.to_string()))
    }

    /// `Data;Descrizione;Importo;Controparte`, the common Italian
    /// home-banking export.
    pub fn home_banking() -> Self {
        Self {
            name: "Home banking".to_string(),
            columns: StatementColumns {
                date_column: Some(0),
                description_column: Some(1),
                amount_column: Some(2),
                counterpart_column: Some(3),
                ..StatementColumns::default()
            },
            ..Self::default()
        }
    }
}

/// One parsed statement row, not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementLine {
    pub date: NaiveDate,
    pub description: String,
    /// Signed: debits negative, credits positive.
    pub amount: Money,
    pub counterpart_name: Option<String>,
    pub category: Option<String>,
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Invalid statement profile: {0}")]
    Profile(String),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Invalid date format: {0}")]
    InvalidDate(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("No data rows")]
    NoDataRows,
}

pub struct StatementImporter;

impl StatementImporter {
    pub fn parse_profile<R: Read>(
        reader: &mut csv::Reader<R>,
        profile: &StatementProfile,
    ) -> Result<Vec<StatementLine>, CsvError> {
        let mut lines = Vec::new();
        let columns = &profile.columns;

        let date_col = columns
            .date_column
            .ok_or_else(|| CsvError::MissingColumn("date_column".to_string()))?;
        if columns.amount_column.is_none()
            && (columns.debit_column.is_none() || columns.credit_column.is_none())
        {
            return Err(CsvError::MissingColumn(
                "amount_column or debit_column + credit_column".to_string(),
            ));
        }

        for (row, result) in reader.records().enumerate() {
            let record = result?;

            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }

            let field = record
                .get(date_col)
                .ok_or_else(|| CsvError::MissingColumn(format!("date_column {}", date_col)))?;
            let date = match parse_date(field, &columns.date_format) {
                Ok(d) => d,
                // Banks append balance and footer lines without a date.
                Err(e) if field.trim().is_empty() => {
                    tracing::warn!(row, "skipping statement row without date: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let description = columns
                .description_column
                .and_then(|col| record.get(col))
                .unwrap_or_default()
                .trim()
                .to_string();

            let amount = if let Some(col) = columns.amount_column {
                parse_amount(record.get(col).unwrap_or_default(), profile.decimal_comma)?
            } else {
                let debit = optional_amount(&record, columns.debit_column, profile.decimal_comma)?;
                let credit = optional_amount(&record, columns.credit_column, profile.decimal_comma)?;
                match (debit, credit) {
                    (Some(d), None) => -d.abs(),
                    (None, Some(c)) => c.abs(),
                    (Some(d), Some(c)) => c.abs() - d.abs(),
                    (None, None) => Money::zero(),
                }
            };

            lines.push(StatementLine {
                date,
                description,
                amount,
                counterpart_name: optional_text(&record, columns.counterpart_column),
                category: optional_text(&record, columns.category_column),
            });
        }

        if lines.is_empty() {
            return Err(CsvError::NoDataRows);
        }

        Ok(lines)
    }
}

fn optional_text(record: &csv::StringRecord, col: Option<usize>) -> Option<String> {
    col.and_then(|c| record.get(c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn optional_amount(
    record: &csv::StringRecord,
    col: Option<usize>,
    decimal_comma: bool,
) -> Result<Option<Money>, CsvError> {
    col.and_then(|c| record.get(c))
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_amount(s, decimal_comma))
        .transpose()
}

fn parse_date(s: &str, format: &str) -> Result<NaiveDate, CsvError> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, format) {
        return Ok(date);
    }

    for fmt in &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%d/%m/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(CsvError::InvalidDate(s.to_string()))
}

/// Parses `1.234,56`, `1,234.56`, `€ -12,50`, `(75.25)` and plain numbers.
/// The right-most of `.`/`,` is the decimal separator when both appear; a
/// lone comma is always decimal. With `decimal_comma`, dots grouping digits
/// in threes (`1.234`, `12.500.000`) are thousands separators. Amounts with
/// more than two decimals are rejected rather than rounded.
fn parse_amount(s: &str, decimal_comma: bool) -> Result<Money, CsvError> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '€' | '$' | ' ' | '\u{a0}' | '\''))
        .collect();

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        (Some(_), None) if decimal_comma && is_dot_grouped(&cleaned) => cleaned.replace('.', ""),
        _ => cleaned.clone(),
    };

    let mut dec = Decimal::from_str(&normalized)
        .map_err(|_| CsvError::InvalidAmount(s.to_string()))?;
    if dec.normalize().scale() > 2 {
        return Err(CsvError::InvalidAmount(s.to_string()));
    }
    if negative {
        dec = -dec;
    }
    Ok(Money::from_decimal(dec))
}

/// `1.234`, `-12.500.000`: a leading group of one to three digits, then
/// groups of exactly three.
fn is_dot_grouped(s: &str) -> bool {
    let digits = s.trim_start_matches(['-', '+']);
    let mut groups = digits.split('.');
    let lead_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.chars().all(|c| c.is_ascii_digit()));
    let mut rest = groups.peekable();
    lead_ok
        && rest.peek().is_some()
        && rest.all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

pub fn parse<R: Read>(
    reader: &mut csv::Reader<R>,
    profile: &StatementProfile,
) -> Result<Vec<StatementLine>, CsvError> {
    StatementImporter::parse_profile(reader, profile)
}

pub fn import_statement<R: Read>(
    data: R,
    profile: &StatementProfile,
) -> Result<Vec<StatementLine>, CsvError> {
    let delimiter = profile
        .delimiter
        .as_bytes()
        .first()
        .copied()
        .unwrap_or(b';');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(profile.has_header)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(data);

    parse(&mut reader, profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_plain() {
        assert_eq!(parse_amount("123.45", true).unwrap(), cents(12345));
    }

    #[test]
    fn parse_amount_italian_format() {
        assert_eq!(parse_amount("1.234,56", true).unwrap(), cents(123456));
        assert_eq!(parse_amount("-12,50", true).unwrap(), cents(-1250));
    }

    #[test]
    fn parse_amount_english_thousands() {
        assert_eq!(parse_amount("1,234.56", true).unwrap(), cents(123456));
    }

    #[test]
    fn parse_amount_with_currency_symbol() {
        assert_eq!(parse_amount("€ 99,99", true).unwrap(), cents(9999));
    }

    #[test]
    fn parse_amount_accounting_parens() {
        assert_eq!(parse_amount("(75.25)", true).unwrap(), cents(-7525));
    }

    #[test]
    fn parse_amount_whole_number() {
        assert_eq!(parse_amount("100", true).unwrap(), cents(10000));
    }

    #[test]
    fn parse_amount_dot_thousands_with_decimal_comma() {
        assert_eq!(parse_amount("1.234", true).unwrap(), cents(123400));
        assert_eq!(parse_amount("-12.500.000", true).unwrap(), cents(-1_250_000_000));
        // two decimals after a lone dot stay decimal
        assert_eq!(parse_amount("12.50", true).unwrap(), cents(1250));
    }

    #[test]
    fn parse_amount_never_rounds_extra_decimals() {
        assert!(parse_amount("1.234", false).is_err());
        assert!(parse_amount("10,005", true).is_err());
        assert_eq!(parse_amount("1.230", false).unwrap(), cents(123));
    }

    #[test]
    fn parse_amount_invalid() {
        assert!(parse_amount("not_a_number", true).is_err());
        assert!(parse_amount("", true).is_err());
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn parse_date_italian() {
        let d = parse_date("10/03/2024", "%d/%m/%Y").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }

    #[test]
    fn parse_date_iso_fallback() {
        let d = parse_date("2024-03-10", "%d/%m/%Y").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }

    #[test]
    fn parse_date_invalid() {
        assert!(parse_date("not-a-date", "%d/%m/%Y").is_err());
    }

    // ── full import ───────────────────────────────────────────────────────────

    fn amount_profile() -> StatementProfile {
        StatementProfile::home_banking()
    }

    #[test]
    fn import_with_signed_amount_column() {
        let data = "data;descrizione;importo;controparte\n\
                    10/03/2024;FATTURA 4521;-120,00;ACME SRL\n\
                    11/03/2024;ACCREDITO CONTRIBUTO;5.000,00;\n";
        let lines = import_statement(data.as_bytes(), &amount_profile()).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].amount, cents(-12000));
        assert_eq!(lines[0].counterpart_name.as_deref(), Some("ACME SRL"));
        assert_eq!(lines[1].amount, cents(500000));
        assert_eq!(lines[1].counterpart_name, None);
    }

    #[test]
    fn import_debit_credit_columns() {
        let data = "data;descrizione;dare;avere\n\
                    10/03/2024;BONIFICO;120,00;\n\
                    11/03/2024;ACCREDITO;;50,00\n";
        let profile = StatementProfile {
            columns: StatementColumns {
                date_column: Some(0),
                description_column: Some(1),
                debit_column: Some(2),
                credit_column: Some(3),
                ..StatementColumns::default()
            },
            ..amount_profile()
        };
        let lines = import_statement(data.as_bytes(), &profile).unwrap();
        assert_eq!(lines[0].amount, cents(-12000));
        assert_eq!(lines[1].amount, cents(5000));
    }

    #[test]
    fn trailing_rows_without_date_are_skipped() {
        let data = "data;descrizione;importo;controparte\n\
                    10/03/2024;POS;-5,00;\n\
                    ;SALDO FINALE;1.000,00;\n";
        let lines = import_statement(data.as_bytes(), &amount_profile()).unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn italian_thousands_without_decimals() {
        let data = "data;descrizione;importo;controparte\n\
                    10/03/2024;BONIFICO ANTICIPO;-1.234;\n";
        let lines = import_statement(data.as_bytes(), &amount_profile()).unwrap();
        assert_eq!(lines[0].amount, cents(-123400));

        let english = StatementProfile {
            decimal_comma: false,
            ..amount_profile()
        };
        assert!(matches!(
            import_statement(data.as_bytes(), &english),
            Err(CsvError::InvalidAmount(_))
        ));
    }

    #[test]
    fn bad_date_is_an_error() {
        let data = "data;descrizione;importo;controparte\n31/02/2024;POS;-5,00;\n";
        assert!(matches!(
            import_statement(data.as_bytes(), &amount_profile()),
            Err(CsvError::InvalidDate(_))
        ));
    }

    #[test]
    fn profile_without_amount_columns_is_rejected() {
        let profile = StatementProfile {
            columns: StatementColumns {
                date_column: Some(0),
                ..StatementColumns::default()
            },
            ..amount_profile()
        };
        assert!(matches!(
            import_statement("a;b\n".as_bytes(), &profile),
            Err(CsvError::MissingColumn(_))
        ));
    }

    #[test]
    fn no_data_rows_errors() {
        let data = "data;descrizione;importo;controparte\n";
        assert!(matches!(
            import_statement(data.as_bytes(), &amount_profile()),
            Err(CsvError::NoDataRows)
        ));
    }

    #[test]
    fn profile_from_toml() {
        let profile = StatementProfile::from_toml(
            r#"
            name = "Banca Esempio"
            delimiter = ","

            [columns]
            date_column = 0
            description_column = 2
            amount_column = 3
            date_format = "%Y-%m-%d"
            "#,
        )
        .unwrap();
        assert_eq!(profile.name, "Banca Esempio");
        assert_eq!(profile.columns.amount_column, Some(3));
        assert!(profile.has_header);
    }
}
