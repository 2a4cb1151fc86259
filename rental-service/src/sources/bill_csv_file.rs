use std::{fs::File, path::PathBuf};

use async_stream::stream;
use csv::StringRecord;
use rental_client::domain::{BillStatus, Money, NewBill};
use time::{format_description::FormatItem, macros::format_description, Date};

use crate::pipeline::{Envelope, PipelineError, RecordStream, Source};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// CSV import source for bills.
///
/// Expected header columns (by name, any order):
/// - unit_id
/// - utility_id
/// - total_amount (decimal, e.g. `84.20`)
/// - billing_period_start, billing_period_end, due_date (`YYYY-MM-DD`)
/// - status (optional; `unpaid` when absent or blank)
pub struct BillCsvFileSource {
    path: PathBuf,
}

impl BillCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

pub(crate) fn parse_date(value: &str, column: &str) -> Result<Date, String> {
    Date::parse(value.trim(), DATE_FORMAT).map_err(|e| format!("invalid {column} '{value}': {e}"))
}

fn record_to_bill(record: &StringRecord, headers: &StringRecord) -> Result<NewBill, String> {
    let get = |name: &str| -> Result<&str, String> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| format!("missing column '{name}'"))
    };
    let id = |name: &str| -> Result<i64, String> {
        let raw = get(name)?;
        raw.trim().parse().map_err(|e| format!("invalid {name} '{raw}': {e}"))
    };

    let amount = get("total_amount")?;
    let total_amount: Money = amount
        .parse()
        .map_err(|e| format!("invalid total_amount: {e}"))?;

    let status = match get("status").map(str::trim) {
        Ok(s) if !s.is_empty() => s
            .to_ascii_lowercase()
            .parse::<BillStatus>()
            .map_err(|_| format!("invalid status '{s}'"))?,
        _ => BillStatus::default(),
    };

    Ok(NewBill {
        unit_id: id("unit_id")?,
        utility_id: id("utility_id")?,
        total_amount,
        billing_period_start: parse_date(get("billing_period_start")?, "billing_period_start")?,
        billing_period_end: parse_date(get("billing_period_end")?, "billing_period_end")?,
        due_date: parse_date(get("due_date")?, "due_date")?,
        status,
    })
}

#[async_trait::async_trait]
impl Source<NewBill> for BillCsvFileSource {
    async fn stream(&self) -> RecordStream<NewBill> {
        let path = self.path.clone();
        let s = stream! {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to open CSV file {}: {e}", path.display())));
                    return;
                }
            };
            let mut rdr = csv::Reader::from_reader(file);
            let headers = match rdr.headers() {
                Ok(h) => h.clone(),
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to read CSV headers: {e}")));
                    return;
                }
            };

            for result in rdr.records() {
                let record = match result {
                    Ok(r) => r,
                    Err(e) => {
                        let line = e.position().map(|p| p.line()).unwrap_or_default();
                        metrics::counter!("bill_import_parse_errors_total").increment(1);
                        yield Err(PipelineError::Record { line, reason: format!("unreadable CSV record: {e}") });
                        continue;
                    }
                };
                let line = record.position().map(|p| p.line()).unwrap_or_default();

                match record_to_bill(&record, &headers) {
                    Ok(bill) => yield Ok(Envelope { payload: bill, line }),
                    Err(reason) => {
                        metrics::counter!("bill_import_parse_errors_total").increment(1);
                        yield Err(PipelineError::Record { line, reason });
                    }
                }
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn headers() -> StringRecord {
        StringRecord::from(vec![
            "unit_id",
            "utility_id",
            "total_amount",
            "billing_period_start",
            "billing_period_end",
            "due_date",
            "status",
        ])
    }

    #[test]
    fn parses_a_full_row() {
        let record = StringRecord::from(vec!["3", "9", "84.2", "2024-01-01", "2024-01-31", "2024-02-14", "Paid"]);
        let bill = record_to_bill(&record, &headers()).unwrap();
        assert_eq!(bill.unit_id, 3);
        assert_eq!(bill.utility_id, 9);
        assert_eq!(bill.total_amount, Money::from_cents(8420));
        assert_eq!(bill.billing_period_end, date!(2024 - 01 - 31));
        assert_eq!(bill.status, BillStatus::Paid);
    }

    #[test]
    fn blank_status_defaults_to_unpaid() {
        let record = StringRecord::from(vec!["3", "9", "10", "2024-01-01", "2024-01-31", "2024-02-14", ""]);
        let bill = record_to_bill(&record, &headers()).unwrap();
        assert_eq!(bill.status, BillStatus::Unpaid);
    }

    #[test]
    fn reports_the_offending_column() {
        let record = StringRecord::from(vec!["3", "9", "10", "01/01/2024", "2024-01-31", "2024-02-14", ""]);
        let err = record_to_bill(&record, &headers()).unwrap_err();
        assert!(err.starts_with("invalid billing_period_start"), "{err}");

        let short = StringRecord::from(vec!["unit_id", "utility_id"]);
        let err = record_to_bill(&StringRecord::from(vec!["1", "2"]), &short).unwrap_err();
        assert_eq!(err, "missing column 'total_amount'");
    }
}
