use rental_client::domain::NewBill;

use crate::{
    controllers::validation,
    pipeline::{Envelope, PipelineError, Transform},
};

/// Field-level validation of an imported bill: amount bounds and date
/// ordering. Installation checks happen when the batch is stored.
pub fn validate_bill(env: Envelope<NewBill>) -> Result<Envelope<NewBill>, PipelineError> {
    match validation::validate_bill_fields(&env.payload) {
        Ok(()) => Ok(env),
        Err(e) => Err(PipelineError::Record {
            line: env.line,
            reason: e.to_string(),
        }),
    }
}

#[derive(Clone, Default)]
pub struct BillValidation;

#[async_trait::async_trait]
impl Transform<NewBill, NewBill> for BillValidation {
    async fn apply(&self, input: Envelope<NewBill>) -> Result<Envelope<NewBill>, PipelineError> {
        match validate_bill(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_rejected_total", "entity" => "bill_import").increment(1);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_client::domain::{BillStatus, Money};
    use time::macros::date;

    fn envelope(total_amount: Money) -> Envelope<NewBill> {
        Envelope {
            payload: NewBill {
                unit_id: 1,
                utility_id: 2,
                total_amount,
                billing_period_start: date!(2024 - 03 - 01),
                billing_period_end: date!(2024 - 03 - 31),
                due_date: date!(2024 - 04 - 20),
                status: BillStatus::Unpaid,
            },
            line: 7,
        }
    }

    #[test]
    fn bill_validation_accepts_valid_record() {
        let res = validate_bill(envelope(Money::from_cents(4_500)));
        assert!(res.is_ok());
    }

    #[test]
    fn bill_validation_reports_line_and_message() {
        let res = validate_bill(envelope(Money::from_cents(-100)));
        match res {
            Err(PipelineError::Record { line, reason }) => {
                assert_eq!(line, 7);
                assert_eq!(reason, "Total Amount cannot be negative");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn bill_validation_rejects_swapped_period() {
        let mut env = envelope(Money::from_cents(100));
        env.payload.billing_period_end = date!(2024 - 02 - 01);
        assert!(matches!(validate_bill(env), Err(PipelineError::Record { .. })));
    }
}
