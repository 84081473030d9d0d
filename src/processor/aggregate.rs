use std::cmp::Ordering;
use std::collections::HashSet;

use crate::helpers::parse_helpers::{parse_finite_f64, parse_i64};
use crate::processor::{
    AggregateOp, ProcessorError, Value,
    column::ColumnType,
    schema::{ResolvedColumn, Schema},
};

/// Evaluation function picked for one (operation, column type) pair.
type EvalFn = fn(&Aggregator, &[String]) -> Result<Value, ProcessorError>;

/// One aggregate measure over a column, e.g. `sum(age)` named `age_sum`.
#[derive(Debug, Clone)]
pub struct Aggregator {
    op: AggregateOp,
    column: ResolvedColumn,
    name: String,
    eval: EvalFn,
}

impl Aggregator {
    /// Resolves `column` in `schema` and picks the evaluation for its type.
    ///
    /// # Errors
    /// - [`ProcessorError::UnknownColumn`] if the column is not in `schema`
    /// - [`ProcessorError::IncompatibleAggregation`] for `sum`/`avg` over a
    ///   string column
    pub fn new(column: &str, op: AggregateOp, schema: &Schema) -> Result<Self, ProcessorError> {
        let column = schema.resolve(column)?;

        let eval: EvalFn = match (op, column.column_type) {
            (AggregateOp::Sum | AggregateOp::Avg, ColumnType::Str) => {
                return Err(ProcessorError::IncompatibleAggregation {
                    op,
                    column: column.name,
                    column_type: column.column_type,
                });
            }
            (AggregateOp::Sum, ColumnType::Int64) => sum_int,
            (AggregateOp::Sum, ColumnType::Float64) => sum_float,
            (AggregateOp::Avg, ColumnType::Int64) => avg_int,
            (AggregateOp::Avg, ColumnType::Float64) => avg_float,
            (AggregateOp::Max, _) => max_value,
            (AggregateOp::Min, _) => min_value,
            (AggregateOp::Count, _) => count,
            (AggregateOp::CountDistinct, _) => count_distinct,
        };

        Ok(Aggregator {
            name: format!("{}_{}", column.name, op.token()),
            op,
            column,
            eval,
        })
    }

    /// Result column name, `<column>_<op>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op(&self) -> AggregateOp {
        self.op
    }

    pub fn column(&self) -> &ResolvedColumn {
        &self.column
    }

    /// Aggregates the raw values collected for one group, in arrival order.
    pub fn evaluate(&self, values: &[String]) -> Result<Value, ProcessorError> {
        (self.eval)(self, values)
    }

    fn empty_group(&self) -> ProcessorError {
        ProcessorError::EmptyGroup {
            aggregate: self.name.clone(),
        }
    }
}

fn int_total(agg: &Aggregator, values: &[String]) -> Result<i128, ProcessorError> {
    values.iter().try_fold(0i128, |acc, raw| {
        let v = parse_i64(raw).ok_or_else(|| agg.column.parse_error(raw))?;
        Ok(acc + i128::from(v))
    })
}

fn float_total(agg: &Aggregator, values: &[String]) -> Result<f64, ProcessorError> {
    values.iter().try_fold(0.0f64, |acc, raw| {
        let v = parse_finite_f64(raw).ok_or_else(|| agg.column.parse_error(raw))?;
        Ok(acc + v)
    })
}

fn sum_int(agg: &Aggregator, values: &[String]) -> Result<Value, ProcessorError> {
    let total = int_total(agg, values)?;
    i64::try_from(total)
        .map(Value::Int)
        .map_err(|_| ProcessorError::SumOverflow {
            aggregate: agg.name.clone(),
        })
}

fn sum_float(agg: &Aggregator, values: &[String]) -> Result<Value, ProcessorError> {
    float_total(agg, values).map(Value::Float)
}

fn avg_int(agg: &Aggregator, values: &[String]) -> Result<Value, ProcessorError> {
    if values.is_empty() {
        return Err(agg.empty_group());
    }
    let total = int_total(agg, values)?;
    Ok(Value::Float(total as f64 / values.len() as f64))
}

fn avg_float(agg: &Aggregator, values: &[String]) -> Result<Value, ProcessorError> {
    if values.is_empty() {
        return Err(agg.empty_group());
    }
    let total = float_total(agg, values)?;
    Ok(Value::Float(total / values.len() as f64))
}

/// First value seeds the result; a later value replaces it only when it
/// compares as `wanted` (strictly greater or strictly less).
fn extreme(
    agg: &Aggregator,
    values: &[String],
    wanted: Ordering,
) -> Result<Value, ProcessorError> {
    let mut best: Option<Value> = None;
    for raw in values {
        let v = agg.column.parse(raw)?;
        let replace = match &best {
            None => true,
            Some(current) => v.partial_cmp(current) == Some(wanted),
        };
        if replace {
            best = Some(v);
        }
    }
    best.ok_or_else(|| agg.empty_group())
}

fn max_value(agg: &Aggregator, values: &[String]) -> Result<Value, ProcessorError> {
    extreme(agg, values, Ordering::Greater)
}

fn min_value(agg: &Aggregator, values: &[String]) -> Result<Value, ProcessorError> {
    extreme(agg, values, Ordering::Less)
}

fn count(_agg: &Aggregator, values: &[String]) -> Result<Value, ProcessorError> {
    Ok(Value::Int(values.len() as i64))
}

fn count_distinct(_agg: &Aggregator, values: &[String]) -> Result<Value, ProcessorError> {
    let distinct: HashSet<&str> = values.iter().map(String::as_str).collect();
    Ok(Value::Int(distinct.len() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::from_columns([
            ("name", ColumnType::Str),
            ("age", ColumnType::Int64),
            ("price", ColumnType::Float64),
        ])
        .unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn eval(column: &str, op: AggregateOp, values: &[&str]) -> Result<Value, ProcessorError> {
        Aggregator::new(column, op, &schema())
            .unwrap()
            .evaluate(&strings(values))
    }

    #[test]
    fn test_names() {
        let schema = schema();
        let names: Vec<String> = [
            AggregateOp::Sum,
            AggregateOp::Avg,
            AggregateOp::Max,
            AggregateOp::Min,
            AggregateOp::Count,
            AggregateOp::CountDistinct,
        ]
        .into_iter()
        .map(|op| Aggregator::new("age", op, &schema).unwrap().name().to_string())
        .collect();
        assert_eq!(
            names,
            vec!["age_sum", "age_avg", "age_max", "age_min", "age_count", "age_countd"]
        );
    }

    #[test]
    fn test_construction_errors() {
        let schema = schema();
        assert!(matches!(
            Aggregator::new("name", AggregateOp::Sum, &schema),
            Err(ProcessorError::IncompatibleAggregation { op: AggregateOp::Sum, .. })
        ));
        assert!(matches!(
            Aggregator::new("name", AggregateOp::Avg, &schema),
            Err(ProcessorError::IncompatibleAggregation { .. })
        ));
        assert!(matches!(
            Aggregator::new("missing", AggregateOp::Count, &schema),
            Err(ProcessorError::UnknownColumn { .. })
        ));
        assert!(Aggregator::new("name", AggregateOp::Max, &schema).is_ok());
        assert!(Aggregator::new("name", AggregateOp::CountDistinct, &schema).is_ok());
    }

    #[test]
    fn test_sum_keeps_column_type() {
        assert_eq!(eval("age", AggregateOp::Sum, &["10", "20", "-5"]).unwrap(), Value::Int(25));
        assert_eq!(eval("price", AggregateOp::Sum, &["1.5", "2.25"]).unwrap(), Value::Float(3.75));
    }

    #[test]
    fn test_sum_of_empty_group_is_zero() {
        assert_eq!(eval("age", AggregateOp::Sum, &[]).unwrap(), Value::Int(0));
        assert_eq!(eval("price", AggregateOp::Sum, &[]).unwrap(), Value::Float(0.0));
    }

    #[test]
    fn test_sum_overflow() {
        let err = eval("age", AggregateOp::Sum, &["9223372036854775807", "1"]).unwrap_err();
        assert!(matches!(err, ProcessorError::SumOverflow { aggregate } if aggregate == "age_sum"));
    }

    #[test]
    fn test_avg_is_float() {
        assert_eq!(eval("age", AggregateOp::Avg, &["10", "30"]).unwrap(), Value::Float(20.0));
        assert_eq!(eval("age", AggregateOp::Avg, &["1", "2"]).unwrap(), Value::Float(1.5));
        assert_eq!(
            eval("price", AggregateOp::Avg, &["1.0", "2.0", "4.5"]).unwrap(),
            Value::Float(2.5)
        );
    }

    #[test]
    fn test_avg_of_empty_group_is_error() {
        let err = eval("age", AggregateOp::Avg, &[]).unwrap_err();
        assert!(matches!(err, ProcessorError::EmptyGroup { aggregate } if aggregate == "age_avg"));
        assert!(eval("price", AggregateOp::Avg, &[]).is_err());
    }

    #[test]
    fn test_min_max_native_ordering() {
        assert_eq!(eval("age", AggregateOp::Max, &["9", "100", "25"]).unwrap(), Value::Int(100));
        assert_eq!(eval("age", AggregateOp::Min, &["9", "100", "-25"]).unwrap(), Value::Int(-25));
        assert_eq!(eval("price", AggregateOp::Max, &["0.5", "0.25"]).unwrap(), Value::Float(0.5));
        // Strings compare lexicographically: "9" > "100".
        assert_eq!(
            eval("name", AggregateOp::Max, &["100", "9", "25"]).unwrap(),
            Value::Str("9".into())
        );
        assert_eq!(
            eval("name", AggregateOp::Min, &["Cara", "Alice", "Bob"]).unwrap(),
            Value::Str("Alice".into())
        );
        assert!(matches!(
            eval("age", AggregateOp::Max, &[]),
            Err(ProcessorError::EmptyGroup { .. })
        ));
    }

    #[test]
    fn test_counts_ignore_parseability() {
        assert_eq!(eval("age", AggregateOp::Count, &["1", "x", "1"]).unwrap(), Value::Int(3));
        assert_eq!(
            eval("age", AggregateOp::CountDistinct, &["1", "x", "1"]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(eval("name", AggregateOp::Count, &[]).unwrap(), Value::Int(0));
        assert_eq!(
            eval("name", AggregateOp::CountDistinct, &["a", "a", "a", "a"]).unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn test_parse_failure_aborts() {
        let err = eval("age", AggregateOp::Sum, &["1", "two"]).unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::ValueParse { column, value, .. } if column == "age" && value == "two"
        ));
        assert!(eval("price", AggregateOp::Min, &["1.0", "nan"]).is_err());
    }
}
