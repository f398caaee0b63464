//! Type conversions for PostgreSQL.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use driftless_migrate::{Row, SqlParam};
use serde_json::Value;
use tokio_postgres::types::{ToSql, Type};

/// Convert a bind parameter to a boxed PostgreSQL value.
pub fn param_to_sql(param: &SqlParam) -> Box<dyn ToSql + Sync + Send> {
    match param {
        SqlParam::Null => Box::new(Option::<String>::None),
        SqlParam::Bool(b) => Box::new(*b),
        SqlParam::Int(i) => Box::new(*i),
        SqlParam::Text(s) => Box::new(s.clone()),
        SqlParam::Timestamp(t) => Box::new(*t),
    }
}

/// Convert bind parameters to PostgreSQL values.
pub fn params_to_sql(params: &[SqlParam]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    params.iter().map(param_to_sql).collect()
}

/// Convert a driver row into an engine row. Columns of types the engine
/// never reads (void, numeric, arrays) come back as NULL.
pub fn row_from_pg(row: &tokio_postgres::Row) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| (column.name().to_string(), column_value(row, i, column.type_())))
        .collect()
}

fn column_value(row: &tokio_postgres::Row, i: usize, ty: &Type) -> Value {
    fn get<'a, T: tokio_postgres::types::FromSql<'a>>(
        row: &'a tokio_postgres::Row,
        i: usize,
    ) -> Option<T> {
        row.try_get::<_, Option<T>>(i).ok().flatten()
    }

    let value = match *ty {
        Type::BOOL => get::<bool>(row, i).map(Value::from),
        Type::INT2 => get::<i16>(row, i).map(Value::from),
        Type::INT4 => get::<i32>(row, i).map(Value::from),
        Type::INT8 => get::<i64>(row, i).map(Value::from),
        Type::OID => get::<u32>(row, i).map(Value::from),
        Type::FLOAT4 => get::<f32>(row, i).map(|f| Value::from(f64::from(f))),
        Type::FLOAT8 => get::<f64>(row, i).map(Value::from),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::CHAR => {
            get::<String>(row, i).map(Value::from)
        }
        Type::JSON | Type::JSONB => get::<Value>(row, i),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, i).map(|t| Value::from(t.to_rfc3339())),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, i).map(|t| Value::from(t.to_string())),
        Type::DATE => get::<NaiveDate>(row, i).map(|d| Value::from(d.to_string())),
        _ => None,
    };
    value.unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_to_sql_count() {
        let params = [
            SqlParam::from("Order"),
            SqlParam::Int(3),
            SqlParam::Bool(true),
            SqlParam::Timestamp(Utc::now()),
            SqlParam::Null,
        ];
        assert_eq!(params_to_sql(&params).len(), 5);
    }

    #[test]
    fn test_param_types_accepted() {
        assert!(<String as ToSql>::accepts(&Type::TEXT));
        assert!(<DateTime<Utc> as ToSql>::accepts(&Type::TIMESTAMPTZ));
        assert!(<Option<String> as ToSql>::accepts(&Type::VARCHAR));
    }
}
