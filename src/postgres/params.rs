use std::error::Error;

use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_util::bytes;

use crate::types::RowValues;

/// Borrowed Postgres parameter list built from an ordered [`RowValues`]
/// slice, preserving declaration order.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Convert a parameter slice into driver references.
    #[must_use]
    pub fn convert(params: &'a [RowValues]) -> Params<'a> {
        Params {
            references: params.iter().map(|p| p as &(dyn ToSql + Sync)).collect(),
        }
    }

    /// The parameter array in the form the driver expects.
    #[must_use]
    pub fn as_refs(&self) -> &[&'a (dyn ToSql + Sync)] {
        &self.references
    }
}

impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            RowValues::Int(i) => (*i).to_sql(ty, out),
            RowValues::Float(f) => (*f).to_sql(ty, out),
            RowValues::Text(s) => s.to_sql(ty, out),
            RowValues::Bool(b) => (*b).to_sql(ty, out),
            RowValues::Timestamp(dt) => dt.to_sql(ty, out),
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(jval) => jval.to_sql(ty, out),
            RowValues::Blob(bytes) => bytes.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        [
            Type::INT2,
            Type::INT4,
            Type::INT8,
            Type::FLOAT4,
            Type::FLOAT8,
            Type::TEXT,
            Type::VARCHAR,
            Type::CHAR,
            Type::NAME,
            Type::BOOL,
            Type::TIMESTAMP,
            Type::TIMESTAMPTZ,
            Type::DATE,
            Type::JSON,
            Type::JSONB,
            Type::BYTEA,
        ]
        .contains(ty)
    }

    to_sql_checked!();
}
