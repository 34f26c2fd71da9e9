// Copyright the Airport authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use arrow::array::ArrayRef;

use crate::catalog::{RecordBatchStream, ScanOptions, Schema};
use crate::error::AirportError;

/// Drives an in/out table-function call. `params` excludes the
/// table-typed parameter (identified by `is_table_type=true` field metadata
/// in the signature); `input` is that table-typed parameter's row stream.
/// Consumption of `input` and production of `output` both happen inside the
/// callback's own `execute`, so pipelining (the callback MAY emit output
/// batches as soon as enough input has been seen) is entirely up to the
/// callback's stream implementation — we just wire the two ends together.
pub(super) async fn execute(
    schema: &dyn Schema,
    function_name: &str,
    params: &[rmpv::Value],
    input: RecordBatchStream,
) -> Result<RecordBatchStream, AirportError> {
    let functions = schema.table_functions_in_out().await?;
    let function = functions
        .into_iter()
        .find(|f| f.name() == function_name)
        .ok_or_else(|| {
            AirportError::not_found("table function (in/out)", function_name.to_string())
        })?;

    let arrays = scalar_params_to_arrays(params)?;
    function.execute(arrays, input, ScanOptions::default()).await
}

/// Mirrors `action::table_function::params_to_arrays`: wraps each scalar
/// MessagePack value as a one-element Arrow array.
fn scalar_params_to_arrays(params: &[rmpv::Value]) -> Result<Vec<ArrayRef>, AirportError> {
    use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
    use std::sync::Arc;

    params
        .iter()
        .map(|value| -> Result<ArrayRef, AirportError> {
            Ok(match value {
                rmpv::Value::Integer(i) => {
                    let v = i
                        .as_i64()
                        .ok_or_else(|| AirportError::malformed("parameter integer out of range"))?;
                    Arc::new(Int64Array::from(vec![v]))
                }
                rmpv::Value::F64(f) => Arc::new(Float64Array::from(vec![*f])),
                rmpv::Value::F32(f) => Arc::new(Float64Array::from(vec![f64::from(*f)])),
                rmpv::Value::Boolean(b) => Arc::new(BooleanArray::from(vec![*b])),
                rmpv::Value::String(s) => {
                    let s = s
                        .as_str()
                        .ok_or_else(|| AirportError::malformed("parameter string is not valid utf8"))?;
                    Arc::new(StringArray::from(vec![s.to_string()]))
                }
                other => {
                    return Err(AirportError::malformed(format!(
                        "unsupported table function parameter: {other:?}"
                    )))
                }
            })
        })
        .collect()
}
