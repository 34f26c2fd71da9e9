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

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use arrow_schema::{Field, Schema as ArrowSchema};
use futures::StreamExt;

use crate::catalog::{RecordBatchStream, Schema};
use crate::error::AirportError;

/// Drives a scalar-function call: validates each inbound batch against
/// `Signature().Parameters`, invokes `Execute`, checks the returned array's
/// type against `Signature().ReturnType`, and wraps it as a single-column
/// `result` batch. Streamed batch-by-batch, never materializing the whole
/// input.
pub(super) async fn execute(
    schema: &dyn Schema,
    function_name: &str,
    mut input: RecordBatchStream,
) -> Result<RecordBatchStream, AirportError> {
    let functions = schema.scalar_functions().await?;
    let function = functions
        .into_iter()
        .find(|f| f.name() == function_name)
        .ok_or_else(|| AirportError::not_found("scalar function", function_name.to_string()))?;

    let signature = function.signature().clone();

    let stream = async_stream::try_stream! {
        while let Some(batch) = input.next().await {
            let batch = batch?;

            if !signature.accepts_arity(batch.num_columns()) {
                Err(AirportError::malformed(format!(
                    "scalar function `{function_name}` expects {} argument(s), got {}",
                    signature.parameters.len(),
                    batch.num_columns()
                )))?;
            }
            for (index, column) in batch.columns().iter().enumerate() {
                if let Some(expected) = signature.parameter_type(index) {
                    if column.data_type() != expected {
                        Err(AirportError::TypeMismatch {
                            expected: expected.to_string(),
                            actual: column.data_type().to_string(),
                        })?;
                    }
                }
            }

            let result = function.execute(batch).await?;

            if let Some(expected) = &signature.return_type {
                if result.data_type() != expected {
                    Err(AirportError::TypeMismatch {
                        expected: expected.to_string(),
                        actual: result.data_type().to_string(),
                    })?;
                }
            }

            let out_schema = Arc::new(ArrowSchema::new(vec![Field::new(
                "result",
                result.data_type().clone(),
                true,
            )]));
            yield RecordBatch::try_new(out_schema, vec![result])
                .map_err(|e| AirportError::internal(format!("failed to build result batch: {e}")))?;
        }
    };

    Ok(Box::pin(stream))
}
