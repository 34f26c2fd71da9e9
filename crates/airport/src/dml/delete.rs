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

use crate::capability::{require_delete, DeletePlan};
use crate::catalog::{DmlOptions, DmlResult, RecordBatchStream, Table};
use crate::error::AirportError;

use super::extract_rowids;

pub(super) async fn delete(
    table: &dyn Table,
    input: RecordBatchStream,
    options: DmlOptions,
    table_name: &str,
) -> Result<DmlResult, AirportError> {
    match require_delete(table, table_name)? {
        DeletePlan::Batch(batch) => batch.delete_batch(input, options).await,
        DeletePlan::RowIds(row_ids_table) => {
            let (row_ids, _stripped) = extract_rowids(input).await?;
            row_ids_table.delete(row_ids, options).await
        }
        DeletePlan::Unsupported => unreachable!("require_delete rejects Unsupported"),
    }
}
