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

use crate::capability::require_insertable;
use crate::catalog::{DmlOptions, DmlResult, RecordBatchStream, Table};
use crate::error::AirportError;

pub(super) async fn insert(
    table: &dyn Table,
    input: RecordBatchStream,
    options: DmlOptions,
    table_name: &str,
) -> Result<DmlResult, AirportError> {
    let insertable = require_insertable(table, table_name)?;
    insertable.insert(input, options).await
}
