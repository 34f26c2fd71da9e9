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

//! Scalar and table function traits.

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use arrow_schema::{DataType, SchemaRef};
use async_trait::async_trait;

use super::{RecordBatchStream, ScanOptions};
use crate::error::AirportError;

/// Field metadata key marking a table-typed parameter of a
/// `TableFunctionInOut` signature.
pub const IS_TABLE_TYPE_METADATA_KEY: &str = "is_table_type";

/// A function's declared shape. `return_type` is `None` for table-valued
/// functions.
#[derive(Debug, Clone)]
pub struct Signature {
    pub parameters: Vec<DataType>,
    pub return_type: Option<DataType>,
    pub variadic: bool,
}

impl Signature {
    #[must_use]
    pub fn scalar(parameters: Vec<DataType>, return_type: DataType) -> Self {
        Self { parameters, return_type: Some(return_type), variadic: false }
    }

    #[must_use]
    pub fn table(parameters: Vec<DataType>) -> Self {
        Self { parameters, return_type: None, variadic: false }
    }

    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Accepts `count` arguments against this signature, honoring
    /// `variadic` (the last declared parameter type repeats).
    #[must_use]
    pub fn accepts_arity(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.parameters.len().saturating_sub(1)
        } else {
            count == self.parameters.len()
        }
    }

    #[must_use]
    pub fn parameter_type(&self, index: usize) -> Option<&DataType> {
        if index < self.parameters.len() {
            self.parameters.get(index)
        } else if self.variadic {
            self.parameters.last()
        } else {
            None
        }
    }
}

#[async_trait]
pub trait ScalarFunction: Send + Sync {
    fn name(&self) -> &str;
    fn comment(&self) -> Option<&str> {
        None
    }
    fn signature(&self) -> &Signature;

    async fn execute(&self, batch: RecordBatch) -> Result<ArrayRef, AirportError>;
}

#[async_trait]
pub trait TableFunction: Send + Sync {
    fn name(&self) -> &str;
    fn comment(&self) -> Option<&str> {
        None
    }
    fn signature(&self) -> &Signature;

    /// Negotiates the output schema before `execute`; may depend on the
    /// concrete parameter values (e.g. `GENERATE_RANGE`'s `column_count`).
    async fn schema_for_parameters(
        &self,
        params: &[ArrayRef],
    ) -> Result<SchemaRef, AirportError>;

    async fn execute(
        &self,
        params: Vec<ArrayRef>,
        options: ScanOptions,
    ) -> Result<RecordBatchStream, AirportError>;
}

#[async_trait]
pub trait TableFunctionInOut: Send + Sync {
    fn name(&self) -> &str;
    fn comment(&self) -> Option<&str> {
        None
    }
    fn signature(&self) -> &Signature;

    async fn schema_for_parameters(
        &self,
        params: &[ArrayRef],
        input_schema: &SchemaRef,
    ) -> Result<SchemaRef, AirportError>;

    async fn execute(
        &self,
        params: Vec<ArrayRef>,
        input: RecordBatchStream,
        options: ScanOptions,
    ) -> Result<RecordBatchStream, AirportError>;
}

/// Returns `true` if `field`'s metadata marks it as a table-typed
/// parameter in a `TableFunctionInOut` signature.
#[must_use]
pub fn is_table_type(field: &arrow_schema::Field) -> bool {
    field.metadata().get(IS_TABLE_TYPE_METADATA_KEY).map(String::as_str) == Some("true")
}

/// Convenience alias used by capability-accessor code in `crate::capability`.
pub type ScalarFunctionRef = Arc<dyn ScalarFunction>;
pub type TableFunctionRef = Arc<dyn TableFunction>;
pub type TableFunctionInOutRef = Arc<dyn TableFunctionInOut>;
