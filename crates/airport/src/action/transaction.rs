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

//! `create_transaction`/`get_transaction_status` action handlers (spec
//! §4.4/§6).

use serde::{Deserialize, Serialize};

use super::encode_reply;
use crate::envelope::decode_action_body;
use crate::error::AirportError;
use crate::transaction::{TransactionRegistry, TransactionStatus};

#[derive(Debug, Serialize)]
struct CreateTransactionReply {
    identifier: Option<String>,
}

pub(super) fn create_transaction(registry: &TransactionRegistry) -> Result<Vec<u8>, AirportError> {
    let identifier = registry.create();
    encode_reply(&CreateTransactionReply { identifier: Some(identifier) })
}

#[derive(Debug, Deserialize)]
struct TransactionStatusRequest {
    identifier: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
enum WireStatus {
    Active,
    Committed,
    Aborted,
}

impl From<TransactionStatus> for WireStatus {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Active => WireStatus::Active,
            TransactionStatus::Committed => WireStatus::Committed,
            TransactionStatus::Aborted => WireStatus::Aborted,
        }
    }
}

#[derive(Debug, Serialize)]
struct TransactionStatusReply {
    status: Option<WireStatus>,
    exists: bool,
}

pub(super) fn get_transaction_status(
    registry: &TransactionRegistry,
    body: &[u8],
) -> Result<Vec<u8>, AirportError> {
    let req: TransactionStatusRequest = decode_action_body(body)?;
    let (status, exists) = registry.status(&req.identifier);
    encode_reply(&TransactionStatusReply { status: status.map(WireStatus::from), exists })
}
