//! Inbound message envelopes

use bytes::Bytes;
use fugue_primitives::{Address, CalleeKey, Selector};

/// The native call payload of a message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NativeMessage {
    /// Recipient; `None` for contract deployments
    pub to: Option<Address>,
    /// Calldata; empty for plain value transfers
    pub data: Bytes,
    /// Transferred value
    pub value: Option<u128>,
}

/// An inbound transaction message as handed to the scheduler.
#[derive(Clone, Debug, PartialEq)]
pub struct StandardMessage {
    /// Batch-unique message id; all scheduler tie-breaking is by id
    pub id: u64,
    /// The native call payload
    pub native: NativeMessage,
    /// Set by the scheduler when this call is pushed to a later generation
    pub is_deferred: bool,
}

impl StandardMessage {
    /// A contract call
    pub fn call(id: u64, to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            native: NativeMessage {
                to: Some(to),
                data: data.into(),
                value: None,
            },
            is_deferred: false,
        }
    }

    /// A plain value transfer (no calldata)
    pub fn transfer(id: u64, to: Address, value: u128) -> Self {
        Self {
            id,
            native: NativeMessage {
                to: Some(to),
                data: Bytes::new(),
                value: Some(value),
            },
            is_deferred: false,
        }
    }

    /// A contract deployment (no recipient)
    pub fn deployment(id: u64, code: impl Into<Bytes>) -> Self {
        Self {
            id,
            native: NativeMessage {
                to: None,
                data: code.into(),
                value: None,
            },
            is_deferred: false,
        }
    }

    /// The callee this message invokes: `short_address(to) || data[..4]`.
    /// `None` for transfers (empty calldata) and deployments (no recipient).
    pub fn callee_key(&self) -> Option<CalleeKey> {
        if self.native.data.is_empty() {
            return None;
        }
        let to = self.native.to.as_ref()?;
        let selector = Selector::from_calldata(&self.native.data);
        Some(CalleeKey::compact(to, &selector))
    }
}
