//! On-disk codec for the persisted callee registry
//!
//! A flat little-endian, length-prefixed encoding: a `u32` record count, then
//! per callee `index (u32)`, `key (12 bytes)`, `conflict_indices (u32 count +
//! u32s)`, `sequential (u8)`, `except_list (u32 count + 12-byte keys)`,
//! `calls (u32)`, `avg_gas (u32)`, `deferrable (u8)`.

use crate::callee::Callee;
use crate::error::{SchedulerError, SchedulerResult};
use fugue_primitives::CalleeKey;

pub(crate) fn encode_callees(callees: &[Callee]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(callees.len() as u32).to_le_bytes());
    for callee in callees {
        buf.extend_from_slice(&callee.index.to_le_bytes());
        buf.extend_from_slice(callee.key.as_bytes());

        buf.extend_from_slice(&(callee.conflict_indices.len() as u32).to_le_bytes());
        for index in &callee.conflict_indices {
            buf.extend_from_slice(&index.to_le_bytes());
        }

        buf.push(callee.sequential as u8);

        buf.extend_from_slice(&(callee.except_list.len() as u32).to_le_bytes());
        for key in &callee.except_list {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(&callee.calls.to_le_bytes());
        buf.extend_from_slice(&callee.avg_gas.to_le_bytes());
        buf.push(callee.deferrable as u8);
    }
    buf
}

pub(crate) fn decode_callees(bytes: &[u8]) -> SchedulerResult<Vec<Callee>> {
    let mut reader = Reader { bytes, pos: 0 };

    let count = reader.read_u32()? as usize;
    let mut callees = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let index = reader.read_u32()?;
        let key = CalleeKey::from_slice(reader.take(CalleeKey::LEN)?)
            .map_err(|_| SchedulerError::Corrupt("bad callee key"))?;

        let conflict_count = reader.read_u32()? as usize;
        let mut conflict_indices = Vec::with_capacity(conflict_count.min(1024));
        for _ in 0..conflict_count {
            conflict_indices.push(reader.read_u32()?);
        }

        let sequential = reader.read_u8()? != 0;

        let except_count = reader.read_u32()? as usize;
        let mut except_list = Vec::with_capacity(except_count.min(1024));
        for _ in 0..except_count {
            let key = CalleeKey::from_slice(reader.take(CalleeKey::LEN)?)
                .map_err(|_| SchedulerError::Corrupt("bad except key"))?;
            except_list.push(key);
        }

        let calls = reader.read_u32()?;
        let avg_gas = reader.read_u32()?;
        let deferrable = reader.read_u8()? != 0;

        callees.push(Callee {
            index,
            key,
            conflict_indices,
            sequential,
            except_list,
            calls,
            avg_gas,
            deferrable,
        });
    }

    if reader.pos != bytes.len() {
        return Err(SchedulerError::Corrupt("trailing bytes"));
    }
    Ok(callees)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> SchedulerResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(SchedulerError::Corrupt("truncated record"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> SchedulerResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u8(&mut self) -> SchedulerResult<u8> {
        Ok(self.take(1)?[0])
    }
}
