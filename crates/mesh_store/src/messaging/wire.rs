//! Positional binary wire layout for geometry exchange.
//!
//! One message, per destination, carries every group in the shared fixed
//! group order as four size-dependent frames:
//!
//! 1. header — `(i32 group_id, i32 count)` per group, zero counts
//!    included, so array offsets are computable without any group lookup;
//! 2. ids — `i32[total]` triangle ids concatenated in group order;
//! 3. coordinates — `f64[total * 9]`, row-major `v0.xyz v1.xyz v2.xyz`;
//! 4. tags — `i32[total]`, present only when the negotiated
//!    [`WireFormat`] carries user tags.
//!
//! Everything is little-endian. The receiver decodes purely positionally
//! against its own group order; group names never cross the wire. Tag
//! presence is negotiated out of band through configuration and is never
//! sniffed from the payload — a format mismatch surfaces as a frame-size
//! protocol error, which is fatal.

use crate::error::TransportError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tessera_spatial::{GroupId, TriangleId};

/// Cluster-wide wire-format selection, fixed by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct WireFormat {
    /// Whether messages carry the trailing per-triangle user-tag array
    pub user_tags: bool,
}

/// One triangle as it crosses the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleRecord {
    /// Globally unique triangle id
    pub id: TriangleId,
    /// Corner coordinates, `v0.xyz v1.xyz v2.xyz`
    pub coords: [f64; 9],
    /// User tag; written as 0 when absent and the format carries tags
    pub tag: Option<i32>,
}

/// All records destined for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBatch {
    /// Group the records belong to
    pub group_id: GroupId,
    /// Records; may be empty
    pub records: Vec<TriangleRecord>,
}

/// A complete per-destination message: one batch per group in the shared
/// fixed order, zero-count batches included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPayload {
    /// Batches in cluster-wide group order
    pub groups: Vec<GroupBatch>,
}

impl MigrationPayload {
    /// Total number of records across all groups.
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    /// Encodes the payload into its wire frames, in send order.
    pub fn encode(&self, format: WireFormat) -> Vec<Bytes> {
        let total = self.total();

        let mut header = BytesMut::with_capacity(self.groups.len() * 8);
        for batch in &self.groups {
            header.put_i32_le(batch.group_id.0);
            header.put_i32_le(batch.records.len() as i32);
        }

        let mut ids = BytesMut::with_capacity(total * 4);
        let mut coords = BytesMut::with_capacity(total * 72);
        let mut tags = BytesMut::with_capacity(if format.user_tags { total * 4 } else { 0 });
        for batch in &self.groups {
            for record in &batch.records {
                ids.put_i32_le(record.id.0);
                for value in record.coords {
                    coords.put_f64_le(value);
                }
                if format.user_tags {
                    tags.put_i32_le(record.tag.unwrap_or(0));
                }
            }
        }

        let mut frames = vec![header.freeze(), ids.freeze(), coords.freeze()];
        if format.user_tags {
            frames.push(tags.freeze());
        }
        frames
    }
}

/// Decodes the header frame against the local group order.
///
/// Returns per-group record counts. The group ids in the frame must match
/// `expected` pairwise — a mismatch means the cluster's group hierarchies
/// diverged, which is unrecoverable.
pub fn decode_header(frame: &Bytes, expected: &[GroupId]) -> Result<Vec<usize>, TransportError> {
    if frame.len() != expected.len() * 8 {
        return Err(TransportError::Protocol(format!(
            "header frame is {} bytes, expected {} for {} groups",
            frame.len(),
            expected.len() * 8,
            expected.len()
        )));
    }
    let mut buf = frame.clone();
    let mut counts = Vec::with_capacity(expected.len());
    for expected_id in expected {
        let group_id = buf.get_i32_le();
        let count = buf.get_i32_le();
        if group_id != expected_id.0 {
            return Err(TransportError::Protocol(format!(
                "header group id {group_id} does not match local group {expected_id}"
            )));
        }
        if count < 0 {
            return Err(TransportError::Protocol(format!(
                "negative record count {count} for group {expected_id}"
            )));
        }
        counts.push(count as usize);
    }
    Ok(counts)
}

/// Decodes the id frame; its length is dictated by the header totals.
pub fn decode_ids(frame: &Bytes, total: usize) -> Result<Vec<TriangleId>, TransportError> {
    if frame.len() != total * 4 {
        return Err(TransportError::Protocol(format!(
            "id frame is {} bytes, expected {} for {total} records",
            frame.len(),
            total * 4
        )));
    }
    let mut buf = frame.clone();
    Ok((0..total).map(|_| TriangleId(buf.get_i32_le())).collect())
}

/// Decodes the coordinate frame; 9 values per record.
pub fn decode_coords(frame: &Bytes, total: usize) -> Result<Vec<f64>, TransportError> {
    if frame.len() != total * 72 {
        return Err(TransportError::Protocol(format!(
            "coordinate frame is {} bytes, expected {} for {total} records",
            frame.len(),
            total * 72
        )));
    }
    let mut buf = frame.clone();
    Ok((0..total * 9).map(|_| buf.get_f64_le()).collect())
}

/// Decodes the optional trailing tag frame.
pub fn decode_tags(frame: &Bytes, total: usize) -> Result<Vec<i32>, TransportError> {
    if frame.len() != total * 4 {
        return Err(TransportError::Protocol(format!(
            "tag frame is {} bytes, expected {} for {total} records",
            frame.len(),
            total * 4
        )));
    }
    let mut buf = frame.clone();
    Ok((0..total).map(|_| buf.get_i32_le()).collect())
}

/// Reassembles decoded frames into a payload in local group order.
pub fn assemble(
    expected: &[GroupId],
    counts: &[usize],
    ids: Vec<TriangleId>,
    coords: Vec<f64>,
    tags: Option<Vec<i32>>,
) -> MigrationPayload {
    let mut groups = Vec::with_capacity(expected.len());
    let mut offset = 0usize;
    for (group_id, &count) in expected.iter().zip(counts) {
        let mut records = Vec::with_capacity(count);
        for i in offset..offset + count {
            let mut record_coords = [0.0; 9];
            record_coords.copy_from_slice(&coords[i * 9..i * 9 + 9]);
            records.push(TriangleRecord {
                id: ids[i],
                coords: record_coords,
                tag: tags.as_ref().map(|t| t[i]),
            });
        }
        offset += count;
        groups.push(GroupBatch {
            group_id: *group_id,
            records,
        });
    }
    MigrationPayload { groups }
}
