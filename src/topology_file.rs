//! On-disk CSR layout
//!
//! All words are little-endian:
//!
//! ```text
//! u64 version (= 1)
//! u64 reserved (= 0)
//! u64 num_nodes
//! u64 num_edges
//! u64 out_indices[num_nodes]
//! u32 out_dests[num_edges]
//! u32 pad                      (only when num_edges is odd)
//! ```
//!
//! The same module encodes the id permutation arrays persisted with
//! derived views (a u64 length followed by the values).

use crate::error::{RdgError, RdgResult};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use samyama_topology::{EdgeId, GraphTopology, NodeId};

/// Layout version written by this engine
pub const TOPOLOGY_FILE_VERSION: u64 = 1;

const HEADER_WORDS: usize = 4;

/// Serialize a topology
pub fn encode_topology(topology: &GraphTopology) -> Bytes {
    let num_nodes = topology.num_nodes();
    let num_edges = topology.num_edges();
    let pad = num_edges % 2;
    let mut buf = BytesMut::with_capacity((HEADER_WORDS + num_nodes) * 8 + (num_edges + pad) * 4);

    buf.put_u64_le(TOPOLOGY_FILE_VERSION);
    buf.put_u64_le(0);
    buf.put_u64_le(num_nodes as u64);
    buf.put_u64_le(num_edges as u64);
    for &idx in topology.out_indices() {
        buf.put_u64_le(idx);
    }
    for &dst in topology.out_dests() {
        buf.put_u32_le(dst);
    }
    if pad == 1 {
        buf.put_u32_le(0);
    }
    buf.freeze()
}

/// Parse and validate a topology file
pub fn decode_topology(data: &[u8]) -> RdgResult<GraphTopology> {
    if data.len() < HEADER_WORDS * 8 {
        return Err(RdgError::InvalidArgument(format!(
            "topology file too short for header: {} bytes",
            data.len()
        )));
    }
    let mut buf = data;
    let version = buf.get_u64_le();
    if version != TOPOLOGY_FILE_VERSION {
        return Err(RdgError::InvalidArgument(format!("unsupported topology file version {}", version)));
    }
    let _reserved = buf.get_u64_le();
    let num_nodes = buf.get_u64_le();
    let num_edges = buf.get_u64_le();

    let required = num_nodes
        .checked_mul(8)
        .and_then(|n| num_edges.checked_mul(4).and_then(|e| n.checked_add(e)))
        .ok_or_else(|| RdgError::InvalidArgument("topology file sizes overflow".to_string()))?;
    if (buf.remaining() as u64) < required {
        return Err(RdgError::InvalidArgument(format!(
            "topology file truncated: {} nodes and {} edges need {} bytes after the header, found {}",
            num_nodes,
            num_edges,
            required,
            buf.remaining()
        )));
    }

    let out_indices: Vec<u64> = (0..num_nodes).map(|_| buf.get_u64_le()).collect();
    let out_dests: Vec<NodeId> = (0..num_edges).map(|_| buf.get_u32_le()).collect();

    GraphTopology::try_new(out_indices, out_dests)
        .ok_or_else(|| RdgError::InvalidArgument("topology file holds an invalid CSR".to_string()))
}

/// Serialize an edge id permutation
pub fn encode_edge_ids(ids: &[EdgeId]) -> Bytes {
    let mut buf = BytesMut::with_capacity(8 + ids.len() * 8);
    buf.put_u64_le(ids.len() as u64);
    for &id in ids {
        buf.put_u64_le(id);
    }
    buf.freeze()
}

pub fn decode_edge_ids(data: &[u8]) -> RdgResult<Vec<EdgeId>> {
    let mut buf = data;
    let len = read_len(&mut buf, 8)?;
    Ok((0..len).map(|_| buf.get_u64_le()).collect())
}

/// Serialize a node id permutation
pub fn encode_node_ids(ids: &[NodeId]) -> Bytes {
    let mut buf = BytesMut::with_capacity(8 + ids.len() * 4);
    buf.put_u64_le(ids.len() as u64);
    for &id in ids {
        buf.put_u32_le(id);
    }
    buf.freeze()
}

pub fn decode_node_ids(data: &[u8]) -> RdgResult<Vec<NodeId>> {
    let mut buf = data;
    let len = read_len(&mut buf, 4)?;
    Ok((0..len).map(|_| buf.get_u32_le()).collect())
}

fn read_len(buf: &mut &[u8], width: usize) -> RdgResult<usize> {
    if buf.remaining() < 8 {
        return Err(RdgError::InvalidArgument("id array file too short".to_string()));
    }
    let len = buf.get_u64_le() as usize;
    if len.checked_mul(width).map_or(true, |bytes| bytes > buf.remaining()) {
        return Err(RdgError::InvalidArgument(format!("id array file truncated: {} entries expected", len)));
    }
    Ok(len)
}
