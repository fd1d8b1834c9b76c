//! Dataflow edges between sibling nodes.

use super::types::{EdgeKind, NodeId};

/// A dataflow connection from an output port of `source` to an input port of
/// `dest`. Both endpoints live in the same subgraph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: NodeId,
    pub dest: NodeId,
    /// Output slot of the source.
    pub source_port: u32,
    /// Input slot of the destination.
    pub dest_port: u32,
    pub kind: EdgeKind,
    pub streaming: bool,
}

impl Edge {
    /// One-to-one, non-streaming edge between port 0 of both ends.
    pub fn new(source: NodeId, dest: NodeId) -> Self {
        Self {
            source,
            dest,
            source_port: 0,
            dest_port: 0,
            kind: EdgeKind::OneToOne,
            streaming: false,
        }
    }

    pub fn with_ports(mut self, source_port: u32, dest_port: u32) -> Self {
        self.source_port = source_port;
        self.dest_port = dest_port;
        self
    }

    pub fn with_kind(mut self, kind: EdgeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}
