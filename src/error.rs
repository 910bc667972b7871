use std::fmt;

use crate::fragment::{ConnectorId, NodeId, ObjId};

/// Errors raised when a caller breaks the contract of a structure API.
///
/// Absence of a result (no rings, no match) is never reported through this
/// type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    /// A node handle does not refer to a live node of the fragment.
    UnknownNode(NodeId),
    /// A connector handle does not refer to a live connector of the fragment.
    UnknownConnector(ConnectorId),
    /// A connector was asked to connect to itself.
    SelfConnection(ConnectorId),
    /// The object is already connected to the connector.
    AlreadyConnected { connector: ConnectorId, obj: ObjId },
    /// An operation that needs a fragment was given a node or connector.
    NotAFragment,
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "unknown node {}", id.index()),
            Self::UnknownConnector(id) => write!(f, "unknown connector {}", id.index()),
            Self::SelfConnection(id) => {
                write!(f, "connector {} cannot connect to itself", id.index())
            }
            Self::AlreadyConnected { connector, obj } => {
                write!(
                    f,
                    "{:?} is already connected to connector {}",
                    obj,
                    connector.index()
                )
            }
            Self::NotAFragment => write!(f, "structure comparison requires two fragments"),
        }
    }
}

impl std::error::Error for StructureError {}
