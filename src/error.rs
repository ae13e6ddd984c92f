//! Error types. Routine control-loop conditions (pickup refused, joint
//! overshoot) are guard clauses, not errors.

use crate::rig::RigId;
use crate::rig::def::SegmentRole;

/// Errors that can occur when loading, saving, or parsing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),

    /// Failed to write the config file to disk.
    #[error("failed to write config: {0}")]
    Write(#[source] std::io::Error),

    /// Failed to parse RON content.
    #[error("failed to parse config: {0}")]
    Parse(#[source] ron::error::SpannedError),

    /// Failed to serialize config to RON.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),
}

/// Topology problems in a rig definition, caught before any body is created.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RigError {
    #[error("rig definition has no segments")]
    EmptyDefinition,

    #[error("segment {0:?} is defined or attached twice")]
    DuplicateSegment(SegmentRole),

    #[error("joint `{joint}` references unknown segment {role:?}")]
    UnknownSegment { joint: &'static str, role: SegmentRole },

    #[error("joint `{joint}` attaches {child:?} before its parent {parent:?} exists")]
    ChildBeforeParent {
        joint: &'static str,
        parent: SegmentRole,
        child: SegmentRole,
    },

    #[error("segment {0:?} is never attached to the root")]
    Unattached(SegmentRole),

    #[error("convex hull of {0:?} is degenerate")]
    DegenerateHull(SegmentRole),

    #[error("joint `{0}` has a zero axis or a reference parallel to its axis")]
    DegenerateAxis(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error("no rig with id {0}")]
    UnknownRig(RigId),

    #[error(transparent)]
    Rig(#[from] RigError),
}
