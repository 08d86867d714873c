// common.rs -- console output facade and the physics error type

use thiserror::Error;

// ============================================================
// Com_Printf / Com_DPrintf
// ============================================================

/// General console output.
pub fn com_printf(msg: &str) {
    tracing::info!("{}", msg.trim_end());
}

/// Developer output. The subscriber decides whether debug level is shown;
/// the `developer` cvar is checked by callers that hold a cvar context.
pub fn com_dprintf(msg: &str) {
    tracing::debug!("{}", msg.trim_end());
}

/// Warnings about content or state that was corrected in place.
pub fn com_wprintf(msg: &str) {
    tracing::warn!("{}", msg.trim_end());
}

// ============================================================
// Errors
// ============================================================

/// Conditions that mean the map data or the calling code is broken. These
/// abort the current frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("{func}: bad node number {node}")]
    BadNodeNumber { func: &'static str, node: usize },

    #[error("hit a {classname} with no model")]
    NoModel { classname: String },

    #[error("hit a {classname} with wrong model type")]
    WrongModelType { classname: String },

    #[error("{classname}: SOLID_BSP without MOVETYPE_PUSH")]
    BspWithoutPush { classname: String },

    #[error("trigger {classname} in clipping list")]
    TriggerInClipList { classname: String },

    #[error("unknown group operation type {0}")]
    UnknownGroupOperation(i32),

    #[error("out of edicts in simulator")]
    OutOfEdicts,

    #[error("FlyMove: trace hit without an entity")]
    NullTraceEntity,

    #[error("SV_Physics: {classname} bad movetype {movetype}")]
    BadMoveType { classname: String, movetype: i32 },

    #[error("sequence {sequence} out of range ({count} sequences)")]
    StudioSequenceOutOfRange { sequence: usize, count: usize },
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;
