use thiserror::Error;

use crate::context::ContextKey;
use crate::hook_store::SlotKind;
use crate::instance::{ChildKey, InstanceId};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the runtime can surface.
///
/// Variants fall in three groups. Programmer errors (hook order, missing
/// context, stale handles, runaway updates) abort the current operation and
/// are never intercepted by error boundaries. Render faults (`Fault` raised by
/// a render body, rewritten to `RenderFault` once the runtime knows where it
/// came from) travel to the nearest error boundary. Effect faults reuse
/// `Fault` and are reported to the host without unmounting anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(
        "{instance}: hook slot {slot} is a {found} hook on this render but was a {expected} hook \
         on the previous one; hooks must be called in the same order on every render"
    )]
    HookOrder {
        instance: InstanceId,
        slot: usize,
        expected: SlotKind,
        found: SlotKind,
    },
    #[error("{instance}: render used {found} hook slots but the previous render used {expected}")]
    HookCount {
        instance: InstanceId,
        expected: usize,
        found: usize,
    },
    #[error("{instance}: hook slot {slot} does not hold a `{expected}`")]
    SlotType {
        instance: InstanceId,
        slot: usize,
        expected: &'static str,
    },
    #[error("{instance}: {context} has no provider and no default value")]
    MissingContext {
        instance: InstanceId,
        context: ContextKey,
    },
    #[error("{instance} is not mounted")]
    Unmounted { instance: InstanceId },
    #[error("{instance}: props do not match component `{component}`")]
    PropsType {
        instance: InstanceId,
        component: &'static str,
    },
    #[error("{instance}: child key {key:?} was used twice in one render")]
    DuplicateKey { instance: InstanceId, key: ChildKey },
    #[error("{instance}: component nesting exceeded {limit} levels")]
    RenderDepth { instance: InstanceId, limit: usize },
    #[error("updates did not settle after {passes} passes")]
    UpdateLoop { passes: usize },
    #[error("{message}")]
    Fault { message: String },
    #[error("{instance} ({component}) failed to render: {message}")]
    RenderFault {
        instance: InstanceId,
        component: &'static str,
        message: String,
    },
}

impl Error {
    /// Builds a fault for a render body or effect to return.
    pub fn fault(message: impl Into<String>) -> Self {
        Error::Fault {
            message: message.into(),
        }
    }

    /// Faults raised by user code; these are the only errors boundaries catch.
    pub fn is_render_fault(&self) -> bool {
        matches!(self, Error::Fault { .. } | Error::RenderFault { .. })
    }

    pub fn is_programmer_error(&self) -> bool {
        !self.is_render_fault()
    }

    /// Instance the error is attributed to, if any.
    pub fn instance(&self) -> Option<InstanceId> {
        match self {
            Error::HookOrder { instance, .. }
            | Error::HookCount { instance, .. }
            | Error::SlotType { instance, .. }
            | Error::MissingContext { instance, .. }
            | Error::Unmounted { instance }
            | Error::PropsType { instance, .. }
            | Error::DuplicateKey { instance, .. }
            | Error::RenderDepth { instance, .. }
            | Error::RenderFault { instance, .. } => Some(*instance),
            Error::UpdateLoop { .. } | Error::Fault { .. } => None,
        }
    }

    pub(crate) fn located(self, instance: InstanceId, component: &'static str) -> Self {
        match self {
            Error::Fault { message } => Error::RenderFault {
                instance,
                component,
                message,
            },
            other => other,
        }
    }
}
