//! Commands: world mutations applied by the worker thread
//!
//! Commands are applied in submission order, and every command queued before
//! a tick starts is applied before that tick answers any query.

use std::path::PathBuf;

use bitflags::bitflags;

use crate::collision::{Shape, ShapeId};
use crate::foundation::math::{RigidTransform, Vec3};

bitflags! {
    /// Options for adding a shape
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AddFlags: u32 {
        /// Permit the shape to be split across tree regions.
        ///
        /// Accepted for compatibility with level data that sets it; the
        /// dynamic tree never splits shapes.
        const ALLOW_SPLIT = 1 << 0;
    }
}

/// A mutation of the collision world
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Remove one shape
    RemoveShape {
        /// Shape to remove
        shape_id: ShapeId,
    },
    /// Remove every shape
    RemoveAllShapes,
    /// Move a shape
    SetObjectToWorld {
        /// Shape to move
        shape_id: ShapeId,
        /// New object-to-world transform
        object_to_world: RigidTransform,
    },
    /// Change the color a shape is drawn with
    SetDebugRenderColor {
        /// Shape to recolor
        shape_id: ShapeId,
        /// RGB color
        color: Vec3,
    },
    /// Replace a shape's user flags
    SetUserFlags {
        /// Shape to update
        shape_id: ShapeId,
        /// New flag bits
        user_flags: u64,
    },
    /// Zero all profiling counters and timings
    ResetProfileData,
    /// Write every shape to a new file
    Dump {
        /// Destination; must not exist
        path: PathBuf,
    },
    /// Replace the world with the shapes in a file
    Restore {
        /// Source; must exist
        path: PathBuf,
    },
}

impl Command {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::RemoveShape { .. } => "RemoveShape",
            Self::RemoveAllShapes => "RemoveAllShapes",
            Self::SetObjectToWorld { .. } => "SetObjectToWorld",
            Self::SetDebugRenderColor { .. } => "SetDebugRenderColor",
            Self::SetUserFlags { .. } => "SetUserFlags",
            Self::ResetProfileData => "ResetProfileData",
            Self::Dump { .. } => "Dump",
            Self::Restore { .. } => "Restore",
        }
    }
}

/// What actually travels through the command queue
#[derive(Debug)]
pub(crate) enum QueuedCommand {
    Apply(Command),
    AddShape {
        shape_id: ShapeId,
        shape: Box<Shape>,
        flags: AddFlags,
    },
    Exit,
}

impl QueuedCommand {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Apply(command) => command.name(),
            Self::AddShape { .. } => "AddShape",
            Self::Exit => "Exit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_flags_reject_unknown_bits() {
        assert_eq!(AddFlags::from_bits(1), Some(AddFlags::ALLOW_SPLIT));
        assert_eq!(AddFlags::from_bits(0b110), None);
        assert!(AddFlags::default().is_empty());
    }

    #[test]
    fn test_command_names() {
        assert_eq!(Command::RemoveAllShapes.name(), "RemoveAllShapes");
        assert_eq!(QueuedCommand::Exit.name(), "Exit");
        assert_eq!(
            QueuedCommand::Apply(Command::Dump { path: PathBuf::from("a.bin") }).name(),
            "Dump"
        );
    }
}
