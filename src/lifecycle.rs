//! Bean lifecycle states.

use std::fmt;

/// Lifecycle state of a bean.
///
/// A bean only moves forward: `Allocated -> Created -> Constructing -> Initialized`,
/// and on teardown `Initialized -> Destroying -> Destroyed`. The only way back is an
/// explicit [`BeanHandle::reload`](crate::BeanHandle::reload), which destroys and
/// re-initializes the same object in place.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::Lifecycle;
///
/// assert!(Lifecycle::Allocated < Lifecycle::Initialized);
/// assert!(Lifecycle::Initialized.is_ready());
/// assert!(!Lifecycle::Constructing.is_ready());
/// assert_eq!(Lifecycle::Destroyed.to_string(), "destroyed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lifecycle {
    /// Registered at scan time; for factory placeholders the object is still absent.
    Allocated,
    /// Object present, dependencies not yet wired.
    Created,
    /// Dependencies are being constructed; re-entering this state on the same
    /// construction path is a cycle.
    Constructing,
    /// Post-construction hook has run; the bean is usable.
    Initialized,
    /// Disposal hook is running.
    Destroying,
    /// Disposal hook has run.
    Destroyed,
}

impl Lifecycle {
    /// Whether the bean has finished construction and has not been torn down.
    pub fn is_ready(self) -> bool {
        self == Lifecycle::Initialized
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Allocated => "allocated",
            Lifecycle::Created => "created",
            Lifecycle::Constructing => "constructing",
            Lifecycle::Initialized => "initialized",
            Lifecycle::Destroying => "destroying",
            Lifecycle::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}
