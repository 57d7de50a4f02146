//! Construction stack and the fault boundary around user hooks.

use std::panic::{self, AssertUnwindSafe};

use crate::error::{BeansError, BeansResult};

const MAX_DEPTH: usize = 1024;

/// Beans currently being constructed by one top-level request, innermost last.
///
/// Explicit rather than thread-local: construction of distinct containers on the
/// same thread never shares a stack.
#[derive(Debug, Default)]
pub(crate) struct ConstructionStack {
    frames: Vec<Frame>,
}

#[derive(Debug)]
struct Frame {
    id: usize,
    name: String,
}

impl ConstructionStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, id: usize) -> bool {
        self.frames.iter().any(|frame| frame.id == id)
    }

    /// Pushes a frame; fails on a cycle or when recursion is too deep.
    pub(crate) fn push(&mut self, id: usize, name: &str) -> BeansResult<()> {
        if self.contains(id) {
            return Err(self.cycle(id, name));
        }
        if self.frames.len() >= MAX_DEPTH {
            return Err(BeansError::DepthExceeded(self.frames.len()));
        }
        self.frames.push(Frame {
            id,
            name: name.to_string(),
        });
        Ok(())
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    /// Cycle error closing at `id`: the path from its first frame, then `id` again.
    pub(crate) fn cycle(&self, id: usize, name: &str) -> BeansError {
        let start = self
            .frames
            .iter()
            .position(|frame| frame.id == id)
            .unwrap_or(self.frames.len());
        let mut path: Vec<String> = self.frames[start..]
            .iter()
            .map(|frame| frame.name.clone())
            .collect();
        path.push(name.to_string());
        BeansError::Cycle { path }
    }

    /// `"a required by b required by c"`, innermost first.
    pub(crate) fn chain(&self, name: &str) -> String {
        let mut chain = name.to_string();
        for frame in self.frames.iter().rev() {
            chain.push_str(" required by ");
            chain.push_str(&frame.name);
        }
        chain
    }
}

/// Runs a user hook, converting a panic into [`BeansError::Panicked`] when `recover` is set.
pub(crate) fn with_fault_catch<T, F>(
    recover: bool,
    bean: &str,
    stage: &'static str,
    f: F,
) -> BeansResult<T>
where
    F: FnOnce() -> BeansResult<T>,
{
    if !recover {
        return f();
    }
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(BeansError::Panicked {
            bean: bean.to_string(),
            stage,
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
