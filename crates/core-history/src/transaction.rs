//! Transaction stack and in-frame coalescer: `begin`/`push`/`end`/`cancel`
//! over a stack of frames, with coalescing on a shared `mergeKey` within
//! `coalesceWindowMs`.

use core_command::{BoxedCommand, Command};

/// One open transaction frame. `last_push_ms` is the clock reading the last
/// command was pushed or coalesced at, used to bound the coalesce window.
pub struct Frame {
    pub name: String,
    pub commands: Vec<BoxedCommand>,
    last_push_ms: Option<u64>,
}

impl Frame {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
            last_push_ms: None,
        }
    }
}

/// Stack of open frames. A nested `end(true)` folds the child frame into
/// its parent as a single Composite. Coalescing only ever looks at the top
/// frame; it never crosses a transaction boundary.
#[derive(Default)]
pub struct TransactionStack {
    frames: Vec<Frame>,
}

impl TransactionStack {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn is_open(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn begin(&mut self, name: impl Into<String>) {
        self.frames.push(Frame::new(name));
    }

    /// Pushes `cmd` into the top frame, coalescing with the last pushed
    /// command when both declare `coalescable` and share a `mergeKey`
    /// within `window_ms` of the last push.
    pub fn push(&mut self, cmd: BoxedCommand, now_ms: u64, window_ms: u64) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        if let Some(last) = frame.commands.last() {
            let within_window = frame
                .last_push_ms
                .is_some_and(|t| now_ms.saturating_sub(t) <= window_ms);
            if within_window && last.can_coalesce_with(cmd.as_ref()) {
                let prior = frame.commands.pop().expect("checked non-empty above");
                frame.commands.push(prior.coalesce_with(cmd));
                frame.last_push_ms = Some(now_ms);
                return;
            }
        }
        frame.commands.push(cmd);
        frame.last_push_ms = Some(now_ms);
    }

    /// Ends the top frame. `commit` true folds it (into the parent frame, or
    /// returns it to the caller to commit to the graph if this was the
    /// outermost frame); `commit` false discards it.
    pub fn end(&mut self, commit: bool) -> Option<Vec<BoxedCommand>> {
        let frame = self.frames.pop()?;
        if !commit || frame.commands.is_empty() {
            return None;
        }
        if let Some(parent) = self.frames.last_mut() {
            parent.commands.extend(frame.commands);
            parent.last_push_ms = None;
            None
        } else {
            Some(frame.commands)
        }
    }

    pub fn cancel(&mut self) {
        self.frames.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_command::meta::{CommandMeta, Scope};
    use core_command::commands::SetViewport;
    use core_model::viewport::ViewportPatch;

    fn zoom_cmd(zoom: f32, ts: u64) -> BoxedCommand {
        Box::new(SetViewport {
            meta: CommandMeta::new("Zoom", Scope::Canvas, ts)
                .coalescable(core_command::meta::merge_keys::VIEWPORT),
            patch: ViewportPatch {
                zoom: Some(zoom),
                ..Default::default()
            },
        })
    }

    #[test]
    fn coalesces_within_window_on_shared_merge_key() {
        let mut stack = TransactionStack::new();
        stack.begin("Zoom");
        stack.push(zoom_cmd(110.0, 0), 0, 120);
        stack.push(zoom_cmd(120.0, 30), 30, 120);
        stack.push(zoom_cmd(125.0, 60), 60, 120);
        let folded = stack.end(true).unwrap();
        assert_eq!(folded.len(), 1);
    }

    #[test]
    fn does_not_coalesce_outside_window() {
        let mut stack = TransactionStack::new();
        stack.begin("Zoom");
        stack.push(zoom_cmd(110.0, 0), 0, 120);
        stack.push(zoom_cmd(120.0, 500), 500, 120);
        let folded = stack.end(true).unwrap();
        assert_eq!(folded.len(), 2);
    }

    #[test]
    fn cancel_discards_frame() {
        let mut stack = TransactionStack::new();
        stack.begin("Zoom");
        stack.push(zoom_cmd(110.0, 0), 0, 120);
        stack.cancel();
        assert!(!stack.is_open());
    }

    #[test]
    fn nested_transaction_folds_into_parent() {
        let mut stack = TransactionStack::new();
        stack.begin("Outer");
        stack.push(zoom_cmd(110.0, 0), 0, 120);
        stack.begin("Inner");
        stack.push(zoom_cmd(500.0, 1000), 1000, 120);
        assert!(stack.end(true).is_none());
        let folded = stack.end(true).unwrap();
        assert_eq!(folded.len(), 2);
    }

    #[test]
    fn empty_transaction_end_produces_no_commit() {
        let mut stack = TransactionStack::new();
        stack.begin("Empty");
        assert!(stack.end(true).is_none());
    }
}
