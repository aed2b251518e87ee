use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use serde::{Deserialize, Serialize};

use crate::foundation::metadata::Metadata;
use crate::foundation::sync::lock;
use crate::foundation::value::Value;
use crate::observation::registry::ListenerRegistry;

/// Thread a notification should be delivered on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadExecutionMode {
    /// Whatever thread raised it.
    #[default]
    Current,
    /// The dispatcher's owning thread.
    Main,
    /// A worker thread.
    Background,
}

pub type Action = Box<dyn FnOnce() + Send>;

pub trait ThreadDispatcher: Send + Sync {
    fn can_execute_inline(&self, mode: ThreadExecutionMode, metadata: Option<&Metadata>) -> bool;

    fn execute(&self, mode: ThreadExecutionMode, action: Action, metadata: Option<&Metadata>);
}

/// Runs everything on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl ThreadDispatcher for InlineDispatcher {
    fn can_execute_inline(&self, _mode: ThreadExecutionMode, _metadata: Option<&Metadata>) -> bool {
        true
    }

    fn execute(&self, _mode: ThreadExecutionMode, action: Action, _metadata: Option<&Metadata>) {
        action();
    }
}

/// Queues `Main` work for the thread that created it; `Background` work goes to rayon.
///
/// Queued actions run in FIFO order when the owning thread calls [`pump`](Self::pump).
pub struct MainThreadDispatcher {
    main: ThreadId,
    tx: Mutex<Sender<Action>>,
    rx: Mutex<Receiver<Action>>,
}

impl Default for MainThreadDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MainThreadDispatcher {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            main: thread::current().id(),
            tx: Mutex::new(tx),
            rx: Mutex::new(rx),
        }
    }

    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main
    }

    /// Runs queued actions; returns how many ran. Does nothing off the owning thread.
    pub fn pump(&self) -> usize {
        if !self.is_main_thread() {
            return 0;
        }
        let mut ran = 0;
        loop {
            // Release the receiver before running so actions may enqueue more work.
            let next = lock(&self.rx).try_recv();
            match next {
                Ok(action) => {
                    action();
                    ran += 1;
                }
                Err(_) => return ran,
            }
        }
    }
}

impl ThreadDispatcher for MainThreadDispatcher {
    fn can_execute_inline(&self, mode: ThreadExecutionMode, _metadata: Option<&Metadata>) -> bool {
        match mode {
            ThreadExecutionMode::Current => true,
            ThreadExecutionMode::Main => self.is_main_thread(),
            ThreadExecutionMode::Background => false,
        }
    }

    fn execute(&self, mode: ThreadExecutionMode, action: Action, _metadata: Option<&Metadata>) {
        match mode {
            ThreadExecutionMode::Current => action(),
            ThreadExecutionMode::Main => {
                // The receiver lives as long as `self`, so sending cannot fail here.
                let _ = lock(&self.tx).send(action);
            }
            ThreadExecutionMode::Background => rayon::spawn(action),
        }
    }
}

/// A registry whose raises are marshalled through a dispatcher.
#[derive(Clone)]
pub struct DispatchingRegistry {
    registry: Arc<ListenerRegistry>,
    dispatcher: Arc<dyn ThreadDispatcher>,
    mode: ThreadExecutionMode,
}

impl DispatchingRegistry {
    pub fn new(
        registry: Arc<ListenerRegistry>,
        dispatcher: Arc<dyn ThreadDispatcher>,
        mode: ThreadExecutionMode,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            mode,
        }
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    pub fn raise(
        &self,
        sender: &Value,
        message: &Value,
        member: Option<&str>,
        metadata: Option<&Metadata>,
    ) {
        if self.dispatcher.can_execute_inline(self.mode, metadata) {
            self.registry.raise(sender, message, member, metadata);
            return;
        }
        let registry = Arc::clone(&self.registry);
        let sender = sender.clone();
        let message = message.clone();
        let member: Option<Arc<str>> = member.map(Arc::from);
        let owned = metadata.cloned();
        self.dispatcher.execute(
            self.mode,
            Box::new(move || {
                registry.raise(&sender, &message, member.as_deref(), owned.as_ref());
            }),
            metadata,
        );
    }
}

#[cfg(test)]
#[path = "../../tests/unit/observation/dispatch.rs"]
mod tests;
