use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

static NEXT_SIGNAL_ID: AtomicU64 = AtomicU64::new(0);

/// Final state of an enqueued command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Complete,
    Failed(String),
}

impl CommandStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, CommandStatus::Complete)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandStatus::Complete => write!(f, "complete"),
            CommandStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

type Observer = Box<dyn FnOnce(&CommandStatus) + Send>;

struct SignalState {
    status: Option<CommandStatus>,
    observers: Vec<Observer>,
}

struct SignalInner {
    id: u64,
    label: String,
    state: Mutex<SignalState>,
    completed: Condvar,
}

impl SignalInner {
    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The future completion of an enqueued command.
///
/// Observers registered with [`CompletionSignal::on_complete`] run on the thread that
/// completes the command, and all of them have returned before [`CompletionSignal::wait`]
/// unblocks. An observer registered after completion runs immediately on the caller.
#[derive(Clone)]
pub struct CompletionSignal {
    inner: Arc<SignalInner>,
}

/// The producing side of a [`CompletionSignal`], held by whoever executes the command.
///
/// Dropping it without calling [`CompletionHandle::complete`] fails the signal so waiters
/// never hang.
pub struct CompletionHandle {
    inner: Option<Arc<SignalInner>>,
}

impl CompletionSignal {
    pub fn pending(label: impl Into<String>) -> (CompletionSignal, CompletionHandle) {
        let inner = Arc::new(SignalInner {
            id: NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            state: Mutex::new(SignalState {
                status: None,
                observers: Vec::new(),
            }),
            completed: Condvar::new(),
        });
        let handle = CompletionHandle {
            inner: Some(Arc::clone(&inner)),
        };
        (CompletionSignal { inner }, handle)
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn status(&self) -> Option<CommandStatus> {
        self.inner.lock().status.clone()
    }

    pub fn on_complete<F>(&self, observer: F)
    where
        F: FnOnce(&CommandStatus) + Send + 'static,
    {
        let mut state = self.inner.lock();
        match state.status.clone() {
            Some(status) => {
                drop(state);
                observer(&status);
            }
            None => state.observers.push(Box::new(observer)),
        }
    }

    /// Block until the command has finished and every observer has run.
    pub fn wait(&self) -> CommandStatus {
        let mut state = self.inner.lock();
        loop {
            if let Some(status) = &state.status {
                return status.clone();
            }
            state = self
                .inner
                .completed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("status", &self.status())
            .finish()
    }
}

impl CompletionHandle {
    pub fn complete(mut self, status: CommandStatus) {
        if let Some(inner) = self.inner.take() {
            Self::finish(&inner, status);
        }
    }

    fn finish(inner: &SignalInner, status: CommandStatus) {
        log::trace!("signal {} ({}) {}", inner.id, inner.label, status);

        // Observers may register more observers, so drain until the list stays empty
        // before publishing the status.
        let mut state = inner.lock();
        loop {
            let observers = std::mem::take(&mut state.observers);
            if observers.is_empty() {
                break;
            }
            drop(state);
            for observer in observers {
                observer(&status);
            }
            state = inner.lock();
        }
        state.status = Some(status);
        drop(state);
        inner.completed.notify_all();
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            Self::finish(
                &inner,
                CommandStatus::Failed("command dropped before completion".to_string()),
            );
        }
    }
}
