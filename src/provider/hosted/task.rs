/*!
 * Hosted Tasks
 * OSAL tasks as named OS threads with a start gate and exit hook
 */

use crate::core::errors::{OsalError, OsalResult};
use crate::core::id::ObjectId;
use crate::provider::context;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};

/// Body of a task
pub type TaskEntry = Box<dyn FnOnce() + Send + 'static>;

/// Callback run when a task is deleted
pub type DeleteHandler = Box<dyn FnOnce() + Send + 'static>;

/// Native thread backing one task
///
/// The thread is spawned parked behind a start gate and only runs its entry
/// once the registry has published the task's ID, so the entry can always
/// look itself up. Dropping the gate without opening it makes the thread exit
/// without running the entry.
pub struct NativeTask {
    handle: Mutex<Option<JoinHandle<()>>>,
    gate: Mutex<Option<flume::Sender<()>>>,
    stack_size: usize,
    priority: AtomicU8,
    delete_handler: Mutex<Option<DeleteHandler>>,
}

impl NativeTask {
    /// Spawn the thread for task `id`; `on_exit` runs on the task's own
    /// thread after `entry` returns (or unwinds)
    pub fn spawn<X>(
        id: ObjectId,
        name: &str,
        stack_size: usize,
        priority: u8,
        entry: TaskEntry,
        on_exit: X,
    ) -> OsalResult<Self>
    where
        X: FnOnce(ObjectId) + Send + 'static,
    {
        let (gate_tx, gate_rx) = flume::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .stack_size(stack_size)
            .spawn(move || {
                if gate_rx.recv().is_err() {
                    return;
                }
                let _context = context::enter(id);
                let _exit = ExitHook(Some(move || on_exit(id)));
                entry();
            })
            .map_err(|e| OsalError::OsFailure(format!("thread spawn failed: {}", e)))?;

        Ok(Self {
            handle: Mutex::new(Some(handle)),
            gate: Mutex::new(Some(gate_tx)),
            stack_size,
            priority: AtomicU8::new(priority),
            delete_handler: Mutex::new(None),
        })
    }

    /// Open the start gate
    pub fn start(&self) {
        if let Some(gate) = self.gate.lock().take() {
            let _ = gate.send(());
        }
    }

    #[inline]
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    #[inline]
    pub fn priority(&self) -> u8 {
        self.priority.load(Ordering::Relaxed)
    }

    pub fn set_priority(&self, priority: u8) {
        self.priority.store(priority, Ordering::Relaxed);
    }

    pub fn set_delete_handler(&self, handler: DeleteHandler) {
        *self.delete_handler.lock() = Some(handler);
    }

    /// Run the delete handler, if any, exactly once
    pub fn run_delete_handler(&self) {
        let handler = self.delete_handler.lock().take();
        if let Some(handler) = handler {
            handler();
        }
    }

    /// Release the thread without waiting for it
    ///
    /// Hosted threads cannot be killed; a deleted task's thread keeps running
    /// until its entry returns.
    pub fn detach(&self) {
        self.gate.lock().take();
        self.handle.lock().take();
    }
}

struct ExitHook<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> Drop for ExitHook<F> {
    fn drop(&mut self) {
        if let Some(hook) = self.0.take() {
            hook();
        }
    }
}
