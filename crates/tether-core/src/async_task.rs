//! # Async tasks
//!
//! `AsyncTask<T>` runs one asynchronous operation at a time and exposes its
//! progress as plain data (`AsyncState<T>`). Each run is tagged with a
//! generation; when a newer run starts, results of older ones are dropped on
//! arrival, so out-of-order completions never overwrite fresher data.
//!
//! Inside a surface, `produce_async` re-runs the operation whenever its
//! dependencies change:
//!
//! ```rust
//! use futures::executor::LocalPool;
//! use tether_core::*;
//!
//! let mut pool = LocalPool::new();
//! let surface = Surface::new("profile").with_spawner(pool.spawner());
//!
//! let render = |user_id: u32| {
//!     async_state(user_id, move || async move {
//!         Ok::<_, std::convert::Infallible>(format!("user {user_id}"))
//!     })
//! };
//!
//! assert!(surface.compose(|| render(1)).unwrap().pending);
//! pool.run_until_stalled();
//! let state = surface.compose(|| render(1)).unwrap();
//! assert_eq!(state.value.as_deref(), Some("user 1"));
//! ```

use std::cell::RefCell;
use std::fmt::Display;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::{LocalSpawn, LocalSpawnExt};

use crate::{Signal, Spawner, SubId, TaskError, current_spawner, remember, unmount_effect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AsyncStatus {
    Idle,
    Pending,
    Resolved,
    Rejected,
}

/// Snapshot of an `AsyncTask`, read synchronously while rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct AsyncState<T> {
    pub pending: bool,
    pub value: Option<T>,
    pub error: Option<TaskError>,
}

impl<T> Default for AsyncState<T> {
    fn default() -> Self {
        Self {
            pending: false,
            value: None,
            error: None,
        }
    }
}

impl<T> AsyncState<T> {
    pub fn status(&self) -> AsyncStatus {
        if self.pending {
            AsyncStatus::Pending
        } else if self.error.is_some() {
            AsyncStatus::Rejected
        } else if self.value.is_some() {
            AsyncStatus::Resolved
        } else {
            AsyncStatus::Idle
        }
    }
}

type Factory<T> = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<T, TaskError>>>;

struct TaskInner<T> {
    generation: u64,
    pending: bool,
    value: Option<T>,
    error: Option<TaskError>,
    factory: Option<Factory<T>>,
    spawner: Option<Spawner>,
}

pub struct AsyncTask<T: 'static> {
    inner: Rc<RefCell<TaskInner<T>>>,
    revision: Signal<u64>,
}

impl<T> Clone for AsyncTask<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            revision: self.revision.clone(),
        }
    }
}

impl<T> Default for AsyncTask<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AsyncTask<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(TaskInner {
                generation: 0,
                pending: false,
                value: None,
                error: None,
                factory: None,
                spawner: None,
            })),
            revision: Signal::new(0),
        }
    }

    pub fn state(&self) -> AsyncState<T>
    where
        T: Clone,
    {
        let inner = self.inner.borrow();
        AsyncState {
            pending: inner.pending,
            value: inner.value.clone(),
            error: inner.error.clone(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.inner.borrow().generation
    }

    pub fn is_pending(&self) -> bool {
        self.inner.borrow().pending
    }

    /// Starts a new generation: clears value and error and marks the task pending.
    pub fn begin(&self) -> u64 {
        let generation = {
            let mut inner = self.inner.borrow_mut();
            inner.generation += 1;
            inner.pending = true;
            inner.value = None;
            inner.error = None;
            inner.generation
        };
        log::debug!("async task generation {generation} started");
        self.bump();
        generation
    }

    /// Commits `outcome` if `generation` is still the current, unsettled one.
    pub fn settle(&self, generation: u64, outcome: Result<T, TaskError>) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.generation != generation || !inner.pending {
                log::trace!(
                    "discarding result of generation {generation} (current {})",
                    inner.generation
                );
                return false;
            }
            inner.pending = false;
            match outcome {
                Ok(value) => inner.value = Some(value),
                Err(err) => {
                    log::debug!("async task generation {generation} failed: {err}");
                    inner.error = Some(err);
                }
            }
        }
        self.bump();
        true
    }

    /// Begins a generation and spawns `fut`, settling its result with that generation.
    pub fn launch<Fut, E>(&self, spawner: &dyn LocalSpawn, fut: Fut) -> u64
    where
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Display + 'static,
    {
        let generation = self.begin();
        let task = self.downgrade();
        let driver = async move {
            let outcome = fut.await.map_err(TaskError::failed);
            match task.upgrade() {
                Some(task) => {
                    task.settle(generation, outcome);
                }
                None => log::trace!("async task dropped before generation {generation} settled"),
            }
        };

        if let Err(err) = spawner.spawn_local(driver) {
            log::warn!("failed to spawn async task: {err}");
            self.settle(
                generation,
                Err(TaskError::new(format!("failed to spawn task: {err}"))),
            );
        }
        generation
    }

    pub fn set_factory<Fut, E>(&self, factory: impl Fn() -> Fut + 'static)
    where
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Display + 'static,
    {
        let factory: Factory<T> = Rc::new(move || {
            let fut = factory();
            async move { fut.await.map_err(TaskError::failed) }.boxed_local()
        });
        self.inner.borrow_mut().factory = Some(factory);
    }

    pub fn set_spawner(&self, spawner: Option<Spawner>) {
        self.inner.borrow_mut().spawner = spawner;
    }

    /// Runs the latest factory again. `false` if no factory or spawner is configured.
    pub fn retry(&self) -> bool {
        let (factory, spawner) = {
            let inner = self.inner.borrow();
            (inner.factory.clone(), inner.spawner.clone())
        };
        match (factory, spawner) {
            (Some(factory), Some(spawner)) => {
                self.launch(spawner.as_local_spawn(), factory());
                true
            }
            _ => false,
        }
    }

    /// Makes any in-flight result inert. Value and error are kept.
    pub fn cancel(&self) {
        let was_pending = {
            let mut inner = self.inner.borrow_mut();
            inner.generation += 1;
            std::mem::replace(&mut inner.pending, false)
        };
        if was_pending {
            log::debug!("async task cancelled while pending");
            self.bump();
        }
    }

    /// Called after every state transition.
    pub fn subscribe(&self, f: impl Fn() + 'static) -> SubId {
        self.revision.subscribe(move |_| f())
    }

    pub fn unsubscribe(&self, id: SubId) -> bool {
        self.revision.unsubscribe(id)
    }

    fn bump(&self) {
        self.revision.update(|r| *r += 1);
    }

    fn downgrade(&self) -> WeakTask<T> {
        WeakTask {
            inner: Rc::downgrade(&self.inner),
            revision: self.revision.clone(),
        }
    }
}

struct WeakTask<T: 'static> {
    inner: std::rc::Weak<RefCell<TaskInner<T>>>,
    revision: Signal<u64>,
}

impl<T> WeakTask<T> {
    fn upgrade(&self) -> Option<AsyncTask<T>> {
        self.inner.upgrade().map(|inner| AsyncTask {
            inner,
            revision: self.revision.clone(),
        })
    }
}

/// Remembers an `AsyncTask` that runs `factory` on the first pass and again
/// whenever `deps` changes. Teardown cancels it.
pub fn produce_async<K, T, E, Fut>(deps: K, factory: impl Fn() -> Fut + 'static) -> AsyncTask<T>
where
    K: PartialEq + 'static,
    T: 'static,
    E: Display + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    let task = remember(AsyncTask::<T>::new);
    let last_deps = remember(|| RefCell::new(None::<K>));

    task.set_factory(factory);
    task.set_spawner(current_spawner());

    unmount_effect({
        let task = (*task).clone();
        move || task.cancel()
    });

    let changed = last_deps.borrow().as_ref() != Some(&deps);
    if changed {
        *last_deps.borrow_mut() = Some(deps);
        if !task.retry() {
            let generation = task.begin();
            task.settle(
                generation,
                Err(TaskError::new("no executor attached to surface")),
            );
        }
    }

    (*task).clone()
}

/// `produce_async(deps, factory).state()`
pub fn async_state<K, T, E, Fut>(deps: K, factory: impl Fn() -> Fut + 'static) -> AsyncState<T>
where
    K: PartialEq + 'static,
    T: Clone + 'static,
    E: Display + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    produce_async(deps, factory).state()
}
