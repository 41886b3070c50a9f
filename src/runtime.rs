//! Parallel resolution runtime.
//!
//! A small, bounded, thread-based pool that resolves whole containers on
//! worker threads. Every worker owns its own [`CascadeResolver`] (and so its
//! own cache) over a shared immutable graph; no resolution state crosses
//! threads.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::cascade::CascadeResolver;
use crate::config::ResolverConfig;
use crate::error::{MarkupError, MarkupResult, RuntimeError};
use crate::graph::{ContainerId, Graph};
use crate::ir::{describe, ObjectRecord};

/// Pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Maximum queued jobs.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
        }
    }
}

/// The resolved objects of one container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerResolution {
    pub container: String,
    /// Units, then the container, then its relations.
    pub objects: Vec<ObjectRecord>,
}

enum Job {
    Resolve {
        container: ContainerId,
        reply: Sender<ContainerResolution>,
    },

    #[cfg(test)]
    Sleep {
        duration: Duration,
        reply: Sender<()>,
    },
}

fn resolve_one(resolver: &mut CascadeResolver<'_>, container: ContainerId) -> ContainerResolution {
    let mut keys = resolver.resolve_container(container);
    keys.extend(resolver.resolve_relations(container));
    let objects = keys.into_iter().filter_map(|key| describe(resolver, key)).collect();
    ContainerResolution {
        container: resolver.graph().container(container).name.clone(),
        objects,
    }
}

/// Handle returned by [`ResolutionPool::submit`].
pub struct ResolutionHandle {
    container: String,
    rx: Receiver<ContainerResolution>,
}

impl ResolutionHandle {
    /// Name of the container being resolved.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Waits for the resolution to complete.
    pub fn join(self) -> MarkupResult<ContainerResolution> {
        self.rx
            .recv()
            .map_err(|_| MarkupError::Runtime(RuntimeError::Disconnected))
    }

    /// Waits for the resolution to complete with a timeout.
    pub fn join_timeout(self, timeout: Duration) -> MarkupResult<ContainerResolution> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => MarkupError::Runtime(RuntimeError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            }),
            RecvTimeoutError::Disconnected => MarkupError::Runtime(RuntimeError::Disconnected),
        })
    }
}

/// Resolves containers of one graph on a fixed set of worker threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use clipmark::runtime::{PoolConfig, ResolutionPool};
/// use clipmark::{Container, Graph, Pointer, ResolverConfig};
///
/// let graph = Graph::builder()
///     .container(Container::new("a").with_clip(Pointer::range("t", 0, 4)))
///     .container(Container::new("b").with_clip(Pointer::range("t", 4, 4)))
///     .build()
///     .unwrap();
/// let pool = ResolutionPool::start(Arc::new(graph), Arc::new(ResolverConfig::default()), PoolConfig::default()).unwrap();
/// let resolved = pool.resolve_all().unwrap();
/// assert_eq!(resolved.len(), 2);
/// assert_eq!(resolved[1].container, "b");
/// ```
pub struct ResolutionPool {
    graph: Arc<Graph>,
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl ResolutionPool {
    /// Spawns the workers.
    ///
    /// # Errors
    ///
    /// Returns an internal error when a worker thread cannot be spawned, and
    /// a validation error when the resolver configuration is invalid.
    pub fn start(graph: Arc<Graph>, config: Arc<ResolverConfig>, pool: PoolConfig) -> MarkupResult<Self> {
        config.validate()?;
        let workers = pool.workers.max(1);
        let queue_capacity = pool.queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let graph = Arc::clone(&graph);
            let config = Arc::clone(&config);
            let handle = thread::Builder::new()
                .name(format!("clipmark-resolve-{idx}"))
                .spawn(move || {
                    let mut resolver = CascadeResolver::new(&graph, &config);
                    loop {
                        match rx.recv() {
                            Ok(Job::Resolve { container, reply }) => {
                                let resolution = resolve_one(&mut resolver, container);
                                trace!(
                                    worker = idx,
                                    container = %resolution.container,
                                    objects = resolution.objects.len(),
                                    "container resolved"
                                );
                                let _ = reply.send(resolution);
                            }
                            Err(_) => break,

                            #[cfg(test)]
                            Ok(Job::Sleep { duration, reply }) => {
                                thread::sleep(duration);
                                let _ = reply.send(());
                            }
                        }
                    }
                })
                .map_err(|e| MarkupError::internal(format!("spawn resolution worker: {e}")))?;
            handles.push(handle);
        }
        debug!(workers, queue_capacity, "resolution pool started");

        Ok(Self {
            graph,
            tx: Some(tx),
            workers: handles,
            queue_capacity,
        })
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    fn try_submit(&self, job: Job) -> Result<(), RuntimeError> {
        let Some(tx) = &self.tx else {
            return Err(RuntimeError::Disconnected);
        };
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(RuntimeError::QueueFull {
                capacity: self.queue_capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(RuntimeError::Disconnected),
        }
    }

    fn enqueue(&self, container: ContainerId, blocking: bool) -> MarkupResult<ResolutionHandle> {
        let (reply, rx) = bounded::<ContainerResolution>(1);
        let job = Job::Resolve { container, reply };
        if blocking {
            let tx = self.tx.as_ref().ok_or(RuntimeError::Disconnected)?;
            tx.send(job).map_err(|_| RuntimeError::Disconnected)?;
        } else {
            self.try_submit(job)?;
        }
        Ok(ResolutionHandle {
            container: self.graph.container(container).name.clone(),
            rx,
        })
    }

    /// Queues one container without blocking.
    ///
    /// # Errors
    ///
    /// `RuntimeError::UnknownContainer` for names absent from the graph,
    /// `RuntimeError::QueueFull` when the queue is at capacity.
    pub fn submit(&self, container: &str) -> MarkupResult<ResolutionHandle> {
        let id = self
            .graph
            .container_id(container)
            .ok_or_else(|| RuntimeError::UnknownContainer {
                name: container.to_string(),
            })?;
        self.enqueue(id, false)
    }

    /// Resolves one container and waits for the result.
    pub fn resolve(&self, container: &str) -> MarkupResult<ContainerResolution> {
        self.submit(container)?.join()
    }

    /// Resolves every container of the graph, in graph order.
    ///
    /// Blocks while the queue is full instead of failing.
    pub fn resolve_all(&self) -> MarkupResult<Vec<ContainerResolution>> {
        let handles = self
            .graph
            .container_ids()
            .map(|id| self.enqueue(id, true))
            .collect::<MarkupResult<Vec<_>>>()?;
        handles.into_iter().map(ResolutionHandle::join).collect()
    }

    #[cfg(test)]
    fn submit_sleep(&self, duration: Duration) -> MarkupResult<Receiver<()>> {
        let (tx, rx) = bounded::<()>(1);
        self.try_submit(Job::Sleep { duration, reply: tx })?;
        Ok(rx)
    }

    /// Stops accepting work, lets workers drain queued jobs, and joins them.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Closing the channel ends each worker loop once the queue drains.
        self.tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for ResolutionPool {
    fn drop(&mut self) {
        self.stop();
    }
}
