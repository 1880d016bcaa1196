//! Background decompilation requests
//!
//! Decompiling is left to an external [`SourceProvider`]. The queue runs
//! requests on its own thread pool, keyed by class: a newer request for a
//! class cancels the older one, and only the newest result for a class is
//! ever delivered. Providers receive a snapshot of the mappings, so
//! renames made while they run never block on them.

use crate::entry::ClassEntry;
use crate::mapping::{EntryMapping, EntryTree};
use rayon::ThreadPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompileError {
    #[error("Decompilation was cancelled")]
    Cancelled,

    #[error("Decompilation failed: {0}")]
    Failed(String),

    #[error("Failed to start decompiler threads: {0}")]
    Pool(String),
}

/// Shared cancellation flag handed to a running request
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The external decompiler
pub trait SourceProvider: Send + Sync + 'static {
    /// Produce source for `class` with `mappings` applied. Long-running
    /// providers should poll `cancel` and give up once it is set.
    fn decompile(
        &self,
        class: &ClassEntry,
        mappings: &EntryTree<EntryMapping>,
        cancel: &CancelToken,
    ) -> Result<String, DecompileError>;
}

/// A finished request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompileResult {
    pub class: ClassEntry,
    /// Request number returned by [`DecompileQueue::request`]
    pub generation: u64,
    pub source: Result<String, DecompileError>,
}

type InFlight = Arc<Mutex<HashMap<ClassEntry, (u64, CancelToken)>>>;

pub struct DecompileQueue<P: SourceProvider> {
    provider: Arc<P>,
    pool: ThreadPool,
    in_flight: InFlight,
    next_generation: AtomicU64,
    tx: Sender<DecompileResult>,
    rx: Receiver<DecompileResult>,
}

impl<P: SourceProvider> DecompileQueue<P> {
    pub fn new(provider: P, threads: usize) -> Result<Self, DecompileError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("decompile-{}", i))
            .build()
            .map_err(|e| DecompileError::Pool(e.to_string()))?;
        let (tx, rx) = mpsc::channel();

        Ok(Self {
            provider: Arc::new(provider),
            pool,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
            tx,
            rx,
        })
    }

    /// Queue `class` for decompilation, superseding any request for it that
    /// is still running. Returns the request's generation.
    pub fn request(&self, class: ClassEntry, mappings: Arc<EntryTree<EntryMapping>>) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancelToken::new();

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((previous, old_token)) =
                in_flight.insert(class.clone(), (generation, token.clone()))
            {
                debug!("Request {} for {} supersedes {}", generation, class, previous);
                old_token.cancel();
            }
        }

        let provider = Arc::clone(&self.provider);
        let in_flight = Arc::clone(&self.in_flight);
        let tx = self.tx.clone();

        self.pool.spawn(move || {
            let source = if token.is_cancelled() {
                Err(DecompileError::Cancelled)
            } else {
                provider.decompile(&class, &mappings, &token)
            };

            let mut in_flight = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            let current = matches!(in_flight.get(&class), Some((latest, _)) if *latest == generation);
            if !current || token.is_cancelled() {
                return;
            }
            in_flight.remove(&class);
            drop(in_flight);

            // The receiver only disappears with the queue itself
            let _ = tx.send(DecompileResult {
                class,
                generation,
                source,
            });
        });
        generation
    }

    /// Cancel the running request for `class`, if any
    pub fn cancel(&self, class: &ClassEntry) -> bool {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        match in_flight.remove(class) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Requests not yet delivered
    pub fn pending(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn try_recv(&self) -> Option<DecompileResult> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<DecompileResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
