use crate::api::{ApiRequest, Backend, SnapshotCounts};
use crate::pipeline::MotionCommand;
use color_eyre::eyre::{bail, eyre, ContextCompat, Result, WrapErr};
use log::{debug, info, warn};
use serde_json::Value;
use std::{
    collections::VecDeque,
    sync::{
        mpsc::{self, Sender},
        Arc, Condvar, Mutex,
    },
    thread::{self, JoinHandle},
};

/// Hands requests to background workers so callers never wait on the
/// network. Replies are logged; failures are logged and dropped.
///
/// Motion commands have their own lane so a halt never waits behind other
/// traffic or behind drive commands it has made stale.
pub struct Dispatcher {
    motion: Arc<MotionLane>,
    sender: Option<Sender<ApiRequest>>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new<B>(backend: B) -> Result<Self>
    where
        B: Backend + 'static,
    {
        let backend = Arc::new(backend);
        let motion = Arc::new(MotionLane::default());
        let (sender, receiver) = mpsc::channel::<ApiRequest>();

        let motion_worker = {
            let backend = backend.clone();
            let motion = motion.clone();
            thread::Builder::new()
                .name("dispatch-motion".into())
                .spawn(move || {
                    while let Some(command) = motion.next() {
                        deliver(&*backend, &ApiRequest::Joystick(command));
                    }
                })
                .wrap_err("failed to spawn motion dispatcher thread")?
        };

        let request_worker = thread::Builder::new()
            .name("dispatch".into())
            .spawn(move || {
                for request in receiver {
                    deliver(&*backend, &request);
                }
            })
            .wrap_err("failed to spawn dispatcher thread")?;

        Ok(Self {
            motion,
            sender: Some(sender),
            workers: vec![motion_worker, request_worker],
        })
    }

    /// Queue a request. Succeeds once the request is handed to a worker,
    /// not when the rover answers.
    pub fn submit(&self, request: ApiRequest) -> Result<()> {
        debug!("{} {:?}", request.path(), request);

        match request {
            ApiRequest::Joystick(command) => self.motion.push(command),
            request => self
                .sender
                .as_ref()
                .wrap_err("dispatcher is shut down")?
                .send(request)
                .wrap_err("dispatcher worker has stopped"),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Closing both lanes lets the workers drain what is queued and exit.
        self.motion.close();
        self.sender.take();

        for worker in self.workers.drain(..) {
            join_logged(worker, "dispatcher");
        }
    }
}

/// Wait for a worker thread, logging instead of propagating a panic.
/// Returns whether the thread finished cleanly.
pub fn join_logged(worker: JoinHandle<()>, name: &str) -> bool {
    let finished = worker.join().is_ok();
    if !finished {
        warn!("{} thread panicked", name);
    }
    finished
}

#[derive(Debug, Default)]
struct MotionQueue {
    /// Stops, followed by at most one drive command.
    pending: VecDeque<MotionCommand>,
    closed: bool,
}

#[derive(Debug, Default)]
struct MotionLane {
    queue: Mutex<MotionQueue>,
    ready: Condvar,
}

impl MotionLane {
    fn push(&self, command: MotionCommand) -> Result<()> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| eyre!("motion queue poisoned"))?;

        if queue.closed {
            bail!("dispatcher is shut down");
        }

        let before = queue.pending.len();
        if command.is_stop() {
            queue.pending.retain(MotionCommand::is_stop);
        } else if queue.pending.back().is_some_and(|last| !last.is_stop()) {
            queue.pending.pop_back();
        }
        let skipped = before - queue.pending.len();
        if skipped > 0 {
            debug!("Dropped {} stale motion command(s)", skipped);
        }

        queue.pending.push_back(command);
        self.ready.notify_one();
        Ok(())
    }

    /// Next command to deliver, or `None` once closed and drained.
    fn next(&self) -> Option<MotionCommand> {
        let mut queue = self.queue.lock().ok()?;

        loop {
            if let Some(command) = queue.pending.pop_front() {
                return Some(command);
            }
            if queue.closed {
                return None;
            }
            queue = self.ready.wait(queue).ok()?;
        }
    }

    fn close(&self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.closed = true;
        }
        self.ready.notify_all();
    }
}

fn deliver(backend: &impl Backend, request: &ApiRequest) {
    match backend.send(request) {
        Ok(reply) => log_reply(request, reply),
        Err(e) => warn!("{} failed: {:#}", request.path(), e),
    }
}

fn log_reply(request: &ApiRequest, reply: Value) {
    if request.returns_snapshot_counts() {
        match serde_json::from_value::<SnapshotCounts>(reply) {
            Ok(counts) => info!("Snapshots: {}", counts),
            Err(e) => warn!("{} returned unreadable counts: {}", request.path(), e),
        }
    } else {
        info!("{} -> {}", request.path(), reply);
    }
}
