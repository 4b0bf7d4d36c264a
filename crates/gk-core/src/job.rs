//! Streaming subprocess jobs
//!
//! A [`Job`] wraps one external command. Its stdout and stderr are read by
//! tasks on the [`JobRunner`]'s runtime and pushed into two queues: produced
//! items and control messages. The UI thread owns the receiving half and
//! drains it once per frame with [`Job::drain`], so producer output only ever
//! becomes UI state on the UI thread.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;

/// How long a terminated process gets before it is killed
const STOP_GRACE: Duration = Duration::from_millis(250);
/// How long to wait for a killed process to be reaped
const KILL_WAIT: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum JobError {
    #[error("failed to start job runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Control messages produced alongside a job's items
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobMessage {
    Started,
    Finished { code: Option<i32> },
    Error(String),
}

pub type LineTransform<T> = Box<dyn FnMut(String) -> Option<T> + Send>;

/// Everything needed to start a job
pub struct JobSpec<T> {
    pub id: String,
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    transform: LineTransform<T>,
}

impl<T> JobSpec<T> {
    /// `transform` runs on the reader task for every stdout line; returning
    /// `None` drops the line.
    pub fn new(
        id: impl Into<String>,
        argv: Vec<String>,
        transform: impl FnMut(String) -> Option<T> + Send + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            argv,
            cwd: None,
            transform: Box::new(transform),
        }
    }

    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl JobSpec<String> {
    /// A job that yields every stdout line unchanged
    pub fn lines(id: impl Into<String>, argv: Vec<String>) -> Self {
        Self::new(id, argv, Some)
    }
}

/// Receiver side of a job's output, implemented by panels
pub trait JobSink<T> {
    fn process_item(&mut self, item: T);

    fn process_message(&mut self, _message: &JobMessage) {}

    /// Called exactly once, after the last item has been processed.
    fn on_finished(&mut self, _code: Option<i32>) {}
}

/// What a single [`Job::drain`] call did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainStats {
    pub items: usize,
    pub errors: usize,
    pub finished: bool,
}

#[derive(Debug)]
struct JobControl {
    id: String,
    stop: AtomicBool,
    pid: AtomicU32,
    kill: Notify,
    exited: watch::Sender<bool>,
}

impl JobControl {
    fn new(id: &str) -> Self {
        let (exited, _) = watch::channel(false);
        Self {
            id: id.to_string(),
            stop: AtomicBool::new(false),
            pid: AtomicU32::new(0),
            kill: Notify::new(),
            exited,
        }
    }

    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn has_exited(&self) -> bool {
        *self.exited.borrow()
    }

    /// The process has been reaped; its pid may already belong to another
    /// process, so signals must not use it any more.
    fn forget_pid(&self) {
        self.pid.store(0, Ordering::SeqCst);
    }

    fn mark_exited(&self) {
        self.forget_pid();
        self.exited.send_replace(true);
    }

    /// Stop without waiting: flag the job and ask the supervisor to kill.
    fn abandon(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if !self.has_exited() {
            self.kill.notify_one();
        }
    }

    /// Terminate, wait a bounded interval, then kill. Safe to call repeatedly.
    fn stop(&self, handle: &Handle) {
        let already_stopped = self.stop.swap(true, Ordering::SeqCst);
        if self.has_exited() {
            return;
        }
        if !already_stopped {
            tracing::debug!(job = %self.id, "stopping job");
        }

        self.terminate();
        if self.wait_exit(handle, STOP_GRACE) {
            return;
        }

        tracing::warn!(job = %self.id, "job ignored terminate, killing");
        self.kill.notify_one();
        if !self.wait_exit(handle, KILL_WAIT) {
            tracing::error!(job = %self.id, "job still running after kill");
        }
    }

    #[cfg(unix)]
    fn terminate(&self) {
        let pid = self.pid.load(Ordering::SeqCst);
        if pid == 0 {
            // Not spawned yet; the supervisor checks the stop flag after spawn.
            return;
        }
        // SAFETY: plain signal delivery to a child we spawned and have not reaped.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self) {
        self.kill.notify_one();
    }

    fn wait_exit(&self, handle: &Handle, limit: Duration) -> bool {
        let mut exited = self.exited.subscribe();
        handle.block_on(async move {
            tokio::time::timeout(limit, exited.wait_for(|done| *done))
                .await
                .map(|res| res.is_ok())
                .unwrap_or(false)
        })
    }
}

/// UI-side handle of a running (or finished) command
pub struct Job<T> {
    id: String,
    argv: Vec<String>,
    running: bool,
    completion_pending: bool,
    control: Arc<JobControl>,
    handle: Handle,
    items: mpsc::UnboundedReceiver<T>,
    messages: mpsc::UnboundedReceiver<JobMessage>,
}

impl<T> Job<T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// True between the `Started` and `Finished` messages
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True until the completion callback has fired (or the job was stopped)
    pub fn is_pending(&self) -> bool {
        self.completion_pending && !self.control.is_stopped()
    }

    pub fn is_stopped(&self) -> bool {
        self.control.is_stopped()
    }

    /// Whether the underlying process has been reaped
    pub fn process_exited(&self) -> bool {
        self.control.has_exited()
    }

    /// Feed everything queued so far into `sink`. Never blocks.
    pub fn drain<S: JobSink<T> + ?Sized>(&mut self, sink: &mut S) -> DrainStats {
        let mut stats = DrainStats::default();

        if self.control.is_stopped() {
            while self.items.try_recv().is_ok() {}
            while self.messages.try_recv().is_ok() {}
            self.running = false;
            return stats;
        }

        while let Ok(item) = self.items.try_recv() {
            sink.process_item(item);
            stats.items += 1;
        }

        while let Ok(message) = self.messages.try_recv() {
            match &message {
                JobMessage::Started => self.running = true,
                JobMessage::Error(text) => {
                    tracing::warn!(job = %self.id, "{text}");
                    stats.errors += 1;
                }
                JobMessage::Finished { code } => {
                    self.running = false;
                    tracing::debug!(job = %self.id, code = ?code, "job finished");
                    // Readers are joined before `Finished` is sent, so this
                    // picks up every item that raced the first loop.
                    while let Ok(item) = self.items.try_recv() {
                        sink.process_item(item);
                        stats.items += 1;
                    }
                }
            }
            sink.process_message(&message);
            if let JobMessage::Finished { code } = message {
                if std::mem::take(&mut self.completion_pending) {
                    sink.on_finished(code);
                    stats.finished = true;
                }
            }
        }

        stats
    }

    /// Stop the job, blocking briefly until its process is gone.
    pub fn stop(&mut self) {
        self.control.stop(&self.handle);
        self.running = false;
        self.completion_pending = false;
    }
}

impl<T> Drop for Job<T> {
    fn drop(&mut self) {
        self.control.abandon();
    }
}

/// Owns the runtime job readers run on, and the id registry that keeps at
/// most one live job per id.
pub struct JobRunner {
    runtime: Runtime,
    live: HashMap<String, Arc<JobControl>>,
}

impl JobRunner {
    pub fn new() -> Result<Self, JobError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("gk-job")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            live: HashMap::new(),
        })
    }

    /// Start `spec`, stopping any job already registered under its id first.
    pub fn start<T: Send + 'static>(&mut self, spec: JobSpec<T>) -> Job<T> {
        let JobSpec {
            id,
            argv,
            cwd,
            transform,
        } = spec;

        if let Some(previous) = self.live.remove(&id) {
            previous.stop(self.runtime.handle());
        }

        let (program, args) = match argv.split_first() {
            Some((program, args)) => (program.as_str(), args),
            None => ("", &[][..]),
        };
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &cwd {
            command.current_dir(cwd);
        }

        let (item_tx, item_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let control = Arc::new(JobControl::new(&id));

        tracing::debug!(job = %id, argv = ?argv, "starting job");
        self.runtime.spawn(supervise(
            command,
            transform,
            Arc::clone(&control),
            item_tx,
            message_tx,
        ));
        self.live.insert(id.clone(), Arc::clone(&control));

        Job {
            id,
            argv,
            running: false,
            completion_pending: true,
            control,
            handle: self.runtime.handle().clone(),
            items: item_rx,
            messages: message_rx,
        }
    }

    /// Stop `job` and unregister it, unless a newer job has taken its id.
    /// Panels call this when they close, so an outgoing panel never stops
    /// the job of the panel replacing it.
    pub fn release<T>(&mut self, job: &mut Job<T>) {
        job.stop();
        let owned = self
            .live
            .get(job.id())
            .is_some_and(|control| Arc::ptr_eq(control, &job.control));
        if owned {
            self.live.remove(job.id());
        }
    }

    pub fn stop_all(&mut self) {
        for (_, control) in self.live.drain() {
            control.stop(self.runtime.handle());
        }
    }

    pub fn any_running(&self) -> bool {
        self.live.values().any(|control| !control.has_exited())
    }

    /// Number of registered jobs whose process has not exited
    pub fn running(&self) -> usize {
        self.live
            .values()
            .filter(|control| !control.has_exited())
            .count()
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn supervise<T: Send + 'static>(
    mut command: Command,
    transform: LineTransform<T>,
    control: Arc<JobControl>,
    items: mpsc::UnboundedSender<T>,
    messages: mpsc::UnboundedSender<JobMessage>,
) {
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            let _ = messages.send(JobMessage::Error(format!("failed to start: {err}")));
            let _ = messages.send(JobMessage::Finished { code: None });
            control.mark_exited();
            return;
        }
    };

    control.pid.store(child.id().unwrap_or(0), Ordering::SeqCst);
    if control.is_stopped() {
        let _ = child.start_kill();
    }
    let _ = messages.send(JobMessage::Started);

    let stdout_task: Option<JoinHandle<()>> = child.stdout.take().map(|stdout| {
        tokio::spawn(read_stdout(
            stdout,
            transform,
            items,
            messages.clone(),
            Arc::clone(&control),
        ))
    });
    let stderr_task: Option<JoinHandle<()>> = child.stderr.take().map(|stderr| {
        tokio::spawn(read_stderr(stderr, messages.clone(), Arc::clone(&control)))
    });

    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = control.kill.notified() => None,
    };
    let status = match exited {
        Some(status) => status,
        None => {
            let _ = child.start_kill();
            child.wait().await
        }
    };
    control.forget_pid();
    let code = match status {
        Ok(status) => status.code(),
        Err(err) => {
            let _ = messages.send(JobMessage::Error(format!("failed to wait: {err}")));
            None
        }
    };
    control.mark_exited();

    for task in [stdout_task, stderr_task].into_iter().flatten() {
        let _ = task.await;
    }

    if !control.is_stopped() {
        let _ = messages.send(JobMessage::Finished { code });
    }
}

async fn read_stdout<T, R: AsyncRead + Unpin>(
    stream: R,
    mut transform: LineTransform<T>,
    items: mpsc::UnboundedSender<T>,
    messages: mpsc::UnboundedSender<JobMessage>,
    control: Arc<JobControl>,
) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if control.is_stopped() {
                    break;
                }
                let Some(item) = transform(decode_line(&buf)) else {
                    continue;
                };
                if items.send(item).is_err() {
                    break;
                }
            }
            Err(err) => {
                let _ = messages.send(JobMessage::Error(format!("read error: {err}")));
                break;
            }
        }
    }
}

async fn read_stderr<R: AsyncRead + Unpin>(
    stream: R,
    messages: mpsc::UnboundedSender<JobMessage>,
    control: Arc<JobControl>,
) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if control.is_stopped() {
                    break;
                }
                let line = decode_line(&buf);
                if line.trim().is_empty() {
                    continue;
                }
                if messages.send(JobMessage::Error(line)).is_err() {
                    break;
                }
            }
            Err(err) => {
                let _ = messages.send(JobMessage::Error(format!("read error: {err}")));
                break;
            }
        }
    }
}

fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
