//! Background execution for I/O and rasterization.
//!
//! Saves and other file work run on one dedicated I/O thread so they are
//! applied in submission order. Rendering runs on a small pool of CPU
//! workers. Every submission returns a [`TaskHandle`] the interactive thread
//! can poll or block on.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Configuration for the background executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Number of CPU worker threads.
    /// Default: logical cores, capped at 4.
    pub cpu_threads: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { cpu_threads: num_cpus().min(4) }
    }
}

impl ExecutorConfig {
    pub fn new(cpu_threads: usize) -> Self {
        Self { cpu_threads }
    }
}

fn num_cpus() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(2)
}

/// Result of a background job.
///
/// The value can be taken exactly once, either by polling with
/// [`try_take`](Self::try_take) or by blocking with [`wait`](Self::wait).
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// A handle that is already resolved.
    pub fn ready(value: T) -> Self {
        let (sender, receiver) = mpsc::channel();
        let _ = sender.send(value);
        Self { receiver }
    }

    /// Take the result if the job has finished.
    pub fn try_take(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Block until the job finishes.
    ///
    /// Returns `None` if the job never ran, e.g. because the executor shut
    /// down or the job panicked.
    pub fn wait(self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

/// One dedicated I/O thread plus a pool of CPU workers.
pub struct BackgroundExecutor {
    io_sender: Option<Sender<Job>>,
    cpu_sender: Option<Sender<Job>>,
    threads: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl BackgroundExecutor {
    /// Start the executor threads.
    pub fn new(config: ExecutorConfig) -> io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut threads = Vec::with_capacity(config.cpu_threads + 1);

        let (io_sender, io_receiver) = mpsc::channel::<Job>();
        threads.push(
            thread::Builder::new()
                .name("inkleaf-io".to_string())
                .spawn(move || {
                    while let Ok(job) = io_receiver.recv() {
                        job();
                    }
                })?,
        );

        let (cpu_sender, cpu_receiver) = mpsc::channel::<Job>();
        let cpu_receiver = Arc::new(Mutex::new(cpu_receiver));
        for index in 0..config.cpu_threads.max(1) {
            let receiver = cpu_receiver.clone();
            threads.push(
                thread::Builder::new()
                    .name(format!("inkleaf-cpu-{}", index))
                    .spawn(move || Self::run_worker(receiver))?,
            );
        }

        log::debug!("Background executor started with {} CPU workers", config.cpu_threads.max(1));
        Ok(Self { io_sender: Some(io_sender), cpu_sender: Some(cpu_sender), threads, shutdown })
    }

    fn run_worker(receiver: Arc<Mutex<Receiver<Job>>>) {
        loop {
            let job = {
                let guard = match receiver.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                guard.recv()
            };
            match job {
                Ok(job) => job(),
                Err(_) => break,
            }
        }
    }

    /// Check if the executor is shutting down.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Run `job` on the I/O thread. Jobs run in submission order.
    pub fn spawn_io<T, F>(&self, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        Self::submit(self.io_sender.as_ref(), job)
    }

    /// Run `job` on a CPU worker.
    pub fn spawn_cpu<T, F>(&self, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        Self::submit(self.cpu_sender.as_ref(), job)
    }

    fn submit<T, F>(sender: Option<&Sender<Job>>, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (result_sender, receiver) = mpsc::channel();
        let boxed: Job = Box::new(move || {
            let _ = result_sender.send(job());
        });
        match sender {
            Some(sender) => {
                if sender.send(boxed).is_err() {
                    log::warn!("Background job dropped: executor stopped");
                }
            }
            None => log::warn!("Background job dropped: executor shut down"),
        }
        TaskHandle { receiver }
    }

    /// Stop accepting jobs, finish the queued ones and join all threads.
    pub fn shutdown(&mut self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        self.io_sender.take();
        self.cpu_sender.take();
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                log::error!("Background thread panicked");
            }
        }
        log::debug!("Background executor stopped");
    }
}

impl Drop for BackgroundExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_io_jobs_run_in_order() {
        let executor = BackgroundExecutor::new(ExecutorConfig::new(1)).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..20)
            .map(|i| {
                let log = log.clone();
                executor.spawn_io(move || log.lock().unwrap().push(i))
            })
            .collect();
        for handle in handles {
            handle.wait().unwrap();
        }
        assert_eq!(*log.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_cpu_job_result() {
        let executor = BackgroundExecutor::new(ExecutorConfig::new(2)).unwrap();
        let handle = executor.spawn_cpu(|| 6 * 7);
        assert_eq!(handle.wait(), Some(42));
    }

    #[test]
    fn test_try_take_polls() {
        let executor = BackgroundExecutor::new(ExecutorConfig::new(1)).unwrap();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let handle = executor.spawn_io(move || {
            gate_rx.recv().unwrap();
            "done"
        });
        assert_eq!(handle.try_take(), None);
        gate_tx.send(()).unwrap();
        let mut result = None;
        for _ in 0..200 {
            result = handle.try_take();
            if result.is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(result, Some("done"));
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let mut executor = BackgroundExecutor::new(ExecutorConfig::new(1)).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let count = count.clone();
            executor.spawn_io(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        executor.shutdown();
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert!(executor.is_shutting_down());
    }

    #[test]
    fn test_submit_after_shutdown() {
        let mut executor = BackgroundExecutor::new(ExecutorConfig::new(1)).unwrap();
        executor.shutdown();
        assert_eq!(executor.spawn_io(|| 1).wait(), None);
    }

    #[test]
    fn test_ready_handle() {
        assert_eq!(TaskHandle::ready(5).try_take(), Some(5));
    }
}
