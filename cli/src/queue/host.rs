use super::{check_transfer_len, CommandQueue};
use common::{
    check_kernel_extent, BoundKernel, CommandStatus, CompletionHandle, CompletionSignal, KernelInvocation,
    MemAccess,
};
use std::error::Error;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

type Storage = Arc<Mutex<Vec<i32>>>;

fn lock(storage: &Storage) -> MutexGuard<'_, Vec<i32>> {
    storage.lock().unwrap_or_else(PoisonError::into_inner)
}

fn snapshot(storage: &Storage) -> Vec<i32> {
    lock(storage).clone()
}

/// Host memory standing in for a device buffer.
pub struct HostBuffer {
    len: usize,
    access: MemAccess,
    storage: Storage,
}

enum HostKernel {
    PerElement {
        source_a: Storage,
        source_b: Storage,
        dest: Storage,
        count: usize,
    },
    SingleWorkItem {
        source_a: Storage,
        source_b: Storage,
        dest: Storage,
        count: usize,
    },
}

enum Command {
    Write {
        storage: Storage,
        data: Vec<i32>,
        done: CompletionHandle,
    },
    Kernel {
        kernel: HostKernel,
        wait_for: Vec<CompletionSignal>,
    },
    Read {
        storage: Storage,
        reply: mpsc::Sender<Vec<i32>>,
    },
    Finish {
        reply: mpsc::Sender<()>,
    },
}

/// A command queue executed in submission order by a worker thread.
///
/// Kernels run on the host: the per-element kernel is split across `num_threads` scoped
/// threads, the single-work-item kernel runs on the queue thread itself.
pub struct HostQueue {
    sender: Option<mpsc::Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl HostQueue {
    pub fn new(num_threads: usize) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let (sender, receiver) = mpsc::channel();
        let failure = Arc::new(Mutex::new(None));
        let worker_failure = Arc::clone(&failure);
        let worker = std::thread::Builder::new()
            .name("host-queue".to_string())
            .spawn(move || queue_worker(receiver, num_threads.max(1), worker_failure))?;

        log::debug!("Host queue started with {} kernel threads", num_threads);
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            failure,
        })
    }

    fn submit(&self, command: Command) -> Result<(), Box<dyn Error + Send + Sync>> {
        let sender = self.sender.as_ref().ok_or("host queue is closed")?;
        sender
            .send(command)
            .map_err(|_| "host queue worker has stopped".into())
    }

    fn check_failure(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        match self.failure.lock().unwrap_or_else(PoisonError::into_inner).take() {
            Some(reason) => Err(format!("queued command failed: {}", reason).into()),
            None => Ok(()),
        }
    }
}

impl CommandQueue for HostQueue {
    type Buffer = HostBuffer;

    fn create_buffer(&mut self, len: usize, access: MemAccess) -> Result<HostBuffer, Box<dyn Error + Send + Sync>> {
        log::debug!("Allocating {:?} host buffer of {} elements", access, len);
        Ok(HostBuffer {
            len,
            access,
            storage: Arc::new(Mutex::new(vec![0; len])),
        })
    }

    fn enqueue_write(
        &mut self,
        buffer: &mut HostBuffer,
        data: &[i32],
        label: &str,
    ) -> Result<CompletionSignal, Box<dyn Error + Send + Sync>> {
        check_transfer_len(buffer.len, data.len())?;

        let (signal, done) = CompletionSignal::pending(label);
        self.submit(Command::Write {
            storage: Arc::clone(&buffer.storage),
            data: data.to_vec(),
            done,
        })?;
        Ok(signal)
    }

    fn enqueue_kernel(
        &mut self,
        invocation: &KernelInvocation<'_, HostBuffer>,
        wait_for: &[CompletionSignal],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let bound = invocation.bind()?;
        let count = check_kernel_extent(&bound, |b| b.len, |b| b.access)?;

        let kernel = match bound {
            BoundKernel::PerElement { source_a, source_b, dest } => HostKernel::PerElement {
                source_a: Arc::clone(&source_a.storage),
                source_b: Arc::clone(&source_b.storage),
                dest: Arc::clone(&dest.storage),
                count,
            },
            BoundKernel::SingleWorkItem { source_a, source_b, dest, .. } => HostKernel::SingleWorkItem {
                source_a: Arc::clone(&source_a.storage),
                source_b: Arc::clone(&source_b.storage),
                dest: Arc::clone(&dest.storage),
                count,
            },
        };

        log::debug!(
            "Enqueueing host kernel {} over {} elements",
            invocation.variant().kernel_name(),
            count
        );
        self.submit(Command::Kernel {
            kernel,
            wait_for: wait_for.to_vec(),
        })
    }

    fn finish(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let (reply, done) = mpsc::channel();
        self.submit(Command::Finish { reply })?;
        done.recv().map_err(|_| "host queue worker has stopped")?;
        self.check_failure()
    }

    fn read_buffer(&mut self, buffer: &HostBuffer, dest: &mut [i32]) -> Result<(), Box<dyn Error + Send + Sync>> {
        check_transfer_len(buffer.len, dest.len())?;

        let (reply, values) = mpsc::channel();
        self.submit(Command::Read {
            storage: Arc::clone(&buffer.storage),
            reply,
        })?;
        let values = values.recv().map_err(|_| "host queue worker has stopped")?;
        dest.copy_from_slice(&values);
        self.check_failure()
    }
}

impl Drop for HostQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Host queue worker panicked");
            }
        }
    }
}

fn queue_worker(receiver: mpsc::Receiver<Command>, num_threads: usize, failure: Arc<Mutex<Option<String>>>) {
    for command in receiver {
        match command {
            Command::Write { storage, data, done } => {
                lock(&storage).copy_from_slice(&data);
                done.complete(CommandStatus::Complete);
            }
            Command::Kernel { kernel, wait_for } => {
                let blocked = wait_for.iter().find_map(|signal| match signal.wait() {
                    CommandStatus::Complete => None,
                    CommandStatus::Failed(reason) => {
                        Some(format!("dependency '{}' failed: {}", signal.label(), reason))
                    }
                });
                match blocked {
                    Some(reason) => {
                        log::error!("Skipping kernel launch: {}", reason);
                        failure
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .get_or_insert(reason);
                    }
                    None => run_kernel(&kernel, num_threads),
                }
            }
            Command::Read { storage, reply } => {
                let _ = reply.send(snapshot(&storage));
            }
            Command::Finish { reply } => {
                let _ = reply.send(());
            }
        }
    }
    log::trace!("Host queue worker exiting");
}

fn run_kernel(kernel: &HostKernel, num_threads: usize) {
    match kernel {
        HostKernel::PerElement {
            source_a,
            source_b,
            dest,
            count,
        } => {
            // Inputs are copied out first so a buffer bound twice cannot deadlock.
            let source_a = snapshot(source_a);
            let source_b = snapshot(source_b);
            let mut dest = lock(dest);

            let chunk_len = count.div_ceil(num_threads).max(1);
            std::thread::scope(|scope| {
                for (chunk_idx, chunk) in dest[..*count].chunks_mut(chunk_len).enumerate() {
                    let (source_a, source_b) = (&source_a, &source_b);
                    scope.spawn(move || {
                        let base = chunk_idx * chunk_len;
                        for (offset, slot) in chunk.iter_mut().enumerate() {
                            let idx = base + offset;
                            *slot = logic::add_values(source_a[idx], source_b[idx]);
                        }
                    });
                }
            });
        }
        HostKernel::SingleWorkItem {
            source_a,
            source_b,
            dest,
            count,
        } => {
            let source_a = snapshot(source_a);
            let source_b = snapshot(source_b);
            let mut dest = lock(dest);
            logic::add_single_work_item(&source_a, &source_b, &mut dest, *count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::KernelArg;

    fn launch(queue: &mut HostQueue, variant: common::KernelVariant, a: &[i32], b: &[i32]) -> Vec<i32> {
        let mut buffer_a = queue.create_buffer(a.len(), MemAccess::ReadOnly).unwrap();
        let mut buffer_b = queue.create_buffer(b.len(), MemAccess::ReadOnly).unwrap();
        let buffer_c = queue.create_buffer(a.len(), MemAccess::ReadWrite).unwrap();

        let upload_a = queue.enqueue_write(&mut buffer_a, a, "A").unwrap();
        let upload_b = queue.enqueue_write(&mut buffer_b, b, "B").unwrap();

        let mut invocation = KernelInvocation::new(variant);
        invocation.set_arg(0, KernelArg::Buffer(&buffer_a)).unwrap();
        invocation.set_arg(1, KernelArg::Buffer(&buffer_b)).unwrap();
        invocation.set_arg(2, KernelArg::Buffer(&buffer_c)).unwrap();
        if variant == common::KernelVariant::SingleWorkItem {
            invocation.set_arg(3, KernelArg::Int(a.len() as i32)).unwrap();
        }
        queue.enqueue_kernel(&invocation, &[upload_a, upload_b]).unwrap();
        queue.finish().unwrap();

        let mut dest = vec![0; a.len()];
        queue.read_buffer(&buffer_c, &mut dest).unwrap();
        dest
    }

    #[test]
    fn test_both_variants_add() {
        let a: Vec<i32> = (0..100).collect();
        let b: Vec<i32> = (0..100).map(|i| i * 10).collect();
        let expected: Vec<i32> = (0..100).map(|i| i * 11).collect();

        for variant in common::KernelVariant::ALL {
            let mut queue = HostQueue::new(4).unwrap();
            assert_eq!(launch(&mut queue, variant, &a, &b), expected, "{variant}");
        }
    }

    #[test]
    fn test_more_threads_than_elements() {
        let mut queue = HostQueue::new(64).unwrap();
        let result = launch(&mut queue, common::KernelVariant::PerElement, &[1, 2, 3], &[4, 5, 6]);
        assert_eq!(result, vec![5, 7, 9]);
    }

    #[test]
    fn test_write_signal_completes() {
        let mut queue = HostQueue::new(1).unwrap();
        let mut buffer = queue.create_buffer(3, MemAccess::ReadOnly).unwrap();
        let signal = queue.enqueue_write(&mut buffer, &[1, 2, 3], "A").unwrap();

        assert_eq!(signal.wait(), CommandStatus::Complete);
        assert_eq!(signal.label(), "A");
    }

    #[test]
    fn test_transfer_length_mismatch_is_rejected() {
        let mut queue = HostQueue::new(1).unwrap();
        let mut buffer = queue.create_buffer(3, MemAccess::ReadWrite).unwrap();

        assert!(queue.enqueue_write(&mut buffer, &[1, 2], "A").is_err());
        let mut too_long = [0i32; 4];
        assert!(queue.read_buffer(&buffer, &mut too_long).is_err());
    }

    #[test]
    fn test_failed_dependency_surfaces_at_finish() {
        let mut queue = HostQueue::new(1).unwrap();
        let a = queue.create_buffer(2, MemAccess::ReadOnly).unwrap();
        let c = queue.create_buffer(2, MemAccess::ReadWrite).unwrap();

        let (never, handle) = CompletionSignal::pending("never");
        drop(handle);

        let mut invocation = KernelInvocation::new(common::KernelVariant::PerElement);
        invocation.set_arg(0, KernelArg::Buffer(&a)).unwrap();
        invocation.set_arg(1, KernelArg::Buffer(&a)).unwrap();
        invocation.set_arg(2, KernelArg::Buffer(&c)).unwrap();
        queue.enqueue_kernel(&invocation, &[never]).unwrap();

        assert!(queue.finish().is_err());
        // The failure is reported once.
        assert!(queue.finish().is_ok());
    }

    #[test]
    fn test_unbound_invocation_is_rejected() {
        let mut queue = HostQueue::new(1).unwrap();
        let a = queue.create_buffer(2, MemAccess::ReadOnly).unwrap();

        let mut invocation = KernelInvocation::new(common::KernelVariant::PerElement);
        invocation.set_arg(0, KernelArg::Buffer(&a)).unwrap();
        assert!(queue.enqueue_kernel(&invocation, &[]).is_err());
    }
}
