//! Best-effort OS scheduling hints for engine worker threads.

/// Scheduling level applied to a worker thread when the engine builder
/// asks for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPriority {
    /// Leave the thread at the platform default.
    Normal,
    /// Favour the workers over ordinary threads.
    Elevated,
    /// Real-time class where the platform offers one. Usually needs
    /// elevated privileges; silently degrades without them.
    Realtime,
}

/// Apply `level` to the calling thread.
///
/// On Linux this maps onto `pthread_setschedparam` with `SCHED_RR` /
/// `SCHED_FIFO` for the elevated levels; on macOS onto QoS classes. The
/// calls fail silently when the platform refuses, leaving the thread at
/// its default priority. Other platforms are a no-op.
pub fn apply_worker_priority(level: WorkerPriority) {
    #[cfg(target_os = "linux")]
    {
        use libc::{pthread_self, pthread_setschedparam, sched_param, SCHED_FIFO, SCHED_RR};

        let (policy, sched_priority) = match level {
            WorkerPriority::Normal => return,
            WorkerPriority::Elevated => (SCHED_RR, 30),
            WorkerPriority::Realtime => (SCHED_FIFO, 70),
        };
        unsafe {
            let mut param: sched_param = std::mem::zeroed();
            param.sched_priority = sched_priority;
            let _ = pthread_setschedparam(pthread_self(), policy, &param);
        }
    }
    #[cfg(target_os = "macos")]
    {
        // QoS classes from pthread/qos.h
        const QOS_CLASS_USER_INTERACTIVE: u32 = 0x21;
        const QOS_CLASS_USER_INITIATED: u32 = 0x19;

        extern "C" {
            fn pthread_set_qos_class_self_np(qos_class: u32, relative_priority: i32) -> i32;
        }

        let qos_class = match level {
            WorkerPriority::Normal => return,
            WorkerPriority::Elevated => QOS_CLASS_USER_INITIATED,
            WorkerPriority::Realtime => QOS_CLASS_USER_INTERACTIVE,
        };
        unsafe {
            let _ = pthread_set_qos_class_self_np(qos_class, 0);
        }
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        let _ = level;
    }
}
