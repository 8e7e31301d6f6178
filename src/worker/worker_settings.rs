use std::time::Duration;

use crate::channel::netstring::DEFAULT_MAX_FRAME_LEN;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_NOTIFICATION_QUEUE_SIZE: usize = 1024;
const DEFAULT_OUTBOUND_QUEUE_SIZE: usize = 256;

/// WorkerSettings tunes the link between the control plane and a worker.
/// The defaults fit a worker on the same host.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub(crate) request_timeout: Duration,
    pub(crate) notification_queue_size: usize,
    pub(crate) outbound_queue_size: usize,
    pub(crate) max_frame_len: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            notification_queue_size: DEFAULT_NOTIFICATION_QUEUE_SIZE,
            outbound_queue_size: DEFAULT_OUTBOUND_QUEUE_SIZE,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl WorkerSettings {
    /// set_request_timeout sets how long a request waits for its reply
    /// before failing with a timeout.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
    }

    /// set_notification_queue_size sets how many notifications may wait for
    /// delivery before the reader stops pulling from the worker.
    pub fn set_notification_queue_size(&mut self, size: usize) {
        self.notification_queue_size = size.max(1);
    }

    pub fn set_outbound_queue_size(&mut self, size: usize) {
        self.outbound_queue_size = size.max(1);
    }

    /// set_max_frame_len bounds the size of a single message in either
    /// direction.
    pub fn set_max_frame_len(&mut self, len: usize) {
        self.max_frame_len = len;
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
