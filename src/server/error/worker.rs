use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Work queue is closed")]
    QueueClosed,
}
