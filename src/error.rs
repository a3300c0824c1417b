use crate::executor::panic_handler::PanicInfo;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("thread pool is shut down")]
    ShutDown,

    #[error("task panicked: {0}")]
    TaskPanicked(PanicInfo),

    #[error("task was dropped before it ran")]
    Abandoned,

    #[error("timed out waiting for task")]
    Timeout,
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    /// Message carried by a panicked task, if this error came from one.
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            Error::TaskPanicked(info) => Some(&info.message),
            _ => None,
        }
    }
}
