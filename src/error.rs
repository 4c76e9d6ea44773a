use crate::shader::{InfoLog, ShaderKind};
use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Init error: {0}")]
    Init(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("{stage} shader compilation failed:\n{log}")]
    Compile { stage: ShaderKind, log: InfoLog },

    #[error("Program link failed:\n{0}")]
    Link(InfoLog),
}

impl Error {
    pub fn device<E: Debug>(what: &str, err: E) -> Self {
        Error::Device(format!("{}: {:?}", what, err))
    }

    /// Process status to terminate with when this error reaches `main`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Init(_) | Error::Device(_) => -1,
            Error::Compile { .. } | Error::Link(_) => 1,
        }
    }
}
