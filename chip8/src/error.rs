use thiserror::Error;

/// A fatal condition raised while executing a single cycle.
///
/// The interpreter never clamps or wraps an out-of-range access; it stops the
/// cycle and hands the fault back to the host instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("address {addr:#05x} is outside of memory")]
    AddressOutOfRange { addr: usize },
    #[error("call stack overflow")]
    StackOverflow,
    #[error("return with an empty call stack")]
    StackUnderflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("program image is {len} bytes but only {capacity} bytes are available")]
    ImageTooLarge { len: usize, capacity: usize },
}
