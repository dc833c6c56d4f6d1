pub type Result<T, E = TaintError> = std::result::Result<T, E>;

#[derive(Debug, derive_more::Display, thiserror::Error)]
pub enum TaintError {
    #[display(fmt = "Err invalid config: {}", _0)]
    Config(String),

    #[display(fmt = "Err guest memory access at {:#x}", _0)]
    GuestAccess(u64),

    #[display(fmt = "Err malformed guest string at {:#x}", _0)]
    GuestString(u64),

    #[display(fmt = "Err: {}", _0)]
    Custom(String),
}
