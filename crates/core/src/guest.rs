//! Access to the memory of the instrumented guest process.
//!
//! The engine runs inside an instrumentation harness that shares an address
//! space with (or can otherwise peek into) the traced program. Everything the
//! engine needs from that address space goes through this trait so that the
//! harness decides how reads are performed.

use crate::error::Result;

#[mockall::automock]
pub trait GuestState {
    /// Read a NUL-terminated string starting at `addr`.
    ///
    /// Fails with [`crate::error::TaintError::GuestAccess`] when the address
    /// is unreadable and [`crate::error::TaintError::GuestString`] when the
    /// bytes are not valid UTF-8.
    fn read_c_string(&self, addr: u64) -> Result<String>;
}
