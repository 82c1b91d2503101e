//! Runtime utilities that abstract over the underlying async executor.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a throwaway current-thread runtime.
///
/// Intended for synchronous call sites (logging layers, `Drop` impls) that have
/// no runtime handle of their own. Fails only if the runtime cannot be built.
pub fn block_on<F>(future: F) -> std::io::Result<F::Output>
where
    F: std::future::Future,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}
