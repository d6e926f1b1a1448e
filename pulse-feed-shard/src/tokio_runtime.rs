use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Shared runtime for callers that are not inside a tokio context.
pub fn get() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        Builder::new_multi_thread()
            .thread_name("pulse-feed")
            .enable_all()
            .build()
            .expect("failed to start the pulse-feed runtime")
    })
}

/// Handle of the runtime the caller runs on, falling back to the shared one.
pub fn handle() -> Handle {
    Handle::try_current().unwrap_or_else(|_| get().handle().clone())
}
