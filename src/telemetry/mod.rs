pub mod config;
pub mod ctx;
pub mod ops;
pub mod sink;

use ctx::LogCtx;

// One typed log context per job
pub fn init() -> LogCtx<ops::init::Init> { LogCtx::new() }
pub fn sync() -> LogCtx<ops::sync::SyncOne> { LogCtx::new() }
pub fn update() -> LogCtx<ops::update::Update> { LogCtx::new() }
pub fn mirror() -> LogCtx<ops::mirror::Mirror> { LogCtx::new() }
pub fn deactivate() -> LogCtx<ops::deactivate::Deactivate> { LogCtx::new() }
pub fn status() -> LogCtx<ops::status::Status> { LogCtx::new() }
