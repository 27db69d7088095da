//! Event mutations with local→remote propagation
//!
//! Non-someday events must reach the remote calendar before the local write
//! commits, so the local record always carries an authoritative remote id
//! once visible to readers. The ordering is structural: a pure planner
//! decides the remote step, the service executes it, and only then applies
//! the local write.

mod plan;
mod service;

pub use plan::{plan_create, plan_delete, plan_update, RemoteStep};
pub use service::EventService;
