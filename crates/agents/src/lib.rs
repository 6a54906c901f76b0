pub mod dispatch;
pub mod router;

pub use dispatch::{Dispatched, ProviderDispatcher};
pub use router::{ChatRouter, RouterError, DEFAULT_SESSION_TTL_HOURS};
