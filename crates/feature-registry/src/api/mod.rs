mod router;
mod state;

pub use router::api_router;
pub use state::ApiState;
