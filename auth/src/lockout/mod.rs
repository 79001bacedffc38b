pub mod policy;
pub mod state;

pub use policy::LockoutPolicy;
pub use state::classify;
pub use state::FailureOutcome;
pub use state::LockedOut;
pub use state::LockoutFields;
pub use state::LockoutState;
