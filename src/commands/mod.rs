pub mod endpoints;
pub mod fetch;
pub mod status;

// Re-export command functions for convenience
pub use endpoints::endpoints;
pub use fetch::fetch;
pub use status::status;
