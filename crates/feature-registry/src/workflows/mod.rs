pub mod candidates;
pub mod notebook;
pub mod query;
