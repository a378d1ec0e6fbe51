//! Media selection and raw byte fetching

pub mod fetch;
pub mod select;
