pub mod requests;
pub mod sort;
