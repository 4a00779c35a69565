pub mod common;

pub mod context_tests;
pub mod descriptor_tests;
pub mod registry_tests;
