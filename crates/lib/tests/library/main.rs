mod common;
mod concurrency_tests;
mod generation_tests;
mod naming_tests;
