mod common;
mod end_to_end_tests;
mod precedence_tests;
mod profile_tests;
mod utilities_tests;
