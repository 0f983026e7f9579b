mod diff_tests;
mod scope_tests;
