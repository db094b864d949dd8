/// Unit test target: domain rules and statistics through the public API
mod basic_tests;
mod stats_tests;
