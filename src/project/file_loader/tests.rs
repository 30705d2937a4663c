#[path = "tests/tests_file_loader.rs"]
mod tests_file_loader;
