pub mod constants;
pub mod dashboard;
pub mod encoding;
pub mod role;
pub mod types;

#[cfg(test)]
pub mod test_helpers;
