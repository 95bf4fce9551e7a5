pub mod attachment;
pub mod request;
pub mod user;

#[cfg(test)]
pub(crate) mod fixtures;
