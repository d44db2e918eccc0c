pub mod okx;
pub mod traits;

#[cfg(test)]
pub mod mock;
