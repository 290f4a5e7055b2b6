pub mod math_client;

pub use math_client::MathClient;
