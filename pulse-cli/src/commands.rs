pub mod browse;
pub mod views;
