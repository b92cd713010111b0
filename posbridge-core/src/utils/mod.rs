pub mod scheduled;

pub use scheduled::Scheduled;
