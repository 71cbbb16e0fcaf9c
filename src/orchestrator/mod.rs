mod controller;
mod gate;
mod pipeline;
mod watchdog;

pub use controller::JobController;
