pub mod poller;
pub mod tick;
