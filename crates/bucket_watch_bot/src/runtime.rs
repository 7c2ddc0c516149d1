pub use bucket_watch_core::{announcement, clock, contract, diff, download_url};
