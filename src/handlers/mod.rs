mod health;
mod metrics;
mod save_text;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use save_text::save_text_handler;
