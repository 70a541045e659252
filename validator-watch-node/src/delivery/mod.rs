pub mod webhook;

pub use webhook::WebhookDelivery;
