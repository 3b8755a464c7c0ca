pub mod content;
pub mod db;
pub mod error;
pub mod http;
pub mod renderer;
pub mod telemetry;
