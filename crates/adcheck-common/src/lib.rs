pub mod compliance;
pub mod error;
pub mod evidence;
pub mod geo;
pub mod gemini;
pub mod inline_data;
pub mod model;
pub mod prompt;
pub mod report;
pub mod request;
