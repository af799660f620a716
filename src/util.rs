pub mod best_effort;
pub mod redact;
pub mod retry;
pub mod text;
