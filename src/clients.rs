pub mod gemini;
pub mod google_news;
pub mod page_image;

pub use gemini::GeminiClient;
pub use google_news::{GoogleNewsClient, GoogleNewsConfig};
pub use page_image::PageImageResolver;
