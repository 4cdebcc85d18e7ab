pub mod providers;
pub mod retry;

use sondera_core::config::RetryConfig;

pub use providers::GeminiClient;
pub use retry::RetryingClient;

/// The default backend: a Gemini client behind the retry wrapper.
pub fn create_backend(retry: RetryConfig) -> RetryingClient<GeminiClient> {
    RetryingClient::new(GeminiClient::new(), retry)
}
