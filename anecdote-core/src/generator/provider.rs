//! The seam between the generator and the generative provider.

use async_trait::async_trait;
use gemini::{Gemini, Request, Response};

/// Something that can answer `generateContent` requests.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn generate_content(&self, request: Request) -> Result<Response, gemini::Error>;
}

#[async_trait]
impl ContentProvider for Gemini {
    async fn generate_content(&self, request: Request) -> Result<Response, gemini::Error> {
        self.generate(request).await
    }
}
