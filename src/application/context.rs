use crate::domain::ports::PresentationHostRef;

/// Where authentication UI for a run is presented, and where the customer comes
/// back to afterwards.
#[derive(Clone)]
pub struct PresentationContext {
    pub host: PresentationHostRef,
    pub return_url: Option<String>,
}

impl PresentationContext {
    pub fn new(host: PresentationHostRef) -> Self {
        Self {
            host,
            return_url: None,
        }
    }

    pub fn with_return_url(mut self, return_url: impl Into<String>) -> Self {
        self.return_url = Some(return_url.into());
        self
    }
}
