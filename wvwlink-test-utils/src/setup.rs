use mockito::{Mock, Server, ServerGuard};

pub struct TestSetup {
    pub server: ServerGuard,
    pub mocks: Vec<Mock>,
}

impl TestSetup {
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
            mocks: Vec::new(),
        }
    }

    /// Base URL to point an account client at.
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Keeps `mock` alive until [`TestSetup::assert_mocks`].
    pub fn keep(&mut self, mock: Mock) {
        self.mocks.push(mock);
    }

    /// Assert all kept mock endpoints were called as expected.
    pub fn assert_mocks(&self) {
        for mock in &self.mocks {
            mock.assert();
        }
    }
}
