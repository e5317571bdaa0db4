use bytes::Bytes;
use http::Request;

/// A request the benchmarks bind from.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    request: TestRequest,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, request: TestRequest) -> Self {
        Self { name, group, request }
    }

    pub fn small(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Small, request)
    }

    pub fn large(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Large, request)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn request(&self) -> &TestRequest {
        &self.request
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TestRequest {
    uri: &'static str,
    headers: &'static [(&'static str, &'static str)],
}

impl TestRequest {
    pub const fn new(uri: &'static str, headers: &'static [(&'static str, &'static str)]) -> Self {
        Self { uri, headers }
    }

    pub fn uri(&self) -> &'static str {
        self.uri
    }

    /// Builds a GET request, the fixtures are static and always valid.
    ///
    /// # Panics
    /// When a fixture holds an invalid uri or header.
    pub fn build(&self) -> Request<Bytes> {
        let builder = self.headers.iter().fold(Request::get(self.uri), |builder, (name, value)| builder.header(*name, *value));
        builder.body(Bytes::new()).expect("benchmark fixtures are valid requests")
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Large,
}
