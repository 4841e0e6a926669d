//! Scripted transport and fixtures shared by unit tests.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::models::UserProfile;

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;

type Handler = Box<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

/// Answers every request with `handler` and records what was sent.
/// Each send yields once first so concurrent calls interleave.
pub struct ScriptedTransport {
    handler: Handler,
    log: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|r| r.path == path).count()
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<ApiResponse, ApiError>> {
        async move {
            self.log.lock().unwrap().push(request.clone());
            tokio::task::yield_now().await;
            Ok((self.handler)(request))
        }
        .boxed()
    }
}

pub fn profile(id: &str) -> UserProfile {
    serde_json::from_str(&profile_json(id)).unwrap()
}

pub fn profile_json(id: &str) -> String {
    format!(
        r#"{{"_id":"{id}","email":"{id}@example.com","username":"{id}","isVerified":true,"isBlocked":false,"isGoogleUser":false}}"#
    )
}

pub fn blog_json(id: &str, tags: &[&str]) -> String {
    let tags = serde_json::to_string(tags).unwrap();
    format!(
        r#"{{"_id":"{id}","title":"Post {id}","brief":"Brief","content":"Body","userId":"u1","tags":{tags},"author":"u1","isPublished":true}}"#
    )
}
