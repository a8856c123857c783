use std::collections::HashSet;
use std::sync::Arc;

use tonic::{Request, Status};

/// Bearer-token auth, checked once per RPC against the configured token set.
/// TLS handles server authentication; this is the only authentication of
/// the client.
#[derive(Clone)]
pub struct BearerAuth {
    tokens: Arc<HashSet<String>>,
}

impl BearerAuth {
    pub fn new(tokens: Vec<String>) -> Self {
        BearerAuth { tokens: Arc::new(tokens.into_iter().collect()) }
    }
}

impl tonic::service::Interceptor for BearerAuth {
    fn call(&mut self, req: Request<()>) -> Result<Request<()>, Status> {
        let token = req
            .metadata()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match token {
            Some(t) if self.tokens.contains(t) => Ok(req),
            Some(_) => Err(Status::unauthenticated("unknown token")),
            None => Err(Status::unauthenticated("missing authorization metadata")),
        }
    }
}
