use async_trait::async_trait;
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// A unary RPC endpoint: one request in, one response (or status) out.
#[async_trait]
pub trait UnaryHandler<Req, Resp>: Send + Sync + 'static
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, req: Request<Req>) -> Result<Response<Resp>, Status>;
}

/// Interceptor around a unary handler, the RPC counterpart of
/// [`crate::middleware::Middleware`].
#[async_trait]
pub trait UnaryInterceptor<Req, Resp>: Send + Sync + 'static
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn intercept(
        &self,
        req: Request<Req>,
        next: Arc<dyn UnaryHandler<Req, Resp>>,
    ) -> Result<Response<Resp>, Status>;
}

struct InterceptedUnary<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    interceptor: Arc<dyn UnaryInterceptor<Req, Resp>>,
    next: Arc<dyn UnaryHandler<Req, Resp>>,
}

#[async_trait]
impl<Req, Resp> UnaryHandler<Req, Resp> for InterceptedUnary<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, req: Request<Req>) -> Result<Response<Resp>, Status> {
        self.interceptor.intercept(req, Arc::clone(&self.next)).await
    }
}

/// Wrap `handler` in `interceptors`; the first interceptor is the outermost.
pub fn compose_unary<Req, Resp>(
    interceptors: &[Arc<dyn UnaryInterceptor<Req, Resp>>],
    handler: Arc<dyn UnaryHandler<Req, Resp>>,
) -> Arc<dyn UnaryHandler<Req, Resp>>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    interceptors.iter().rev().fold(handler, |next, interceptor| {
        Arc::new(InterceptedUnary {
            interceptor: Arc::clone(interceptor),
            next,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl UnaryHandler<String, String> for Echo {
        async fn call(&self, req: Request<String>) -> Result<Response<String>, Status> {
            let order = req
                .metadata()
                .get("x-order")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            Ok(Response::new(format!("{}{}", order, req.into_inner())))
        }
    }

    struct Mark(&'static str);

    #[async_trait]
    impl UnaryInterceptor<String, String> for Mark {
        async fn intercept(
            &self,
            mut req: Request<String>,
            next: Arc<dyn UnaryHandler<String, String>>,
        ) -> Result<Response<String>, Status> {
            let order = req
                .metadata()
                .get("x-order")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let value = format!("{}{}", order, self.0)
                .parse()
                .map_err(|_| Status::internal("bad metadata"))?;
            req.metadata_mut().insert("x-order", value);
            next.call(req).await
        }
    }

    #[tokio::test]
    async fn interceptors_run_outermost_first() {
        let chain: Vec<Arc<dyn UnaryInterceptor<String, String>>> =
            vec![Arc::new(Mark("A>")), Arc::new(Mark("B>"))];
        let entry = compose_unary(&chain, Arc::new(Echo));

        let res = entry.call(Request::new("body".to_string())).await.unwrap();
        assert_eq!(res.into_inner(), "A>B>body");
    }
}
