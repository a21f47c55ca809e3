//! Wire types and tonic glue for `basic.v1.BasicService`.
//!
//! ```text
//! service BasicService {
//!   rpc Command1(Command1Request) returns (Command1Response);
//!   rpc Command2(Command2Request) returns (stream Command2Response);
//! }
//! ```

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Command1Request {
    #[prost(string, tag = "1")]
    pub input: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Command1Response {
    #[prost(string, tag = "1")]
    pub output: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Command2Request {
    #[prost(string, tag = "1")]
    pub input1: String,
    #[prost(string, tag = "2")]
    pub input2: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Command2Response {
    #[prost(string, tag = "1")]
    pub output: String,
}

pub mod basic_service_server {
    use async_trait::async_trait;
    use tonic::codegen::{http, Arc, Body, BoxFuture, Context, Poll, Service, StdError};

    use super::{Command1Request, Command1Response, Command2Request, Command2Response};

    pub const SERVICE_NAME: &str = "basic.v1.BasicService";

    const COMMAND1: &str = "/basic.v1.BasicService/Command1";
    const COMMAND2: &str = "/basic.v1.BasicService/Command2";

    #[async_trait]
    pub trait BasicService: Send + Sync + 'static {
        async fn command1(
            &self,
            request: tonic::Request<Command1Request>,
        ) -> Result<tonic::Response<Command1Response>, tonic::Status>;

        type Command2Stream: tokio_stream::Stream<Item = Result<Command2Response, tonic::Status>>
            + Send
            + 'static;

        async fn command2(
            &self,
            request: tonic::Request<Command2Request>,
        ) -> Result<tonic::Response<Self::Command2Stream>, tonic::Status>;
    }

    /// Routes `BasicService` requests to `T`.
    pub struct BasicServiceServer<T> {
        inner: Arc<T>,
    }

    impl<T> BasicServiceServer<T> {
        pub fn new(inner: T) -> Self {
            Self { inner: Arc::new(inner) }
        }
    }

    impl<T> Clone for BasicServiceServer<T> {
        fn clone(&self) -> Self {
            Self {
                inner: self.inner.clone(),
            }
        }
    }

    struct Command1Svc<T>(Arc<T>);

    impl<T: BasicService> tonic::server::UnaryService<Command1Request> for Command1Svc<T> {
        type Response = Command1Response;
        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

        fn call(&mut self, request: tonic::Request<Command1Request>) -> Self::Future {
            let inner = Arc::clone(&self.0);
            Box::pin(async move { inner.command1(request).await })
        }
    }

    struct Command2Svc<T>(Arc<T>);

    impl<T: BasicService> tonic::server::ServerStreamingService<Command2Request> for Command2Svc<T> {
        type Response = Command2Response;
        type ResponseStream = T::Command2Stream;
        type Future = BoxFuture<tonic::Response<Self::ResponseStream>, tonic::Status>;

        fn call(&mut self, request: tonic::Request<Command2Request>) -> Self::Future {
            let inner = Arc::clone(&self.0);
            Box::pin(async move { inner.command2(request).await })
        }
    }

    impl<T, B> Service<http::Request<B>> for BasicServiceServer<T>
    where
        T: BasicService,
        B: Body + Send + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::Body>;
        type Error = std::convert::Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                COMMAND1 => Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.unary(Command1Svc(inner), req).await)
                }),
                COMMAND2 => Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.server_streaming(Command2Svc(inner), req).await)
                }),
                path => {
                    let status = tonic::Status::unimplemented(format!("unknown method {path}"));
                    Box::pin(async move { Ok(status.into_http()) })
                }
            }
        }
    }

    impl<T> tonic::server::NamedService for BasicServiceServer<T> {
        const NAME: &'static str = SERVICE_NAME;
    }
}

pub mod basic_service_client {
    use tonic::codegen::http::uri::PathAndQuery;
    use tonic::transport::Channel;
    use tonic::{IntoRequest, Response, Status, Streaming};

    use super::{Command1Request, Command1Response, Command2Request, Command2Response};

    #[derive(Debug, Clone)]
    pub struct BasicServiceClient {
        inner: tonic::client::Grpc<Channel>,
    }

    impl BasicServiceClient {
        pub fn new(channel: Channel) -> Self {
            Self {
                inner: tonic::client::Grpc::new(channel),
            }
        }

        async fn ready(&mut self) -> Result<(), Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| Status::unknown(format!("Service was not ready: {e}")))
        }

        pub async fn command1(
            &mut self,
            request: impl IntoRequest<Command1Request>,
        ) -> Result<Response<Command1Response>, Status> {
            self.ready().await?;
            let path = PathAndQuery::from_static("/basic.v1.BasicService/Command1");
            self.inner
                .unary(request.into_request(), path, tonic::codec::ProstCodec::default())
                .await
        }

        pub async fn command2(
            &mut self,
            request: impl IntoRequest<Command2Request>,
        ) -> Result<Response<Streaming<Command2Response>>, Status> {
            self.ready().await?;
            let path = PathAndQuery::from_static("/basic.v1.BasicService/Command2");
            self.inner
                .server_streaming(request.into_request(), path, tonic::codec::ProstCodec::default())
                .await
        }
    }
}
