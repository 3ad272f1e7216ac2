//! End-to-end tests: an in-process tonic server on an ephemeral port,
//! exercised with the generated clients.

use core::time::Duration;
use futures::StreamExt;
use quartet_tonic_core::proto::blog::{
    Blog, BlogServiceClient, CreateBlogRequest, DeleteBlogRequest, ListBlogRequest,
    ReadBlogRequest, UpdateBlogRequest,
};
use quartet_tonic_core::proto::calculator::{
    Calculating, CalculatorRequest, CalculatorServiceClient, ComputeAverageRequest,
    FindMaximumRequest, PrimeNumberDecompositionRequest, SquareRootRequest,
};
use quartet_tonic_core::proto::greet::{
    GreetEveryoneRequest, GreetManyTimesRequest, GreetRequest, GreetServiceClient,
    GreetWithDeadlineRequest, Greeting, LongGreetRequest,
};
use quartet_tonic_core::deadline::GRPC_TIMEOUT_HEADER;
use quartet_tonic_core::proto::blog::BlogServiceServer;
use quartet_tonic_core::proto::calculator::CalculatorServiceServer;
use quartet_tonic_core::proto::greet::GreetServiceServer;
use quartet_tonic_core::quartet::blog::BLOG_SERVICE;
use quartet_tonic_core::quartet::calculator::CALCULATOR_SERVICE;
use quartet_tonic_core::quartet::greet::GREET_SERVICE;
use quartet_tonic_core::quartet::store::{KEY_TEXT_LEN, MemoryStore};
use quartet_tonic_server::server::arrival::ArrivalLayer;
use quartet_tonic_server::server::config::ServerConfig;
use quartet_tonic_server::server::service::Services;
use quartet_tonic_server::server::service::blog::BlogHandler;
use quartet_tonic_server::server::service::calculator::CalculatorHandler;
use quartet_tonic_server::server::service::greet::GreetHandler;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::metadata::MetadataValue;
use tonic::server::NamedService;
use tonic::transport::{Channel, Server};
use tonic::{Code, Request};

struct TestServer {
    channel: Channel,
    services: Services,
    store: Arc<MemoryStore>,
}

/// Bind to port 0, spawn the gRPC server, and return a connected channel.
async fn start_server() -> TestServer {
    let config = ServerConfig {
        server_addr: "127.0.0.1:0".to_string(),
        stream_buffer_size: 2,
        shutdown_timeout: Duration::from_millis(200),
        greet_interval: Duration::from_millis(10),
        greet_repeat: 3,
        ..ServerConfig::default()
    };
    let store = Arc::new(MemoryStore::new());
    let services = Services::with_store(&config, Arc::clone(&store));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let router = Server::builder()
        .layer(ArrivalLayer)
        .add_service(services.calculator_server())
        .add_service(services.blog_server())
        .add_service(services.greet_server());
    tokio::spawn(async move {
        router
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    let channel = Channel::from_shared(format!("http://{addr}"))
        .unwrap()
        .connect()
        .await
        .unwrap();

    TestServer {
        channel,
        services,
        store,
    }
}

fn greeting(first_name: &str) -> Option<Greeting> {
    Some(Greeting {
        first_name: first_name.to_string(),
        last_name: "Citra".to_string(),
    })
}

fn draft(title: &str) -> Option<Blog> {
    Some(Blog {
        id: String::new(),
        author_id: "naraycitra".to_string(),
        title: title.to_string(),
        content: format!("{title} content"),
    })
}

#[tokio::test]
async fn calculator_unary_calls() {
    let server = start_server().await;
    let mut client = CalculatorServiceClient::new(server.channel);

    let sum = client
        .calculate(CalculatorRequest {
            calculating: Some(Calculating { x: 3, y: 10 }),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(sum.result, 13);

    let root = client
        .square_root(SquareRootRequest { number: 4 })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(root.root, 2.0);

    let status = client
        .square_root(SquareRootRequest { number: -1 })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "Received negative number: -1");
}

#[tokio::test]
async fn calculator_streaming_calls() {
    let server = start_server().await;
    let mut client = CalculatorServiceClient::new(server.channel);

    let factors: Vec<i64> = client
        .prime_number_decomposition(PrimeNumberDecompositionRequest { number: 120 })
        .await
        .unwrap()
        .into_inner()
        .map(|r| r.unwrap().result)
        .collect()
        .await;
    assert_eq!(factors, vec![2, 2, 2, 3, 5]);

    let numbers = [1, 2, 3, 4].map(|number| ComputeAverageRequest { number });
    let average = client
        .compute_average(tokio_stream::iter(numbers))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(average.result, 2.5);

    let status = client
        .compute_average(tokio_stream::iter(Vec::<ComputeAverageRequest>::new()))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let numbers = [1, 5, 3, 6, 2, 20].map(|number| FindMaximumRequest { number });
    let maxima: Vec<i64> = client
        .find_maximum(tokio_stream::iter(numbers))
        .await
        .unwrap()
        .into_inner()
        .map(|r| r.unwrap().result)
        .collect()
        .await;
    assert_eq!(maxima, vec![1, 5, 5, 6, 6, 20]);
}

#[tokio::test]
async fn blog_crud_round_trip() {
    let server = start_server().await;
    let mut client = BlogServiceClient::new(server.channel);

    let created = client
        .create_blog(CreateBlogRequest {
            blog: draft("first"),
        })
        .await
        .unwrap()
        .into_inner()
        .blog
        .unwrap();
    assert_eq!(created.id.len(), KEY_TEXT_LEN);

    let read = client
        .read_blog(ReadBlogRequest {
            blog_id: created.id.clone(),
        })
        .await
        .unwrap()
        .into_inner()
        .blog
        .unwrap();
    assert_eq!(read, created);

    let replacement = Blog {
        title: "second".to_string(),
        ..created.clone()
    };
    let updated = client
        .update_blog(UpdateBlogRequest {
            blog: Some(replacement.clone()),
        })
        .await
        .unwrap()
        .into_inner()
        .blog
        .unwrap();
    assert_eq!(updated, replacement);

    let deleted = client
        .delete_blog(DeleteBlogRequest {
            blog_id: created.id.clone(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(deleted.blog_id, created.id);

    let status = client
        .read_blog(ReadBlogRequest {
            blog_id: created.id,
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn blog_identifier_errors() {
    let server = start_server().await;
    let mut client = BlogServiceClient::new(server.channel);

    let status = client
        .read_blog(ReadBlogRequest {
            blog_id: "123456df".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let status = client
        .delete_blog(DeleteBlogRequest {
            blog_id: "not base32 at all, not at all".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let status = client
        .update_blog(UpdateBlogRequest {
            blog: Some(Blog {
                id: "00000000000000000000000000".to_string(),
                ..draft("ghost").unwrap()
            }),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    let status = client
        .create_blog(CreateBlogRequest { blog: None })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn blog_list_streams_every_record() {
    let server = start_server().await;
    let mut client = BlogServiceClient::new(server.channel);

    for i in 0..5 {
        client
            .create_blog(CreateBlogRequest {
                blog: draft(&format!("post {i}")),
            })
            .await
            .unwrap();
    }

    let items: Vec<_> = client
        .list_blog(ListBlogRequest {})
        .await
        .unwrap()
        .into_inner()
        .collect()
        .await;

    assert_eq!(items.len(), 5);
    assert!(items.iter().all(|item| item.is_ok()));
}

#[tokio::test]
async fn blog_store_outage_is_internal() {
    let server = start_server().await;
    let mut client = BlogServiceClient::new(server.channel);
    server.store.set_available(false);

    let status = client
        .create_blog(CreateBlogRequest {
            blog: draft("lost"),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
}

#[tokio::test]
async fn greet_every_shape() {
    let server = start_server().await;
    let mut client = GreetServiceClient::new(server.channel);

    let reply = client
        .greet(GreetRequest {
            greeting: greeting("Naray"),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(reply.result, "Hello, Naray Citra");

    let many: Vec<String> = client
        .greet_many_times(GreetManyTimesRequest {
            greeting: greeting("Naray"),
        })
        .await
        .unwrap()
        .into_inner()
        .map(|r| r.unwrap().result)
        .collect()
        .await;
    assert_eq!(
        many,
        [
            "Hello, Naray Citra at 0",
            "Hello, Naray Citra at 1",
            "Hello, Naray Citra at 2"
        ]
    );

    let requests = ["Lucy", "Mark"].map(|name| LongGreetRequest {
        greeting: greeting(name),
    });
    let long = client
        .long_greet(tokio_stream::iter(requests))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(long.result, "Hello, Lucy Citra! \nHello, Mark Citra! \n");

    let requests = ["Lucy", "Mark"].map(|name| GreetEveryoneRequest {
        greeting: greeting(name),
    });
    let everyone: Vec<String> = client
        .greet_everyone(tokio_stream::iter(requests))
        .await
        .unwrap()
        .into_inner()
        .map(|r| r.unwrap().result)
        .collect()
        .await;
    assert_eq!(everyone, ["Hello, Lucy Citra", "Hello, Mark Citra"]);
}

#[tokio::test]
async fn greet_with_deadline_honours_the_caller_timeout() {
    let server = start_server().await;
    let mut client = GreetServiceClient::new(server.channel);

    let mut request = Request::new(GreetWithDeadlineRequest {
        greeting: greeting("Naray"),
    });
    request.set_timeout(Duration::from_secs(5));
    let reply = client.greet_with_deadline(request).await.unwrap();
    assert_eq!(reply.into_inner().result, "Hello, Naray Citra");

    // Three 10ms steps cannot finish in 5ms.
    let mut request = Request::new(GreetWithDeadlineRequest {
        greeting: greeting("Naray"),
    });
    request.set_timeout(Duration::from_millis(5));
    let status = client.greet_with_deadline(request).await.unwrap_err();
    assert_eq!(status.code(), Code::DeadlineExceeded, "{status:?}");
}

fn with_zero_timeout<T>(message: T) -> Request<T> {
    let mut request = Request::new(message);
    request
        .metadata_mut()
        .insert(GRPC_TIMEOUT_HEADER, MetadataValue::from_static("0m"));
    request
}

#[tokio::test]
async fn zero_timeout_arrives_past_its_deadline() {
    let server = start_server().await;
    let mut client = GreetServiceClient::new(server.channel);

    let request = with_zero_timeout(tokio_stream::iter([LongGreetRequest {
        greeting: greeting("Lucy"),
    }]));
    let status = client.long_greet(request).await.unwrap_err();
    assert_eq!(status.code(), Code::DeadlineExceeded, "{status:?}");

    let request = with_zero_timeout(tokio_stream::iter([GreetEveryoneRequest {
        greeting: greeting("Lucy"),
    }]));
    let status = match client.greet_everyone(request).await {
        Ok(response) => response.into_inner().message().await.unwrap_err(),
        Err(status) => status,
    };
    assert_eq!(status.code(), Code::DeadlineExceeded, "{status:?}");
}

#[tokio::test]
async fn aborted_bidi_call_stops_answering() {
    let server = start_server().await;
    // A message the client cannot encode aborts the request stream, which
    // resets the call on the wire.
    let mut client = GreetServiceClient::new(server.channel).max_encoding_message_size(256);

    let (tx, rx) = mpsc::channel(4);
    let mut replies = client
        .greet_everyone(ReceiverStream::new(rx))
        .await
        .unwrap()
        .into_inner();

    tx.send(GreetEveryoneRequest {
        greeting: greeting("Lucy"),
    })
    .await
    .unwrap();
    let first = replies.message().await.unwrap().unwrap();
    assert_eq!(first.result, "Hello, Lucy Citra");
    assert_eq!(server.services.dispatcher().inflight(), 1);

    tx.send(GreetEveryoneRequest {
        greeting: greeting(&"x".repeat(1024)),
    })
    .await
    .unwrap();
    assert!(replies.message().await.is_err());

    tokio::time::timeout(Duration::from_secs(2), async {
        while server.services.dispatcher().inflight() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("bidi call still running after the caller aborted");
    drop(tx);
}

#[test]
fn tonic_servers_route_the_registered_services() {
    assert_eq!(
        <CalculatorServiceServer<CalculatorHandler> as NamedService>::NAME,
        CALCULATOR_SERVICE.name
    );
    assert_eq!(
        <BlogServiceServer<BlogHandler<MemoryStore>> as NamedService>::NAME,
        BLOG_SERVICE.name
    );
    assert_eq!(
        <GreetServiceServer<GreetHandler> as NamedService>::NAME,
        GREET_SERVICE.name
    );
}

#[tokio::test]
async fn calls_after_shutdown_are_unavailable() {
    let server = start_server().await;
    let mut client = CalculatorServiceClient::new(server.channel);

    server.services.shutdown().await;
    assert!(server.services.dispatcher().is_shutting_down());

    let status = client
        .square_root(SquareRootRequest { number: 9 })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unavailable);
}
