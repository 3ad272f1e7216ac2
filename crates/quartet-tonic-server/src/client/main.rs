//! Demo client: runs every call shape of every service against a live server.

use clap::{Parser, Subcommand};
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
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Code, Request};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "quartet-client",
    version,
    about = "Exercises the quartet services over gRPC"
)]
struct Cli {
    /// Server URI.
    ///
    /// Environment variable: `QUARTET_SERVER`
    #[arg(long, env = "QUARTET_SERVER", default_value_t = String::from("http://127.0.0.1:50051"))]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sum, square root, prime factors, average and running maximum.
    Calculator {
        /// Number to factor.
        #[arg(long, default_value_t = 120)]
        number: i64,
    },
    /// Create, read, update, list and delete a blog.
    Blog,
    /// Every greeting shape, then two deadline-bounded greetings.
    Greet {
        #[arg(long, default_value_t = String::from("Naray"))]
        first_name: String,
        #[arg(long, default_value_t = String::from("Citra"))]
        last_name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let channel = Channel::from_shared(cli.server.clone())?.connect().await?;
    tracing::info!("Connected to {}", cli.server);

    match cli.command {
        Command::Calculator { number } => run_calculator(channel, number).await,
        Command::Blog => run_blog(channel).await,
        Command::Greet {
            first_name,
            last_name,
        } => {
            let greeting = Greeting {
                first_name,
                last_name,
            };
            run_greet(channel, greeting).await
        }
    }
}

async fn run_calculator(channel: Channel, number: i64) -> anyhow::Result<()> {
    let mut client = CalculatorServiceClient::new(channel);

    let sum = client
        .calculate(CalculatorRequest {
            calculating: Some(Calculating { x: 3, y: 10 }),
        })
        .await?
        .into_inner();
    tracing::info!("3 + 10 = {}", sum.result);

    for n in [16, -4] {
        match client.square_root(SquareRootRequest { number: n }).await {
            Ok(res) => tracing::info!("sqrt({n}) = {}", res.into_inner().root),
            Err(status) if status.code() == Code::InvalidArgument => {
                tracing::warn!("sqrt({n}) rejected: {}", status.message());
            }
            Err(status) => return Err(status.into()),
        }
    }

    let mut factors = client
        .prime_number_decomposition(PrimeNumberDecompositionRequest { number })
        .await?
        .into_inner();
    let mut found = Vec::new();
    while let Some(factor) = factors.next().await {
        found.push(factor?.result);
    }
    tracing::info!("Prime factors of {number}: {found:?}");

    let numbers = [1, 2, 3, 4].map(|number| ComputeAverageRequest { number });
    let average = client
        .compute_average(tokio_stream::iter(numbers))
        .await?
        .into_inner();
    tracing::info!("Average of [1, 2, 3, 4] = {}", average.result);

    // Feed the running maximum one number at a time, reading each answer
    // before sending the next.
    let (tx, rx) = mpsc::channel(1);
    let mut maxima = client
        .find_maximum(ReceiverStream::new(rx))
        .await?
        .into_inner();
    for number in [1, 5, 3, 6, 2, 20] {
        tx.send(FindMaximumRequest { number }).await?;
        if let Some(maximum) = maxima.next().await {
            tracing::info!("Sent {number}, maximum is now {}", maximum?.result);
        }
    }
    drop(tx);
    while let Some(maximum) = maxima.next().await {
        maximum?;
    }

    Ok(())
}

async fn run_blog(channel: Channel) -> anyhow::Result<()> {
    let mut client = BlogServiceClient::new(channel);

    let created = client
        .create_blog(CreateBlogRequest {
            blog: Some(Blog {
                id: String::new(),
                author_id: "naraycitra".to_string(),
                title: "Rust is cool".to_string(),
                content: "Rust is a really cool programming language".to_string(),
            }),
        })
        .await?
        .into_inner()
        .blog
        .unwrap_or_default();
    tracing::info!("Created blog: {created:?}");

    for blog_id in ["123456df", "00000000000000000000000000"] {
        if let Err(status) = client
            .read_blog(ReadBlogRequest {
                blog_id: blog_id.to_string(),
            })
            .await
        {
            tracing::info!("Reading {blog_id:?} failed as expected: {:?}", status.code());
        }
    }

    let read = client
        .read_blog(ReadBlogRequest {
            blog_id: created.id.clone(),
        })
        .await?
        .into_inner();
    tracing::info!("Blog read: {:?}", read.blog);

    let updated = client
        .update_blog(UpdateBlogRequest {
            blog: Some(Blog {
                title: "Rust is still cool".to_string(),
                content: "Ownership makes it so".to_string(),
                ..created.clone()
            }),
        })
        .await?
        .into_inner();
    tracing::info!("Blog updated: {:?}", updated.blog);

    let mut list = client.list_blog(ListBlogRequest {}).await?.into_inner();
    while let Some(item) = list.next().await {
        tracing::info!("Listed: {:?}", item?.blog);
    }

    let deleted = client
        .delete_blog(DeleteBlogRequest {
            blog_id: created.id,
        })
        .await?
        .into_inner();
    tracing::info!("Blog deleted: {}", deleted.blog_id);

    Ok(())
}

async fn run_greet(channel: Channel, greeting: Greeting) -> anyhow::Result<()> {
    let mut client = GreetServiceClient::new(channel);

    let reply = client
        .greet(GreetRequest {
            greeting: Some(greeting.clone()),
        })
        .await?
        .into_inner();
    tracing::info!("Greet: {}", reply.result);

    let mut many = client
        .greet_many_times(GreetManyTimesRequest {
            greeting: Some(greeting.clone()),
        })
        .await?
        .into_inner();
    while let Some(reply) = many.next().await {
        tracing::info!("GreetManyTimes: {}", reply?.result);
    }

    let friends = ["Stephane", "John", "Lucy", "Mark", "Piper"].map(|name| Greeting {
        first_name: name.to_string(),
        last_name: greeting.last_name.clone(),
    });

    let long = client
        .long_greet(tokio_stream::iter(friends.clone().map(|g| LongGreetRequest {
            greeting: Some(g),
        })))
        .await?
        .into_inner();
    tracing::info!("LongGreet: {:?}", long.result);

    let (tx, rx) = mpsc::channel(friends.len());
    tokio::spawn(async move {
        for friend in friends {
            let request = GreetEveryoneRequest {
                greeting: Some(friend),
            };
            if tx.send(request).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });
    let mut everyone = client
        .greet_everyone(ReceiverStream::new(rx))
        .await?
        .into_inner();
    while let Some(reply) = everyone.next().await {
        tracing::info!("GreetEveryone: {}", reply?.result);
    }

    for timeout in [Duration::from_secs(5), Duration::from_secs(1)] {
        let mut request = Request::new(GreetWithDeadlineRequest {
            greeting: Some(greeting.clone()),
        });
        request.set_timeout(timeout);

        match client.greet_with_deadline(request).await {
            Ok(reply) => tracing::info!("GreetWithDeadLine ({timeout:?}): {}", reply.into_inner().result),
            Err(status)
                if matches!(status.code(), Code::DeadlineExceeded | Code::Cancelled) =>
            {
                tracing::warn!("GreetWithDeadLine ({timeout:?}): deadline was exceeded");
            }
            Err(status) => return Err(status.into()),
        }
    }

    Ok(())
}
