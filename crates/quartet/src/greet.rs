//! Greeting service.
//!
//! Exercises every call shape with trivial text handlers, plus
//! `GreetWithDeadLine`, a slow unary call that checks its context between
//! work steps.

use crate::engine::{
    CallContext, CallStream, Inbound, MethodDescriptor, ServiceDescriptor, Shape, bidi_stream,
    client_stream, relay, server_stream, unary,
};
use crate::Result;
use core::time::Duration;

const SERVICE: &str = "greet.GreetService";

pub static GREET: MethodDescriptor = MethodDescriptor::new(SERVICE, "Greet", Shape::Unary);
pub static GREET_MANY_TIMES: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "GreetManyTimes", Shape::ServerStream);
pub static LONG_GREET: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "LongGreet", Shape::ClientStream);
pub static GREET_EVERYONE: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "GreetEveryone", Shape::BidiStream);
pub static GREET_WITH_DEADLINE: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "GreetWithDeadLine", Shape::Unary);

pub static GREET_SERVICE: ServiceDescriptor = ServiceDescriptor {
    name: SERVICE,
    methods: &[
        &GREET,
        &GREET_MANY_TIMES,
        &LONG_GREET,
        &GREET_EVERYONE,
        &GREET_WITH_DEADLINE,
    ],
};

/// Work steps performed by `greet_with_deadline`.
const DEADLINE_STEPS: u32 = 3;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Greeting {
    pub first_name: String,
    pub last_name: String,
}

impl Greeting {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Debug)]
pub struct Greeter {
    interval: Duration,
    repeat: u32,
    stream_buffer: usize,
}

impl Greeter {
    pub const fn new(interval: Duration, repeat: u32) -> Self {
        Self {
            interval,
            repeat,
            stream_buffer: 8,
        }
    }

    pub const fn with_stream_buffer(mut self, stream_buffer: usize) -> Self {
        self.stream_buffer = stream_buffer;
        self
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn greet(&self, ctx: CallContext, greeting: Greeting) -> Result<String> {
        unary(ctx, greeting, |_, greeting| async move {
            Ok(format!("Hello, {}", greeting.full_name()))
        })
        .await
    }

    /// Emits `repeat` numbered greetings, `interval` apart.
    pub fn greet_many_times(&self, ctx: CallContext, greeting: Greeting) -> CallStream<String> {
        let (interval, repeat) = (self.interval, self.repeat);
        server_stream(ctx, greeting, self.stream_buffer, move |greeting, mut out| async move {
            let name = greeting.full_name();
            for i in 0..repeat {
                if i > 0 {
                    tokio::time::sleep(interval).await;
                }
                out.emit(format!("Hello, {name} at {i}")).await?;
            }
            Ok(())
        })
    }

    /// Concatenates one line per inbound greeting.
    pub async fn long_greet(&self, inbound: Inbound<Greeting>) -> Result<String> {
        client_stream(inbound, |mut inbound| async move {
            let mut result = String::new();
            while let Some(greeting) = inbound.receive().await? {
                result.push_str(&format!("Hello, {}! \n", greeting.full_name()));
            }
            Ok(result)
        })
        .await
    }

    pub fn greet_everyone(&self, inbound: Inbound<Greeting>) -> CallStream<String> {
        bidi_stream(inbound, self.stream_buffer, |inbound, out| {
            relay(inbound, out, |greeting| {
                Ok(format!("Hello, {}", greeting.full_name()))
            })
        })
    }

    /// Takes three `interval`s to answer, checking the call before each step.
    pub async fn greet_with_deadline(&self, ctx: CallContext, greeting: Greeting) -> Result<String> {
        let interval = self.interval;
        unary(ctx, greeting, |ctx, greeting| async move {
            for step in 0..DEADLINE_STEPS {
                ctx.check()?;
                tracing::trace!("Deadline greet step {step}");
                tokio::time::sleep(interval).await;
            }
            ctx.check()?;
            Ok(format!("Hello, {}", greeting.full_name()))
        })
        .await
    }
}

impl Default for Greeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use futures::StreamExt;
    use tokio::time::Instant;

    fn ada() -> Greeting {
        Greeting::new("Ada", "Lovelace")
    }

    #[tokio::test]
    async fn greet_says_hello() {
        let reply = Greeter::default().greet(CallContext::new(), ada()).await;
        assert_eq!(reply.as_deref(), Ok("Hello, Ada Lovelace"));
    }

    #[tokio::test(start_paused = true)]
    async fn greet_many_times_paces_its_output() {
        let greeter = Greeter::new(Duration::from_millis(100), 3);
        let start = Instant::now();

        let replies: Vec<_> = greeter
            .greet_many_times(CallContext::new(), ada())
            .collect()
            .await;

        let replies: Vec<String> = replies.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(
            replies,
            [
                "Hello, Ada Lovelace at 0",
                "Hello, Ada Lovelace at 1",
                "Hello, Ada Lovelace at 2"
            ]
        );
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn long_greet_concatenates_every_greeting() {
        let inbound = Inbound::from_iter(
            CallContext::new(),
            [ada(), Greeting::new("Alan", "Turing")],
        );

        let reply = Greeter::default().long_greet(inbound).await;

        assert_eq!(
            reply.as_deref(),
            Ok("Hello, Ada Lovelace! \nHello, Alan Turing! \n")
        );
    }

    #[tokio::test]
    async fn greet_everyone_answers_each_greeting() {
        let inbound = Inbound::from_iter(
            CallContext::new(),
            [ada(), Greeting::new("Grace", "Hopper")],
        );

        let replies: Vec<_> = Greeter::default().greet_everyone(inbound).collect().await;

        assert_eq!(
            replies,
            vec![
                Ok("Hello, Ada Lovelace".to_string()),
                Ok("Hello, Grace Hopper".to_string())
            ]
        );
    }

    #[test]
    fn deadline_greet_keeps_its_wire_route() {
        assert_eq!(
            GREET_WITH_DEADLINE.path(),
            "/greet.GreetService/GreetWithDeadLine"
        );
    }

    #[tokio::test]
    async fn greet_everyone_keeps_reading_while_replies_back_up() {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let replies = Greeter::default()
            .with_stream_buffer(1)
            .greet_everyone(Inbound::from_receiver(CallContext::new(), rx));

        let names = ["Ada", "Alan", "Grace", "Edsger", "Barbara", "Donald"];
        for name in names {
            tokio::time::timeout(Duration::from_secs(1), tx.send(Ok(Greeting::new(name, "X"))))
                .await
                .expect("send blocked behind unread replies")
                .unwrap();
        }
        drop(tx);

        let replies: Vec<String> = replies.map(|r| r.unwrap()).collect().await;
        assert_eq!(replies.len(), names.len());
        assert_eq!(replies[5], "Hello, Donald X");
    }

    #[tokio::test(start_paused = true)]
    async fn greet_with_deadline_completes_within_a_generous_deadline() {
        let greeter = Greeter::new(Duration::from_secs(1), 1);
        let ctx = CallContext::with_timeout(Duration::from_secs(5));

        let reply = greeter.greet_with_deadline(ctx, ada()).await;

        assert_eq!(reply.as_deref(), Ok("Hello, Ada Lovelace"));
    }

    #[tokio::test(start_paused = true)]
    async fn greet_with_deadline_exceeds_a_short_deadline() {
        let greeter = Greeter::new(Duration::from_secs(1), 1);
        let ctx = CallContext::with_timeout(Duration::from_secs(1));

        let reply = greeter.greet_with_deadline(ctx, ada()).await;

        assert_eq!(reply, Err(Error::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn greet_with_deadline_observes_cancellation() {
        let greeter = Greeter::new(Duration::from_secs(1), 1);
        let ctx = CallContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            canceller.cancel();
        });

        let reply = greeter.greet_with_deadline(ctx, ada()).await;

        assert_eq!(reply, Err(Error::Canceled));
    }
}
