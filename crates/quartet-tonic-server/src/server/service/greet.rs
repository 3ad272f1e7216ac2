//! `greet.GreetService` over the engine's [`Greeter`].

use super::{Call, ResponseStream};
use quartet_tonic_core::proto::greet::{
    GreetEveryoneRequest, GreetEveryoneResponse, GreetManyTimesRequest, GreetManyTimesResponse,
    GreetRequest, GreetResponse, GreetService, GreetWithDeadlineRequest,
    GreetWithDeadlineResponse, LongGreetRequest, LongGreetResponse,
};
use quartet_tonic_core::quartet::engine::Dispatcher;
use quartet_tonic_core::quartet::greet::{
    GREET, GREET_EVERYONE, GREET_MANY_TIMES, GREET_WITH_DEADLINE, Greeter, Greeting, LONG_GREET,
};
use std::sync::Arc;
use tonic::{Request, Response, Status, Streaming};

#[derive(Clone)]
pub struct GreetHandler {
    greeter: Greeter,
    dispatcher: Arc<Dispatcher>,
}

impl GreetHandler {
    pub fn new(greeter: Greeter, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            greeter,
            dispatcher,
        }
    }
}

// A request without a greeting greets an empty name.
fn greeting_of(greeting: Option<quartet_tonic_core::proto::greet::Greeting>) -> Greeting {
    greeting.map(Greeting::from).unwrap_or_default()
}

#[tonic::async_trait]
impl GreetService for GreetHandler {
    type GreetManyTimesStream = ResponseStream<GreetManyTimesResponse>;
    type GreetEveryoneStream = ResponseStream<GreetEveryoneResponse>;

    #[tracing::instrument(name = "Greet", skip_all)]
    async fn greet(
        &self,
        request: Request<GreetRequest>,
    ) -> Result<Response<GreetResponse>, Status> {
        let call = Call::open(&self.dispatcher, &GREET, &request)?;
        let greeting = greeting_of(request.into_inner().greeting);
        tracing::info!("Greet function was invoked with {greeting:?}");

        let result = self
            .greeter
            .greet(call.context(), greeting)
            .await
            .map(|result| GreetResponse { result });
        call.respond(result)
    }

    #[tracing::instrument(name = "GreetManyTimes", skip_all)]
    async fn greet_many_times(
        &self,
        request: Request<GreetManyTimesRequest>,
    ) -> Result<Response<Self::GreetManyTimesStream>, Status> {
        let call = Call::open(&self.dispatcher, &GREET_MANY_TIMES, &request)?;
        let greeting = greeting_of(request.into_inner().greeting);
        tracing::info!("GreetManyTimes function was invoked with {greeting:?}");

        let greetings = self.greeter.greet_many_times(call.context(), greeting);
        Ok(call.stream(greetings, |result| GreetManyTimesResponse { result }))
    }

    #[tracing::instrument(name = "LongGreet", skip_all)]
    async fn long_greet(
        &self,
        request: Request<Streaming<LongGreetRequest>>,
    ) -> Result<Response<LongGreetResponse>, Status> {
        let call = Call::open(&self.dispatcher, &LONG_GREET, &request)?;
        let inbound = call.inbound(request.into_inner(), |m: LongGreetRequest| {
            greeting_of(m.greeting)
        });

        let result = self
            .greeter
            .long_greet(inbound)
            .await
            .map(|result| LongGreetResponse { result });
        call.respond(result)
    }

    #[tracing::instrument(name = "GreetEveryone", skip_all)]
    async fn greet_everyone(
        &self,
        request: Request<Streaming<GreetEveryoneRequest>>,
    ) -> Result<Response<Self::GreetEveryoneStream>, Status> {
        let call = Call::open(&self.dispatcher, &GREET_EVERYONE, &request)?;
        let inbound = call.inbound(request.into_inner(), |m: GreetEveryoneRequest| {
            greeting_of(m.greeting)
        });

        let replies = self.greeter.greet_everyone(inbound);
        Ok(call.stream(replies, |result| GreetEveryoneResponse { result }))
    }

    #[tracing::instrument(name = "GreetWithDeadLine", skip_all)]
    async fn greet_with_deadline(
        &self,
        request: Request<GreetWithDeadlineRequest>,
    ) -> Result<Response<GreetWithDeadlineResponse>, Status> {
        let call = Call::open(&self.dispatcher, &GREET_WITH_DEADLINE, &request)?;
        let greeting = greeting_of(request.into_inner().greeting);
        tracing::info!("GreetWithDeadLine function was invoked with {greeting:?}");

        let result = self
            .greeter
            .greet_with_deadline(call.context(), greeting)
            .await
            .map(|result| GreetWithDeadlineResponse { result });
        call.respond(result)
    }
}
