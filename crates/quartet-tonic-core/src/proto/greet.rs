//! `greet` package.

use quartet::greet;

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Greeting {
    #[prost(string, tag = "1")]
    pub first_name: String,
    #[prost(string, tag = "2")]
    pub last_name: String,
}

impl From<Greeting> for greet::Greeting {
    fn from(g: Greeting) -> Self {
        Self::new(g.first_name, g.last_name)
    }
}

impl From<greet::Greeting> for Greeting {
    fn from(g: greet::Greeting) -> Self {
        Self {
            first_name: g.first_name,
            last_name: g.last_name,
        }
    }
}

macro_rules! greeting_exchange {
    ($($request:ident => $response:ident),+ $(,)?) => {
        $(
            #[derive(Clone, PartialEq, Eq, prost::Message)]
            pub struct $request {
                #[prost(message, optional, tag = "1")]
                pub greeting: Option<Greeting>,
            }

            #[derive(Clone, PartialEq, Eq, prost::Message)]
            pub struct $response {
                #[prost(string, tag = "1")]
                pub result: String,
            }
        )+
    };
}

greeting_exchange! {
    GreetRequest => GreetResponse,
    GreetManyTimesRequest => GreetManyTimesResponse,
    LongGreetRequest => LongGreetResponse,
    GreetEveryoneRequest => GreetEveryoneResponse,
    GreetWithDeadlineRequest => GreetWithDeadlineResponse,
}

include!(concat!(env!("OUT_DIR"), "/greet.GreetService.rs"));

pub use greet_service_client::GreetServiceClient;
pub use greet_service_server::{GreetService, GreetServiceServer};
