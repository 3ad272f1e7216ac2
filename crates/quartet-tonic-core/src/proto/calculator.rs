//! `calculator` package.

#[derive(Clone, PartialEq, prost::Message)]
pub struct Calculating {
    #[prost(int32, tag = "1")]
    pub x: i32,
    #[prost(int32, tag = "2")]
    pub y: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CalculatorRequest {
    #[prost(message, optional, tag = "1")]
    pub calculating: Option<Calculating>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CalculatorResponse {
    #[prost(int32, tag = "1")]
    pub result: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrimeNumberDecompositionRequest {
    #[prost(int64, tag = "1")]
    pub number: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrimeNumberDecompositionResponse {
    #[prost(int64, tag = "1")]
    pub result: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ComputeAverageRequest {
    #[prost(int64, tag = "1")]
    pub number: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ComputeAverageResponse {
    #[prost(double, tag = "1")]
    pub result: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FindMaximumRequest {
    #[prost(int64, tag = "1")]
    pub number: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FindMaximumResponse {
    #[prost(int64, tag = "1")]
    pub result: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SquareRootRequest {
    #[prost(int32, tag = "1")]
    pub number: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SquareRootResponse {
    #[prost(double, tag = "1")]
    pub root: f64,
}

include!(concat!(env!("OUT_DIR"), "/calculator.CalculatorService.rs"));

pub use calculator_service_client::CalculatorServiceClient;
pub use calculator_service_server::{CalculatorService, CalculatorServiceServer};
