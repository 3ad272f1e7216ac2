//! `calculator.CalculatorService` over the engine's [`Calculator`].

use super::{Call, ResponseStream};
use quartet_tonic_core::proto::calculator::{
    CalculatorRequest, CalculatorResponse, CalculatorService, ComputeAverageRequest,
    ComputeAverageResponse, FindMaximumRequest, FindMaximumResponse,
    PrimeNumberDecompositionRequest, PrimeNumberDecompositionResponse, SquareRootRequest,
    SquareRootResponse,
};
use quartet_tonic_core::quartet::calculator::{
    CALCULATE, COMPUTE_AVERAGE, Calculator, FIND_MAXIMUM, PRIME_NUMBER_DECOMPOSITION, SQUARE_ROOT,
};
use quartet_tonic_core::quartet::engine::Dispatcher;
use std::sync::Arc;
use tonic::{Request, Response, Status, Streaming};

#[derive(Clone)]
pub struct CalculatorHandler {
    calculator: Calculator,
    dispatcher: Arc<Dispatcher>,
}

impl CalculatorHandler {
    pub fn new(calculator: Calculator, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            calculator,
            dispatcher,
        }
    }
}

#[tonic::async_trait]
impl CalculatorService for CalculatorHandler {
    type PrimeNumberDecompositionStream = ResponseStream<PrimeNumberDecompositionResponse>;
    type FindMaximumStream = ResponseStream<FindMaximumResponse>;

    #[tracing::instrument(name = "Calculate", skip_all)]
    async fn calculate(
        &self,
        request: Request<CalculatorRequest>,
    ) -> Result<Response<CalculatorResponse>, Status> {
        let call = Call::open(&self.dispatcher, &CALCULATE, &request)?;
        let operands = request.into_inner().calculating.unwrap_or_default();

        let result = self
            .calculator
            .sum(call.context(), operands.x, operands.y)
            .await
            .map(|result| CalculatorResponse { result });
        call.respond(result)
    }

    #[tracing::instrument(name = "SquareRoot", skip_all, fields(number = request.get_ref().number))]
    async fn square_root(
        &self,
        request: Request<SquareRootRequest>,
    ) -> Result<Response<SquareRootResponse>, Status> {
        let call = Call::open(&self.dispatcher, &SQUARE_ROOT, &request)?;
        let number = request.into_inner().number;

        let result = self
            .calculator
            .square_root(call.context(), number)
            .await
            .map(|root| SquareRootResponse { root });
        call.respond(result)
    }

    #[tracing::instrument(name = "PrimeNumberDecomposition", skip_all, fields(number = request.get_ref().number))]
    async fn prime_number_decomposition(
        &self,
        request: Request<PrimeNumberDecompositionRequest>,
    ) -> Result<Response<Self::PrimeNumberDecompositionStream>, Status> {
        let call = Call::open(&self.dispatcher, &PRIME_NUMBER_DECOMPOSITION, &request)?;
        let number = request.into_inner().number;

        let factors = self.calculator.prime_decomposition(call.context(), number);
        Ok(call.stream(factors, |result| PrimeNumberDecompositionResponse { result }))
    }

    #[tracing::instrument(name = "ComputeAverage", skip_all)]
    async fn compute_average(
        &self,
        request: Request<Streaming<ComputeAverageRequest>>,
    ) -> Result<Response<ComputeAverageResponse>, Status> {
        let call = Call::open(&self.dispatcher, &COMPUTE_AVERAGE, &request)?;
        let inbound = call.inbound(request.into_inner(), |m: ComputeAverageRequest| m.number);

        let result = self
            .calculator
            .compute_average(inbound)
            .await
            .map(|result| ComputeAverageResponse { result });
        call.respond(result)
    }

    #[tracing::instrument(name = "FindMaximum", skip_all)]
    async fn find_maximum(
        &self,
        request: Request<Streaming<FindMaximumRequest>>,
    ) -> Result<Response<Self::FindMaximumStream>, Status> {
        let call = Call::open(&self.dispatcher, &FIND_MAXIMUM, &request)?;
        let inbound = call.inbound(request.into_inner(), |m: FindMaximumRequest| m.number);

        let maxima = self.calculator.find_maximum(inbound);
        Ok(call.stream(maxima, |result| FindMaximumResponse { result }))
    }
}
