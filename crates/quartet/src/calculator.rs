//! Stateless arithmetic, one operation per interaction shape.

use crate::engine::{
    CallContext, CallStream, Inbound, MethodDescriptor, ServiceDescriptor, Shape, bidi_stream,
    client_stream, relay, server_stream, unary,
};
use crate::{Error, Result};

const SERVICE: &str = "calculator.CalculatorService";

pub static CALCULATE: MethodDescriptor = MethodDescriptor::new(SERVICE, "Calculate", Shape::Unary);
pub static SQUARE_ROOT: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "SquareRoot", Shape::Unary);
pub static PRIME_NUMBER_DECOMPOSITION: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "PrimeNumberDecomposition", Shape::ServerStream);
pub static COMPUTE_AVERAGE: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "ComputeAverage", Shape::ClientStream);
pub static FIND_MAXIMUM: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "FindMaximum", Shape::BidiStream);

pub static CALCULATOR_SERVICE: ServiceDescriptor = ServiceDescriptor {
    name: SERVICE,
    methods: &[
        &CALCULATE,
        &SQUARE_ROOT,
        &PRIME_NUMBER_DECOMPOSITION,
        &COMPUTE_AVERAGE,
        &FIND_MAXIMUM,
    ],
};

/// Trial divisions between cancellation checks while factoring.
const FACTOR_CHECK_INTERVAL: u64 = 4096;

#[derive(Clone, Debug)]
pub struct Calculator {
    stream_buffer: usize,
}

impl Calculator {
    pub const fn new() -> Self {
        Self { stream_buffer: 8 }
    }

    pub const fn with_stream_buffer(mut self, stream_buffer: usize) -> Self {
        self.stream_buffer = stream_buffer;
        self
    }

    /// `x + y`, rejecting results that do not fit in an `i32`.
    pub async fn sum(&self, ctx: CallContext, x: i32, y: i32) -> Result<i32> {
        unary(ctx, (x, y), |_, (x, y)| async move {
            tracing::debug!("Calculate {x} + {y}");
            x.checked_add(y)
                .ok_or_else(|| Error::invalid_argument(format!("{x} + {y} overflows int32")))
        })
        .await
    }

    pub async fn square_root(&self, ctx: CallContext, number: i32) -> Result<f64> {
        unary(ctx, number, |_, number| async move {
            if number < 0 {
                return Err(Error::invalid_argument(format!(
                    "Received negative number: {number}"
                )));
            }
            Ok(f64::from(number).sqrt())
        })
        .await
    }

    /// Streams the prime factors of `number` in ascending order, repeated by
    /// multiplicity. Numbers below 2 have no factors and close the stream
    /// immediately.
    pub fn prime_decomposition(&self, ctx: CallContext, number: i64) -> CallStream<i64> {
        server_stream(ctx, number, self.stream_buffer, |number, mut out| async move {
            tracing::debug!("Decomposing {number}");
            let mut n = number;
            let mut divisor = 2_i64;
            let mut steps = 0_u64;

            while n > 1 {
                if divisor > n / divisor {
                    out.emit(n).await?;
                    break;
                }
                if n % divisor == 0 {
                    out.emit(divisor).await?;
                    n /= divisor;
                } else {
                    divisor += 1;
                    steps += 1;
                    if steps % FACTOR_CHECK_INTERVAL == 0 {
                        out.context().check()?;
                        tokio::task::yield_now().await;
                    }
                }
            }
            Ok(())
        })
    }

    /// Mean of every number the caller sends.
    ///
    /// An empty input is rejected with `InvalidArgument` rather than
    /// answered with NaN.
    pub async fn compute_average(&self, inbound: Inbound<i64>) -> Result<f64> {
        client_stream(inbound, |mut inbound| async move {
            let mut total = 0_i128;
            let mut count = 0_u64;
            while let Some(number) = inbound.receive().await? {
                total += i128::from(number);
                count += 1;
            }
            if count == 0 {
                return Err(Error::invalid_argument("no numbers received"));
            }
            Ok(total as f64 / count as f64)
        })
        .await
    }

    /// Emits the running maximum after every received number.
    pub fn find_maximum(&self, inbound: Inbound<i64>) -> CallStream<i64> {
        bidi_stream(inbound, self.stream_buffer, |inbound, out| {
            let mut maximum: Option<i64> = None;
            relay(inbound, out, move |number| {
                let current = maximum.map_or(number, |m| m.max(number));
                maximum = Some(current);
                Ok(current)
            })
        })
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}
