//! Generates the gRPC client and server bindings for the `calculator`, `blog`
//! and `greet` packages with `tonic-build`'s manual builder.
//!
//! The message types are hand-written prost structs under `src/proto`, so no
//! `.proto` files or `protoc` are involved. Each service is emitted into
//! `OUT_DIR` as `<package>.<Service>.rs` and pulled in with `include!`.

use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic_prost::ProstCodec";

#[derive(Clone, Copy)]
enum Shape {
    Unary,
    ServerStream,
    ClientStream,
    BidiStream,
}

fn method(name: &str, route: &str, module: &str, input: &str, output: &str, shape: Shape) -> Method {
    let builder = Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::proto::{module}::{input}"))
        .output_type(format!("crate::proto::{module}::{output}"))
        .codec_path(CODEC);

    match shape {
        Shape::Unary => builder.build(),
        Shape::ServerStream => builder.server_streaming().build(),
        Shape::ClientStream => builder.client_streaming().build(),
        Shape::BidiStream => builder.client_streaming().server_streaming().build(),
    }
}

fn calculator() -> Service {
    let m = |name, route, input, output, shape| method(name, route, "calculator", input, output, shape);
    Service::builder()
        .name("CalculatorService")
        .package("calculator")
        .method(m("calculate", "Calculate", "CalculatorRequest", "CalculatorResponse", Shape::Unary))
        .method(m("square_root", "SquareRoot", "SquareRootRequest", "SquareRootResponse", Shape::Unary))
        .method(m(
            "prime_number_decomposition",
            "PrimeNumberDecomposition",
            "PrimeNumberDecompositionRequest",
            "PrimeNumberDecompositionResponse",
            Shape::ServerStream,
        ))
        .method(m(
            "compute_average",
            "ComputeAverage",
            "ComputeAverageRequest",
            "ComputeAverageResponse",
            Shape::ClientStream,
        ))
        .method(m(
            "find_maximum",
            "FindMaximum",
            "FindMaximumRequest",
            "FindMaximumResponse",
            Shape::BidiStream,
        ))
        .build()
}

fn blog() -> Service {
    let m = |name, route, input, output, shape| method(name, route, "blog", input, output, shape);
    Service::builder()
        .name("BlogService")
        .package("blog")
        .method(m("create_blog", "CreateBlog", "CreateBlogRequest", "CreateBlogResponse", Shape::Unary))
        .method(m("read_blog", "ReadBlog", "ReadBlogRequest", "ReadBlogResponse", Shape::Unary))
        .method(m("update_blog", "UpdateBlog", "UpdateBlogRequest", "UpdateBlogResponse", Shape::Unary))
        .method(m("delete_blog", "DeleteBlog", "DeleteBlogRequest", "DeleteBlogResponse", Shape::Unary))
        .method(m("list_blog", "ListBlog", "ListBlogRequest", "ListBlogResponse", Shape::ServerStream))
        .build()
}

fn greet() -> Service {
    let m = |name, route, input, output, shape| method(name, route, "greet", input, output, shape);
    Service::builder()
        .name("GreetService")
        .package("greet")
        .method(m("greet", "Greet", "GreetRequest", "GreetResponse", Shape::Unary))
        .method(m(
            "greet_many_times",
            "GreetManyTimes",
            "GreetManyTimesRequest",
            "GreetManyTimesResponse",
            Shape::ServerStream,
        ))
        .method(m("long_greet", "LongGreet", "LongGreetRequest", "LongGreetResponse", Shape::ClientStream))
        .method(m(
            "greet_everyone",
            "GreetEveryone",
            "GreetEveryoneRequest",
            "GreetEveryoneResponse",
            Shape::BidiStream,
        ))
        .method(m(
            "greet_with_deadline",
            "GreetWithDeadLine",
            "GreetWithDeadlineRequest",
            "GreetWithDeadlineResponse",
            Shape::Unary,
        ))
        .build()
}

fn main() {
    Builder::new().compile(&[calculator(), blog(), greet()]);
}
