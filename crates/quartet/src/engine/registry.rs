//! Service registration surface.
//!
//! Each service advertises a static [`ServiceDescriptor`] naming its
//! operations, and each operation is bound to exactly one [`Shape`]. The
//! [`Registry`] records which descriptors a server exposes so the
//! [`Dispatcher`](super::Dispatcher) can refuse calls to anything else.
//!
//! Routing a transport path to a handler is not done here: the generated
//! tonic router matches `/package.Service/Method` and the generated service
//! trait impls call the handlers. Unknown paths never reach the engine and
//! are answered `Unimplemented` by the router.

use core::fmt;

/// The four interaction shapes a call can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// One request, one response.
    Unary,
    /// One request, many responses.
    ServerStream,
    /// Many requests, one response.
    ClientStream,
    /// Many requests and many responses, independently timed.
    BidiStream,
}

impl Shape {
    /// Whether the caller sends more than one message.
    pub const fn client_streaming(self) -> bool {
        matches!(self, Self::ClientStream | Self::BidiStream)
    }

    /// Whether the handler sends more than one message.
    pub const fn server_streaming(self) -> bool {
        matches!(self, Self::ServerStream | Self::BidiStream)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unary => "unary",
            Self::ServerStream => "server_stream",
            Self::ClientStream => "client_stream",
            Self::BidiStream => "bidi_stream",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named operation bound to one interaction shape.
#[derive(Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Fully-qualified service name, e.g. `blog.BlogService`.
    pub service: &'static str,
    /// Route name of the operation, e.g. `ReadBlog`.
    pub name: &'static str,
    pub shape: Shape,
}

impl MethodDescriptor {
    pub const fn new(service: &'static str, name: &'static str, shape: Shape) -> Self {
        Self {
            service,
            name,
            shape,
        }
    }

    /// The transport path of this method: `/service/name`.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.name)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.name)
    }
}

/// The set of operations a service advertises.
#[derive(Debug)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub methods: &'static [&'static MethodDescriptor],
}

/// Registered services, in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    services: Vec<&'static ServiceDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service. Registering the same name twice replaces the
    /// earlier descriptor.
    pub fn register(&mut self, service: &'static ServiceDescriptor) -> &mut Self {
        self.services.retain(|s| s.name != service.name);
        self.services.push(service);
        self
    }

    pub fn with(mut self, service: &'static ServiceDescriptor) -> Self {
        self.register(service);
        self
    }

    pub fn services(&self) -> impl Iterator<Item = &'static ServiceDescriptor> + '_ {
        self.services.iter().copied()
    }

    /// Whether `method` is the descriptor registered under its own name.
    pub fn contains(&self, method: &MethodDescriptor) -> bool {
        self.services
            .iter()
            .filter(|s| s.name == method.service)
            .flat_map(|s| s.methods.iter())
            .any(|m| *m == method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PING: MethodDescriptor = MethodDescriptor::new("test.Echo", "Ping", Shape::Unary);
    static CHATTER: MethodDescriptor =
        MethodDescriptor::new("test.Echo", "Chatter", Shape::BidiStream);
    static ECHO: ServiceDescriptor = ServiceDescriptor {
        name: "test.Echo",
        methods: &[&PING, &CHATTER],
    };

    static STRAY: MethodDescriptor = MethodDescriptor::new("test.Echo", "Ping", Shape::BidiStream);

    #[test]
    fn contains_only_registered_descriptors() {
        let registry = Registry::new().with(&ECHO);

        assert!(registry.contains(&PING));
        assert!(registry.contains(&CHATTER));
        assert_eq!(CHATTER.path(), "/test.Echo/Chatter");
        // Same route, different shape.
        assert!(!registry.contains(&STRAY));
        assert!(!Registry::new().contains(&PING));
    }

    #[test]
    fn registering_a_name_again_replaces_it() {
        static EMPTY: ServiceDescriptor = ServiceDescriptor {
            name: "test.Echo",
            methods: &[],
        };
        let mut registry = Registry::new().with(&ECHO);
        registry.register(&EMPTY);

        assert_eq!(registry.services().count(), 1);
        assert!(!registry.contains(&PING));
    }

    #[test]
    fn shape_directions() {
        assert!(!Shape::Unary.client_streaming() && !Shape::Unary.server_streaming());
        assert!(Shape::ServerStream.server_streaming() && !Shape::ServerStream.client_streaming());
        assert!(Shape::ClientStream.client_streaming() && !Shape::ClientStream.server_streaming());
        assert!(Shape::BidiStream.client_streaming() && Shape::BidiStream.server_streaming());
    }
}
