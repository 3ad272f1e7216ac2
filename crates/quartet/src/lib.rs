#![doc = include_str!("../README.md")]

pub mod blog;
pub mod calculator;
pub mod engine;
mod error;
pub mod greet;
pub mod store;

pub use crate::error::*;

use crate::engine::Registry;

/// A registry advertising the blog, calculator and greet services.
pub fn default_registry() -> Registry {
    Registry::new()
        .with(&blog::BLOG_SERVICE)
        .with(&calculator::CALCULATOR_SERVICE)
        .with(&greet::GREET_SERVICE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Shape;

    #[test]
    fn default_registry_exposes_every_operation() {
        let registry = default_registry();
        assert_eq!(registry.services().count(), 3);

        for service in registry.services() {
            for method in service.methods {
                assert_eq!(method.service, service.name);
                assert!(registry.contains(method), "{method} missing");
            }
        }
        assert_eq!(calculator::FIND_MAXIMUM.shape, Shape::BidiStream);
        assert_eq!(blog::LIST_BLOG.shape, Shape::ServerStream);
        assert_eq!(greet::LONG_GREET.shape, Shape::ClientStream);
    }
}
